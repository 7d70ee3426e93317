//! Deny-list check for queries typed into the expert console.
//!
//! This is a case-insensitive substring scan, not a parser. It will not catch
//! keywords hidden behind escapes or built at runtime, and it rejects harmless
//! queries that merely mention a keyword (e.g. inside a literal). The graph
//! store's own read-only endpoint configuration remains the real boundary.

use crate::error::PipelineError;

/// SPARQL Update operations that create, modify, delete or bulk-load data.
pub const DENY_LIST: &[&str] = &[
    "INSERT", "DELETE", "DROP", "CLEAR", "CREATE", "LOAD", "COPY", "MOVE", "UPDATE",
];

/// First deny-listed keyword contained in `body`, ignoring case.
pub fn find_forbidden(body: &str) -> Option<&'static str> {
    let upper = body.to_uppercase();
    DENY_LIST.iter().copied().find(|kw| upper.contains(kw))
}

/// Rejects empty bodies and anything matching [`DENY_LIST`]. Returns the body
/// unchanged otherwise.
pub fn check(body: &str) -> Result<&str, PipelineError> {
    if body.trim().is_empty() {
        return Err(PipelineError::empty_query());
    }
    match find_forbidden(body) {
        Some(keyword) => Err(PipelineError::SecurityRejection { keyword }),
        None => Ok(body),
    }
}

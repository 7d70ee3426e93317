//! Question → SPARQL body, via the completion oracle.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::namespaces::undeclared_prefixes;
use crate::oracle::CompletionOracle;
use crate::prompt::{system_prompt, GenerationRequest};
use crate::vocab::Vocabulary;

/// Query text without namespace declarations, as produced by the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedBody(String);

impl GeneratedBody {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

pub struct QueryGenerator {
    oracle: Arc<dyn CompletionOracle>,
    system_prompt: String,
}

impl QueryGenerator {
    pub fn new(vocab: &Vocabulary, oracle: Arc<dyn CompletionOracle>) -> Self {
        Self {
            oracle,
            system_prompt: system_prompt(vocab),
        }
    }

    pub fn request_for(&self, question: &str) -> GenerationRequest {
        GenerationRequest::new(&self.system_prompt, question)
    }

    /// One oracle call, no retries. The body is not checked for SPARQL
    /// syntax; malformed output surfaces later as a store error.
    pub async fn generate(&self, question: &str) -> Result<GeneratedBody, PipelineError> {
        if question.trim().is_empty() {
            return Err(PipelineError::empty_question());
        }

        let request = self.request_for(question);
        let text = self
            .oracle
            .complete(&request.prompt)
            .await
            .map_err(|e| PipelineError::Generation(e.to_string()))?;
        debug!(oracle = %self.oracle.describe(), response = %text, "oracle response");

        let body = extract_query_body(&text).ok_or_else(PipelineError::no_query_produced)?;
        let missing = undeclared_prefixes(body.as_str());
        if !missing.is_empty() {
            // Left to the store to reject; the log makes the cause obvious.
            warn!(?missing, "generated query uses undeclared prefixes");
        }
        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct QueryEnvelope {
    #[serde(default)]
    sparql: Option<String>,
}

/// Info strings the oracle is known to put after an opening fence.
const FENCE_TAGS: &[&str] = &["sparql", "json"];

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Removes markdown fence markers (```` ```sparql ````, ```` ```json ````,
/// bare ```` ``` ````) wherever they appear and trims the result.
pub fn strip_code_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find("```") {
        out.push_str(&rest[..idx]);
        rest = &rest[idx + 3..];
        let tag_len = rest
            .char_indices()
            .find(|(_, c)| !is_tag_char(*c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let tag = &rest[..tag_len];
        if FENCE_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            // `sparql` / `json` go wherever they sit, with the blanks after them.
            rest = rest[tag_len..].trim_start_matches([' ', '\t']);
        } else if matches!(rest[tag_len..].chars().next(), None | Some('\n') | Some('\r')) {
            // Any other info string only when it runs to the end of the line.
            rest = &rest[tag_len..];
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// Two-stage extraction: a JSON object with a non-empty `sparql` field wins;
/// anything else (prose, bare SPARQL, JSON without the field) falls back to
/// the fence-stripped text. `None` when nothing is left.
pub fn extract_query_body(text: &str) -> Option<GeneratedBody> {
    let cleaned = strip_code_fences(text);

    if let Ok(envelope) = serde_json::from_str::<QueryEnvelope>(&cleaned) {
        if let Some(sparql) = envelope.sparql.filter(|s| !s.trim().is_empty()) {
            return Some(GeneratedBody(sparql));
        }
    }

    if cleaned.is_empty() {
        None
    } else {
        Some(GeneratedBody(cleaned))
    }
}

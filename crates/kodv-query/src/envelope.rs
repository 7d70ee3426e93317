//! Uniform result envelope returned for every request.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, PipelineError};
use crate::results::{Binding, SelectResults};

pub const EMPTY_MESSAGE: &str = "no data";

/// Terminal state of one request, serialized with a `status` tag:
///
/// ```json
/// {"status": "success", "sparql": "SELECT ...", "vars": ["name"], "data": [...]}
/// {"status": "empty", "message": "no data"}
/// {"status": "error", "kind": "security", "message": "..."}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResultEnvelope {
    Success {
        /// The body that was executed, without the namespace block.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sparql: Option<String>,
        #[serde(default)]
        vars: Vec<String>,
        data: Vec<Binding>,
    },
    Empty {
        message: String,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

/// What the pipeline produced before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Rows {
        sparql: Option<String>,
        results: SelectResults,
    },
    /// A single-record lookup matched nothing.
    Empty,
}

impl ResultEnvelope {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn data(&self) -> &[Binding] {
        match self {
            Self::Success { data, .. } => data,
            _ => &[],
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Error { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<Outcome> for ResultEnvelope {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Rows { sparql, results } => {
                let (vars, data) = results.into_parts();
                Self::Success { sparql, vars, data }
            }
            Outcome::Empty => Self::Empty {
                message: EMPTY_MESSAGE.to_string(),
            },
        }
    }
}

impl From<&PipelineError> for ResultEnvelope {
    fn from(err: &PipelineError) -> Self {
        Self::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Wraps the terminal pipeline state into an envelope. Binding values pass
/// through untouched.
pub fn normalize(result: Result<Outcome, PipelineError>) -> ResultEnvelope {
    match result {
        Ok(outcome) => outcome.into(),
        Err(err) => ResultEnvelope::from(&err),
    }
}

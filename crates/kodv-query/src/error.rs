use thiserror::Error;

/// Failure of a single pipeline request. Every variant is terminal for the
/// request; nothing here is retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Empty question, empty console query or malformed region code.
    #[error("{0}")]
    Input(String),

    /// The oracle failed or produced no usable query body.
    #[error("{0}")]
    Generation(String),

    /// A console query matched the mutation deny-list.
    #[error("🚫 security warning: queries that modify or delete data are not allowed (matched `{keyword}`)")]
    SecurityRejection { keyword: &'static str },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    pub fn empty_question() -> Self {
        Self::Input("no question provided".to_string())
    }

    pub fn empty_query() -> Self {
        Self::Input("empty query".to_string())
    }

    pub fn no_query_produced() -> Self {
        Self::Generation("no query produced".to_string())
    }

    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Input(_) => ErrorKind::Input,
            Self::Generation(_) => ErrorKind::Generation,
            Self::SecurityRejection { .. } => ErrorKind::Security,
            Self::Store(_) => ErrorKind::Store,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    Generation,
    Security,
    Store,
}

/// Transport or evaluation failure at the graph store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("graph store request failed: {0}")]
    Transport(String),
    #[error("graph store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("graph store returned malformed results: {0}")]
    Decode(String),
}

/// Failure of the text-completion oracle.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("LLM network error: {0}")]
    Network(String),
    #[error("LLM API error: {0}")]
    Api(String),
    #[error("LLM returned an invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no LLM provider configured; set GEMINI_API_KEY or OPENAI_API_KEY")]
    NoProviderConfigured,
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_keep_the_diagnostic() {
        let err: PipelineError = StoreError::Status {
            status: 400,
            body: "MalformedQueryException: Encountered \" \"}\"".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Store);
        assert!(err.to_string().contains("MalformedQueryException"));
    }

    #[test]
    fn security_rejection_names_the_keyword() {
        let err = PipelineError::SecurityRejection { keyword: "DROP" };
        assert_eq!(err.kind(), ErrorKind::Security);
        assert!(err.to_string().contains("`DROP`"));
    }
}

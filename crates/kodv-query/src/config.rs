//! Runtime configuration read from environment variables.
//!
//! - `KODV_SPARQL_ENDPOINT` (default: local Blazegraph `kb` namespace)
//! - `KODV_STORE_TIMEOUT_SECS` (default 30)
//! - `GEMINI_API_KEY`, `GEMINI_MODEL`, `GEMINI_BASE_URL`
//! - `OPENAI_API_KEY`, `OPENAI_MODEL`, `OPENAI_BASE_URL` (used when no Gemini key is set)
//! - `KODV_LLM_TIMEOUT_SECS` (default 60)
//! - `KODV_WIKIDATA_ENDPOINT`, `KODV_ENRICH_TIMEOUT_MS` (default 2000),
//!   `KODV_USER_AGENT`, `KODV_ENRICH_DISABLED`

use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_SPARQL_ENDPOINT: &str = "http://localhost:9999/blazegraph/namespace/kb/sparql";
pub const DEFAULT_WIKIDATA_ENDPOINT: &str = "https://query.wikidata.org/sparql";
pub const DEFAULT_USER_AGENT: &str = "KODV_Project_Bot/1.0";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Gemini,
    OpenAi,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub timeout: Duration,
    pub user_agent: String,
    /// Language of the description pulled from the federated service.
    pub language: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_WIKIDATA_ENDPOINT.to_string(),
            timeout: Duration::from_millis(2000),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            language: "ko".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub store: StoreConfig,
    /// `None` when no provider key is present; `ask` is then unavailable but
    /// the console, code list and region lookups still work.
    pub llm: Option<LlmConfig>,
    pub enrichment: EnrichmentConfig,
}

impl PipelineConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup (tests pass a map here).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let store = StoreConfig {
            endpoint: get("KODV_SPARQL_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_SPARQL_ENDPOINT.to_string()),
            timeout: Duration::from_secs(parse_u64(&get, "KODV_STORE_TIMEOUT_SECS", 30)?),
        };

        let llm_timeout = Duration::from_secs(parse_u64(&get, "KODV_LLM_TIMEOUT_SECS", 60)?);
        let llm = if let Some(key) = get("GEMINI_API_KEY") {
            Some(LlmConfig {
                provider: LlmProvider::Gemini,
                api_key: key,
                model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                base_url: get("GEMINI_BASE_URL"),
                timeout: llm_timeout,
            })
        } else if let Some(key) = get("OPENAI_API_KEY") {
            Some(LlmConfig {
                provider: LlmProvider::OpenAi,
                api_key: key,
                model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                base_url: get("OPENAI_BASE_URL"),
                timeout: llm_timeout,
            })
        } else {
            None
        };

        let defaults = EnrichmentConfig::default();
        let enrichment = EnrichmentConfig {
            enabled: !get("KODV_ENRICH_DISABLED")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            endpoint: get("KODV_WIKIDATA_ENDPOINT").unwrap_or(defaults.endpoint),
            timeout: Duration::from_millis(parse_u64(&get, "KODV_ENRICH_TIMEOUT_MS", 2000)?),
            user_agent: get("KODV_USER_AGENT").unwrap_or(defaults.user_agent),
            language: defaults.language,
        };

        Ok(Self {
            store,
            llm,
            enrichment,
        })
    }

    pub fn require_llm(&self) -> Result<&LlmConfig, ConfigError> {
        self.llm.as_ref().ok_or(ConfigError::NoProviderConfigured)
    }
}

fn parse_u64<G>(get: &G, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
            var,
            reason: format!("`{raw}`: {e}"),
        }),
    }
}

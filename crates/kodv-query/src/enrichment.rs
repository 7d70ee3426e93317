//! Best-effort enrichment from Wikidata.
//!
//! A local entity may carry an `owl:sameAs` link to its Wikidata item. When it
//! does, we ask Wikidata for one depicting image and a Korean description and
//! merge them into the row. Nothing here can fail the request: every error,
//! including the timeout, is logged and turned into "no enrichment".

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::EnrichmentConfig;
use crate::results::{Binding, RdfTerm, SelectResults};
use crate::vocab::CROSS_REFERENCE_VAR;

/// Depicting properties, in priority order: image, logo image, coat of arms
/// image, flag image. They are tried as one alternation path, so when an item
/// has several the store decides which one comes back first.
pub const IMAGE_PREDICATES: &[&str] = &["wdt:P18", "wdt:P154", "wdt:P94", "wdt:P41"];

pub const IMAGE_VAR: &str = "image";
pub const DESCRIPTION_VAR: &str = "desc";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentRecord {
    pub image: Option<RdfTerm>,
    pub desc: Option<RdfTerm>,
}

impl EnrichmentRecord {
    pub fn is_empty(&self) -> bool {
        self.image.is_none() && self.desc.is_none()
    }

    /// Adds `image` / `desc` to `binding`.
    pub fn merge_into(self, binding: &mut Binding) {
        if let Some(image) = self.image {
            binding.insert(IMAGE_VAR.to_string(), image);
        }
        if let Some(desc) = self.desc {
            binding.insert(DESCRIPTION_VAR.to_string(), desc);
        }
    }
}

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("enrichment request failed: {0}")]
    Transport(String),
    #[error("enrichment service returned HTTP {0}")]
    Status(u16),
    #[error("enrichment response was malformed: {0}")]
    Decode(String),
}

/// Remote lookup of one cross-reference. Implementations may fail freely;
/// [`EnrichmentFetcher`] absorbs the errors.
#[async_trait]
pub trait EnrichmentSource: Send + Sync {
    async fn lookup(&self, xref: &str) -> Result<Option<EnrichmentRecord>, EnrichmentError>;
}

/// SPARQL sent to Wikidata for `xref`.
pub fn enrichment_query(xref: &str, language: &str) -> String {
    format!(
        r#"PREFIX wdt: <http://www.wikidata.org/prop/direct/>
PREFIX schema: <http://schema.org/>

SELECT ?{IMAGE_VAR} ?{DESCRIPTION_VAR} WHERE {{
  <{xref}> {predicates} ?{IMAGE_VAR} .
  OPTIONAL {{ <{xref}> schema:description ?{DESCRIPTION_VAR} . FILTER(LANG(?{DESCRIPTION_VAR}) = "{language}") }}
}} LIMIT 1"#,
        predicates = IMAGE_PREDICATES.join("|"),
    )
}

/// True when `xref` is an absolute http(s) IRI that can be written between
/// `<` and `>` without escaping.
pub fn is_linkable_iri(xref: &str) -> bool {
    const FORBIDDEN: &[char] = &['<', '>', '"', '{', '}', '|', '\\', '^', '`'];
    if xref.is_empty() || xref.chars().any(|c| c.is_whitespace() || c.is_control() || FORBIDDEN.contains(&c)) {
        return false;
    }
    match url::Url::parse(xref) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

/// Wikidata Query Service client.
pub struct WikidataSource {
    client: Client,
    endpoint: String,
    user_agent: String,
    language: String,
}

impl WikidataSource {
    pub fn new(config: &EnrichmentConfig) -> Result<Self, EnrichmentError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EnrichmentError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            user_agent: config.user_agent.clone(),
            language: config.language.clone(),
        })
    }
}

#[async_trait]
impl EnrichmentSource for WikidataSource {
    async fn lookup(&self, xref: &str) -> Result<Option<EnrichmentRecord>, EnrichmentError> {
        let query = enrichment_query(xref, &self.language);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("query", query.as_str()), ("format", "json")])
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, crate::store::SPARQL_RESULTS_JSON)
            .send()
            .await
            .map_err(|e| EnrichmentError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EnrichmentError::Status(response.status().as_u16()));
        }

        let results: SelectResults = response
            .json()
            .await
            .map_err(|e| EnrichmentError::Decode(e.to_string()))?;

        Ok(results.bindings().first().map(|row| EnrichmentRecord {
            image: row.get(IMAGE_VAR).cloned(),
            desc: row.get(DESCRIPTION_VAR).cloned(),
        }))
    }
}

/// Wraps a source with a hard deadline and error absorption.
#[derive(Clone)]
pub struct EnrichmentFetcher {
    source: Arc<dyn EnrichmentSource>,
    timeout: Duration,
}

impl EnrichmentFetcher {
    pub fn new(source: Arc<dyn EnrichmentSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Never fails and never takes longer than the configured timeout.
    pub async fn fetch(&self, xref: &str) -> Option<EnrichmentRecord> {
        if !is_linkable_iri(xref) {
            debug!(xref, "skipping enrichment for non-IRI cross-reference");
            return None;
        }

        match tokio::time::timeout(self.timeout, self.source.lookup(xref)).await {
            Ok(Ok(Some(record))) if !record.is_empty() => Some(record),
            Ok(Ok(_)) => {
                debug!(xref, "no enrichment record");
                None
            }
            Ok(Err(err)) => {
                warn!(xref, error = %err, "enrichment failed; returning primary result only");
                None
            }
            Err(_) => {
                warn!(
                    xref,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "enrichment timed out; returning primary result only"
                );
                None
            }
        }
    }

    /// Enriches the first row that carries a cross-reference. Rows without
    /// one are left alone and the source is not contacted.
    pub async fn enrich(&self, results: &mut SelectResults) {
        let Some(row) = results
            .results
            .bindings
            .iter_mut()
            .find(|b| b.contains_key(CROSS_REFERENCE_VAR))
        else {
            return;
        };

        let xref = row[CROSS_REFERENCE_VAR].value.clone();
        if let Some(record) = self.fetch(&xref).await {
            record.merge_into(row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_uses_predicate_alternation_in_priority_order() {
        let q = enrichment_query("http://www.wikidata.org/entity/Q8684", "ko");
        assert!(q.contains(
            "<http://www.wikidata.org/entity/Q8684> wdt:P18|wdt:P154|wdt:P94|wdt:P41 ?image ."
        ));
        assert!(q.contains(r#"FILTER(LANG(?desc) = "ko")"#));
        assert!(q.trim_end().ends_with("LIMIT 1"));
    }

    #[test]
    fn only_plain_http_iris_are_linkable() {
        assert!(is_linkable_iri("http://www.wikidata.org/entity/Q8684"));
        assert!(is_linkable_iri("https://www.wikidata.org/entity/Q8684"));
        assert!(!is_linkable_iri(""));
        assert!(!is_linkable_iri("Q8684"));
        assert!(!is_linkable_iri("urn:isbn:123"));
        assert!(!is_linkable_iri("http://x.org/a> } ; DROP ALL #"));
        assert!(!is_linkable_iri("http://x.org/a b"));
    }

    #[test]
    fn merge_adds_only_present_fields() {
        let mut row = Binding::new();
        row.insert("label".to_string(), RdfTerm::literal("서울특별시"));
        EnrichmentRecord {
            image: Some(RdfTerm::uri("http://commons.wikimedia.org/wiki/Special:FilePath/Seoul.jpg")),
            desc: None,
        }
        .merge_into(&mut row);

        assert_eq!(row.len(), 2);
        assert!(row.contains_key(IMAGE_VAR));
        assert!(!row.contains_key(DESCRIPTION_VAR));
    }
}

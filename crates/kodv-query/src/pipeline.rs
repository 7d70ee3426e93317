//! Inbound operations.
//!
//! ```text
//! ask:          question → generate → assemble → execute → enrich → envelope
//! run_console:  body → gate → assemble → execute → envelope
//! region_data:  code → fixed lookup → assemble → execute → enrich → envelope
//! existing_codes: fixed query → assemble → execute → code prefixes
//! ```
//!
//! All collaborators are injected at construction. A `Pipeline` holds no
//! per-request state and can be shared across tasks behind an `Arc`.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{debug, info};

use crate::enrichment::EnrichmentFetcher;
use crate::envelope::{normalize, Outcome, ResultEnvelope};
use crate::error::PipelineError;
use crate::executor::GraphExecutor;
use crate::gate;
use crate::generator::QueryGenerator;
use crate::namespaces::assemble;
use crate::oracle::CompletionOracle;
use crate::prompt::GenerationRequest;
use crate::store::GraphStore;
use crate::vocab::{Vocabulary, CROSS_REFERENCE_VAR, DIVISION_CODE_PROPERTY, KODV_ID_BASE};

/// Properties shown on the region detail card, in display order.
pub const REGION_CARD_PROPERTIES: &[&str] = &[
    "kodv:population",
    "kodv:droughtSeverityAvg",
    "kodv:droughtFrequency",
    "kodv:vulnerabilityScore",
];

/// Short (province) and long (city/county/district) code prefix lengths.
pub const CODE_PREFIX_LENGTHS: [usize; 2] = [2, 5];

pub struct Pipeline {
    vocab: Arc<Vocabulary>,
    generator: Option<QueryGenerator>,
    executor: GraphExecutor,
    enricher: Option<EnrichmentFetcher>,
}

impl Pipeline {
    pub fn new(vocab: Arc<Vocabulary>, store: Arc<dyn GraphStore>) -> Self {
        Self {
            vocab,
            generator: None,
            executor: GraphExecutor::new(store),
            enricher: None,
        }
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn CompletionOracle>) -> Self {
        self.generator = Some(QueryGenerator::new(&self.vocab, oracle));
        self
    }

    pub fn with_enrichment(mut self, enricher: EnrichmentFetcher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// The text that would be sent to the oracle for `question`.
    pub fn generation_request(&self, question: &str) -> Option<GenerationRequest> {
        self.generator.as_ref().map(|g| g.request_for(question))
    }

    // ------------------------------------------------------------------------
    // ask
    // ------------------------------------------------------------------------

    /// Translates `question` into SPARQL, runs it and enriches the first row
    /// carrying a cross-reference.
    pub async fn ask(&self, question: &str) -> ResultEnvelope {
        normalize(self.ask_outcome(question).await)
    }

    async fn ask_outcome(&self, question: &str) -> Result<Outcome, PipelineError> {
        if question.trim().is_empty() {
            return Err(PipelineError::empty_question());
        }
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| PipelineError::Generation("no LLM provider configured".to_string()))?;

        info!(question, "translating question");
        let body = generator.generate(question).await?;
        let query = assemble(body.as_str());
        debug!(query = %query, "assembled generated query");

        let mut results = self.executor.execute(&query).await?;
        if let Some(enricher) = &self.enricher {
            enricher.enrich(&mut results).await;
        }

        Ok(Outcome::Rows {
            sparql: Some(body.into_string()),
            results,
        })
    }

    // ------------------------------------------------------------------------
    // console
    // ------------------------------------------------------------------------

    /// Runs a user-written query body after the deny-list check.
    pub async fn run_console(&self, body: &str) -> ResultEnvelope {
        normalize(self.console_outcome(body).await)
    }

    async fn console_outcome(&self, body: &str) -> Result<Outcome, PipelineError> {
        let body = gate::check(body)?;
        info!("running console query");
        let query = assemble(body);
        let results = self.executor.execute(&query).await?;
        Ok(Outcome::Rows {
            sparql: None,
            results,
        })
    }

    // ------------------------------------------------------------------------
    // codes
    // ------------------------------------------------------------------------

    /// Distinct 2- and 5-character prefixes of every division code.
    pub async fn existing_codes(&self) -> Result<BTreeSet<String>, PipelineError> {
        let query = assemble(&format!(
            "SELECT DISTINCT ?code WHERE {{ ?s {DIVISION_CODE_PROPERTY} ?code . }}"
        ));
        let results = self.executor.execute(&query).await?;
        Ok(code_prefixes(results.column("code")))
    }

    // ------------------------------------------------------------------------
    // region detail
    // ------------------------------------------------------------------------

    /// Detail card for one division plus Wikidata enrichment.
    pub async fn region_data(&self, region_code: &str) -> ResultEnvelope {
        normalize(self.region_outcome(region_code).await)
    }

    async fn region_outcome(&self, region_code: &str) -> Result<Outcome, PipelineError> {
        let code = validate_region_code(region_code)?;
        let query = assemble(&region_query(&self.vocab, code));

        let outcome = self.executor.lookup_one(&query).await?;
        let Outcome::Rows { mut results, .. } = outcome else {
            return Ok(Outcome::Empty);
        };

        // Keep only the first row of the lookup.
        results.results.bindings.truncate(1);
        if let Some(enricher) = &self.enricher {
            enricher.enrich(&mut results).await;
        }
        Ok(Outcome::Rows {
            sparql: None,
            results,
        })
    }
}

/// Region codes are short alphanumeric identifiers appended to the KODV id
/// base; anything else is refused before it reaches a query string.
pub fn validate_region_code(code: &str) -> Result<&str, PipelineError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(PipelineError::Input("empty region code".to_string()));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(PipelineError::Input(format!("invalid region code `{code}`")));
    }
    Ok(code)
}

/// Body of the single-region lookup.
pub fn region_query(vocab: &Vocabulary, code: &str) -> String {
    let card: Vec<_> = REGION_CARD_PROPERTIES
        .iter()
        .filter_map(|iri| vocab.properties.iter().find(|p| p.property == *iri))
        .collect();

    let mut select = String::from("SELECT ?label");
    for p in &card {
        let _ = write!(select, " ?{}", p.variable);
    }
    let _ = write!(select, " ?gradeLabel ?{CROSS_REFERENCE_VAR}");

    let mut body = String::new();
    let _ = writeln!(body, "{select}");
    body.push_str("WHERE {\n");
    let _ = writeln!(body, "  BIND(<{KODV_ID_BASE}{code}> AS ?region)");
    body.push_str("  OPTIONAL { ?region rdfs:label ?label . }\n");
    let _ = writeln!(body, "  OPTIONAL {{ ?region owl:sameAs ?{CROSS_REFERENCE_VAR} . }}");
    for p in &card {
        let _ = writeln!(body, "  OPTIONAL {{ ?region {} ?{} . }}", p.property, p.variable);
    }
    body.push_str(
        "  OPTIONAL {\n    ?region kodv:vulnerabilityRating ?gradeURI .\n    ?gradeURI skos:prefLabel ?gradeLabel .\n  }\n",
    );
    body.push_str("} LIMIT 1");
    body
}

/// First 2 and first 5 characters of each code, deduplicated.
pub fn code_prefixes<'a, I>(codes: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = BTreeSet::new();
    for code in codes {
        let code = code.trim();
        let len = code.chars().count();
        for n in CODE_PREFIX_LENGTHS {
            if len >= n {
                out.insert(code.chars().take(n).collect());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::undeclared_prefixes;

    #[test]
    fn code_prefixes_take_two_and_five_characters() {
        let got = code_prefixes(["11010", "26110", "1", "4113510300"]);
        let want: BTreeSet<String> = ["11", "11010", "26", "26110", "41", "41135"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(got, want);
    }

    #[test]
    fn region_codes_are_validated() {
        assert_eq!(validate_region_code(" 11010 ").unwrap(), "11010");
        assert!(validate_region_code("").is_err());
        assert!(validate_region_code("11010> . } DROP ALL").is_err());
        assert!(validate_region_code("../etc").is_err());
    }

    #[test]
    fn region_query_selects_card_variables() {
        let vocab = Vocabulary::kodv();
        let q = region_query(&vocab, "11010");
        assert!(q.starts_with("SELECT ?label ?pop ?severity ?freq ?vulScore ?gradeLabel ?wikiURI\n"));
        assert!(q.contains("BIND(<https://knowledgemap.kr/kodv/id/11010> AS ?region)"));
        assert!(q.contains("OPTIONAL { ?region owl:sameAs ?wikiURI . }"));
        assert!(q.ends_with("} LIMIT 1"));
        assert!(undeclared_prefixes(&q).is_empty());
    }
}

//! KODV Query: natural language → SPARQL over the drought-vulnerability graph
//!
//! This crate turns Korean free-text questions about regional drought
//! vulnerability into SPARQL, runs them against a local graph store and
//! enriches results with Wikidata when a row links to it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                           ask(question)                              │
//! │                                                                      │
//! │  ┌────────────┐   ┌───────────┐   ┌───────────┐   ┌──────────────┐  │
//! │  │ Vocabulary │──►│ Generator │──►│ Assembler │──►│   Executor   │  │
//! │  │ + examples │   │ (oracle)  │   │ (PREFIX)  │   │ (SPARQL/HTTP)│  │
//! │  └────────────┘   └───────────┘   └─────▲─────┘   └──────┬───────┘  │
//! │                                         │                │          │
//! │                   ┌───────────┐         │         ┌──────▼───────┐  │
//! │  run_console ────►│   Gate    │─────────┘         │  Enrichment  │  │
//! │                   │(deny-list)│                   │  (Wikidata)  │  │
//! │                   └───────────┘                   └──────┬───────┘  │
//! │                                                          │          │
//! │                                                   ┌──────▼───────┐  │
//! │                                                   │   Envelope   │  │
//! │                                                   └──────────────┘  │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The oracle, the store and the enrichment source are traits
//! ([`CompletionOracle`], [`GraphStore`], [`EnrichmentSource`]) injected into
//! [`Pipeline`], so every stage can be replaced by a test double.

pub mod config;
pub mod enrichment;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod gate;
pub mod generator;
pub mod namespaces;
pub mod oracle;
pub mod pipeline;
pub mod prompt;
pub mod results;
pub mod store;
pub mod vocab;

pub use config::{EnrichmentConfig, LlmConfig, LlmProvider, PipelineConfig, StoreConfig};
pub use enrichment::{
    EnrichmentError, EnrichmentFetcher, EnrichmentRecord, EnrichmentSource, WikidataSource,
};
pub use envelope::{normalize, Outcome, ResultEnvelope};
pub use error::{ConfigError, ErrorKind, OracleError, PipelineError, StoreError};
pub use executor::GraphExecutor;
pub use generator::{extract_query_body, GeneratedBody, QueryGenerator};
pub use namespaces::{assemble, prefix_block, AssembledQuery, NAMESPACES};
pub use oracle::{CompletionOracle, GeminiOracle, OpenAiOracle};
pub use pipeline::Pipeline;
pub use results::{Binding, RdfTerm, SelectResults, TermType};
pub use store::{GraphStore, SparqlHttpStore};
pub use vocab::Vocabulary;

use std::sync::Arc;

/// Wires the HTTP-backed collaborators described by `config`.
///
/// Without an LLM provider the pipeline still serves the console, code list
/// and region lookups; `ask` then reports a generation error.
pub fn build_pipeline(config: &PipelineConfig) -> anyhow::Result<Pipeline> {
    let vocab = Arc::new(Vocabulary::kodv());
    let store = Arc::new(SparqlHttpStore::new(&config.store)?);
    let mut pipeline = Pipeline::new(vocab, store);

    if let Some(llm) = &config.llm {
        let oracle: Arc<dyn CompletionOracle> = Arc::from(oracle::from_config(llm)?);
        pipeline = pipeline.with_oracle(oracle);
    }

    if config.enrichment.enabled {
        let source = Arc::new(WikidataSource::new(&config.enrichment)?);
        pipeline = pipeline.with_enrichment(EnrichmentFetcher::new(source, config.enrichment.timeout));
    }

    Ok(pipeline)
}

//! Pipeline tests against in-memory test doubles
//!
//! Every collaborator (oracle, store, enrichment source) is replaced by a
//! double that records how often it was called, so the tests can assert that
//! rejected requests never reach the model or the store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kodv_query::*;

// ============================================================================
// Test doubles
// ============================================================================

struct ScriptedOracle {
    reply: Result<String, String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing(msg: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(msg.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionOracle for ScriptedOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().map_err(OracleError::Network)
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

struct StubStore {
    reply: Result<SelectResults, String>,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl StubStore {
    fn returning(results: SelectResults) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(results),
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        })
    }

    fn failing(msg: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(msg.to_string()),
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_query(&self) -> String {
        self.queries.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl GraphStore for StubStore {
    async fn select(&self, query: &str) -> Result<SelectResults, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        self.reply.clone().map_err(StoreError::Transport)
    }

    fn endpoint(&self) -> &str {
        "stub://store"
    }
}

enum EnrichBehavior {
    Hit(EnrichmentRecord),
    Miss,
    Fail,
    Hang,
}

struct StubEnrichment {
    behavior: EnrichBehavior,
    calls: AtomicUsize,
    xrefs: Mutex<Vec<String>>,
}

impl StubEnrichment {
    fn new(behavior: EnrichBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            xrefs: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnrichmentSource for StubEnrichment {
    async fn lookup(&self, xref: &str) -> Result<Option<EnrichmentRecord>, EnrichmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.xrefs.lock().unwrap().push(xref.to_string());
        match &self.behavior {
            EnrichBehavior::Hit(record) => Ok(Some(record.clone())),
            EnrichBehavior::Miss => Ok(None),
            EnrichBehavior::Fail => Err(EnrichmentError::Status(503)),
            EnrichBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(None)
            }
        }
    }
}

// ============================================================================
// Fixtures
// ============================================================================

const SEOUL_WIKI: &str = "http://www.wikidata.org/entity/Q8684";

fn row(pairs: &[(&str, RdfTerm)]) -> Binding {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn results(vars: &[&str], rows: Vec<Binding>) -> SelectResults {
    SelectResults::new(vars.iter().map(|v| v.to_string()).collect(), rows)
}

fn region_rows(with_xref: bool) -> SelectResults {
    let mut r = row(&[
        ("label", RdfTerm::lang_literal("서울특별시", "ko")),
        ("pop", RdfTerm::typed_literal("9386034", "http://www.w3.org/2001/XMLSchema#integer")),
    ]);
    if with_xref {
        r.insert("wikiURI".to_string(), RdfTerm::uri(SEOUL_WIKI));
    }
    results(&["label", "pop", "wikiURI"], vec![r])
}

fn seoul_record() -> EnrichmentRecord {
    EnrichmentRecord {
        image: Some(RdfTerm::uri(
            "http://commons.wikimedia.org/wiki/Special:FilePath/Seoul%20skyline.jpg",
        )),
        desc: Some(RdfTerm::lang_literal("대한민국의 수도", "ko")),
    }
}

fn pipeline(store: Arc<StubStore>) -> Pipeline {
    Pipeline::new(Arc::new(Vocabulary::kodv()), store)
}

fn fetcher(source: Arc<StubEnrichment>, timeout: Duration) -> EnrichmentFetcher {
    EnrichmentFetcher::new(source, timeout)
}

// ============================================================================
// ask
// ============================================================================

#[tokio::test]
async fn empty_question_touches_nothing() {
    let oracle = ScriptedOracle::replying(r#"{"sparql": "SELECT ?x WHERE {}"}"#);
    let store = StubStore::returning(SelectResults::default());
    let p = pipeline(store.clone()).with_oracle(oracle.clone());

    for q in ["", "   ", "\n\t"] {
        let env = p.ask(q).await;
        assert_eq!(env.error_kind(), Some(ErrorKind::Input), "question {q:?}");
    }
    assert_eq!(oracle.calls(), 0);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn json_reply_is_executed_with_prefixes() {
    let body = "SELECT ?name ?code ?val WHERE { ?s rdfs:label ?name ; koad:divisionCode ?code ; kodv:population ?val }";
    let oracle = ScriptedOracle::replying(&format!("```json\n{}\n```", serde_json::json!({ "sparql": body })));
    let store = StubStore::returning(results(&["name"], vec![]));
    let p = pipeline(store.clone()).with_oracle(oracle.clone());

    let env = p.ask("서울 인구").await;
    match &env {
        ResultEnvelope::Success { sparql, data, .. } => {
            assert_eq!(sparql.as_deref(), Some(body));
            assert!(data.is_empty());
        }
        other => panic!("expected success, got {other:?}"),
    }
    assert_eq!(oracle.calls(), 1);
    assert_eq!(store.last_query(), assemble(body).into_string());

    let prompt = oracle.prompts.lock().unwrap()[0].clone();
    assert!(prompt.ends_with("User: 서울 인구\nSPARQL:"));
}

#[tokio::test]
async fn raw_reply_falls_back_to_stripped_text() {
    let oracle = ScriptedOracle::replying("```sparql\nSELECT ?name WHERE { ?s rdfs:label ?name }\n```");
    let store = StubStore::returning(SelectResults::default());
    let p = pipeline(store.clone()).with_oracle(oracle);

    let env = p.ask("이름 목록").await;
    match env {
        ResultEnvelope::Success { sparql, .. } => {
            assert_eq!(sparql.as_deref(), Some("SELECT ?name WHERE { ?s rdfs:label ?name }"))
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn blank_reply_is_a_generation_failure() {
    let oracle = ScriptedOracle::replying("```\n\n```");
    let store = StubStore::returning(SelectResults::default());
    let p = pipeline(store.clone()).with_oracle(oracle.clone());

    let env = p.ask("아무거나").await;
    assert_eq!(env.error_kind(), Some(ErrorKind::Generation));
    match env {
        ResultEnvelope::Error { message, .. } => assert_eq!(message, "no query produced"),
        other => panic!("expected error, got {other:?}"),
    }
    assert_eq!(oracle.calls(), 1);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn oracle_failure_is_reported_without_retry() {
    let oracle = ScriptedOracle::failing("connection reset");
    let store = StubStore::returning(SelectResults::default());
    let p = pipeline(store.clone()).with_oracle(oracle.clone());

    let env = p.ask("전북 인구").await;
    assert_eq!(env.error_kind(), Some(ErrorKind::Generation));
    assert_eq!(oracle.calls(), 1);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn ask_without_oracle_is_a_generation_failure() {
    let store = StubStore::returning(SelectResults::default());
    let env = pipeline(store.clone()).ask("전북 인구").await;
    assert_eq!(env.error_kind(), Some(ErrorKind::Generation));
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn store_error_carries_the_diagnostic() {
    let oracle = ScriptedOracle::replying("SELECT ?x WHERE { ?x ?y }");
    let store = StubStore::failing("Encountered \" \"}\" at line 16");
    let p = pipeline(store.clone()).with_oracle(oracle);

    match p.ask("깨진 쿼리").await {
        ResultEnvelope::Error { kind, message } => {
            assert_eq!(kind, ErrorKind::Store);
            assert!(message.contains("at line 16"), "{message}");
        }
        other => panic!("expected store error, got {other:?}"),
    }
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn ask_rows_without_xref_skip_enrichment() {
    let oracle = ScriptedOracle::replying("SELECT ?name WHERE { ?s rdfs:label ?name }");
    let rows = results(
        &["name"],
        vec![row(&[("name", RdfTerm::literal("종로구"))])],
    );
    let store = StubStore::returning(rows.clone());
    let source = StubEnrichment::new(EnrichBehavior::Hit(seoul_record()));
    let p = pipeline(store)
        .with_oracle(oracle)
        .with_enrichment(fetcher(source.clone(), Duration::from_secs(2)));

    let env = p.ask("종로구").await;
    assert_eq!(env.data(), rows.bindings());
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn ask_enriches_only_the_first_linked_row() {
    let oracle = ScriptedOracle::replying("SELECT ?name ?wikiURI WHERE { ?s rdfs:label ?name ; owl:sameAs ?wikiURI }");
    let rows = results(
        &["name", "wikiURI"],
        vec![
            row(&[("name", RdfTerm::literal("무명"))]),
            row(&[("name", RdfTerm::literal("서울특별시")), ("wikiURI", RdfTerm::uri(SEOUL_WIKI))]),
            row(&[("name", RdfTerm::literal("부산광역시")), ("wikiURI", RdfTerm::uri("http://www.wikidata.org/entity/Q16520"))]),
        ],
    );
    let store = StubStore::returning(rows);
    let source = StubEnrichment::new(EnrichBehavior::Hit(seoul_record()));
    let p = pipeline(store)
        .with_oracle(oracle)
        .with_enrichment(fetcher(source.clone(), Duration::from_secs(2)));

    let env = p.ask("서울과 부산").await;
    let data = env.data();
    assert_eq!(data.len(), 3);
    assert!(!data[0].contains_key("image"));
    assert!(data[1].contains_key("image"));
    assert!(data[1].contains_key("desc"));
    assert!(!data[2].contains_key("image"));
    assert_eq!(source.calls(), 1);
    assert_eq!(source.xrefs.lock().unwrap()[0], SEOUL_WIKI);
}

// ============================================================================
// console
// ============================================================================

#[tokio::test]
async fn console_rejects_mutations_before_the_store() {
    let store = StubStore::returning(SelectResults::default());
    let p = pipeline(store.clone());

    for q in [
        "DELETE WHERE { ?s ?p ?o }",
        "insert data { <a> <b> <c> }",
        "Drop Graph <http://x>",
        "SELECT * WHERE { ?s ?p ?o } # then CLEAR ALL",
        "load <http://evil/dump.ttl>",
    ] {
        let env = p.run_console(q).await;
        assert_eq!(env.error_kind(), Some(ErrorKind::Security), "query {q:?}");
    }
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn console_empty_query_is_an_input_error() {
    let store = StubStore::returning(SelectResults::default());
    let env = pipeline(store.clone()).run_console("  ").await;
    match env {
        ResultEnvelope::Error { kind, message } => {
            assert_eq!(kind, ErrorKind::Input);
            assert_eq!(message, "empty query");
        }
        other => panic!("expected error, got {other:?}"),
    }
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn console_query_gets_prefixes_and_vars() {
    let body = "SELECT ?name WHERE { ?s a koad:Province ; rdfs:label ?name }";
    let rows = results(
        &["name"],
        vec![row(&[("name", RdfTerm::literal("경기도"))])],
    );
    let store = StubStore::returning(rows);
    let env = pipeline(store.clone()).run_console(body).await;

    match env {
        ResultEnvelope::Success { sparql, vars, data } => {
            assert!(sparql.is_none());
            assert_eq!(vars, vec!["name"]);
            assert_eq!(data[0]["name"].value, "경기도");
        }
        other => panic!("expected success, got {other:?}"),
    }
    assert_eq!(store.last_query(), format!("{}{body}", prefix_block()));
}

// ============================================================================
// codes
// ============================================================================

#[tokio::test]
async fn existing_codes_surface_store_errors() {
    let store = StubStore::failing("connection refused");
    let err = pipeline(store).existing_codes().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Store);
}

// ============================================================================
// region detail + enrichment
// ============================================================================

#[tokio::test]
async fn region_without_rows_is_empty() {
    let store = StubStore::returning(SelectResults::default());
    let env = pipeline(store.clone()).region_data("99999").await;
    assert_eq!(
        env,
        ResultEnvelope::Empty {
            message: "no data".to_string()
        }
    );
    assert!(store.last_query().contains("<https://knowledgemap.kr/kodv/id/99999>"));
}

#[tokio::test]
async fn region_with_only_unbound_optionals_is_empty() {
    let store = StubStore::returning(results(&["label"], vec![Binding::new()]));
    let env = pipeline(store).region_data("99999").await;
    assert!(matches!(env, ResultEnvelope::Empty { .. }));
}

#[tokio::test]
async fn region_code_injection_is_refused() {
    let store = StubStore::returning(SelectResults::default());
    let env = pipeline(store.clone())
        .region_data("11010> . } DELETE WHERE { ?s ?p ?o } #")
        .await;
    assert_eq!(env.error_kind(), Some(ErrorKind::Input));
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn region_without_xref_is_returned_unchanged() {
    let store = StubStore::returning(region_rows(false));
    let source = StubEnrichment::new(EnrichBehavior::Hit(seoul_record()));
    let p = pipeline(store).with_enrichment(fetcher(source.clone(), Duration::from_secs(2)));

    let env = p.region_data("11").await;
    assert_eq!(env.data(), region_rows(false).bindings());
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn region_enrichment_hit_merges_image_and_description() {
    let store = StubStore::returning(region_rows(true));
    let source = StubEnrichment::new(EnrichBehavior::Hit(seoul_record()));
    let p = pipeline(store).with_enrichment(fetcher(source.clone(), Duration::from_secs(2)));

    let env = p.region_data("11").await;
    assert!(env.is_success());
    let data = env.data();
    assert_eq!(data.len(), 1);
    let record = seoul_record();
    assert_eq!(data[0].get("image"), record.image.as_ref());
    assert_eq!(data[0].get("desc"), record.desc.as_ref());
    assert_eq!(data[0]["label"].value, "서울특별시");
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn region_enrichment_failures_keep_the_primary_result() {
    for behavior in [EnrichBehavior::Miss, EnrichBehavior::Fail, EnrichBehavior::Hang] {
        let store = StubStore::returning(region_rows(true));
        let source = StubEnrichment::new(behavior);
        let p = pipeline(store).with_enrichment(fetcher(source.clone(), Duration::from_millis(100)));

        let started = std::time::Instant::now();
        let env = p.region_data("11").await;
        assert!(started.elapsed() < Duration::from_secs(5));

        assert!(env.is_success());
        assert_eq!(env.data(), region_rows(true).bindings());
        assert_eq!(source.calls(), 1);
    }
}

#[tokio::test]
async fn non_iri_cross_reference_is_not_fetched() {
    let mut rows = region_rows(false);
    rows.results.bindings[0].insert("wikiURI".to_string(), RdfTerm::literal("Q8684"));
    let store = StubStore::returning(rows.clone());
    let source = StubEnrichment::new(EnrichBehavior::Hit(seoul_record()));
    let p = pipeline(store).with_enrichment(fetcher(source.clone(), Duration::from_secs(2)));

    let env = p.region_data("11").await;
    assert_eq!(env.data(), rows.bindings());
    assert_eq!(source.calls(), 0);
}

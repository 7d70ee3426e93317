//! JSON API for the map front-end.
//!
//! Routes:
//! - `GET  /healthz`
//! - `GET  /api/existing-codes` → `["11", "11010", ...]`
//! - `GET  /api/data/{region_code}` → envelope
//! - `POST /api/ask` `{"question": "..."}` → envelope
//! - `POST /api/sparql` `{"query": "..."}` → envelope
//!
//! Envelopes always come back with `200`; the `status` field carries the
//! outcome. Each connection is served on its own task and shares only the
//! read-only [`Pipeline`].

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use kodv_query::{Pipeline, PipelineError, ResultEnvelope};

/// Upper bound on request bodies (questions and console queries are small).
/// Reading stops as soon as a body goes past it.
const MAX_BODY_BYTES: usize = 256 * 1024;

#[derive(Debug, Deserialize)]
struct AskRequest {
    #[serde(default)]
    question: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SparqlRequest {
    #[serde(default)]
    query: Option<String>,
}

pub async fn serve(listen: SocketAddr, pipeline: Pipeline) -> Result<()> {
    let listener = TcpListener::bind(listen)
        .await
        .map_err(|e| anyhow!("serve: failed to bind {listen}: {e}"))?;
    serve_on(listener, Arc::new(pipeline)).await
}

async fn serve_on(listener: TcpListener, pipeline: Arc<Pipeline>) -> Result<()> {
    let bound = listener
        .local_addr()
        .map_err(|e| anyhow!("serve: failed to read bound addr: {e}"))?;
    info!("listening on http://{bound}");

    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| anyhow!("serve: accept failed: {e}"))?;
        let io = TokioIo::new(stream);
        let pipeline = pipeline.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| handle_request(req, pipeline.clone()));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                warn!(%peer, error = %e, "connection error");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    pipeline: Arc<Pipeline>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let span = tracing::info_span!("request", id = %Uuid::new_v4(), %method, %path);

    async move {
        let resp = match (method, path.as_str()) {
            (Method::GET, "/healthz") => text_response(StatusCode::OK, "ok\n"),
            (Method::GET, "/api/existing-codes") => {
                // The front-end treats a missing list as "nothing highlighted".
                let codes = match pipeline.existing_codes().await {
                    Ok(codes) => codes.into_iter().collect::<Vec<_>>(),
                    Err(e) => {
                        warn!(error = %e, "existing-codes lookup failed");
                        Vec::new()
                    }
                };
                json_response(StatusCode::OK, &codes)
            }
            (Method::GET, p) if p.starts_with("/api/data/") => {
                let code = &p["/api/data/".len()..];
                let envelope = pipeline.region_data(code).await;
                json_response(StatusCode::OK, &envelope)
            }
            (Method::POST, "/api/ask") => {
                let envelope = match read_json::<AskRequest>(req).await {
                    Ok(body) => pipeline.ask(body.question.as_deref().unwrap_or("")).await,
                    Err(envelope) => envelope,
                };
                json_response(StatusCode::OK, &envelope)
            }
            (Method::POST, "/api/sparql") => {
                let envelope = match read_json::<SparqlRequest>(req).await {
                    Ok(body) => pipeline.run_console(body.query.as_deref().unwrap_or("")).await,
                    Err(envelope) => envelope,
                };
                json_response(StatusCode::OK, &envelope)
            }
            _ => json_error(StatusCode::NOT_FOUND, "not found"),
        };
        info!(status = resp.status().as_u16(), "handled");
        Ok(resp)
    }
    .instrument(span)
    .await
}

/// Reads and decodes a JSON body. Failures come back as an `error` envelope
/// so the caller sees the same shape as every other outcome.
async fn read_json<T: for<'de> Deserialize<'de>>(req: Request<Incoming>) -> Result<T, ResultEnvelope> {
    let bytes = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| {
            if e.is::<LengthLimitError>() {
                input_error(format!("request body too large (max {MAX_BODY_BYTES} bytes)"))
            } else {
                input_error(format!("failed to read request body: {e}"))
            }
        })?
        .to_bytes();
    serde_json::from_slice(&bytes).map_err(|e| input_error(format!("invalid JSON body: {e}")))
}

fn input_error(message: String) -> ResultEnvelope {
    ResultEnvelope::from(&PipelineError::Input(message))
}

fn text_response(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from_static(b"internal error"))))
}

fn json_response<T: serde::Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{\"error\":\"serialize\"}".to_vec());
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json; charset=utf-8")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from_static(b"{\"error\":\"internal\"}"))))
}

fn json_error(status: StatusCode, msg: &str) -> Response<Full<Bytes>> {
    let v = serde_json::json!({ "error": msg });
    json_response(status, &v)
}

//! KODV CLI
//!
//! Command-line front door to the question → SPARQL pipeline:
//! - `serve`: JSON API consumed by the map front-end
//! - `ask`, `sparql`, `codes`, `region`: run one operation and print the result
//! - `prompt`: print the generation request without calling the model

use std::io::{self, Read};
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use kodv_query::{build_pipeline, PipelineConfig, ResultEnvelope};

mod render;
mod server;

#[derive(Parser)]
#[command(name = "kodv")]
#[command(
    author,
    version,
    about = "KODV: ask the drought-vulnerability knowledge graph in plain Korean"
)]
struct Cli {
    /// SPARQL endpoint of the graph store (overrides KODV_SPARQL_ENDPOINT).
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Skip the Wikidata lookup.
    #[arg(long, global = true)]
    no_enrich: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the JSON API (`/api/ask`, `/api/sparql`, `/api/data/{code}`, `/api/existing-codes`).
    Serve {
        #[arg(long, default_value = "127.0.0.1:5000")]
        listen: SocketAddr,
    },

    /// Translate a question into SPARQL and run it.
    Ask {
        /// Question text (words are joined with spaces).
        #[arg(required = true)]
        question: Vec<String>,
        /// Print the raw JSON envelope instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Run a SPARQL query body through the console path (deny-list + prefixes).
    Sparql {
        /// Query text. Reads `--file`, or stdin when neither is given.
        query: Option<String>,
        #[arg(short, long, conflicts_with = "query")]
        file: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },

    /// List distinct 2- and 5-digit administrative code prefixes.
    Codes,

    /// Show the detail card for one administrative code.
    Region {
        code: String,
        #[arg(long)]
        json: bool,
    },

    /// Print the generation request for a question (no model call).
    Prompt {
        #[arg(required = true)]
        question: Vec<String>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = PipelineConfig::from_env().context("failed to read configuration")?;
    if let Some(endpoint) = cli.endpoint {
        config.store.endpoint = endpoint;
    }
    if cli.no_enrich {
        config.enrichment.enabled = false;
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| anyhow!("failed to initialize tokio runtime: {e}"))?;

    rt.block_on(run(cli.command, config))
}

async fn run(command: Commands, config: PipelineConfig) -> Result<()> {
    match command {
        Commands::Serve { listen } => {
            let pipeline = build_pipeline(&config)?;
            server::serve(listen, pipeline).await
        }
        Commands::Ask { question, json } => {
            let llm = config.require_llm()?;
            tracing::debug!(provider = ?llm.provider, model = %llm.model, "using LLM provider");
            let pipeline = build_pipeline(&config)?;
            let envelope = pipeline.ask(&question.join(" ")).await;
            print_envelope(&envelope, json)
        }
        Commands::Sparql { query, file, json } => {
            let body = match (query, file) {
                (Some(q), _) => q,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                (None, None) => {
                    let mut buf = String::new();
                    io::stdin()
                        .read_to_string(&mut buf)
                        .context("failed to read query from stdin")?;
                    buf
                }
            };
            let pipeline = build_pipeline(&config)?;
            let envelope = pipeline.run_console(&body).await;
            print_envelope(&envelope, json)
        }
        Commands::Codes => {
            let pipeline = build_pipeline(&config)?;
            let codes = pipeline.existing_codes().await?;
            for code in codes {
                println!("{code}");
            }
            Ok(())
        }
        Commands::Region { code, json } => {
            let pipeline = build_pipeline(&config)?;
            let envelope = pipeline.region_data(&code).await;
            print_envelope(&envelope, json)
        }
        Commands::Prompt { question } => {
            let question = question.join(" ");
            let vocab = kodv_query::Vocabulary::kodv();
            let system = kodv_query::prompt::system_prompt(&vocab);
            let request = kodv_query::prompt::GenerationRequest::new(&system, &question);
            println!("{}", request.prompt);
            match vocab.property_for(&question) {
                Some(p) => eprintln!(
                    "{}",
                    format!("keyword `{}` -> {}", p.keyword, p.property).dimmed()
                ),
                None => eprintln!("{}", "no vocabulary keyword in question".yellow()),
            }
            Ok(())
        }
    }
}

fn print_envelope(envelope: &ResultEnvelope, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(envelope)?);
    } else {
        print!("{}", render::render_envelope(envelope));
    }
    match envelope {
        ResultEnvelope::Error { message, .. } => Err(anyhow!("{}", message.red())),
        _ => Ok(()),
    }
}

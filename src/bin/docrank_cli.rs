use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use docrank::{
    config::Config,
    logging,
    processing::{BatchOrchestrator, BatchRequest, BatchSettings, RawDocument},
    services::ServiceHandle,
};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "docrank-cli",
    about = "Rank local documents against a target query"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rank every file under the given paths and print the batch result as JSON.
    Rank {
        /// Query the documents are ranked against.
        #[arg(long)]
        target: String,
        /// Override `MAX_CONCURRENCY`.
        #[arg(long)]
        concurrency: Option<usize>,
        /// Override `PER_ITEM_TIMEOUT_MS`.
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Files or directories; directories are walked recursively.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Rank {
            target,
            concurrency,
            timeout_ms,
            paths,
        } => rank(target, concurrency, timeout_ms, &paths).await,
    }
}

async fn rank(
    target: String,
    concurrency: Option<usize>,
    timeout_ms: Option<u64>,
    paths: &[PathBuf],
) -> Result<()> {
    logging::init_tracing_to(logging::Console::Stderr);
    let mut config = Config::load().context("invalid configuration")?;
    if let Some(concurrency) = concurrency {
        config.max_concurrency = concurrency;
    }
    if let Some(timeout_ms) = timeout_ms {
        config.per_item_timeout_ms = timeout_ms;
    }
    config.validate().context("invalid command-line override")?;

    let documents = collect_documents(paths)?;
    if documents.is_empty() {
        bail!("no files found under the given paths");
    }

    let services = ServiceHandle::init(&config)
        .await
        .context("failed to initialise services")?;
    let orchestrator = BatchOrchestrator::new(&config, &services);
    debug_settings(orchestrator.settings());

    let result = orchestrator
        .run_batch(BatchRequest {
            documents,
            target_query: target,
        })
        .await;
    services.shutdown().await;

    let response = result.context("batch rejected")?;
    let rendered = serde_json::to_string_pretty(&response).context("serialise batch result")?;
    println!("{rendered}");
    Ok(())
}

fn debug_settings(settings: &BatchSettings) {
    tracing::debug!(
        max_concurrency = settings.max_concurrency,
        timeout_ms = settings.timeout_ms(),
        "Running batch from the command line"
    );
}

/// Read every regular file under `paths`, in walk order.
fn collect_documents(paths: &[PathBuf]) -> Result<Vec<RawDocument>> {
    let mut documents = Vec::new();
    for root in paths {
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.with_context(|| format!("walk {}", root.display()))?;
            if entry.file_type().is_file() {
                documents.push(read_document(entry.path())?);
            }
        }
    }
    Ok(documents)
}

fn read_document(path: &Path) -> Result<RawDocument> {
    let payload =
        std::fs::read(path).with_context(|| format!("read document {}", path.display()))?;
    Ok(RawDocument::new(path.display().to_string(), payload))
}

use std::env;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::error;

use docsift::{hash, DocumentPipeline, PipelineConfig, ProcessingOptions};

/// Developer utility: run the pipeline against a local file and dump the
/// result as JSON. Not part of the library surface — the crate's interface
/// is `DocumentPipeline::process` and `hash`.
#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let path = args
        .next()
        .context("usage: inspect <file> [document_type]")?;
    let document_type = args.next().unwrap_or_else(|| "generic".to_string());

    let config = PipelineConfig::from_env()?;
    let pipeline = DocumentPipeline::new(config)?;

    let bytes = std::fs::read(&path).with_context(|| format!("failed to read {}", path))?;
    let filename = Path::new(&path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path.as_str());

    let result = pipeline
        .process(&bytes, filename, &document_type, &ProcessingOptions::default())
        .await;

    eprintln!("sha256 {}", hash(&bytes));
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

use anyhow::Context;
use clap::Parser;
use docshelf::browser::DocBrowser;
use docshelf::cli::Cli;
use docshelf::config::BrowserConfig;
use docshelf::fs_source::FsContentSource;
use docshelf::server::DocServer;
use docshelf::worker::BackgroundWorker;
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    docshelf::tracing::init_with(cli.log_format);

    let config = BrowserConfig::load_or_default(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;

    let docs_root = tokio::fs::canonicalize(&cli.docs_root)
        .await
        .with_context(|| format!("Docs root {} is not accessible", cli.docs_root.display()))?;
    tracing::info!("Starting docshelf MCP server for {}", docs_root.display());

    let browser = Arc::new(DocBrowser::new(
        Arc::new(FsContentSource::new(docs_root)),
        config,
    ));

    let shutdown = CancellationToken::new();
    let mut worker = BackgroundWorker::new(Arc::clone(&browser));
    if cli.no_warm {
        worker = worker.skip_warm_up();
    }
    let worker = worker.spawn(shutdown.clone());

    let service = DocServer::new(browser)
        .serve(stdio())
        .await
        .inspect_err(|e| {
            tracing::error!("Error serving MCP server: {:?}", e);
        })?;

    service.waiting().await?;

    shutdown.cancel();
    if let Err(e) = worker.await {
        tracing::warn!("Background worker ended abnormally: {}", e);
    }

    Ok(())
}

mod cli;
mod display;

use anyhow::Context;
use clap::Parser;
use pjextract_browser::{BrowserAuthenticator, BrowserOptions};
use pjextract_core::Orchestrator;
use pjextract_store::export_workbook;
use pjextract_sync::PanelClient;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Args;
use crate::display::TextProgress;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    info!("pjextract v{}", env!("CARGO_PKG_VERSION"));

    let settings = args.settings();
    let request = args.run_request()?;

    let authenticator = BrowserAuthenticator::launch(
        settings.clone(),
        BrowserOptions {
            headful: args.headful,
            ..BrowserOptions::default()
        },
    )
    .await
    .context("failed to launch the browser")?;
    let client = PanelClient::new(settings.clone()).context("failed to build the HTTP client")?;

    let orchestrator = Orchestrator::new(authenticator, client, settings);
    let mut progress = TextProgress::stderr();
    let report = orchestrator.run(&request, &mut progress).await;

    let (authenticator, _) = orchestrator.into_parts();
    if let Err(e) = authenticator.close().await {
        warn!(error = %e, "browser did not shut down cleanly");
    }

    eprintln!("\n{}", display::render_summary(&report));

    let Some(artifact) = export_workbook(&report.results, request.mode, &mut progress)? else {
        return Ok(());
    };

    tokio::fs::create_dir_all(&args.output_dir)
        .await
        .with_context(|| format!("cannot create {}", args.output_dir.display()))?;
    let path = args.output_dir.join(&artifact.filename);
    tokio::fs::write(&path, &artifact.bytes)
        .await
        .with_context(|| format!("cannot write {}", path.display()))?;

    info!(path = %path.display(), bytes = artifact.bytes.len(), "workbook written");
    eprintln!("Planilha salva em {}", path.display());
    Ok(())
}

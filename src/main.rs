use anyhow::Context;
use clap::Parser;
use pdf_qa::{api, config, logging, processing::PdfQaService};
use std::sync::Arc;
use tokio::net::TcpListener;

/// PDF question answering HTTP server.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Interface to bind; overrides `SERVER_HOST`.
    #[arg(long)]
    host: Option<String>,
    /// Port to bind; overrides `SERVER_PORT`.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    logging::init_tracing();
    let config = config::init_config().context("Failed to load configuration")?;

    let service = PdfQaService::from_config(config).context("Failed to initialize services")?;
    service.initialize_schema().await;

    let app = api::with_http_layers(api::create_router(Arc::new(service)), config);

    let host = cli.host.unwrap_or_else(|| config.server_host.clone());
    let port = cli.port.unwrap_or(config.server_port);
    let listener = TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind {host}:{port}"))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server terminated")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

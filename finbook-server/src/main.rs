//! Finbook HTTP server
//!
//! Serves the personal finance API over HTTP. All state lives in a
//! DuckDB file under the data directory.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use finbook_core::FinbookContext;
use finbook_server::api;

#[derive(Parser)]
#[command(name = "finbookd", about = "Finbook personal finance HTTP API", version)]
struct Args {
    /// Data directory holding the database and settings.json
    #[arg(long, env = "FINBOOK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Port to listen on (overrides settings.json)
    #[arg(long, env = "FINBOOK_PORT")]
    port: Option<u16>,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("finbook")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let data_dir = args.data_dir.unwrap_or_else(default_data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    let context = FinbookContext::new(&data_dir)
        .with_context(|| format!("Failed to open database in {}", data_dir.display()))?;
    let port = args.port.unwrap_or(context.config.port);

    let app = api::router(Arc::new(context));
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;

    tracing::info!(data_dir = %data_dir.display(), port, "finbookd listening");
    axum::serve(listener, app).await?;
    Ok(())
}

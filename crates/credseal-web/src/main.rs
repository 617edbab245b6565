use std::sync::Arc;

use anyhow::Context;
use credseal_core::{C2paTool, Error};
use credseal_web::{build_router, shutdown_signal, AppState, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "credseal_web=debug,credseal_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().context("Invalid configuration")?;
    let signing = config
        .signing
        .clone()
        .prepare()
        .context("Failed to prepare signing directories and key material")?;

    let tool = C2paTool::new(signing.tool.clone(), signing.tool_working_dir());
    let version = tool
        .preflight()
        .await
        .map_err(|e| Error::ToolUnavailable(e.to_string()))
        .context("c2patool preflight failed")?;
    tracing::info!(version = %version, "Found signing tool");
    tracing::info!(
        upload_dir = %signing.upload_dir.display(),
        manifest_dir = %signing.manifest_dir.display(),
        max_file_size_mb = signing.max_file_size_mb,
        "Signing configuration ready"
    );

    let state = AppState::new(signing, &config.public_url, Arc::new(tool));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    tracing::info!("Starting credseal on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

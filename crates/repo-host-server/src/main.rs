//! repo-host: authorization-gated repository host.
//!
//! Configuration comes from flags or the environment (see `--help`):
//!   REPO_HOST_BIND            listen address (default: localhost:5000)
//!   REPO_HOST_STORAGE_ROOT    repository root (default: repo-host-root)
//!   REPO_HOST_POLICY_BACKEND  local | oso-cloud (default: local)
//!   OSO_URL / OSO_AUTH        hosted policy service endpoint and API key

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use repo_host_policy::polar::{render_polar, POLICY_FILE_NAME};
use repo_host_server::config::{Cli, Command, PolicyBackend, Settings};
use repo_host_server::router::build_router;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,repo_host_server=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cli.settings).await,
        Command::PrintPolicy => {
            print!("{}", render_polar());
            Ok(())
        }
        Command::PushPolicy => push_policy(&cli.settings).await,
        Command::ClearData => {
            cli.settings
                .oso_client()?
                .clear_data()
                .await
                .context("failed to clear policy service data")?;
            tracing::info!("policy service data cleared");
            Ok(())
        }
    }
}

async fn push_policy(settings: &Settings) -> anyhow::Result<()> {
    settings
        .oso_client()?
        .push_policy(&render_polar())
        .await
        .context("failed to push policy")?;
    tracing::info!(file = POLICY_FILE_NAME, "policy pushed");
    Ok(())
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    if settings.push_policy {
        if settings.policy_backend == PolicyBackend::OsoCloud {
            push_policy(&settings).await?;
        } else {
            tracing::warn!("REPO_HOST_PUSH_POLICY ignored for the local policy backend");
        }
    }

    let gateway = settings.gateway()?;
    gateway
        .storage()
        .init()
        .await
        .context("failed to initialise storage root")?;

    let app = build_router(Arc::new(gateway), settings.max_upload_bytes);

    let listener = TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("failed to bind to {}", settings.bind))?;
    tracing::info!(
        bind = %settings.bind,
        backend = ?settings.policy_backend,
        root = %settings.storage_root.display(),
        "repo-host listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

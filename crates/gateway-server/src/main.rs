//! Gatekeeper server
//!
//! Serves the login endpoint and the protected API behind the
//! authenticating gateway.

use anyhow::{Context, Result};
use auth_core::realm::Argon2Hasher;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

use gateway_server::logging::{log_welcome, setup_logging};
use gateway_server::{build_router, AppState, ServerConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "HTTP authentication gateway", long_about = None)]
struct Args {
    /// Configuration file (defaults to ./gatekeeper.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured bind address
    #[arg(short, long)]
    bind: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the Argon2 hash of a password for the `users` list
    HashPassword { password: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = ServerConfig::load(args.config.as_deref())?;

    if let Some(Command::HashPassword { password }) = &args.command {
        let hasher = Argon2Hasher::new(&config.auth.password)?;
        println!("{}", hasher.hash(password)?);
        return Ok(());
    }

    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }

    setup_logging(&config.logging)?;
    log_welcome("gatekeeper", env!("CARGO_PKG_VERSION"));

    let state = AppState::from_config(&config).context("Failed to initialise authentication")?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    info!(address = %listener.local_addr()?, "Listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}

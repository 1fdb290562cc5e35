//! Comments DAV server.
//!
//! Serves `comments/{objectType}/{objectId}` below `/remote.php/dav/`,
//! backed by a SQLite database. Authentication is delegated to a fronting
//! proxy that sets a trusted header with the user id.
//!
//! Usage:
//!   commentdav-server --listen 127.0.0.1:8080 --database comments.db

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use commentdav_server::config::ServerConfig;
use commentdav_server::{build_router, AppState, DEFAULT_BASE_URI, DEFAULT_USER_HEADER};
use commentdav_store::SqliteCommentStore;
use http::HeaderName;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "commentdav-server")]
#[command(about = "Comments DAV server")]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// Path to the SQLite database
    #[arg(short, long, default_value = "comments.db")]
    database: PathBuf,

    /// Path to the TOML config file
    #[arg(short, long, default_value = "commentdav.toml")]
    config: PathBuf,

    /// Header carrying the authenticated user id
    #[arg(long, default_value = DEFAULT_USER_HEADER)]
    user_header: String,

    /// DAV base path
    #[arg(long, default_value = DEFAULT_BASE_URI)]
    base_uri: String,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("Comments DAV server starting...");
    let config = ServerConfig::load_from(&args.config)?;
    if config.users.is_empty() {
        warn!("No users configured, every request will be anonymous");
    }

    let store = SqliteCommentStore::open(&args.database)
        .with_context(|| format!("Failed to open database {:?}", args.database))?;
    info!("Using database {:?}", args.database);

    let user_header = HeaderName::from_bytes(args.user_header.to_ascii_lowercase().as_bytes())
        .with_context(|| format!("Invalid user header {:?}", args.user_header))?;
    let state = AppState::new(Arc::new(store), &config)
        .with_user_header(user_header)
        .with_base_uri(args.base_uri.clone());
    let app = build_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen))?;
    info!("Listening on http://{}{}", args.listen, args.base_uri);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}

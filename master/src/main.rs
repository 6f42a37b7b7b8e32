mod handlers;
mod state;

use crate::state::AppState;
use anyhow::Result;
use std::env;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// - En Docker: SPLITTER_BIND_ADDR=0.0.0.0:8080
/// - Local: default 0.0.0.0:8080
fn bind_addr() -> String {
    env::var("SPLITTER_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("master=debug,common=debug,tower_http=info,axum=info")),
        )
        .init();

    let state = AppState::new();

    // router HTTP
    let app = handlers::build_router(state);

    let listener = TcpListener::bind(bind_addr()).await?;
    info!("master escuchando en {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

//! School academics server.
//!
//! Run from repo root: `cargo run -p school-academics-server`
//! Set `STORE_BACKEND=memory` to run without PostgreSQL.

use school_academics::{app, collections, AppConfig, AppState, MemoryDocumentStore, PgDocumentStore, StoreBackend};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("school_academics=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let specs = collections();
    let state = match config.backend {
        StoreBackend::Postgres => AppState::new(Arc::new(PgDocumentStore::connect(&config, &specs).await?)),
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; data is lost on exit");
            AppState::new(Arc::new(MemoryDocumentStore::new(&specs)))
        }
    };

    let router = app(state, config.body_limit);
    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("school academics listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}

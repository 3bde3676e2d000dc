//! BOMX Server Library
//!
//! HTTP service generating derived CSV artifacts for the explosion of
//! materials workflow.
//!
//! # Overview
//!
//! Each generation request runs as one stateless invocation: it queries
//! the relational planning source, encodes the result set to CSV, uploads
//! the artifact to object storage, and records the outcome in a durable
//! per-artifact-type status document. Invocations coordinate only through
//! that document; a read-only status endpoint reconciles it against the
//! artifacts actually present in storage.
//!
//! # Architecture
//!
//! - **Commands** (write operations): run one generation invocation for
//!   one artifact type.
//! - **Queries** (read operations): return the reconciled status document.
//!
//! ## Framework Stack
//!
//! - **Axum**: HTTP surface acting as the invocation trigger
//! - **SQLx**: relational source access, one connection per invocation
//! - **AWS SDK (S3)**: artifact and status document storage
//!
//! # Example
//!
//! ```no_run
//! use bomx_server::{config::Config, router, AppState};
//! use bomx_server::db::SqlSourceConnector;
//! use bomx_server::storage::Storage;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let storage = Storage::new(config.storage.clone()).await?;
//!     let state = AppState {
//!         store: Arc::new(storage),
//!         source: Arc::new(SqlSourceConnector::new(config.source.clone())),
//!     };
//!     let app = router(state);
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod db;
pub mod features;
pub mod storage;

use db::SourceConnector;
use storage::ObjectStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub source: Arc<dyn SourceConnector>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", features::explosion::explosion_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

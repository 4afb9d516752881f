//! HTTP surface: router, shared state, and handlers.

pub mod compress;
pub mod error;
pub mod optimize;

pub use error::ApiError;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::config::Config;
use crate::domains::optimization::{OptimizationService, OptimizationServiceImpl};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn OptimizationService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let service = Arc::new(OptimizationServiceImpl::new(config.max_concurrent_items));
        Self {
            service,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let max_body_bytes = state.config.max_body_bytes;
    Router::new()
        .route("/compress", post(compress::compress))
        .route("/optimize", post(optimize::optimize))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

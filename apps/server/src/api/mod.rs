mod error;
mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use kb_core::{KnowledgeBase, SearchLog};
use tower_http::cors::{Any, CorsLayer};

pub struct AppState {
    pub kb: Arc<KnowledgeBase>,
    pub logs: SearchLog,
}

impl AppState {
    pub fn new(kb: Arc<KnowledgeBase>) -> Self {
        let logs = SearchLog::new(kb.config().query_log_capacity);
        Self { kb, logs }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/search", post(handlers::search))
        .route("/api/files/*path", get(handlers::file))
        .route("/api/categories", get(handlers::categories))
        .route("/api/tags", get(handlers::tags))
        .route("/api/stats", get(handlers::stats))
        .route("/api/reindex", post(handlers::reindex))
        .route("/api/logs", get(handlers::logs))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(cors)
}

//! Knowledge base API endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use kb_core::{Document, SearchLogEntry, SearchOptions, SearchResults, Stats};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::ApiError;

const DEFAULT_LOG_LIMIT: usize = 50;

/// Request payload for a search.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub options: SearchOptions,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    #[serde(flatten)]
    pub results: SearchResults,
    pub query: String,
    pub options: SearchOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReindexResponse {
    pub message: String,
    pub files_indexed: usize,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    /// Kept as a string so that a malformed value falls back to the default.
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<SearchLogEntry>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct RouteNotFound {
    pub error: String,
    pub path: String,
}

/// POST /api/search
pub(crate) async fn search(
    State(state): State<Arc<AppState>>,
    client: Option<ConnectInfo<SocketAddr>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(request) = payload?;
    let query = request.query.unwrap_or_default();

    let results = state.kb.search(&query, &request.options)?;

    let client = client.map(|ConnectInfo(addr)| addr.ip().to_string());
    state.logs.record(&query, results.total, client);

    Ok(Json(SearchResponse {
        results,
        query,
        options: request.options,
    }))
}

/// GET /api/files/*path
///
/// The path may be sent either with plain slashes or as one `%2F`-encoded segment.
pub(crate) async fn file(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Json<Document>, ApiError> {
    let key = path.trim_start_matches('/');
    let doc = state.kb.get(key)?;
    Ok(Json(Document::clone(&doc)))
}

/// GET /api/categories
pub(crate) async fn categories(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.kb.categories())
}

/// GET /api/tags
pub(crate) async fn tags(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.kb.tags())
}

/// GET /api/stats
pub(crate) async fn stats(State(state): State<Arc<AppState>>) -> Json<Stats> {
    Json(state.kb.stats())
}

/// POST /api/reindex
pub(crate) async fn reindex(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReindexResponse>, ApiError> {
    tracing::info!("Reindex requested");
    let files_indexed = state.kb.reindex().await?;
    Ok(Json(ReindexResponse {
        message: "重新索引完成".to_string(),
        files_indexed,
    }))
}

/// GET /api/logs?limit=N
pub(crate) async fn logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LogsQuery>,
) -> Json<LogsResponse> {
    let limit = params
        .limit
        .as_deref()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_LOG_LIMIT);

    Json(LogsResponse {
        logs: state.logs.recent(limit),
        total: state.logs.len(),
    })
}

pub(crate) async fn health() -> &'static str {
    "ok"
}

pub(crate) async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(RouteNotFound {
            error: "接口不存在".to_string(),
            path: uri.path().to_string(),
        }),
    )
}

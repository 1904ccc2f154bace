use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use techscope_core::persist::{load_snapshot, IndexPaths};
use techscope_core::{DocMeta, Error, IndexStats, QueryEngine, SearchResult};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Upper bound on `k` regardless of what the client asks for.
pub const MAX_K: usize = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: String,
    pub score: f64,
    pub title: String,
    pub url: Option<String>,
}

impl From<SearchResult> for SearchHit {
    fn from(r: SearchResult) -> Self {
        Self { doc_id: r.doc_id, score: r.score, title: r.meta.title, url: r.meta.url }
    }
}

#[derive(Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: IndexStats,
    pub average_terms_per_document: f64,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<QueryEngine>,
    pub index_dir: PathBuf,
    pub admin_token: Option<String>,
}

/// `{"error": message}` with a status derived from the failure kind.
#[derive(Debug)]
pub struct ApiError(StatusCode, String);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let status = match &e {
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Error::IndexUnavailable | Error::IndexNotFound(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %e, "request failed");
        }
        ApiError(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

/// Build the router over the index in `index_dir`. A missing index is not
/// fatal: the server starts empty and answers 503 until `/index/reload`
/// succeeds.
pub fn build_app(index_dir: impl Into<PathBuf>) -> Result<Router> {
    let index_dir = index_dir.into();
    let engine = QueryEngine::new();
    match load_snapshot(&IndexPaths::new(&index_dir)) {
        Ok(snapshot) => {
            engine.install(snapshot);
        }
        Err(Error::IndexNotFound(path)) => {
            tracing::warn!(path = %path.display(), "no index found; search is unavailable until reload");
        }
        Err(e) => return Err(e.into()),
    }
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    Ok(router(AppState { engine: Arc::new(engine), index_dir, admin_token }))
}

pub fn router(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/stats", get(stats_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let k = params.k.min(MAX_K);
    let page = state.engine.search_page(&params.q, k)?;
    Ok(Json(SearchResponse {
        query: params.q,
        took_s: start.elapsed().as_secs_f64(),
        total_hits: page.total_hits,
        results: page.results.into_iter().map(SearchHit::from).collect(),
    }))
}

pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.engine.stats()?;
    Ok(Json(StatsResponse { average_terms_per_document: stats.average_terms_per_document(), stats }))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Result<Json<DocMeta>, ApiError> {
    let snapshot = state.engine.current()?;
    match snapshot.docs.get(&doc_id) {
        Some(meta) => Ok(Json(meta.clone())),
        None => Err(ApiError(StatusCode::NOT_FOUND, format!("document {doc_id} not found"))),
    }
}

/// Reload the index directory and swap it in. In-flight searches finish on
/// the snapshot they started with.
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let paths = IndexPaths::new(&state.index_dir);
    let snapshot = tokio::task::spawn_blocking(move || load_snapshot(&paths))
        .await
        .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))??;
    let stats = snapshot.stats();
    state.engine.install(snapshot);
    tracing::info!(documents = stats.document_count, terms = stats.term_count, "index reloaded");
    Ok(Json(json!({ "reloaded": true, "documents": stats.document_count, "terms": stats.term_count })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(ApiError(StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError(StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}

//! HTTP transport for the search service.
//!
//! Routes:
//! - `GET /api/search?query=..&fields=title,content&limit=N`
//! - `POST /api/search` (rebuild webhook)
//! - `POST /api/search/invalidate`
//! - `GET /api/search/status`
//! - `GET /health`

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use sitesearch_index::{Field, SearchOptions, DEFAULT_LIMIT};
use sitesearch_service::{IndexLifecycleManager, LifecycleError};
use sitesearch_types::Document;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: IndexLifecycleManager,
}

impl AppState {
    pub fn new(lifecycle: IndexLifecycleManager) -> Self {
        Self { lifecycle }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    /// Comma-separated field names
    pub fields: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RebuildResponse {
    pub message: String,
    pub documents: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Handler errors mapped onto HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    InvalidQuery(String),
    UnknownField(String),
    Internal(String),
}

impl From<LifecycleError> for ApiError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::InvalidQuery(message) => ApiError::InvalidQuery(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::InvalidQuery(msg) => (StatusCode::BAD_REQUEST, "invalid_query", msg),
            ApiError::UnknownField(field) => (
                StatusCode::BAD_REQUEST,
                "unknown_field",
                format!("unknown search field '{field}'"),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        (status, Json(ErrorResponse::new(error, message))).into_response()
    }
}

/// Build the router over the given state.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/search", get(search).post(rebuild))
        .route("/api/search/invalidate", post(invalidate))
        .route("/api/search/status", get(status))
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown_signal` resolves.
pub async fn run_server_with_shutdown<F>(
    addr: SocketAddr,
    state: AppState,
    shutdown_signal: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "HTTP server ready");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("HTTP server shutdown complete");
    Ok(())
}

fn parse_fields(raw: Option<&str>) -> Result<Vec<Field>, ApiError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| Field::parse(name).ok_or_else(|| ApiError::UnknownField(name.to_string())))
        .collect()
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params.query.unwrap_or_default();
    let options = SearchOptions::new()
        .with_fields(parse_fields(params.fields.as_deref())?)
        .with_limit(params.limit.unwrap_or(DEFAULT_LIMIT));

    let hits = state.lifecycle.search(&query, &options).await?;
    let documents: Vec<Document> = hits.into_iter().map(|hit| hit.document).collect();
    Ok(Json(documents))
}

async fn rebuild(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    match state.lifecycle.rebuild().await {
        Ok(generation) => Ok(Json(RebuildResponse {
            message: "Search index rebuilt".to_string(),
            documents: generation.engine.len(),
        })),
        Err(e) => {
            error!(error = %e, "Rebuild failed");
            Err(ApiError::Internal(e.to_string()))
        }
    }
}

async fn invalidate(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    warn!("Index invalidated over HTTP");
    state.lifecycle.invalidate();
    StatusCode::ACCEPTED
}

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.lifecycle.status())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitesearch_content::{ContentSync, InMemoryContentSource, RawPage};
    use sitesearch_service::LifecycleConfig;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn site() -> Arc<InMemoryContentSource> {
        Arc::new(InMemoryContentSource::new(vec![
            RawPage::rich_text("/", "Home", "<p>Welcome to our site</p>"),
            RawPage::rich_text("/about", "About", "<p>Our team</p>"),
        ]))
    }

    async fn spawn_app(source: Arc<InMemoryContentSource>) -> (String, oneshot::Sender<()>) {
        let lifecycle = IndexLifecycleManager::new(
            ContentSync::new(source),
            None,
            LifecycleConfig::default(),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, create_router(AppState::new(lifecycle)))
                .with_graceful_shutdown(async {
                    rx.await.ok();
                })
                .await
                .unwrap();
        });

        (format!("http://{addr}"), tx)
    }

    #[test]
    fn test_parse_fields() {
        assert!(parse_fields(None).unwrap().is_empty());
        assert_eq!(
            parse_fields(Some("title, url")).unwrap(),
            vec![Field::Title, Field::Url]
        );
        assert!(matches!(
            parse_fields(Some("title,body")),
            Err(ApiError::UnknownField(name)) if name == "body"
        ));
    }

    #[test]
    fn test_lifecycle_errors_map_to_status_codes() {
        let bad = ApiError::from(LifecycleError::InvalidQuery("empty".to_string()));
        assert_eq!(bad.into_response().status(), StatusCode::BAD_REQUEST);

        let failed = ApiError::from(LifecycleError::Fetch("down".to_string()));
        assert_eq!(
            failed.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_search_endpoint() {
        let (base, shutdown) = spawn_app(site()).await;
        let client = reqwest::Client::new();

        let health: HealthResponse = client
            .get(format!("{base}/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health.status, "healthy");

        let response = client
            .get(format!("{base}/api/search"))
            .query(&[("query", "welcome")])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let docs: Vec<Document> = response.json().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "/");
        assert_eq!(docs[0].title, "Home");

        shutdown.send(()).ok();
    }

    #[tokio::test]
    async fn test_missing_query_is_bad_request() {
        let (base, shutdown) = spawn_app(site()).await;
        let client = reqwest::Client::new();

        let response = client
            .get(format!("{base}/api/search"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json().await.unwrap();
        assert_eq!(body.error, "invalid_query");

        let response = client
            .get(format!("{base}/api/search"))
            .query(&[("query", "team"), ("fields", "body")])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        shutdown.send(()).ok();
    }

    #[tokio::test]
    async fn test_rebuild_and_invalidate_endpoints() {
        let source = site();
        let (base, shutdown) = spawn_app(source.clone()).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{base}/api/search"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: RebuildResponse = response.json().await.unwrap();
        assert_eq!(body.documents, 2);

        let status: serde_json::Value = client
            .get(format!("{base}/api/search/status"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status["state"], "warm");
        assert_eq!(status["documents"], 2);

        let response = client
            .post(format!("{base}/api/search/invalidate"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);

        let status: serde_json::Value = client
            .get(format!("{base}/api/search/status"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status["state"], "empty");

        shutdown.send(()).ok();
    }

    #[tokio::test]
    async fn test_failed_rebuild_is_server_error() {
        let source = site();
        source.set_site_map_down(true);
        let (base, shutdown) = spawn_app(source).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/api/search"))
            .send()
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            reqwest::StatusCode::INTERNAL_SERVER_ERROR
        );

        shutdown.send(()).ok();
    }

    #[tokio::test]
    async fn test_health_and_graceful_shutdown() {
        let lifecycle = IndexLifecycleManager::new(
            ContentSync::new(site()),
            None,
            LifecycleConfig::default(),
        );
        let (tx, rx) = oneshot::channel::<()>();
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();

        let handle = tokio::spawn(async move {
            run_server_with_shutdown(addr, AppState::new(lifecycle), async {
                rx.await.ok();
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(()).ok();

        let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(result.is_ok());
    }
}

use crate::suggest::{SuggestionError, SuggestionService, SuggestionSource};
use crate::ContentCandidate;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

#[derive(Clone)]
struct SharedState {
    service: Arc<SuggestionService>,
}

pub fn router(service: Arc<SuggestionService>) -> Router {
    let shared_state = Arc::new(SharedState { service });

    Router::new()
        .route("/api/suggestions", post(suggestions))
        .route("/api/health", get(health))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::warn!("shutting down");
}

pub async fn serve(service: Arc<SuggestionService>, listen: &str) -> anyhow::Result<()> {
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("listening on {listen}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn start_daemon(service: SuggestionService, listen: &str) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async { serve(Arc::new(service), listen).await })
}

#[derive(Debug)]
enum HttpError {
    Suggestion(SuggestionError),
    Rejected(JsonRejection),
    Join(tokio::task::JoinError),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        match self {
            // suggest only fails on caller input
            HttpError::Suggestion(err) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": err.to_string()})),
            ),
            HttpError::Rejected(rejection) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": rejection.body_text()})),
            ),
            HttpError::Join(err) => {
                log::error!("{err:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "internal error"})),
                )
            }
        }
        .into_response()
    }
}

impl From<SuggestionError> for HttpError {
    fn from(err: SuggestionError) -> Self {
        Self::Suggestion(err)
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected(rejection)
    }
}

impl From<tokio::task::JoinError> for HttpError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Join(err)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionsRequest {
    pub user_id: String,
    /// Falls back to `suggestions.default_limit`
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<ContentCandidate>,
    pub source: SuggestionSource,
}

async fn suggestions(
    State(state): State<Arc<SharedState>>,
    payload: Result<Json<SuggestionsRequest>, JsonRejection>,
) -> Result<Json<SuggestionsResponse>, HttpError> {
    let Json(payload) = payload?;
    log::debug!("payload: {payload:?}");

    let service = state.service.clone();
    let limit = payload.limit.unwrap_or(service.config().default_limit);

    let result =
        tokio::task::spawn_blocking(move || service.suggest(&payload.user_id, limit)).await??;

    Ok(Json(SuggestionsResponse {
        suggestions: result.items,
        source: result.source,
    }))
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

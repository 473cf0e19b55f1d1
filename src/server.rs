use crate::catalog::Dataset;
use crate::config::AppConfig;
use crate::data::{Level, SchedulingOutput, Selector, Semester};
use crate::error::SchedulingError;
use crate::solver;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AppState {
    pub dataset: Arc<Dataset>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(dataset: Dataset, config: AppConfig) -> Self {
        Self {
            dataset: Arc::new(dataset),
            config: Arc::new(config),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    pub level: Level,
    pub semester: Semester,
    #[serde(default)]
    pub max_nodes: Option<u64>,
    #[serde(default)]
    pub time_limit_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// A [`SchedulingError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct HttpError(StatusCode, ApiError);

impl From<SchedulingError> for HttpError {
    fn from(err: SchedulingError) -> Self {
        let (status, code) = match &err {
            SchedulingError::NoDataForSelector { .. } => (StatusCode::NOT_FOUND, "NO_DATA"),
            SchedulingError::EmptyCatalogAfterFiltering { .. } => {
                (StatusCode::NOT_FOUND, "EMPTY_CATALOG")
            }
            SchedulingError::Infeasible(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INFEASIBLE"),
            SchedulingError::UnknownSubjectArea(_) | SchedulingError::Config(_) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        HttpError(
            status,
            ApiError {
                code: code.to_string(),
                message: err.to_string(),
            },
        )
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.0, Json(self.1)).into_response()
    }
}

async fn solve_handler(
    State(state): State<AppState>,
    Json(request): Json<SolveRequest>,
) -> Result<Json<SchedulingOutput>, HttpError> {
    let selector = Selector::new(request.level, request.semester);
    let settings = state
        .config
        .search
        .clone()
        .with_overrides(request.max_nodes, request.time_limit_ms);

    // the search is CPU-bound; keep it off the async workers
    let result = tokio::task::spawn_blocking(move || {
        solver::generate(&state.dataset, selector, &state.config, &settings)
    })
    .await
    .map_err(|e| {
        HttpError(
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiError {
                code: "INTERNAL_ERROR".to_string(),
                message: e.to_string(),
            },
        )
    })?;

    match result {
        Ok(output) => Ok(Json(output)),
        Err(e) => {
            warn!("Solve request for {selector} failed: {e}");
            Err(e.into())
        }
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/schedule/solve", post(solve_handler))
        .route("/v1/health", get(health_handler))
        .with_state(state)
}

pub async fn run_server(state: AppState) -> Result<(), SchedulingError> {
    let address = state.config.bind_address.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

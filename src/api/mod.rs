//! HTTP API: record reads and job triggers
//!
//! Routes live under `/api/v1`:
//! - `GET /cars/` with `limit` (1-100, default 50) and `offset` (>= 0)
//! - `GET /cars/:id`
//! - `POST /scrape/` and `POST /dump/`, which start the job in the
//!   background and answer immediately

use crate::jobs::JobRunner;
use crate::storage::{Storage, StorageError, StoredCar};
use crate::ScraperError;
use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::sync::PoisonError;

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 100;

#[derive(Clone)]
struct AppState {
    runner: JobRunner,
}

/// Errors returned to API clients as `{"detail": ...}`
#[derive(Debug)]
pub enum ApiError {
    NotFound(i64),
    InvalidParameter(String),
    Storage(StorageError),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidParameter(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidParameter(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::NotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("Car with id={} not found", id),
            ),
            Self::InvalidParameter(detail) => (StatusCode::UNPROCESSABLE_ENTITY, detail),
            Self::Storage(e) => {
                tracing::error!("[API] Storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal storage error".to_string(),
                )
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    limit: Option<i64>,
    offset: Option<i64>,
}

impl ListParams {
    /// Checks bounds and applies defaults
    fn resolve(&self) -> Result<(u32, u32), ApiError> {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(ApiError::InvalidParameter(format!(
                "limit must be between 1 and {}, got {}",
                MAX_LIMIT, limit
            )));
        }

        let offset = self.offset.unwrap_or(0);
        let offset = u32::try_from(offset).map_err(|_| {
            ApiError::InvalidParameter(format!("offset must be >= 0, got {}", offset))
        })?;

        Ok((limit as u32, offset))
    }
}

#[derive(Debug, Serialize)]
struct Acknowledgement {
    message: &'static str,
}

/// Builds the application router
pub fn router(runner: JobRunner) -> Router {
    let v1 = Router::new()
        .route("/cars", get(list_cars))
        .route("/cars/", get(list_cars))
        .route("/cars/:id", get(get_car))
        .route("/scrape", post(trigger_scrape))
        .route("/scrape/", post(trigger_scrape))
        .route("/dump", post(trigger_dump))
        .route("/dump/", post(trigger_dump));

    Router::new()
        .nest("/api/v1", v1)
        .with_state(AppState { runner })
}

/// Serves the API until `shutdown` resolves
pub async fn serve<F>(runner: JobRunner, bind_address: &str, shutdown: F) -> Result<(), ScraperError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    tracing::info!("[API] Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(runner))
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

async fn list_cars(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<StoredCar>>, ApiError> {
    let Query(params) = params?;
    let (limit, offset) = params.resolve()?;
    let cars = state
        .runner
        .storage()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .list_cars(limit, offset)?;
    Ok(Json(cars))
}

async fn get_car(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<StoredCar>, ApiError> {
    let Path(id) = id?;
    if id < 1 {
        return Err(ApiError::InvalidParameter(format!(
            "id must be >= 1, got {}",
            id
        )));
    }

    let car = state
        .runner
        .storage()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get_car(id)?;
    car.map(Json).ok_or(ApiError::NotFound(id))
}

async fn trigger_scrape(State(state): State<AppState>) -> Json<Acknowledgement> {
    if state.runner.crawl_running() {
        tracing::info!("[API] Scrape requested while a crawl is running");
    }
    state.runner.spawn_crawl();
    Json(Acknowledgement {
        message: "Scraping process initiated",
    })
}

async fn trigger_dump(State(state): State<AppState>) -> Json<Acknowledgement> {
    state.runner.spawn_dump();
    Json(Acknowledgement {
        message: "Database dump initiated",
    })
}

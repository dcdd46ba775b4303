//! Health Check Endpoints
//!
//! - /health - Combined health status
//! - /health/live - Liveness probe
//! - /health/ready - Readiness probe
//! - /health/startup - Startup probe

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
    /// Functional but not fully initialized
    Degraded,
}

impl HealthStatus {
    fn status_code(self) -> StatusCode {
        match self {
            HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::OK,
        }
    }
}

/// Individual health check result
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub uptime_seconds: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<HealthCheck>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SimpleHealthResponse {
    pub status: HealthStatus,
}

/// Ping the role store's database.
async fn check_mongodb(db: &mongodb::Database) -> HealthCheck {
    let start = Instant::now();
    let result = db.run_command(mongodb::bson::doc! { "ping": 1 }).await;
    let duration_ms = Some(start.elapsed().as_millis() as u64);

    match result {
        Ok(_) => HealthCheck {
            name: "mongodb".to_string(),
            status: HealthStatus::Up,
            message: None,
            duration_ms,
        },
        Err(e) => HealthCheck {
            name: "mongodb".to_string(),
            status: HealthStatus::Down,
            message: Some(format!("Connection failed: {}", e)),
            duration_ms,
        },
    }
}

#[derive(Clone)]
pub struct HealthState {
    /// `None` when roles live in the in-memory store.
    pub db: Option<mongodb::Database>,
    pub version: Option<String>,
    pub started_at: DateTime<Utc>,
    ready: Arc<AtomicBool>,
}

impl HealthState {
    pub fn new(db: Option<mongodb::Database>, version: Option<String>) -> Self {
        Self {
            db,
            version,
            started_at: Utc::now(),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn database_status(&self) -> HealthStatus {
        match &self.db {
            Some(db) => check_mongodb(db).await.status,
            None => HealthStatus::Up,
        }
    }
}

/// Combined health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse)
    )
)]
pub async fn get_health(State(state): State<HealthState>) -> Response {
    let mut checks = Vec::new();
    let mut status = HealthStatus::Up;

    if let Some(db) = &state.db {
        let check = check_mongodb(db).await;
        if check.status == HealthStatus::Down {
            status = HealthStatus::Down;
        }
        checks.push(check);
    }

    if !state.is_ready() && status == HealthStatus::Up {
        status = HealthStatus::Degraded;
    }

    let now = Utc::now();
    let response = HealthResponse {
        status,
        timestamp: now,
        version: state.version.clone(),
        uptime_seconds: (now - state.started_at).num_seconds(),
        checks,
    };

    (status.status_code(), Json(response)).into_response()
}

/// Liveness probe. Always up while the process answers.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = SimpleHealthResponse)
    )
)]
pub async fn get_liveness() -> Json<SimpleHealthResponse> {
    Json(SimpleHealthResponse { status: HealthStatus::Up })
}

/// Readiness probe. Down until startup completes or while the database is unreachable.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = SimpleHealthResponse),
        (status = 503, description = "Service is not ready", body = SimpleHealthResponse)
    )
)]
pub async fn get_readiness(State(state): State<HealthState>) -> Response {
    let status = if state.is_ready() {
        state.database_status().await
    } else {
        HealthStatus::Down
    };

    (status.status_code(), Json(SimpleHealthResponse { status })).into_response()
}

/// Startup probe
#[utoipa::path(
    get,
    path = "/health/startup",
    tag = "health",
    responses(
        (status = 200, description = "Service has started", body = SimpleHealthResponse),
        (status = 503, description = "Service is starting", body = SimpleHealthResponse)
    )
)]
pub async fn get_startup(State(state): State<HealthState>) -> Response {
    let status = if state.is_ready() {
        HealthStatus::Up
    } else {
        HealthStatus::Down
    };

    (status.status_code(), Json(SimpleHealthResponse { status })).into_response()
}

pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/", get(get_health))
        .route("/live", get(get_liveness))
        .route("/ready", get(get_readiness))
        .route("/startup", get(get_startup))
        .with_state(state)
}

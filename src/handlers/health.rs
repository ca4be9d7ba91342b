use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;
use std::sync::OnceLock;
use std::time::Instant;

use crate::{db, AppState};

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub database: ComponentStatus,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub timestamp: String,
}

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Records the process start for uptime reporting.
pub fn init_start_time() {
    let _ = START_TIME.get_or_init(Instant::now);
}

fn uptime_secs() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

/// GET /health. Responds 503 when the database is unreachable.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match db::check_connection(&state.db).await {
        Ok(()) => ComponentStatus::Up,
        Err(e) => {
            tracing::warn!(error = %e, "Health check: database unreachable");
            ComponentStatus::Down
        }
    };

    let code = if database == ComponentStatus::Up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(HealthResponse {
            status: database,
            database,
            version: env!("CARGO_PKG_VERSION"),
            uptime_secs: uptime_secs(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }),
    )
}

pub mod reports;
pub mod transactions;

use crate::health::check_health;
use crate::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let response = check_health(&state.health, state.start_time).await;

    // 503 when the transaction store is unreachable
    let status_code = if response.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;

use crate::domain::Stage;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StageInfo {
    pub position: usize,
    pub key: Stage,
    pub label: &'static str,
}

pub async fn completion_report(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let report = state.service.completion_report().await?;

    Ok(Json(report))
}

/// The canonical stage list, in display order.
pub async fn list_stages() -> impl IntoResponse {
    let stages: Vec<StageInfo> = Stage::ALL
        .into_iter()
        .enumerate()
        .map(|(i, stage)| StageInfo {
            position: i + 1,
            key: stage,
            label: stage.label(),
        })
        .collect();

    Json(stages)
}

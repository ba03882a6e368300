use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::domain::TransactionView;
use crate::error::AppError;
use crate::ports::StageFilter;
use crate::utils::pagination::{paginate, Pagination};
use crate::validation::{TransactionDraft, ValidationError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<StageFilter>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageUpdate {
    pub stage_key: Option<String>,
}

pub async fn create_transaction(
    State(state): State<AppState>,
    payload: Result<Json<TransactionDraft>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(draft) = payload?;
    let tx = state.service.create(&draft).await?;

    Ok((StatusCode::CREATED, Json(TransactionView::from(tx))))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = params.status.unwrap_or_default();
    let transactions = state.service.list(filter).await?;
    let pagination = Pagination {
        limit: params.limit,
        offset: params.offset,
    };

    let views: Vec<TransactionView> = transactions.into_iter().map(TransactionView::from).collect();
    Ok(Json(paginate(views, pagination)))
}

pub async fn list_completed_transactions(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<impl IntoResponse, AppError> {
    let transactions = state.service.list(StageFilter::Completed).await?;

    let views: Vec<TransactionView> = transactions.into_iter().map(TransactionView::from).collect();
    Ok(Json(paginate(views, pagination)))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let tx = state.service.get(id).await?;

    Ok(Json(TransactionView::from(tx)))
}

/// Marks the stage named in `stageKey` as completed now.
pub async fn mark_stage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<StageUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(update) = payload?;
    let stage_key = update
        .stage_key
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| ValidationError::new("stageKey", "is required"))?;

    let tx = state.service.mark_stage(id, &stage_key, Utc::now()).await?;

    Ok(Json(TransactionView::from(tx)))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.service.delete(id).await?;

    Ok(Json(json!({ "message": "Transaction deleted successfully" })))
}

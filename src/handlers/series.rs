// src/handlers/series.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::{error::AppError, pagination::Paginated},
    config::AppState,
    models::quotation::{CreateSeriesPayload, SeriesListParams, UpdateSeriesPayload},
};

// GET /api/series
pub async fn list_series(
    State(app_state): State<AppState>,
    Query(params): Query<SeriesListParams>,
) -> Result<impl IntoResponse, AppError> {
    let (rows, total, req) = app_state.series_repo.list(&params).await?;
    Ok(Json(Paginated::new(rows, total, req)))
}

// GET /api/series/{id}
pub async fn get_series(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let series = app_state
        .series_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Series"))?;
    Ok(Json(series))
}

// POST /api/series
pub async fn create_series(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateSeriesPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let series = app_state.series_repo.create(payload.assignments()).await?;
    Ok((StatusCode::CREATED, Json(series)))
}

// PUT /api/series/{id}
pub async fn update_series(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateSeriesPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let series = app_state
        .series_repo
        .update(id, payload.assignments())
        .await?
        .ok_or_else(|| AppError::not_found("Series"))?;
    Ok(Json(series))
}

// DELETE /api/series/{id}
pub async fn delete_series(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let references = app_state.series_repo.count_references(id).await?;
    if references > 0 {
        return Err(AppError::StillReferenced {
            entity: "Series".into(),
            references,
        });
    }

    if !app_state.series_repo.delete(id).await? {
        return Err(AppError::not_found("Series"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// src/handlers/master.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        pagination::{ListParams, Paginated},
    },
    db::MasterRepository,
    models::master::MasterEntity,
};

// The same five handlers serve every master table; the route decides `T`.

// GET /api/{resource}
pub async fn list<T: MasterEntity>(
    State(repo): State<MasterRepository<T>>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let (rows, total, req) = repo.list(&params).await?;
    Ok(Json(Paginated::new(rows, total, req)))
}

// GET /api/{resource}/{id}
pub async fn get<T: MasterEntity>(
    State(repo): State<MasterRepository<T>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let row = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(T::LABEL))?;
    Ok(Json(row))
}

// POST /api/{resource}
pub async fn create<T: MasterEntity>(
    State(repo): State<MasterRepository<T>>,
    Json(payload): Json<T::Create>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let row = repo.create(payload).await?;
    tracing::info!(table = T::TABLE, "{} created", T::LABEL);
    Ok((StatusCode::CREATED, Json(row)))
}

// PUT /api/{resource}/{id}
pub async fn update<T: MasterEntity>(
    State(repo): State<MasterRepository<T>>,
    Path(id): Path<i64>,
    Json(payload): Json<T::Update>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let row = repo
        .update(id, payload)
        .await?
        .ok_or_else(|| AppError::not_found(T::LABEL))?;
    Ok(Json(row))
}

// DELETE /api/{resource}/{id}
pub async fn delete<T: MasterEntity>(
    State(repo): State<MasterRepository<T>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !repo.delete(id).await? {
        return Err(AppError::not_found(T::LABEL));
    }
    Ok(StatusCode::NO_CONTENT)
}

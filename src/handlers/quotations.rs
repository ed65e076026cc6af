// src/handlers/quotations.rs

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        pagination::Paginated,
        upload::{remove_stored_file, save_multipart_file},
    },
    config::AppState,
    models::quotation::{
        CreateQuotationPayload, QuotationDetail, QuotationListParams, UpdateQuotationPayload,
    },
};

// GET /api/quotations
pub async fn list_quotations(
    State(app_state): State<AppState>,
    Query(params): Query<QuotationListParams>,
) -> Result<impl IntoResponse, AppError> {
    let (rows, total, req) = app_state.quotation_repo.list(&params).await?;
    Ok(Json(Paginated::new(rows, total, req).with_total_pages()))
}

// GET /api/quotations/{id}
pub async fn get_quotation(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quotation = app_state.quotation_service.get_quotation(id).await?;
    Ok(Json(quotation))
}

// POST /api/quotations
#[utoipa::path(
    post,
    path = "/api/quotations",
    tag = "Quotations",
    request_body = CreateQuotationPayload,
    responses(
        (status = 201, description = "Header and items created together", body = QuotationDetail),
        (status = 400, description = "Invalid payload, date or series"),
        (status = 409, description = "Quotation number already exists")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_quotation(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateQuotationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let quotation = app_state.quotation_service.create_quotation(payload).await?;
    Ok((StatusCode::CREATED, Json(quotation)))
}

// PUT /api/quotations/{id}
#[utoipa::path(
    put,
    path = "/api/quotations/{id}",
    tag = "Quotations",
    params(("id" = i64, Path, description = "Quotation id")),
    request_body = UpdateQuotationPayload,
    responses(
        (status = 200, description = "Updated quotation with its items", body = QuotationDetail),
        (status = 400, description = "Invalid payload or foreign item id"),
        (status = 404, description = "Quotation not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_quotation(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuotationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let quotation = app_state.quotation_service.update_quotation(id, payload).await?;
    Ok(Json(quotation))
}

// DELETE /api/quotations/{id}
pub async fn delete_quotation(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attachment = app_state.quotation_service.delete_quotation(id).await?;

    if let Some(path) = attachment.as_deref() {
        remove_stored_file(&app_state.config.upload_dir, path).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/quotations/{id}/attachment (multipart: file)
pub async fn upload_attachment(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let previous = app_state
        .quotation_repo
        .find_by_id(&app_state.db_pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Quotation"))?;

    let upload_root = &app_state.config.upload_dir;
    let (stored, _) = save_multipart_file(multipart, upload_root, "quotations").await?;

    let quotation = app_state
        .quotation_repo
        .set_attachment(id, &stored.relative_path)
        .await?
        .ok_or_else(|| AppError::not_found("Quotation"))?;

    if let Some(old) = previous.attachment_path.as_deref() {
        remove_stored_file(upload_root, old).await;
    }
    Ok(Json(quotation))
}

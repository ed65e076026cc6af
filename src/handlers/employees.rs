// src/handlers/employees.rs

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
    models::employee::{CreateEmployeePayload, EmployeeCreated, EmployeeListParams, UpdateEmployeePayload},
};

// GET /api/employees
pub async fn list_employees(
    State(app_state): State<AppState>,
    Query(params): Query<EmployeeListParams>,
) -> Result<impl IntoResponse, AppError> {
    let (rows, total, req) = app_state.employee_repo.list(&params).await?;
    Ok(Json(Paginated::new(rows, total, req)))
}

// GET /api/employees/{id}
pub async fn get_employee(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let employee = app_state
        .employee_repo
        .find_view(id)
        .await?
        .ok_or_else(|| AppError::not_found("Employee"))?;
    Ok(Json(employee))
}

// POST /api/employees
#[utoipa::path(
    post,
    path = "/api/employees",
    tag = "Employees",
    request_body = CreateEmployeePayload,
    responses(
        (status = 201, description = "User, employee, addresses and bank account created together", body = EmployeeCreated),
        (status = 400, description = "Invalid payload or date"),
        (status = 409, description = "E-mail or mobile already exists")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_employee(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateEmployeePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let created = app_state
        .employee_service
        .create_employee_as_user(payload)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

// PUT /api/employees/{id}
pub async fn update_employee(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateEmployeePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let employee = app_state.employee_service.update_employee(id, payload).await?;
    Ok(Json(employee))
}

// DELETE /api/employees/{id}
pub async fn delete_employee(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    app_state.employee_service.delete_employee(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

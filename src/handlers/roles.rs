// src/handlers/roles.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::{
        db_utils::Assignments,
        error::AppError,
        pagination::{non_blank, ListParams, Paginated},
    },
    config::AppState,
    models::rbac::{
        CreateRolePayload, Role, RolePermissionsResponse, SavedPermissionsResponse,
        UpdatePermissionsPayload, UpdateRolePayload,
    },
};

// GET /api/roles
pub async fn list_roles(
    State(app_state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let (roles, total, req) = app_state.rbac_repo.list_roles(&params).await?;
    Ok(Json(Paginated::new(roles, total, req)))
}

// GET /api/roles/{id}
pub async fn get_role(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let role = app_state
        .rbac_repo
        .find_role(id)
        .await?
        .ok_or_else(|| AppError::not_found("Role"))?;
    Ok(Json(role))
}

// POST /api/roles
#[utoipa::path(
    post,
    path = "/api/roles",
    tag = "RBAC",
    request_body = CreateRolePayload,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 409, description = "Role name already in use")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_role(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateRolePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let role = app_state
        .rbac_repo
        .create_role(payload.name.trim(), non_blank(payload.description.as_deref()))
        .await?;
    Ok((StatusCode::CREATED, Json(role)))
}

// PUT /api/roles/{id}
pub async fn update_role(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRolePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let mut fields = Assignments::new();
    fields
        .set_opt("name", payload.name.map(|n| n.trim().to_string()))
        .set_opt("description", payload.description);

    let role = app_state
        .rbac_repo
        .update_role(id, fields)
        .await?
        .ok_or_else(|| AppError::not_found("Role"))?;
    Ok(Json(role))
}

// DELETE /api/roles/{id}
pub async fn delete_role(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !app_state.rbac_repo.soft_delete_role(id).await? {
        return Err(AppError::not_found("Role"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/roles/{id}/permissions
#[utoipa::path(
    get,
    path = "/api/roles/{id}/permissions",
    tag = "RBAC",
    params(("id" = i64, Path, description = "Role id")),
    responses(
        (status = 200, description = "Active menu tree with the role's flags on every node", body = RolePermissionsResponse),
        (status = 404, description = "Role not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_permissions(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let tree = app_state.rbac_service.permission_tree(id).await?;
    Ok(Json(tree))
}

// PUT /api/roles/{id}/permissions
#[utoipa::path(
    put,
    path = "/api/roles/{id}/permissions",
    tag = "RBAC",
    params(("id" = i64, Path, description = "Role id")),
    request_body = UpdatePermissionsPayload,
    responses(
        (status = 200, description = "Stored matrix, keyed by menu id", body = SavedPermissionsResponse),
        (status = 400, description = "Some keys match no menu"),
        (status = 404, description = "Role not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn save_permissions(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePermissionsPayload>,
) -> Result<impl IntoResponse, AppError> {
    let saved = app_state
        .rbac_service
        .save_permissions(id, payload.permissions)
        .await?;
    Ok(Json(saved))
}

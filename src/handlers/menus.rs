// src/handlers/menus.rs

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
    config::AppState,
    models::menu::{
        build_menu_tree, creates_parent_cycle, CreateMenuPayload, MenuTreeNode, UpdateMenuPayload,
    },
};

// GET /api/menus
pub async fn list_menus(
    State(app_state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let (menus, total, req) = app_state.menu_repo.list(&params).await?;
    Ok(Json(Paginated::new(menus, total, req)))
}

// GET /api/menus/tree
#[utoipa::path(
    get,
    path = "/api/menus/tree",
    tag = "Menus",
    responses((status = 200, description = "Active menus as a tree", body = Vec<MenuTreeNode>)),
    security(("api_jwt" = []))
)]
pub async fn menu_tree(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let menus = app_state.menu_repo.list_active().await?;
    Ok(Json(build_menu_tree(menus)))
}

// GET /api/menus/{id}
pub async fn get_menu(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let menu = app_state
        .menu_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Menu"))?;
    Ok(Json(menu))
}

// POST /api/menus
pub async fn create_menu(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateMenuPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let menu = app_state.menu_repo.create(payload.assignments()).await?;
    Ok((StatusCode::CREATED, Json(menu)))
}

// PUT /api/menus/{id}
pub async fn update_menu(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateMenuPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;
    if let Some(Some(parent_id)) = payload.parent_id {
        if parent_id == id {
            return Err(AppError::invalid_field("parent_id", "A menu cannot be its own parent."));
        }
        let links = app_state.menu_repo.parent_links().await?;
        if creates_parent_cycle(id, parent_id, &links) {
            return Err(AppError::invalid_field(
                "parent_id",
                "A menu cannot be moved under one of its own submenus.",
            ));
        }
    }

    let menu = app_state
        .menu_repo
        .update(id, payload.assignments())
        .await?
        .ok_or_else(|| AppError::not_found("Menu"))?;
    Ok(Json(menu))
}

// DELETE /api/menus/{id}
pub async fn delete_menu(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !app_state.menu_repo.delete(id).await? {
        return Err(AppError::not_found("Menu"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// src/handlers/products.rs

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
        upload::{remove_stored_file, save_multipart_file},
    },
    config::AppState,
    models::product::{
        CreateProductPayload, ProductDetail, ProductListParams, UpdateProductPayload,
        UpdateVariantPayload, VariantPayload,
    },
};

// GET /api/products
#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Products",
    params(
        ("page" = Option<i64>, Query, description = "1-based page"),
        ("limit" = Option<i64>, Query, description = "Page size, at most 100"),
        ("search" = Option<String>, Query, description = "Matches name, SKU or description"),
        ("category_id" = Option<i64>, Query, description = "Category filter"),
        ("is_active" = Option<bool>, Query, description = "Active filter"),
        ("stock" = Option<i64>, Query, description = "Exact total stock"),
        ("sort_by" = Option<String>, Query, description = "id, name, sku, price, created_at or stock"),
        ("sort_order" = Option<String>, Query, description = "asc or desc")
    ),
    responses((status = 200, description = "Page of products with their derived total stock")),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    Query(params): Query<ProductListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.product_service.list_products(&params).await?;
    Ok(Json(page))
}

// GET /api/products/{id}
pub async fn get_product(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let product = app_state.product_service.get_product(id).await?;
    Ok(Json(product))
}

// POST /api/products
#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Products",
    request_body = CreateProductPayload,
    responses(
        (status = 201, description = "Product and variants created", body = ProductDetail),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "SKU already exists")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let product = app_state.product_service.create_product(payload).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

// PUT /api/products/{id}
pub async fn update_product(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let product = app_state
        .product_repo
        .update(id, payload.assignments())
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;
    Ok(Json(product))
}

// DELETE /api/products/{id}
pub async fn delete_product(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let product = app_state
        .product_repo
        .delete(id)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;

    if let Some(image) = product.image_path.as_deref() {
        remove_stored_file(&app_state.config.upload_dir, image).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/products/{id}/image (multipart: file)
pub async fn upload_image(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let previous = app_state
        .product_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;

    let upload_root = &app_state.config.upload_dir;
    let (stored, _) = save_multipart_file(multipart, upload_root, "products").await?;

    let product = app_state
        .product_repo
        .set_image(id, &stored.relative_path)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;

    if let Some(old) = previous.image_path.as_deref() {
        remove_stored_file(upload_root, old).await;
    }
    Ok(Json(product))
}

// ---
// Variants
// ---

// POST /api/products/{id}/variants
pub async fn create_variant(
    State(app_state): State<AppState>,
    Path(product_id): Path<i64>,
    Json(payload): Json<VariantPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;
    app_state
        .product_repo
        .find_by_id(product_id)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;

    let variant = app_state
        .product_repo
        .create_variant(&app_state.db_pool, product_id, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(variant)))
}

// PUT /api/variants/{id}
pub async fn update_variant(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateVariantPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let variant = app_state
        .product_repo
        .update_variant(id, payload.assignments())
        .await?
        .ok_or_else(|| AppError::not_found("Variant"))?;
    Ok(Json(variant))
}

// DELETE /api/variants/{id}
pub async fn delete_variant(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !app_state.product_repo.delete_variant(id).await? {
        return Err(AppError::not_found("Variant"));
    }
    Ok(StatusCode::NO_CONTENT)
}

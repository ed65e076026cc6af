// src/handlers/users.rs

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::{
        db_utils::Assignments,
        error::AppError,
        pagination::{non_blank, Paginated},
        upload::{remove_stored_file, save_multipart_file},
    },
    config::AppState,
    models::user::{
        AssignRolePayload, AutocompleteParams, CreateAddressPayload, CreateBankAccountPayload,
        CreateUserPayload, UpdateUserPayload, User, UserDetail, UserListParams,
    },
    services::auth::hash_password,
};

async fn ensure_user(app_state: &AppState, id: i64) -> Result<User, AppError> {
    app_state
        .user_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
}

// ---
// Users
// ---

// GET /api/users
pub async fn list_users(
    State(app_state): State<AppState>,
    Query(params): Query<UserListParams>,
) -> Result<impl IntoResponse, AppError> {
    let (users, total, req) = app_state.user_repo.list(&params).await?;
    Ok(Json(Paginated::new(users, total, req)))
}

// GET /api/users/search?q=
pub async fn search_users(
    State(app_state): State<AppState>,
    Query(params): Query<AutocompleteParams>,
) -> Result<impl IntoResponse, AppError> {
    let suggestions = app_state.user_repo.autocomplete(&params).await?;
    Ok(Json(suggestions))
}

// GET /api/users/{id}
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User with addresses, bank accounts and documents"),
        (status = 404, description = "User not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_user(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = ensure_user(&app_state, id).await?;
    let repo = &app_state.user_repo;

    Ok(Json(UserDetail {
        user,
        addresses: repo.list_addresses(id).await?,
        bank_accounts: repo.list_bank_accounts(id).await?,
        documents: repo.list_documents(id).await?,
    }))
}

// POST /api/users
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    request_body = CreateUserPayload,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "E-mail or mobile already exists")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_user(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let password_hash = hash_password(payload.password).await?;

    let mut fields = Assignments::new();
    fields
        .set("first_name", payload.first_name.trim())
        .set("last_name", payload.last_name.trim())
        .set("email", payload.email.trim().to_lowercase())
        .set("mobile", payload.mobile.trim())
        .set("password_hash", password_hash)
        .set_opt("is_active", payload.is_active);
    payload.roles.apply(&mut fields);

    let user = app_state
        .user_repo
        .create_user(&app_state.db_pool, fields)
        .await?;

    tracing::info!(user_id = user.id, "✅ User created");
    Ok((StatusCode::CREATED, Json(user)))
}

// PUT /api/users/{id}
pub async fn update_user(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let mut fields = Assignments::new();
    fields
        .set_opt("first_name", payload.first_name.map(|v| v.trim().to_string()))
        .set_opt("last_name", payload.last_name.map(|v| v.trim().to_string()))
        .set_opt("email", payload.email.map(|v| v.trim().to_lowercase()))
        .set_opt("mobile", payload.mobile.map(|v| v.trim().to_string()))
        .set_opt("is_active", payload.is_active);
    payload.roles.apply(&mut fields);

    if let Some(password) = payload.password {
        fields.set("password_hash", hash_password(password).await?);
    }

    let user = app_state
        .user_repo
        .update_user(&app_state.db_pool, id, fields)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(Json(user))
}

// DELETE /api/users/{id}
pub async fn delete_user(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let documents = app_state.user_repo.list_documents(id).await?;

    if !app_state.user_repo.delete_user(id).await? {
        return Err(AppError::not_found("User"));
    }

    for document in documents {
        remove_stored_file(&app_state.config.upload_dir, &document.file_path).await;
    }

    tracing::info!(user_id = id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Addresses
// ---

// GET /api/users/{id}/addresses
pub async fn list_addresses(
    State(app_state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ensure_user(&app_state, user_id).await?;
    Ok(Json(app_state.user_repo.list_addresses(user_id).await?))
}

// POST /api/users/{id}/addresses
pub async fn create_address(
    State(app_state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(payload): Json<CreateAddressPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;
    if payload.address.is_blank() {
        return Err(AppError::BadRequest("The address has no fields filled in.".into()));
    }
    ensure_user(&app_state, user_id).await?;

    let address = app_state
        .user_repo
        .create_address(&app_state.db_pool, user_id, payload.address_type, &payload.address)
        .await?;
    Ok((StatusCode::CREATED, Json(address)))
}

// DELETE /api/addresses/{id}
pub async fn delete_address(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !app_state.user_repo.delete_address(id).await? {
        return Err(AppError::not_found("Address"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Bank accounts
// ---

// GET /api/users/{id}/bank-accounts
pub async fn list_bank_accounts(
    State(app_state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ensure_user(&app_state, user_id).await?;
    Ok(Json(app_state.user_repo.list_bank_accounts(user_id).await?))
}

// POST /api/users/{id}/bank-accounts
pub async fn create_bank_account(
    State(app_state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(payload): Json<CreateBankAccountPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;
    if payload.bank.is_blank() {
        return Err(AppError::BadRequest("The bank account has no fields filled in.".into()));
    }
    ensure_user(&app_state, user_id).await?;

    let account = app_state
        .user_repo
        .create_bank_account(&app_state.db_pool, user_id, &payload.bank, payload.is_primary)
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

// DELETE /api/bank-accounts/{id}
pub async fn delete_bank_account(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !app_state.user_repo.delete_bank_account(id).await? {
        return Err(AppError::not_found("Bank account"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Documents
// ---

// GET /api/users/{id}/documents
pub async fn list_documents(
    State(app_state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ensure_user(&app_state, user_id).await?;
    Ok(Json(app_state.user_repo.list_documents(user_id).await?))
}

// POST /api/users/{id}/documents (multipart: file, document_type)
pub async fn upload_document(
    State(app_state): State<AppState>,
    Path(user_id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    ensure_user(&app_state, user_id).await?;

    let upload_root = &app_state.config.upload_dir;
    let (stored, fields) = save_multipart_file(multipart, upload_root, "documents").await?;

    let Some(document_type) = non_blank(fields.get("document_type").map(String::as_str)) else {
        remove_stored_file(upload_root, &stored.relative_path).await;
        return Err(AppError::invalid_field("document_type", "document_type is required"));
    };

    let document = match app_state
        .user_repo
        .create_document(user_id, document_type, &stored.original_name, &stored.relative_path)
        .await
    {
        Ok(document) => document,
        Err(e) => {
            remove_stored_file(upload_root, &stored.relative_path).await;
            return Err(e);
        }
    };

    Ok((StatusCode::CREATED, Json(document)))
}

// DELETE /api/documents/{id}
pub async fn delete_document(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let document = app_state
        .user_repo
        .delete_document(id)
        .await?
        .ok_or_else(|| AppError::not_found("Document"))?;

    remove_stored_file(&app_state.config.upload_dir, &document.file_path).await;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Role mappings
// ---

// GET /api/users/{id}/roles
pub async fn list_user_roles(
    State(app_state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ensure_user(&app_state, user_id).await?;
    Ok(Json(app_state.user_repo.list_roles(user_id).await?))
}

// POST /api/users/{id}/roles
pub async fn assign_role(
    State(app_state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(payload): Json<AssignRolePayload>,
) -> Result<impl IntoResponse, AppError> {
    ensure_user(&app_state, user_id).await?;
    app_state
        .rbac_repo
        .find_role(payload.role_id)
        .await?
        .ok_or_else(|| AppError::not_found("Role"))?;

    let mapping = app_state
        .user_repo
        .assign_role(user_id, payload.role_id)
        .await?;
    Ok((StatusCode::CREATED, Json(mapping)))
}

// DELETE /api/users/{id}/roles/{role_id}
pub async fn revoke_role(
    State(app_state): State<AppState>,
    Path((user_id, role_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    if !app_state.user_repo.revoke_role(user_id, role_id).await? {
        return Err(AppError::not_found("Role mapping"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// src/handlers/leads.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        pagination::{non_blank, Paginated},
    },
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::crm::{
        CreateFollowUpPayload, CreateInteractionPayload, CreateLeadPayload, FollowUpStatus,
        LeadListParams, LeadResponse, UpdateFollowUpPayload, UpdateLeadPayload,
    },
};

async fn ensure_lead(app_state: &AppState, id: i64) -> Result<(), AppError> {
    app_state
        .crm_repo
        .find_lead(id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::not_found("Lead"))
}

// ---
// Leads
// ---

// GET /api/leads
#[utoipa::path(
    get,
    path = "/api/leads",
    tag = "CRM",
    params(
        ("page" = Option<i64>, Query, description = "1-based page"),
        ("limit" = Option<i64>, Query, description = "Page size"),
        ("search" = Option<String>, Query, description = "Matches contact, company, e-mail or mobile"),
        ("status" = Option<String>, Query, description = "Lead status"),
        ("source" = Option<String>, Query, description = "Lead source"),
        ("assigned_to" = Option<i64>, Query, description = "Assigned user id")
    ),
    responses((status = 200, description = "Page of leads with totalPages")),
    security(("api_jwt" = []))
)]
pub async fn list_leads(
    State(app_state): State<AppState>,
    Query(params): Query<LeadListParams>,
) -> Result<impl IntoResponse, AppError> {
    let (leads, total, req) = app_state.crm_repo.list_leads(&params).await?;
    let data: Vec<LeadResponse> = leads.into_iter().map(LeadResponse::from).collect();
    Ok(Json(Paginated::new(data, total, req).with_total_pages()))
}

// GET /api/leads/{id}
pub async fn get_lead(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state
        .crm_repo
        .find_lead(id)
        .await?
        .ok_or_else(|| AppError::not_found("Lead"))?;
    Ok(Json(LeadResponse::from(lead)))
}

// POST /api/leads
#[utoipa::path(
    post,
    path = "/api/leads",
    tag = "CRM",
    request_body = CreateLeadPayload,
    responses(
        (status = 201, description = "Lead created", body = LeadResponse),
        (status = 400, description = "Invalid payload")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_lead(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateLeadPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let lead = app_state.crm_repo.create_lead(payload.assignments()).await?;
    Ok((StatusCode::CREATED, Json(LeadResponse::from(lead))))
}

// PUT /api/leads/{id}
pub async fn update_lead(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateLeadPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let lead = app_state
        .crm_repo
        .update_lead(id, payload.assignments())
        .await?
        .ok_or_else(|| AppError::not_found("Lead"))?;
    Ok(Json(LeadResponse::from(lead)))
}

// DELETE /api/leads/{id}
pub async fn delete_lead(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !app_state.crm_repo.delete_lead(id).await? {
        return Err(AppError::not_found("Lead"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Interactions
// ---

// GET /api/leads/{id}/interactions
pub async fn list_interactions(
    State(app_state): State<AppState>,
    Path(lead_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ensure_lead(&app_state, lead_id).await?;
    Ok(Json(app_state.crm_repo.list_interactions(lead_id).await?))
}

// POST /api/leads/{id}/interactions
pub async fn create_interaction(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(lead_id): Path<i64>,
    Json(payload): Json<CreateInteractionPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;
    ensure_lead(&app_state, lead_id).await?;

    let interaction = app_state
        .crm_repo
        .create_interaction(
            lead_id,
            payload.interaction_type.trim(),
            non_blank(payload.notes.as_deref()),
            payload.interaction_at.unwrap_or_else(Utc::now),
            Some(user.id),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(interaction)))
}

// DELETE /api/interactions/{id}
pub async fn delete_interaction(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !app_state.crm_repo.delete_interaction(id).await? {
        return Err(AppError::not_found("Interaction"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Follow-ups
// ---

// GET /api/leads/{id}/follow-ups
pub async fn list_follow_ups(
    State(app_state): State<AppState>,
    Path(lead_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ensure_lead(&app_state, lead_id).await?;
    Ok(Json(app_state.crm_repo.list_follow_ups(lead_id).await?))
}

// POST /api/leads/{id}/follow-ups
pub async fn create_follow_up(
    State(app_state): State<AppState>,
    Path(lead_id): Path<i64>,
    Json(payload): Json<CreateFollowUpPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;
    ensure_lead(&app_state, lead_id).await?;

    let follow_up = app_state
        .crm_repo
        .create_follow_up(
            lead_id,
            payload.follow_up_at,
            payload.status.unwrap_or(FollowUpStatus::Pending),
            non_blank(payload.notes.as_deref()),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(follow_up)))
}

// PUT /api/follow-ups/{id}
pub async fn update_follow_up(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateFollowUpPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let follow_up = app_state
        .crm_repo
        .update_follow_up(id, payload.follow_up_at, payload.status, payload.notes.as_deref())
        .await?
        .ok_or_else(|| AppError::not_found("Follow-up"))?;
    Ok(Json(follow_up))
}

// DELETE /api/follow-ups/{id}
pub async fn delete_follow_up(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !app_state.crm_repo.delete_follow_up(id).await? {
        return Err(AppError::not_found("Follow-up"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// src/handlers/indiamart.rs

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    models::indiamart::{IndiaMartQuery, SyncSummary},
};

// GET /api/indiamart/leads
#[utoipa::path(
    get,
    path = "/api/indiamart/leads",
    tag = "CRM",
    params(
        ("api_key" = String, Query, description = "IndiaMART CRM key"),
        ("start_time" = Option<String>, Query, description = "DD-Mon-YYYY HH:MM:SS"),
        ("end_time" = Option<String>, Query, description = "DD-Mon-YYYY HH:MM:SS")
    ),
    responses(
        (status = 200, description = "Upstream body; X-Data-Source tells live from cache"),
        (status = 429, description = "Rate limited and no snapshot available")
    ),
    security(("api_jwt" = []))
)]
pub async fn fetch_leads(
    State(app_state): State<AppState>,
    Query(query): Query<IndiaMartQuery>,
) -> Result<Response, AppError> {
    let response = app_state.indiamart_service.fetch_leads(&query).await?;
    Ok(response.to_response())
}

// POST /api/indiamart/sync
#[utoipa::path(
    post,
    path = "/api/indiamart/sync",
    tag = "CRM",
    params(
        ("api_key" = String, Query, description = "IndiaMART CRM key"),
        ("start_time" = Option<String>, Query, description = "DD-Mon-YYYY HH:MM:SS"),
        ("end_time" = Option<String>, Query, description = "DD-Mon-YYYY HH:MM:SS")
    ),
    responses((status = 200, description = "Import summary", body = SyncSummary)),
    security(("api_jwt" = []))
)]
pub async fn sync_leads(
    State(app_state): State<AppState>,
    Query(query): Query<IndiaMartQuery>,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state.indiamart_service.sync(&query).await?;
    Ok(Json(summary))
}

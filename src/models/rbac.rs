// src/models/rbac.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::ToSchema;
use validator::Validate;

// Named permission bundle. Soft-deleted through `deleted_at`.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Role {
    #[schema(example = 3)]
    pub id: i64,

    #[schema(example = "Sales Manager")]
    pub name: String,

    #[schema(example = "Full access to sales and CRM")]
    pub description: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRolePayload {
    #[validate(length(min = 1, message = "Name is required."))]
    #[schema(example = "Store Assistant")]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRolePayload {
    #[validate(length(min = 1, message = "Name cannot be empty."))]
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Capability flags of a role on one menu. Missing flags read as false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct MenuPermission {
    pub can_view: bool,
    pub can_create: bool,
    pub can_update: bool,
    pub can_delete: bool,
    pub can_all: bool,
}

/// Stored matrix: menu id (as a string) -> flags. Ordered so the JSON output is stable.
pub type PermissionMap = BTreeMap<String, MenuPermission>;

#[derive(Debug, Clone, FromRow)]
pub struct RoleManagement {
    pub id: i64,
    pub role_id: i64,
    pub menu_id: i64,
    pub permissions: Json<PermissionMap>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Incoming matrix. Keys are menu ids or, for older clients, menu names.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePermissionsPayload {
    #[schema(value_type = Object)]
    pub permissions: BTreeMap<String, MenuPermission>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RolePermissionsResponse {
    pub role_id: i64,
    #[schema(value_type = Vec<Object>)]
    pub menus: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SavedPermissionsResponse {
    pub role_id: i64,
    #[schema(value_type = Object)]
    pub permissions: PermissionMap,
}

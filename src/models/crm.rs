// src/models/crm.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::common::db_utils::Assignments;

// --- Leads ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Lead {
    pub id: i64,
    pub contact: String,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub source: String,
    pub status: String,
    pub assigned_to: Option<i64>,
    pub notes: Option<String>,
    /// Query id of the lead on IndiaMART, when it came from there.
    pub external_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lead as returned to clients. Older screens read the contact as `name`.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeadResponse {
    pub name: String,
    #[serde(flatten)]
    pub lead: Lead,
}

impl From<Lead> for LeadResponse {
    fn from(lead: Lead) -> Self {
        Self {
            name: lead.contact.clone(),
            lead,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LeadListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
    pub assigned_to: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLeadPayload {
    #[serde(alias = "name")]
    #[validate(length(min = 1, message = "Contact name is required."))]
    pub contact: String,
    pub company_name: Option<String>,
    #[validate(email(message = "The e-mail provided is invalid."))]
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub source: Option<String>,
    pub status: Option<String>,
    pub assigned_to: Option<i64>,
    pub notes: Option<String>,
}

impl CreateLeadPayload {
    pub fn assignments(self) -> Assignments {
        let mut a = Assignments::new();
        a.set("contact", self.contact)
            .set_opt("company_name", self.company_name)
            .set_opt("email", self.email)
            .set_opt("mobile", self.mobile)
            .set_opt("source", self.source)
            .set_opt("status", self.status)
            .set_opt("assigned_to", self.assigned_to)
            .set_opt("notes", self.notes);
        a
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateLeadPayload {
    #[serde(alias = "name")]
    #[validate(length(min = 1, message = "Contact name cannot be empty."))]
    pub contact: Option<String>,
    pub company_name: Option<String>,
    #[validate(email(message = "The e-mail provided is invalid."))]
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub source: Option<String>,
    pub status: Option<String>,
    pub assigned_to: Option<i64>,
    pub notes: Option<String>,
}

impl UpdateLeadPayload {
    pub fn assignments(self) -> Assignments {
        let mut a = Assignments::new();
        a.set_opt("contact", self.contact)
            .set_opt("company_name", self.company_name)
            .set_opt("email", self.email)
            .set_opt("mobile", self.mobile)
            .set_opt("source", self.source)
            .set_opt("status", self.status)
            .set_opt("assigned_to", self.assigned_to)
            .set_opt("notes", self.notes);
        a
    }
}

// --- Interactions ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct LeadInteraction {
    pub id: i64,
    pub lead_id: i64,
    pub interaction_type: String,
    pub notes: Option<String>,
    pub interaction_at: DateTime<Utc>,
    pub created_by: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInteractionPayload {
    #[validate(length(min = 1, message = "Interaction type is required."))]
    pub interaction_type: String,
    pub notes: Option<String>,
    /// Defaults to now.
    pub interaction_at: Option<DateTime<Utc>>,
}

// --- Follow-ups ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "follow_up_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FollowUpStatus {
    Pending,
    Done,
    Skipped,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct LeadFollowUp {
    pub id: i64,
    pub lead_id: i64,
    pub follow_up_at: DateTime<Utc>,
    pub status: FollowUpStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateFollowUpPayload {
    pub follow_up_at: DateTime<Utc>,
    pub status: Option<FollowUpStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateFollowUpPayload {
    pub follow_up_at: Option<DateTime<Utc>>,
    pub status: Option<FollowUpStatus>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead() -> Lead {
        Lead {
            id: 9,
            contact: "Ravi Kumar".into(),
            company_name: Some("Kumar Textiles".into()),
            email: None,
            mobile: Some("9811122233".into()),
            source: "indiamart".into(),
            status: "new".into(),
            assigned_to: None,
            notes: None,
            external_ref: Some("2733419855".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn contact_is_exposed_under_both_names() {
        let json = serde_json::to_value(LeadResponse::from(lead())).unwrap();
        assert_eq!(json["name"], "Ravi Kumar");
        assert_eq!(json["contact"], "Ravi Kumar");
        assert_eq!(json["id"], 9);
    }

    #[test]
    fn name_is_accepted_for_contact() {
        let payload: CreateLeadPayload =
            serde_json::from_str(r#"{"name": "Meera", "source": "walk-in"}"#).unwrap();
        assert_eq!(payload.contact, "Meera");

        let payload: CreateLeadPayload = serde_json::from_str(r#"{"contact": "Meera"}"#).unwrap();
        assert_eq!(payload.contact, "Meera");
    }

    #[test]
    fn follow_up_status_is_lowercase_on_the_wire() {
        let status: FollowUpStatus = serde_json::from_str(r#""skipped""#).unwrap();
        assert_eq!(status, FollowUpStatus::Skipped);
        assert_eq!(serde_json::to_string(&FollowUpStatus::Done).unwrap(), r#""done""#);
    }
}

// src/models/indiamart.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Query string of `GET /api/indiamart/leads`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IndiaMartQuery {
    pub api_key: String,
    /// `DD-Mon-YYYY HH:MM:SS`, forwarded as is
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// Envelope returned by the CRM listing API. Older accounts get the entries
/// under `RESPONSE`, newer ones under `DATA`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndiaMartEnvelope {
    #[serde(rename = "STATUS", default)]
    pub status: Option<String>,
    #[serde(rename = "CODE", default)]
    pub code: Option<i64>,
    #[serde(rename = "MESSAGE", default)]
    pub message: Option<String>,
    #[serde(rename = "TOTAL_RECORDS", default)]
    pub total_records: Option<i64>,
    #[serde(rename = "DATA", default)]
    pub data: Option<Vec<IndiaMartLead>>,
    #[serde(rename = "RESPONSE", default)]
    pub response: Option<Vec<IndiaMartLead>>,
}

impl IndiaMartEnvelope {
    pub fn into_leads(self) -> Vec<IndiaMartLead> {
        self.data.or(self.response).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndiaMartLead {
    #[serde(rename = "UNIQUE_QUERY_ID", default)]
    pub unique_query_id: Option<String>,
    #[serde(rename = "SENDER_NAME", default)]
    pub sender_name: Option<String>,
    #[serde(rename = "SENDER_EMAIL", default)]
    pub sender_email: Option<String>,
    #[serde(rename = "SENDER_MOBILE", default)]
    pub sender_mobile: Option<String>,
    #[serde(rename = "SENDER_COMPANY", default)]
    pub sender_company: Option<String>,
    #[serde(rename = "SUBJECT", default)]
    pub subject: Option<String>,
    #[serde(rename = "QUERY_MESSAGE", default)]
    pub query_message: Option<String>,
}

impl IndiaMartLead {
    /// Text stored in the lead's notes.
    pub fn notes(&self) -> Option<String> {
        match (self.subject.as_deref(), self.query_message.as_deref()) {
            (Some(s), Some(m)) if !m.trim().is_empty() => Some(format!("{}\n\n{}", s, m)),
            (Some(s), _) => Some(s.to_string()),
            (None, Some(m)) => Some(m.to_string()),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SyncSummary {
    pub fetched: usize,
    pub inserted: u64,
    /// `live` or `cache`
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_read_from_either_key() {
        let raw = r#"{"STATUS":"SUCCESS","CODE":200,"TOTAL_RECORDS":1,
            "RESPONSE":[{"UNIQUE_QUERY_ID":"77","SENDER_NAME":"Anil"}]}"#;
        let env: IndiaMartEnvelope = serde_json::from_str(raw).unwrap();
        let leads = env.into_leads();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].unique_query_id.as_deref(), Some("77"));

        let raw = r#"{"STATUS":"SUCCESS","DATA":[{"UNIQUE_QUERY_ID":"78"},{"UNIQUE_QUERY_ID":"79"}]}"#;
        let env: IndiaMartEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(env.into_leads().len(), 2);
    }

    #[test]
    fn notes_join_subject_and_message() {
        let lead = IndiaMartLead {
            subject: Some("Requirement for cotton shirts".into()),
            query_message: Some("Need 200 pcs".into()),
            ..Default::default()
        };
        assert_eq!(
            lead.notes().as_deref(),
            Some("Requirement for cotton shirts\n\nNeed 200 pcs")
        );
        assert_eq!(IndiaMartLead::default().notes(), None);
    }
}

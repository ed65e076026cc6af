// src/db/crm_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    common::{
        db_utils::{classify_db_error, Assignments},
        error::AppError,
        pagination::{non_blank, PageRequest},
    },
    models::{
        crm::{Lead, LeadFollowUp, LeadInteraction, LeadListParams, FollowUpStatus},
        indiamart::IndiaMartLead,
    },
};

#[derive(Clone)]
pub struct CrmRepository {
    pool: PgPool,
}

fn push_lead_filters(qb: &mut QueryBuilder<'_, Postgres>, params: &LeadListParams) {
    qb.push(" WHERE 1 = 1");
    if let Some(term) = non_blank(params.search.as_deref()) {
        let like = format!("%{}%", term);
        qb.push(" AND (contact ILIKE ")
            .push_bind(like.clone())
            .push(" OR company_name ILIKE ")
            .push_bind(like.clone())
            .push(" OR email ILIKE ")
            .push_bind(like.clone())
            .push(" OR mobile ILIKE ")
            .push_bind(like)
            .push(")");
    }
    if let Some(status) = non_blank(params.status.as_deref()) {
        qb.push(" AND status = ").push_bind(status.to_string());
    }
    if let Some(source) = non_blank(params.source.as_deref()) {
        qb.push(" AND source = ").push_bind(source.to_string());
    }
    if let Some(assigned_to) = params.assigned_to {
        qb.push(" AND assigned_to = ").push_bind(assigned_to);
    }
}

impl CrmRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  LEADS
    // =========================================================================

    pub async fn list_leads(&self, params: &LeadListParams) -> Result<(Vec<Lead>, i64, PageRequest), AppError> {
        let req = PageRequest::new(params.page, params.limit);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM leads");
        push_lead_filters(&mut count, params);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM leads");
        push_lead_filters(&mut qb, params);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(req.limit)
            .push(" OFFSET ")
            .push_bind(req.offset());

        let leads = qb.build_query_as::<Lead>().fetch_all(&self.pool).await?;
        Ok((leads, total, req))
    }

    pub async fn find_lead(&self, id: i64) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(lead)
    }

    pub async fn create_lead(&self, assignments: Assignments) -> Result<Lead, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO leads");
        assignments.push_insert(&mut qb);
        qb.push(" RETURNING *");

        qb.build_query_as::<Lead>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify_db_error(e, "Lead"))
    }

    pub async fn update_lead(&self, id: i64, assignments: Assignments) -> Result<Option<Lead>, AppError> {
        if assignments.is_empty() {
            return self.find_lead(id).await;
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE leads SET ");
        assignments.push_set(&mut qb);
        qb.push(", updated_at = NOW() WHERE id = ")
            .push_bind(id)
            .push(" RETURNING *");

        qb.build_query_as::<Lead>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify_db_error(e, "Lead"))
    }

    pub async fn delete_lead(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Inserts IndiaMART entries that are not stored yet, keyed by their query
    /// id. Entries without one are skipped. Returns how many rows were added.
    pub async fn import_external_leads(&self, entries: &[IndiaMartLead]) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for entry in entries {
            let Some(external_ref) = non_blank(entry.unique_query_id.as_deref()) else {
                continue;
            };
            let contact = non_blank(entry.sender_name.as_deref()).unwrap_or("IndiaMART buyer");

            let result = sqlx::query(
                r#"
                INSERT INTO leads (contact, company_name, email, mobile, source, notes, external_ref)
                VALUES ($1, $2, $3, $4, 'indiamart', $5, $6)
                ON CONFLICT (external_ref) DO NOTHING
                "#,
            )
            .bind(contact)
            .bind(non_blank(entry.sender_company.as_deref()))
            .bind(non_blank(entry.sender_email.as_deref()))
            .bind(non_blank(entry.sender_mobile.as_deref()))
            .bind(entry.notes())
            .bind(external_ref)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    // =========================================================================
    //  INTERACTIONS
    // =========================================================================

    pub async fn list_interactions(&self, lead_id: i64) -> Result<Vec<LeadInteraction>, AppError> {
        let rows = sqlx::query_as::<_, LeadInteraction>(
            "SELECT * FROM lead_interactions WHERE lead_id = $1 ORDER BY interaction_at DESC, id DESC",
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create_interaction(
        &self,
        lead_id: i64,
        interaction_type: &str,
        notes: Option<&str>,
        interaction_at: DateTime<Utc>,
        created_by: Option<i64>,
    ) -> Result<LeadInteraction, AppError> {
        let row = sqlx::query_as::<_, LeadInteraction>(
            r#"
            INSERT INTO lead_interactions (lead_id, interaction_type, notes, interaction_at, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(interaction_type)
        .bind(notes)
        .bind(interaction_at)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify_db_error(e, "Interaction"))?;
        Ok(row)
    }

    pub async fn delete_interaction(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM lead_interactions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  FOLLOW-UPS
    // =========================================================================

    pub async fn list_follow_ups(&self, lead_id: i64) -> Result<Vec<LeadFollowUp>, AppError> {
        let rows = sqlx::query_as::<_, LeadFollowUp>(
            "SELECT * FROM lead_follow_ups WHERE lead_id = $1 ORDER BY follow_up_at",
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create_follow_up(
        &self,
        lead_id: i64,
        follow_up_at: DateTime<Utc>,
        status: FollowUpStatus,
        notes: Option<&str>,
    ) -> Result<LeadFollowUp, AppError> {
        let row = sqlx::query_as::<_, LeadFollowUp>(
            r#"
            INSERT INTO lead_follow_ups (lead_id, follow_up_at, status, notes)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(follow_up_at)
        .bind(status)
        .bind(notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify_db_error(e, "Follow-up"))?;
        Ok(row)
    }

    /// `COALESCE` keeps the stored value for every absent field.
    pub async fn update_follow_up(
        &self,
        id: i64,
        follow_up_at: Option<DateTime<Utc>>,
        status: Option<FollowUpStatus>,
        notes: Option<&str>,
    ) -> Result<Option<LeadFollowUp>, AppError> {
        let row = sqlx::query_as::<_, LeadFollowUp>(
            r#"
            UPDATE lead_follow_ups
            SET follow_up_at = COALESCE($1, follow_up_at),
                status = COALESCE($2, status),
                notes = COALESCE($3, notes),
                updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(follow_up_at)
        .bind(status)
        .bind(notes)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn delete_follow_up(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM lead_follow_ups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

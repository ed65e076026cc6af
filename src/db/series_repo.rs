// src/db/series_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};

use crate::{
    common::{
        db_utils::{classify_db_error, Assignments},
        error::AppError,
        pagination::{non_blank, PageRequest},
    },
    models::quotation::{Series, SeriesListParams},
};

#[derive(Clone)]
pub struct SeriesRepository {
    pool: PgPool,
}

fn push_series_filters(qb: &mut QueryBuilder<'_, Postgres>, params: &SeriesListParams) {
    qb.push(" WHERE 1 = 1");
    if let Some(term) = non_blank(params.search.as_deref()) {
        let like = format!("%{}%", term);
        qb.push(" AND (name ILIKE ")
            .push_bind(like.clone())
            .push(" OR prefix ILIKE ")
            .push_bind(like)
            .push(")");
    }
    if let Some(company_id) = params.company_id {
        qb.push(" AND company_id = ").push_bind(company_id);
    }
    if let Some(branch_id) = params.company_branch_id {
        qb.push(" AND company_branch_id = ").push_bind(branch_id);
    }
}

impl SeriesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, params: &SeriesListParams) -> Result<(Vec<Series>, i64, PageRequest), AppError> {
        let req = PageRequest::new(params.page, params.limit);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM series");
        push_series_filters(&mut count, params);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM series");
        push_series_filters(&mut qb, params);
        qb.push(" ORDER BY name LIMIT ")
            .push_bind(req.limit)
            .push(" OFFSET ")
            .push_bind(req.offset());

        let rows = qb.build_query_as::<Series>().fetch_all(&self.pool).await?;
        Ok((rows, total, req))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Series>, AppError> {
        let row = sqlx::query_as::<_, Series>("SELECT * FROM series WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn create(&self, assignments: Assignments) -> Result<Series, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO series");
        assignments.push_insert(&mut qb);
        qb.push(" RETURNING *");

        qb.build_query_as::<Series>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify_db_error(e, "Series"))
    }

    pub async fn update(&self, id: i64, assignments: Assignments) -> Result<Option<Series>, AppError> {
        if assignments.is_empty() {
            return self.find_by_id(id).await;
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE series SET ");
        assignments.push_set(&mut qb);
        qb.push(", updated_at = NOW() WHERE id = ")
            .push_bind(id)
            .push(" RETURNING *");

        qb.build_query_as::<Series>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify_db_error(e, "Series"))
    }

    /// Number of quotations numbered from this series.
    pub async fn count_references(&self, id: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM quotation_tables WHERE series_id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM series WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify_db_error(e, "Series"))?;
        Ok(result.rows_affected() > 0)
    }

    /// Takes the current number and advances the counter in one statement.
    /// The row lock held by the UPDATE serializes concurrent callers until
    /// their transaction ends. Returns the series as it was before the bump.
    pub async fn take_next_number<'e, E>(&self, executor: E, id: i64) -> Result<Option<Series>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Series>(
            r#"
            UPDATE series
            SET next_number = next_number + 1, updated_at = NOW()
            WHERE id = $1 AND is_active = TRUE
            RETURNING id, name, prefix, postfix, next_number - 1 AS next_number, padding,
                      company_id, company_branch_id, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }
}

// src/db/quotation_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};

use crate::{
    common::{
        db_utils::{classify_db_error, Assignments},
        error::AppError,
        pagination::{non_blank, PageRequest},
    },
    models::quotation::{PricedItem, QuotationListParams, QuotationTable, QuotationTableItem},
};

#[derive(Clone)]
pub struct QuotationRepository {
    pool: PgPool,
}

fn push_quotation_filters(qb: &mut QueryBuilder<'_, Postgres>, params: &QuotationListParams) {
    qb.push(" WHERE 1 = 1");
    if let Some(term) = non_blank(params.search.as_deref()) {
        let like = format!("%{}%", term);
        qb.push(" AND (quotation_no ILIKE ")
            .push_bind(like.clone())
            .push(" OR notes ILIKE ")
            .push_bind(like)
            .push(")");
    }
    if let Some(status) = non_blank(params.status.as_deref()) {
        qb.push(" AND status = ").push_bind(status.to_string());
    }
    if let Some(customer_id) = params.customer_id {
        qb.push(" AND customer_id = ").push_bind(customer_id);
    }
    if let Some(series_id) = params.series_id {
        qb.push(" AND series_id = ").push_bind(series_id);
    }
    if let Some(from) = params.from_date {
        qb.push(" AND quotation_date >= ").push_bind(from);
    }
    if let Some(to) = params.to_date {
        qb.push(" AND quotation_date <= ").push_bind(to);
    }
}

impl QuotationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  HEADERS
    // =========================================================================

    pub async fn list(
        &self,
        params: &QuotationListParams,
    ) -> Result<(Vec<QuotationTable>, i64, PageRequest), AppError> {
        let req = PageRequest::new(params.page, params.limit);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM quotation_tables");
        push_quotation_filters(&mut count, params);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM quotation_tables");
        push_quotation_filters(&mut qb, params);
        qb.push(" ORDER BY quotation_date DESC, id DESC LIMIT ")
            .push_bind(req.limit)
            .push(" OFFSET ")
            .push_bind(req.offset());

        let rows = qb.build_query_as::<QuotationTable>().fetch_all(&self.pool).await?;
        Ok((rows, total, req))
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: i64) -> Result<Option<QuotationTable>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, QuotationTable>("SELECT * FROM quotation_tables WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    pub async fn insert_header<'e, E>(
        &self,
        executor: E,
        assignments: Assignments,
    ) -> Result<QuotationTable, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO quotation_tables");
        assignments.push_insert(&mut qb);
        qb.push(" RETURNING *");

        qb.build_query_as::<QuotationTable>()
            .fetch_one(executor)
            .await
            .map_err(|e| classify_db_error(e, "Quotation"))
    }

    pub async fn update_header<'e, E>(
        &self,
        executor: E,
        id: i64,
        assignments: Assignments,
    ) -> Result<Option<QuotationTable>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE quotation_tables SET ");
        if !assignments.is_empty() {
            assignments.push_set(&mut qb);
            qb.push(", ");
        }
        qb.push("updated_at = NOW() WHERE id = ")
            .push_bind(id)
            .push(" RETURNING *");

        qb.build_query_as::<QuotationTable>()
            .fetch_optional(executor)
            .await
            .map_err(|e| classify_db_error(e, "Quotation"))
    }

    pub async fn set_total<'e, E>(&self, executor: E, id: i64, total: Decimal) -> Result<QuotationTable, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, QuotationTable>(
            "UPDATE quotation_tables SET total_amount = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(total)
        .bind(id)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    pub async fn set_attachment(&self, id: i64, path: &str) -> Result<Option<QuotationTable>, AppError> {
        let row = sqlx::query_as::<_, QuotationTable>(
            "UPDATE quotation_tables SET attachment_path = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(path)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn delete_header<'e, E>(&self, executor: E, id: i64) -> Result<Option<QuotationTable>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, QuotationTable>("DELETE FROM quotation_tables WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    // =========================================================================
    //  ITEMS
    // =========================================================================

    pub async fn list_items<'e, E>(&self, executor: E, quotation_id: i64) -> Result<Vec<QuotationTableItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, QuotationTableItem>(
            "SELECT * FROM quotation_table_items WHERE quotation_id = $1 ORDER BY id",
        )
        .bind(quotation_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn item_ids<'e, E>(&self, executor: E, quotation_id: i64) -> Result<Vec<i64>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM quotation_table_items WHERE quotation_id = $1 ORDER BY id",
        )
        .bind(quotation_id)
        .fetch_all(executor)
        .await?;
        Ok(ids)
    }

    /// Bulk insert in a single statement, every row stamped with `quotation_id`.
    pub async fn insert_items<'e, E>(
        &self,
        executor: E,
        quotation_id: i64,
        items: &[PricedItem],
    ) -> Result<Vec<QuotationTableItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO quotation_table_items \
             (quotation_id, product_id, product_variant_id, description, quantity, rate, discount, tax_rate, amount) ",
        );
        qb.push_values(items, |mut row, item| {
            row.push_bind(quotation_id)
                .push_bind(item.product_id)
                .push_bind(item.product_variant_id)
                .push_bind(item.description.clone())
                .push_bind(item.quantity)
                .push_bind(item.rate)
                .push_bind(item.discount)
                .push_bind(item.tax_rate)
                .push_bind(item.amount);
        });
        qb.push(" RETURNING *");

        qb.build_query_as::<QuotationTableItem>()
            .fetch_all(executor)
            .await
            .map_err(|e| classify_db_error(e, "Quotation item"))
    }

    pub async fn update_item<'e, E>(
        &self,
        executor: E,
        quotation_id: i64,
        item_id: i64,
        item: &PricedItem,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE quotation_table_items
            SET product_id = $1, product_variant_id = $2, description = $3, quantity = $4,
                rate = $5, discount = $6, tax_rate = $7, amount = $8
            WHERE id = $9 AND quotation_id = $10
            "#,
        )
        .bind(item.product_id)
        .bind(item.product_variant_id)
        .bind(item.description.as_deref())
        .bind(item.quantity)
        .bind(item.rate)
        .bind(item.discount)
        .bind(item.tax_rate)
        .bind(item.amount)
        .bind(item_id)
        .bind(quotation_id)
        .execute(executor)
        .await
        .map_err(|e| classify_db_error(e, "Quotation item"))?;
        Ok(())
    }

    pub async fn delete_items<'e, E>(&self, executor: E, quotation_id: i64, ids: &[i64]) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM quotation_table_items WHERE quotation_id = $1 AND id = ANY($2)")
            .bind(quotation_id)
            .bind(ids)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_all_items<'e, E>(&self, executor: E, quotation_id: i64) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM quotation_table_items WHERE quotation_id = $1")
            .bind(quotation_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

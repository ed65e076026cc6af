// src/db/product_repo.rs

use std::collections::HashMap;

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};

use crate::{
    common::{
        db_utils::{classify_db_error, Assignments},
        error::AppError,
        pagination::{non_blank, PageRequest},
    },
    models::product::{Product, ProductListParams, ProductVariant, VariantPayload},
};

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

// Filters that live in SQL. The stock filter never does: stock is derived.
fn push_product_filters(qb: &mut QueryBuilder<'_, Postgres>, params: &ProductListParams) {
    qb.push(" WHERE 1 = 1");
    if let Some(term) = non_blank(params.search.as_deref()) {
        let like = format!("%{}%", term);
        qb.push(" AND (name ILIKE ")
            .push_bind(like.clone())
            .push(" OR sku ILIKE ")
            .push_bind(like)
            .push(")");
    }
    if let Some(category_id) = params.category_id {
        qb.push(" AND category_id = ").push_bind(category_id);
    }
    if let Some(is_active) = params.is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  LISTING
    // =========================================================================

    /// One page straight from SQL, for requests that neither filter nor sort by stock.
    pub async fn list_page(
        &self,
        params: &ProductListParams,
        req: PageRequest,
    ) -> Result<(Vec<Product>, i64), AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_product_filters(&mut count, params);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let column = params
            .sort_by
            .unwrap_or_default()
            .column()
            .unwrap_or("id");
        let order = params.sort_order.unwrap_or_default().sql();

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM products");
        push_product_filters(&mut qb, params);
        qb.push(format!(" ORDER BY {} {}, id {} LIMIT ", column, order, order))
            .push_bind(req.limit)
            .push(" OFFSET ")
            .push_bind(req.offset());

        let products = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;
        Ok((products, total))
    }

    /// Every product matching the SQL-side filters, unpaginated.
    pub async fn list_all_matching(&self, params: &ProductListParams) -> Result<Vec<Product>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM products");
        push_product_filters(&mut qb, params);
        qb.push(" ORDER BY id");

        let products = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;
        Ok(products)
    }

    /// Sum of variant stock per product. Products without variants are absent.
    pub async fn stock_totals(&self, product_ids: &[i64]) -> Result<HashMap<i64, i64>, AppError> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT product_id, COALESCE(SUM(stock), 0)::BIGINT
            FROM product_variants
            WHERE product_id = ANY($1)
            GROUP BY product_id
            "#,
        )
        .bind(product_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    // =========================================================================
    //  PRODUCTS
    // =========================================================================

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn create<'e, E>(&self, executor: E, assignments: Assignments) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO products");
        assignments.push_insert(&mut qb);
        qb.push(" RETURNING *");

        qb.build_query_as::<Product>()
            .fetch_one(executor)
            .await
            .map_err(|e| classify_db_error(e, "Product"))
    }

    pub async fn update(&self, id: i64, assignments: Assignments) -> Result<Option<Product>, AppError> {
        if assignments.is_empty() {
            return self.find_by_id(id).await;
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE products SET ");
        assignments.push_set(&mut qb);
        qb.push(", updated_at = NOW() WHERE id = ")
            .push_bind(id)
            .push(" RETURNING *");

        qb.build_query_as::<Product>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify_db_error(e, "Product"))
    }

    pub async fn set_image(&self, id: i64, image_path: &str) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            "UPDATE products SET image_path = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(image_path)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    /// Variants go with the product (ON DELETE CASCADE).
    pub async fn delete(&self, id: i64) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>("DELETE FROM products WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify_db_error(e, "Product"))?;
        Ok(product)
    }

    // =========================================================================
    //  VARIANTS
    // =========================================================================

    pub async fn list_variants(&self, product_id: i64) -> Result<Vec<ProductVariant>, AppError> {
        let variants = sqlx::query_as::<_, ProductVariant>(
            "SELECT * FROM product_variants WHERE product_id = $1 ORDER BY id",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(variants)
    }

    pub async fn create_variant<'e, E>(
        &self,
        executor: E,
        product_id: i64,
        variant: &VariantPayload,
    ) -> Result<ProductVariant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, ProductVariant>(
            r#"
            INSERT INTO product_variants (product_id, size_id, sku, price, stock)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(variant.size_id)
        .bind(non_blank(variant.sku.as_deref()))
        .bind(variant.price)
        .bind(variant.stock)
        .fetch_one(executor)
        .await
        .map_err(|e| classify_db_error(e, "Variant"))?;
        Ok(row)
    }

    pub async fn update_variant(
        &self,
        id: i64,
        assignments: Assignments,
    ) -> Result<Option<ProductVariant>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE product_variants SET ");
        if !assignments.is_empty() {
            assignments.push_set(&mut qb);
            qb.push(", ");
        }
        qb.push("updated_at = NOW() WHERE id = ")
            .push_bind(id)
            .push(" RETURNING *");

        qb.build_query_as::<ProductVariant>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify_db_error(e, "Variant"))
    }

    pub async fn delete_variant(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM product_variants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify_db_error(e, "Variant"))?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::product::ProductSortField;

    #[test]
    fn stock_is_never_part_of_the_sql_filter() {
        let params = ProductListParams {
            search: Some("tee".into()),
            category_id: Some(4),
            stock: Some(0),
            sort_by: Some(ProductSortField::Stock),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM products");
        push_product_filters(&mut qb, &params);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM products WHERE 1 = 1 AND (name ILIKE $1 OR sku ILIKE $2) AND category_id = $3"
        );
    }
}

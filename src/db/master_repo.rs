// src/db/master_repo.rs

use std::marker::PhantomData;

use axum::extract::FromRef;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    common::{
        db_utils::classify_db_error,
        error::AppError,
        pagination::{ListParams, PageRequest},
    },
    config::AppState,
    models::master::MasterEntity,
};

/// CRUD over one flat master table. The table, searchable columns and
/// payload-to-column mapping come from the entity's `MasterEntity` impl.
pub struct MasterRepository<T> {
    pool: PgPool,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for MasterRepository<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: MasterEntity> FromRef<AppState> for MasterRepository<T> {
    fn from_ref(state: &AppState) -> Self {
        MasterRepository::new(state.db_pool.clone())
    }
}

fn push_filters<'a, T: MasterEntity>(
    qb: &mut QueryBuilder<'a, Postgres>,
    search: Option<&str>,
    active: Option<bool>,
) {
    qb.push(" WHERE 1 = 1");

    if let Some(term) = search {
        qb.push(" AND (");
        for (i, column) in T::SEARCH_COLUMNS.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(*column).push("::TEXT ILIKE ").push_bind(term.to_string());
        }
        qb.push(")");
    }

    if let Some(is_active) = active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
}

impl<T: MasterEntity> MasterRepository<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    pub async fn list(&self, params: &ListParams) -> Result<(Vec<T>, i64, PageRequest), AppError> {
        let req = params.page_request();
        let search = params.search_term();
        let active = params.active_filter();

        let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {}", T::TABLE));
        push_filters::<T>(&mut count, search.as_deref(), active);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT * FROM {}", T::TABLE));
        push_filters::<T>(&mut qb, search.as_deref(), active);
        qb.push(" ORDER BY id DESC LIMIT ")
            .push_bind(req.limit)
            .push(" OFFSET ")
            .push_bind(req.offset());

        let rows = qb.build_query_as::<T>().fetch_all(&self.pool).await?;
        Ok((rows, total, req))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<T>, AppError> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", T::TABLE);
        let row = sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn create(&self, payload: T::Create) -> Result<T, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("INSERT INTO {}", T::TABLE));
        T::insert_assignments(payload).push_insert(&mut qb);
        qb.push(" RETURNING *");

        qb.build_query_as::<T>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify_db_error(e, T::LABEL))
    }

    /// Only the fields present in the payload are written.
    pub async fn update(&self, id: i64, payload: T::Update) -> Result<Option<T>, AppError> {
        let assignments = T::update_assignments(payload);
        if assignments.is_empty() {
            return self.find_by_id(id).await;
        }

        let mut qb = QueryBuilder::<Postgres>::new(format!("UPDATE {} SET ", T::TABLE));
        assignments.push_set(&mut qb);
        qb.push(", updated_at = NOW() WHERE id = ")
            .push_bind(id)
            .push(" RETURNING *");

        qb.build_query_as::<T>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify_db_error(e, T::LABEL))
    }

    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", T::TABLE);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify_db_error(e, T::LABEL))?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::master::{Category, Unit};

    #[test]
    fn search_spans_every_searchable_column() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM categories");
        push_filters::<Category>(&mut qb, Some("%shirt%"), Some(true));
        assert_eq!(
            qb.sql(),
            "SELECT * FROM categories WHERE 1 = 1 AND (name::TEXT ILIKE $1 OR description::TEXT ILIKE $2) AND is_active = $3"
        );
    }

    #[test]
    fn no_filters_leaves_an_open_where() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM units");
        push_filters::<Unit>(&mut qb, None, None);
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM units WHERE 1 = 1");
    }
}

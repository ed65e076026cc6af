// src/db/menu_repo.rs

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    common::{
        db_utils::{classify_db_error, Assignments},
        error::AppError,
        pagination::{ListParams, PageRequest},
    },
    models::menu::Menu,
};

#[derive(Clone)]
pub struct MenuRepository {
    pool: PgPool,
}

fn push_menu_filters(qb: &mut QueryBuilder<'_, Postgres>, search: Option<&str>, active: Option<bool>) {
    qb.push(" WHERE 1 = 1");
    if let Some(term) = search {
        qb.push(" AND (name ILIKE ")
            .push_bind(term.to_string())
            .push(" OR path ILIKE ")
            .push_bind(term.to_string())
            .push(")");
    }
    if let Some(is_active) = active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
}

impl MenuRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, params: &ListParams) -> Result<(Vec<Menu>, i64, PageRequest), AppError> {
        let req = params.page_request();
        let search = params.search_term();
        let active = params.active_filter();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM menus");
        push_menu_filters(&mut count, search.as_deref(), active);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM menus");
        push_menu_filters(&mut qb, search.as_deref(), active);
        qb.push(" ORDER BY parent_id NULLS FIRST, sort_order, name LIMIT ")
            .push_bind(req.limit)
            .push(" OFFSET ")
            .push_bind(req.offset());

        let menus = qb.build_query_as::<Menu>().fetch_all(&self.pool).await?;
        Ok((menus, total, req))
    }

    pub async fn list_active(&self) -> Result<Vec<Menu>, AppError> {
        let menus = sqlx::query_as::<_, Menu>(
            "SELECT * FROM menus WHERE is_active = TRUE ORDER BY sort_order, name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(menus)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Menu>, AppError> {
        let menu = sqlx::query_as::<_, Menu>("SELECT * FROM menus WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(menu)
    }

    pub async fn create(&self, assignments: Assignments) -> Result<Menu, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO menus");
        assignments.push_insert(&mut qb);
        qb.push(" RETURNING *");

        qb.build_query_as::<Menu>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify_db_error(e, "Menu"))
    }

    pub async fn update(&self, id: i64, assignments: Assignments) -> Result<Option<Menu>, AppError> {
        if assignments.is_empty() {
            return self.find_by_id(id).await;
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE menus SET ");
        assignments.push_set(&mut qb);
        qb.push(", updated_at = NOW() WHERE id = ")
            .push_bind(id)
            .push(" RETURNING *");

        qb.build_query_as::<Menu>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify_db_error(e, "Menu"))
    }

    /// Fails with a constraint violation while the menu still has children.
    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify_db_error(e, "Menu"))?;
        Ok(result.rows_affected() > 0)
    }

    /// `(id, name)` for every menu, active or not. Used to resolve permission keys.
    pub async fn id_name_pairs(&self) -> Result<Vec<(i64, String)>, AppError> {
        let rows = sqlx::query_as::<_, (i64, String)>("SELECT id, name FROM menus")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// `(id, parent_id)` for every menu.
    pub async fn parent_links(&self) -> Result<Vec<(i64, Option<i64>)>, AppError> {
        let rows = sqlx::query_as::<_, (i64, Option<i64>)>("SELECT id, parent_id FROM menus")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn any_active_id(&self) -> Result<Option<i64>, AppError> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM menus WHERE is_active = TRUE ORDER BY id LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }
}

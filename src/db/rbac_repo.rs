// src/db/rbac_repo.rs

use sqlx::{types::Json, Executor, PgPool, Postgres, QueryBuilder};

use crate::{
    common::{
        db_utils::{classify_db_error, Assignments},
        error::AppError,
        pagination::{ListParams, PageRequest},
    },
    models::rbac::{PermissionMap, Role, RoleManagement},
};

const ROLE_COLUMNS: &str = "id, name, description, created_at, updated_at";

// Roles and their permission matrix. Soft-deleted roles are invisible to
// every read here.
#[derive(Clone)]
pub struct RbacRepository {
    pool: PgPool,
}

impl RbacRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  ROLES
    // =========================================================================

    pub async fn list_roles(&self, params: &ListParams) -> Result<(Vec<Role>, i64, PageRequest), AppError> {
        let req = params.page_request();
        let search = params.search_term();

        let mut count =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM roles WHERE deleted_at IS NULL");
        if let Some(term) = &search {
            count.push(" AND name ILIKE ").push_bind(term.clone());
        }
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM roles WHERE deleted_at IS NULL",
            ROLE_COLUMNS
        ));
        if let Some(term) = search {
            qb.push(" AND name ILIKE ").push_bind(term);
        }
        qb.push(" ORDER BY name LIMIT ")
            .push_bind(req.limit)
            .push(" OFFSET ")
            .push_bind(req.offset());

        let roles = qb.build_query_as::<Role>().fetch_all(&self.pool).await?;
        Ok((roles, total, req))
    }

    pub async fn find_role(&self, id: i64) -> Result<Option<Role>, AppError> {
        let sql = format!(
            "SELECT {} FROM roles WHERE id = $1 AND deleted_at IS NULL",
            ROLE_COLUMNS
        );
        let role = sqlx::query_as::<_, Role>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    pub async fn create_role(&self, name: &str, description: Option<&str>) -> Result<Role, AppError> {
        let sql = format!(
            "INSERT INTO roles (name, description) VALUES ($1, $2) RETURNING {}",
            ROLE_COLUMNS
        );
        sqlx::query_as::<_, Role>(&sql)
            .bind(name)
            .bind(description)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify_db_error(e, "Role"))
    }

    pub async fn update_role(&self, id: i64, assignments: Assignments) -> Result<Option<Role>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE roles SET ");
        if !assignments.is_empty() {
            assignments.push_set(&mut qb);
            qb.push(", ");
        }
        qb.push("updated_at = NOW() WHERE id = ")
            .push_bind(id)
            .push(" AND deleted_at IS NULL RETURNING ")
            .push(ROLE_COLUMNS);

        qb.build_query_as::<Role>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify_db_error(e, "Role"))
    }

    /// Soft-deletes the role together with its live user mappings.
    pub async fn soft_delete_role(&self, id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE roles SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE user_role_mappings SET deleted_at = NOW() WHERE role_id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    // =========================================================================
    //  PERMISSION MATRIX
    // =========================================================================

    pub async fn find_permissions(&self, role_id: i64) -> Result<Option<RoleManagement>, AppError> {
        let row = sqlx::query_as::<_, RoleManagement>(
            "SELECT * FROM role_managements WHERE role_id = $1",
        )
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Replaces the whole stored map. `placeholder_menu_id` is only used when
    /// the role has no row yet.
    pub async fn save_permissions<'e, E>(
        &self,
        executor: E,
        role_id: i64,
        placeholder_menu_id: i64,
        permissions: &PermissionMap,
    ) -> Result<RoleManagement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, RoleManagement>(
            r#"
            INSERT INTO role_managements (role_id, menu_id, permissions)
            VALUES ($1, $2, $3)
            ON CONFLICT (role_id) DO UPDATE
                SET permissions = EXCLUDED.permissions,
                    updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(role_id)
        .bind(placeholder_menu_id)
        .bind(Json(permissions))
        .fetch_one(executor)
        .await
        .map_err(|e| classify_db_error(e, "Role permissions"))?;
        Ok(row)
    }
}

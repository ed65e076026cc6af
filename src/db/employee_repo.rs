// src/db/employee_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};

use crate::{
    common::{
        db_utils::{classify_db_error, Assignments},
        error::AppError,
        pagination::{non_blank, PageRequest},
    },
    models::employee::{Employee, EmployeeListParams, EmployeeView},
};

const VIEW_SELECT: &str = r#"
    SELECT e.id, e.user_id, u.first_name, u.last_name, u.email, u.mobile,
           e.department_id, d.name AS department_name,
           e.designation_id, g.name AS designation_name,
           e.employee_code, e.joining_date, e.date_of_birth, e.salary,
           u.is_active, e.created_at
    FROM employees e
    JOIN users u ON u.id = e.user_id
    LEFT JOIN departments d ON d.id = e.department_id
    LEFT JOIN designations g ON g.id = e.designation_id
"#;

#[derive(Clone)]
pub struct EmployeeRepository {
    pool: PgPool,
}

fn push_employee_filters(qb: &mut QueryBuilder<'_, Postgres>, params: &EmployeeListParams) {
    qb.push(" WHERE 1 = 1");
    if let Some(term) = non_blank(params.search.as_deref()) {
        let like = format!("%{}%", term);
        qb.push(" AND (u.first_name ILIKE ")
            .push_bind(like.clone())
            .push(" OR u.last_name ILIKE ")
            .push_bind(like.clone())
            .push(" OR u.email ILIKE ")
            .push_bind(like.clone())
            .push(" OR e.employee_code ILIKE ")
            .push_bind(like)
            .push(")");
    }
    if let Some(department_id) = params.department_id {
        qb.push(" AND e.department_id = ").push_bind(department_id);
    }
    if let Some(designation_id) = params.designation_id {
        qb.push(" AND e.designation_id = ").push_bind(designation_id);
    }
}

impl EmployeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        user_id: i64,
        mut assignments: Assignments,
    ) -> Result<Employee, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        assignments.set("user_id", user_id);

        let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO employees");
        assignments.push_insert(&mut qb);
        qb.push(" RETURNING *");

        qb.build_query_as::<Employee>()
            .fetch_one(executor)
            .await
            .map_err(|e| classify_db_error(e, "Employee"))
    }

    pub async fn list(
        &self,
        params: &EmployeeListParams,
    ) -> Result<(Vec<EmployeeView>, i64, PageRequest), AppError> {
        let req = PageRequest::new(params.page, params.limit);

        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM employees e JOIN users u ON u.id = e.user_id",
        );
        push_employee_filters(&mut count, params);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(VIEW_SELECT);
        push_employee_filters(&mut qb, params);
        qb.push(" ORDER BY e.id DESC LIMIT ")
            .push_bind(req.limit)
            .push(" OFFSET ")
            .push_bind(req.offset());

        let rows = qb.build_query_as::<EmployeeView>().fetch_all(&self.pool).await?;
        Ok((rows, total, req))
    }

    pub async fn find_view(&self, id: i64) -> Result<Option<EmployeeView>, AppError> {
        let sql = format!("{} WHERE e.id = $1", VIEW_SELECT);
        let row = sqlx::query_as::<_, EmployeeView>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: i64) -> Result<Option<Employee>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: i64,
        assignments: Assignments,
    ) -> Result<Option<Employee>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE employees SET ");
        if !assignments.is_empty() {
            assignments.push_set(&mut qb);
            qb.push(", ");
        }
        qb.push("updated_at = NOW() WHERE id = ")
            .push_bind(id)
            .push(" RETURNING *");

        qb.build_query_as::<Employee>()
            .fetch_optional(executor)
            .await
            .map_err(|e| classify_db_error(e, "Employee"))
    }

    /// Removes the employee record and returns it. The user row stays.
    pub async fn delete<'e, E>(&self, executor: E, id: i64) -> Result<Option<Employee>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Employee>("DELETE FROM employees WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(|e| classify_db_error(e, "Employee"))?;
        Ok(row)
    }
}

// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};

use crate::{
    common::{
        db_utils::{classify_db_error, Assignments},
        error::AppError,
        pagination::{non_blank, PageRequest},
    },
    models::user::{
        AddressBlock, AddressType, AutocompleteParams, BankBlock, User, UserAddress,
        UserBankAccount, UserDocument, UserListParams, UserRole, UserRoleMapping, UserSuggestion,
    },
};

// Users and everything a user owns: addresses, bank accounts, documents and
// role mappings.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

fn push_user_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    search: Option<&str>,
    active: Option<bool>,
    role: Option<UserRole>,
) {
    qb.push(" WHERE 1 = 1");
    if let Some(term) = search {
        let like = format!("%{}%", term);
        qb.push(" AND (first_name ILIKE ")
            .push_bind(like.clone())
            .push(" OR last_name ILIKE ")
            .push_bind(like.clone())
            .push(" OR email ILIKE ")
            .push_bind(like.clone())
            .push(" OR mobile ILIKE ")
            .push_bind(like)
            .push(")");
    }
    if let Some(is_active) = active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
    if let Some(role) = role {
        qb.push(" AND ").push(role.column()).push(" = TRUE");
    }
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  USERS
    // =========================================================================

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn list(&self, params: &UserListParams) -> Result<(Vec<User>, i64, PageRequest), AppError> {
        let req = PageRequest::new(params.page, params.limit);
        let search = non_blank(params.search.as_deref());
        let active = match params.filter.as_deref().map(str::trim) {
            Some(f) if f.eq_ignore_ascii_case("active") => Some(true),
            Some(f) if f.eq_ignore_ascii_case("inactive") => Some(false),
            _ => None,
        };

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_user_filters(&mut count, search, active, params.role);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM users");
        push_user_filters(&mut qb, search, active, params.role);
        qb.push(" ORDER BY id DESC LIMIT ")
            .push_bind(req.limit)
            .push(" OFFSET ")
            .push_bind(req.offset());

        let users = qb.build_query_as::<User>().fetch_all(&self.pool).await?;
        Ok((users, total, req))
    }

    /// Lightweight lookup used by pickers: active users only, capped at 20.
    pub async fn autocomplete(&self, params: &AutocompleteParams) -> Result<Vec<UserSuggestion>, AppError> {
        let limit = params.limit.filter(|l| *l > 0).unwrap_or(10).min(20);

        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT id, first_name || ' ' || last_name AS name, email, mobile FROM users",
        );
        push_user_filters(&mut qb, non_blank(params.q.as_deref()), Some(true), params.role);
        qb.push(" ORDER BY first_name, last_name LIMIT ").push_bind(limit);

        let rows = qb.build_query_as::<UserSuggestion>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    // `assignments` must already carry `password_hash`.
    pub async fn create_user<'e, E>(&self, executor: E, assignments: Assignments) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO users");
        assignments.push_insert(&mut qb);
        qb.push(" RETURNING *");

        qb.build_query_as::<User>()
            .fetch_one(executor)
            .await
            .map_err(|e| classify_db_error(e, "User"))
    }

    pub async fn update_user<'e, E>(
        &self,
        executor: E,
        id: i64,
        assignments: Assignments,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        if !assignments.is_empty() {
            assignments.push_set(&mut qb);
            qb.push(", ");
        }
        qb.push("updated_at = NOW() WHERE id = ")
            .push_bind(id)
            .push(" RETURNING *");

        qb.build_query_as::<User>()
            .fetch_optional(executor)
            .await
            .map_err(|e| classify_db_error(e, "User"))
    }

    pub async fn delete_user(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify_db_error(e, "User"))?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  ADDRESSES
    // =========================================================================

    pub async fn list_addresses(&self, user_id: i64) -> Result<Vec<UserAddress>, AppError> {
        let rows = sqlx::query_as::<_, UserAddress>(
            "SELECT * FROM user_addresses WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create_address<'e, E>(
        &self,
        executor: E,
        user_id: i64,
        address_type: AddressType,
        address: &AddressBlock,
    ) -> Result<UserAddress, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, UserAddress>(
            r#"
            INSERT INTO user_addresses (user_id, address_type, line1, line2, city, state, country, pincode)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(address_type)
        .bind(non_blank(address.line1.as_deref()))
        .bind(non_blank(address.line2.as_deref()))
        .bind(non_blank(address.city.as_deref()))
        .bind(non_blank(address.state.as_deref()))
        .bind(non_blank(address.country.as_deref()))
        .bind(non_blank(address.pincode.as_deref()))
        .fetch_one(executor)
        .await
        .map_err(|e| classify_db_error(e, "Address"))?;
        Ok(row)
    }

    pub async fn delete_address(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM user_addresses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  BANK ACCOUNTS
    // =========================================================================

    pub async fn list_bank_accounts(&self, user_id: i64) -> Result<Vec<UserBankAccount>, AppError> {
        let rows = sqlx::query_as::<_, UserBankAccount>(
            "SELECT * FROM user_bank_accounts WHERE user_id = $1 ORDER BY is_primary DESC, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create_bank_account<'e, E>(
        &self,
        executor: E,
        user_id: i64,
        bank: &BankBlock,
        is_primary: bool,
    ) -> Result<UserBankAccount, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, UserBankAccount>(
            r#"
            INSERT INTO user_bank_accounts (user_id, bank_name, account_holder, account_number, ifsc_code, branch, is_primary)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(non_blank(bank.bank_name.as_deref()))
        .bind(non_blank(bank.account_holder.as_deref()))
        .bind(non_blank(bank.account_number.as_deref()))
        .bind(non_blank(bank.ifsc_code.as_deref()).map(str::to_uppercase))
        .bind(non_blank(bank.branch.as_deref()))
        .bind(is_primary)
        .fetch_one(executor)
        .await
        .map_err(|e| classify_db_error(e, "Bank account"))?;
        Ok(row)
    }

    pub async fn delete_bank_account(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM user_bank_accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  DOCUMENTS
    // =========================================================================

    pub async fn list_documents(&self, user_id: i64) -> Result<Vec<UserDocument>, AppError> {
        let rows = sqlx::query_as::<_, UserDocument>(
            "SELECT * FROM user_documents WHERE user_id = $1 ORDER BY uploaded_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create_document(
        &self,
        user_id: i64,
        document_type: &str,
        file_name: &str,
        file_path: &str,
    ) -> Result<UserDocument, AppError> {
        let row = sqlx::query_as::<_, UserDocument>(
            r#"
            INSERT INTO user_documents (user_id, document_type, file_name, file_path)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(document_type)
        .bind(file_name)
        .bind(file_path)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify_db_error(e, "Document"))?;
        Ok(row)
    }

    /// Returns the deleted row so the caller can remove the file.
    pub async fn delete_document(&self, id: i64) -> Result<Option<UserDocument>, AppError> {
        let row = sqlx::query_as::<_, UserDocument>("DELETE FROM user_documents WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    // =========================================================================
    //  ROLE MAPPINGS (soft delete)
    // =========================================================================

    pub async fn list_roles(&self, user_id: i64) -> Result<Vec<UserRoleMapping>, AppError> {
        let rows = sqlx::query_as::<_, UserRoleMapping>(
            r#"
            SELECT m.id, m.user_id, m.role_id, r.name AS role_name, m.created_at
            FROM user_role_mappings m
            JOIN roles r ON r.id = m.role_id
            WHERE m.user_id = $1
              AND m.deleted_at IS NULL
              AND r.deleted_at IS NULL
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn assign_role(&self, user_id: i64, role_id: i64) -> Result<UserRoleMapping, AppError> {
        let row = sqlx::query_as::<_, UserRoleMapping>(
            r#"
            WITH inserted AS (
                INSERT INTO user_role_mappings (user_id, role_id)
                VALUES ($1, $2)
                RETURNING id, user_id, role_id, created_at
            )
            SELECT i.id, i.user_id, i.role_id, r.name AS role_name, i.created_at
            FROM inserted i
            JOIN roles r ON r.id = i.role_id
            "#,
        )
        .bind(user_id)
        .bind(role_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify_db_error(e, "Role assignment"))?;
        Ok(row)
    }

    pub async fn revoke_role(&self, user_id: i64, role_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE user_role_mappings
            SET deleted_at = NOW()
            WHERE user_id = $1 AND role_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_combine_search_status_and_role() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_user_filters(&mut qb, Some("rao"), Some(true), Some(UserRole::Customer));
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM users WHERE 1 = 1 AND (first_name ILIKE $1 OR last_name ILIKE $2 \
             OR email ILIKE $3 OR mobile ILIKE $4) AND is_active = $5 AND is_customer = TRUE"
        );
    }
}

// src/common/db_utils.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{query_builder::Separated, Postgres, QueryBuilder};

use crate::common::error::AppError;

// ---
// Database error classification
// ---

/// Turns a driver error into something the client can act on.
/// Unique violations become 409, foreign key / check violations become 400,
/// everything else keeps its raw message (500).
pub fn classify_db_error(err: sqlx::Error, entity: &str) -> AppError {
    if let Some(db_err) = err.as_database_error() {
        let message = db_err.message().to_string();
        let constraint = db_err.constraint().unwrap_or_default().to_string();

        if db_err.is_unique_violation() || message.to_lowercase().contains("unique") {
            return AppError::Conflict(unique_violation_message(
                &format!("{} {}", message, constraint),
                entity,
            ));
        }
        if db_err.is_foreign_key_violation() {
            return AppError::ConstraintViolation(foreign_key_message(&message, entity));
        }
        if db_err.is_check_violation() {
            return AppError::ConstraintViolation(format!("{} has an out-of-range value", entity));
        }
    }
    err.into()
}

pub(crate) fn unique_violation_message(raw: &str, entity: &str) -> String {
    let raw = raw.to_lowercase();
    if raw.contains("email") {
        "email already exists".to_string()
    } else if raw.contains("mobile") {
        "mobile already exists".to_string()
    } else if raw.contains("sku") {
        format!("{} with this SKU already exists", entity)
    } else {
        format!("{} already exists", entity)
    }
}

pub(crate) fn foreign_key_message(raw: &str, entity: &str) -> String {
    if raw.to_lowercase().starts_with("update or delete") {
        format!("{} is still in use by other records", entity)
    } else {
        format!("{} references a record that does not exist", entity)
    }
}

// ---
// Partial writes
// ---

/// A bindable value for dynamically built INSERT/UPDATE statements.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    BigInt(i64),
    /// Clears a nullable BIGINT column.
    NullBigInt,
    Int(i32),
    Bool(bool),
    Decimal(Decimal),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}
impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}
impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::BigInt(v)
    }
}
impl From<Option<i64>> for SqlValue {
    fn from(v: Option<i64>) -> Self {
        v.map_or(SqlValue::NullBigInt, SqlValue::BigInt)
    }
}
impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v)
    }
}
impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}
impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}
impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}
impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl SqlValue {
    fn bind_into(self, sep: &mut Separated<'_, '_, Postgres, &'static str>) {
        match self {
            SqlValue::Text(v) => sep.push_bind_unseparated(v),
            SqlValue::BigInt(v) => sep.push_bind_unseparated(v),
            SqlValue::NullBigInt => sep.push_bind_unseparated(None::<i64>),
            SqlValue::Int(v) => sep.push_bind_unseparated(v),
            SqlValue::Bool(v) => sep.push_bind_unseparated(v),
            SqlValue::Decimal(v) => sep.push_bind_unseparated(v),
            SqlValue::Date(v) => sep.push_bind_unseparated(v),
            SqlValue::Timestamp(v) => sep.push_bind_unseparated(v),
        };
    }
}

/// Column/value pairs collected from a payload. Absent fields are never added,
/// so an UPDATE built from it leaves them untouched.
#[derive(Debug, Default, Clone)]
pub struct Assignments(Vec<(&'static str, SqlValue)>);

impl Assignments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Setting a column twice keeps its first position and the last value.
    pub fn set(&mut self, column: &'static str, value: impl Into<SqlValue>) -> &mut Self {
        let value = value.into();
        match self.0.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.0.push((column, value)),
        }
        self
    }

    pub fn set_opt<V: Into<SqlValue>>(&mut self, column: &'static str, value: Option<V>) -> &mut Self {
        if let Some(v) = value {
            self.set(column, v);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn columns(&self) -> Vec<&'static str> {
        self.0.iter().map(|(c, _)| *c).collect()
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.0.iter().find(|(c, _)| *c == column).map(|(_, v)| v)
    }

    /// Appends `col = $n, col2 = $m` (no leading SET).
    pub fn push_set(self, qb: &mut QueryBuilder<'_, Postgres>) {
        let mut sep = qb.separated(", ");
        for (column, value) in self.0 {
            sep.push(column);
            sep.push_unseparated(" = ");
            value.bind_into(&mut sep);
        }
    }

    /// Appends `(col, col2) VALUES ($1, $2)`.
    pub fn push_insert(self, qb: &mut QueryBuilder<'_, Postgres>) {
        let columns = self.columns().join(", ");
        qb.push(" (").push(columns).push(") VALUES (");
        let mut sep = qb.separated(", ");
        for (_, value) in self.0 {
            sep.push("");
            value.bind_into(&mut sep);
        }
        qb.push(")");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_messages_mention_the_offending_field() {
        let raw = "duplicate key value violates unique constraint \"users_email_key\"";
        assert_eq!(unique_violation_message(raw, "User"), "email already exists");

        let raw = "duplicate key value violates unique constraint \"users_mobile_key\"";
        assert_eq!(unique_violation_message(raw, "User"), "mobile already exists");

        let raw = "duplicate key value violates unique constraint \"categories_name_key\"";
        assert_eq!(unique_violation_message(raw, "Category"), "Category already exists");
    }

    #[test]
    fn foreign_key_messages_distinguish_delete_from_insert() {
        let delete = "update or delete on table \"units\" violates foreign key constraint";
        assert_eq!(foreign_key_message(delete, "Unit"), "Unit is still in use by other records");

        let insert = "insert or update on table \"products\" violates foreign key constraint";
        assert_eq!(
            foreign_key_message(insert, "Product"),
            "Product references a record that does not exist"
        );
    }

    #[test]
    fn absent_fields_are_not_assigned() {
        let mut a = Assignments::new();
        a.set_opt("name", Some("Shirts"))
            .set_opt::<String>("description", None)
            .set_opt("is_active", Some(false));

        assert_eq!(a.columns(), vec!["name", "is_active"]);
        assert_eq!(a.get("is_active"), Some(&SqlValue::Bool(false)));
    }

    #[test]
    fn explicit_nulls_are_assigned() {
        let mut a = Assignments::new();
        a.set_opt("parent_id", Some(None::<i64>))
            .set_opt("department_id", None::<Option<i64>>);

        assert_eq!(a.columns(), vec!["parent_id"]);
        assert_eq!(a.get("parent_id"), Some(&SqlValue::NullBigInt));
    }

    #[test]
    fn setting_a_column_again_overwrites_it() {
        let mut a = Assignments::new();
        a.set("is_employee", false).set("email", "a@b.c").set("is_employee", true);

        assert_eq!(a.columns(), vec!["is_employee", "email"]);
        assert_eq!(a.get("is_employee"), Some(&SqlValue::Bool(true)));
    }

    #[test]
    fn update_sql_uses_one_placeholder_per_field() {
        let mut a = Assignments::new();
        a.set("name", "Kg").set("symbol", "kg");

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE units SET ");
        a.push_set(&mut qb);
        qb.push(" WHERE id = ").push_bind(1_i64);

        assert_eq!(qb.sql(), "UPDATE units SET name = $1, symbol = $2 WHERE id = $3");
    }

    #[test]
    fn insert_sql_lists_columns_in_order() {
        let mut a = Assignments::new();
        a.set("name", "GST 18").set("rate", Decimal::new(18, 0));

        let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO taxes");
        a.push_insert(&mut qb);

        assert_eq!(qb.sql(), "INSERT INTO taxes (name, rate) VALUES ($1, $2)");
    }
}

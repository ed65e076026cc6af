// src/models/master.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow};
use validator::{Validate, ValidationError};

use crate::common::db_utils::Assignments;

/// A flat master-data table served by the generic CRUD handlers.
/// Every implementor has `id`, `is_active`, `created_at` and `updated_at` columns.
pub trait MasterEntity:
    for<'r> FromRow<'r, PgRow> + Serialize + Send + Sync + Unpin + 'static
{
    const TABLE: &'static str;
    const LABEL: &'static str;
    const SEARCH_COLUMNS: &'static [&'static str];

    type Create: DeserializeOwned + Validate + Send + 'static;
    type Update: DeserializeOwned + Validate + Send + 'static;

    fn insert_assignments(payload: Self::Create) -> Assignments;
    fn update_assignments(payload: Self::Update) -> Assignments;
}

pub(crate) fn validate_percentage(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() || *val > Decimal::ONE_HUNDRED {
        let mut err = ValidationError::new("range");
        err.message = Some("Must be between 0 and 100.".into());
        return Err(err);
    }
    Ok(())
}

// --- Categories ---

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategory {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategory {
    #[validate(length(min = 1, message = "Name cannot be empty."))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

impl MasterEntity for Category {
    const TABLE: &'static str = "categories";
    const LABEL: &'static str = "Category";
    const SEARCH_COLUMNS: &'static [&'static str] = &["name", "description"];
    type Create = CreateCategory;
    type Update = UpdateCategory;

    fn insert_assignments(p: CreateCategory) -> Assignments {
        let mut a = Assignments::new();
        a.set("name", p.name)
            .set_opt("description", p.description)
            .set_opt("is_active", p.is_active);
        a
    }

    fn update_assignments(p: UpdateCategory) -> Assignments {
        let mut a = Assignments::new();
        a.set_opt("name", p.name)
            .set_opt("description", p.description)
            .set_opt("is_active", p.is_active);
        a
    }
}

// --- Units ---

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Unit {
    pub id: i64,
    pub name: String,
    pub symbol: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUnit {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
    #[validate(length(min = 1, message = "Symbol is required."))]
    pub symbol: String,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUnit {
    #[validate(length(min = 1, message = "Name cannot be empty."))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "Symbol cannot be empty."))]
    pub symbol: Option<String>,
    pub is_active: Option<bool>,
}

impl MasterEntity for Unit {
    const TABLE: &'static str = "units";
    const LABEL: &'static str = "Unit";
    const SEARCH_COLUMNS: &'static [&'static str] = &["name", "symbol"];
    type Create = CreateUnit;
    type Update = UpdateUnit;

    fn insert_assignments(p: CreateUnit) -> Assignments {
        let mut a = Assignments::new();
        a.set("name", p.name)
            .set("symbol", p.symbol)
            .set_opt("is_active", p.is_active);
        a
    }

    fn update_assignments(p: UpdateUnit) -> Assignments {
        let mut a = Assignments::new();
        a.set_opt("name", p.name)
            .set_opt("symbol", p.symbol)
            .set_opt("is_active", p.is_active);
        a
    }
}

// --- Taxes ---

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Tax {
    pub id: i64,
    pub name: String,
    pub rate: Decimal,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTax {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
    #[validate(custom(function = "validate_percentage"))]
    pub rate: Decimal,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTax {
    #[validate(length(min = 1, message = "Name cannot be empty."))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_percentage"))]
    pub rate: Option<Decimal>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

impl MasterEntity for Tax {
    const TABLE: &'static str = "taxes";
    const LABEL: &'static str = "Tax";
    const SEARCH_COLUMNS: &'static [&'static str] = &["name", "description"];
    type Create = CreateTax;
    type Update = UpdateTax;

    fn insert_assignments(p: CreateTax) -> Assignments {
        let mut a = Assignments::new();
        a.set("name", p.name)
            .set("rate", p.rate)
            .set_opt("description", p.description)
            .set_opt("is_active", p.is_active);
        a
    }

    fn update_assignments(p: UpdateTax) -> Assignments {
        let mut a = Assignments::new();
        a.set_opt("name", p.name)
            .set_opt("rate", p.rate)
            .set_opt("description", p.description)
            .set_opt("is_active", p.is_active);
        a
    }
}

// --- Stores ---

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Store {
    pub id: i64,
    pub name: String,
    pub code: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStore {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
    pub code: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStore {
    #[validate(length(min = 1, message = "Name cannot be empty."))]
    pub name: Option<String>,
    pub code: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

impl MasterEntity for Store {
    const TABLE: &'static str = "stores";
    const LABEL: &'static str = "Store";
    const SEARCH_COLUMNS: &'static [&'static str] = &["name", "code", "city"];
    type Create = CreateStore;
    type Update = UpdateStore;

    fn insert_assignments(p: CreateStore) -> Assignments {
        let mut a = Assignments::new();
        a.set("name", p.name)
            .set_opt("code", p.code)
            .set_opt("address", p.address)
            .set_opt("city", p.city)
            .set_opt("state", p.state)
            .set_opt("phone", p.phone)
            .set_opt("is_active", p.is_active);
        a
    }

    fn update_assignments(p: UpdateStore) -> Assignments {
        let mut a = Assignments::new();
        a.set_opt("name", p.name)
            .set_opt("code", p.code)
            .set_opt("address", p.address)
            .set_opt("city", p.city)
            .set_opt("state", p.state)
            .set_opt("phone", p.phone)
            .set_opt("is_active", p.is_active);
        a
    }
}

// --- Sizes ---

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Size {
    pub id: i64,
    pub name: String,
    pub code: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSize {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
    pub code: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSize {
    #[validate(length(min = 1, message = "Name cannot be empty."))]
    pub name: Option<String>,
    pub code: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl MasterEntity for Size {
    const TABLE: &'static str = "sizes";
    const LABEL: &'static str = "Size";
    const SEARCH_COLUMNS: &'static [&'static str] = &["name", "code"];
    type Create = CreateSize;
    type Update = UpdateSize;

    fn insert_assignments(p: CreateSize) -> Assignments {
        let mut a = Assignments::new();
        a.set("name", p.name)
            .set_opt("code", p.code)
            .set_opt("sort_order", p.sort_order)
            .set_opt("is_active", p.is_active);
        a
    }

    fn update_assignments(p: UpdateSize) -> Assignments {
        let mut a = Assignments::new();
        a.set_opt("name", p.name)
            .set_opt("code", p.code)
            .set_opt("sort_order", p.sort_order)
            .set_opt("is_active", p.is_active);
        a
    }
}

// --- HSN codes ---

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct HsnCode {
    pub id: i64,
    pub code: String,
    pub description: Option<String>,
    pub gst_rate: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateHsnCode {
    #[validate(length(min = 2, max = 8, message = "HSN code must have 2 to 8 characters."))]
    pub code: String,
    pub description: Option<String>,
    #[validate(custom(function = "validate_percentage"))]
    #[serde(default)]
    pub gst_rate: Decimal,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateHsnCode {
    #[validate(length(min = 2, max = 8, message = "HSN code must have 2 to 8 characters."))]
    pub code: Option<String>,
    pub description: Option<String>,
    #[validate(custom(function = "validate_percentage"))]
    pub gst_rate: Option<Decimal>,
    pub is_active: Option<bool>,
}

impl MasterEntity for HsnCode {
    const TABLE: &'static str = "hsn_codes";
    const LABEL: &'static str = "HSN code";
    const SEARCH_COLUMNS: &'static [&'static str] = &["code", "description"];
    type Create = CreateHsnCode;
    type Update = UpdateHsnCode;

    fn insert_assignments(p: CreateHsnCode) -> Assignments {
        let mut a = Assignments::new();
        a.set("code", p.code)
            .set_opt("description", p.description)
            .set("gst_rate", p.gst_rate)
            .set_opt("is_active", p.is_active);
        a
    }

    fn update_assignments(p: UpdateHsnCode) -> Assignments {
        let mut a = Assignments::new();
        a.set_opt("code", p.code)
            .set_opt("description", p.description)
            .set_opt("gst_rate", p.gst_rate)
            .set_opt("is_active", p.is_active);
        a
    }
}

// --- Departments ---

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDepartment {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDepartment {
    #[validate(length(min = 1, message = "Name cannot be empty."))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

impl MasterEntity for Department {
    const TABLE: &'static str = "departments";
    const LABEL: &'static str = "Department";
    const SEARCH_COLUMNS: &'static [&'static str] = &["name", "description"];
    type Create = CreateDepartment;
    type Update = UpdateDepartment;

    fn insert_assignments(p: CreateDepartment) -> Assignments {
        let mut a = Assignments::new();
        a.set("name", p.name)
            .set_opt("description", p.description)
            .set_opt("is_active", p.is_active);
        a
    }

    fn update_assignments(p: UpdateDepartment) -> Assignments {
        let mut a = Assignments::new();
        a.set_opt("name", p.name)
            .set_opt("description", p.description)
            .set_opt("is_active", p.is_active);
        a
    }
}

// --- Designations ---

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Designation {
    pub id: i64,
    pub name: String,
    pub department_id: Option<i64>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDesignation {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
    pub department_id: Option<i64>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDesignation {
    #[validate(length(min = 1, message = "Name cannot be empty."))]
    pub name: Option<String>,
    pub department_id: Option<i64>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

impl MasterEntity for Designation {
    const TABLE: &'static str = "designations";
    const LABEL: &'static str = "Designation";
    const SEARCH_COLUMNS: &'static [&'static str] = &["name", "description"];
    type Create = CreateDesignation;
    type Update = UpdateDesignation;

    fn insert_assignments(p: CreateDesignation) -> Assignments {
        let mut a = Assignments::new();
        a.set("name", p.name)
            .set_opt("department_id", p.department_id)
            .set_opt("description", p.description)
            .set_opt("is_active", p.is_active);
        a
    }

    fn update_assignments(p: UpdateDesignation) -> Assignments {
        let mut a = Assignments::new();
        a.set_opt("name", p.name)
            .set_opt("department_id", p.department_id)
            .set_opt("description", p.description)
            .set_opt("is_active", p.is_active);
        a
    }
}

// --- Companies ---

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub gstin: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCompany {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
    #[validate(length(equal = 15, message = "GSTIN must have 15 characters."))]
    pub gstin: Option<String>,
    #[validate(email(message = "Invalid e-mail."))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCompany {
    #[validate(length(min = 1, message = "Name cannot be empty."))]
    pub name: Option<String>,
    #[validate(length(equal = 15, message = "GSTIN must have 15 characters."))]
    pub gstin: Option<String>,
    #[validate(email(message = "Invalid e-mail."))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

impl MasterEntity for Company {
    const TABLE: &'static str = "companies";
    const LABEL: &'static str = "Company";
    const SEARCH_COLUMNS: &'static [&'static str] = &["name", "gstin", "email"];
    type Create = CreateCompany;
    type Update = UpdateCompany;

    fn insert_assignments(p: CreateCompany) -> Assignments {
        let mut a = Assignments::new();
        a.set("name", p.name)
            .set_opt("gstin", p.gstin)
            .set_opt("email", p.email)
            .set_opt("phone", p.phone)
            .set_opt("address", p.address)
            .set_opt("is_active", p.is_active);
        a
    }

    fn update_assignments(p: UpdateCompany) -> Assignments {
        let mut a = Assignments::new();
        a.set_opt("name", p.name)
            .set_opt("gstin", p.gstin)
            .set_opt("email", p.email)
            .set_opt("phone", p.phone)
            .set_opt("address", p.address)
            .set_opt("is_active", p.is_active);
        a
    }
}

// --- Company branches ---

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CompanyBranch {
    pub id: i64,
    pub company_id: i64,
    pub name: String,
    pub code: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCompanyBranch {
    pub company_id: i64,
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
    pub code: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCompanyBranch {
    pub company_id: Option<i64>,
    #[validate(length(min = 1, message = "Name cannot be empty."))]
    pub name: Option<String>,
    pub code: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub is_active: Option<bool>,
}

impl MasterEntity for CompanyBranch {
    const TABLE: &'static str = "company_branches";
    const LABEL: &'static str = "Company branch";
    const SEARCH_COLUMNS: &'static [&'static str] = &["name", "code", "city"];
    type Create = CreateCompanyBranch;
    type Update = UpdateCompanyBranch;

    fn insert_assignments(p: CreateCompanyBranch) -> Assignments {
        let mut a = Assignments::new();
        a.set("company_id", p.company_id)
            .set("name", p.name)
            .set_opt("code", p.code)
            .set_opt("address", p.address)
            .set_opt("city", p.city)
            .set_opt("state", p.state)
            .set_opt("is_active", p.is_active);
        a
    }

    fn update_assignments(p: UpdateCompanyBranch) -> Assignments {
        let mut a = Assignments::new();
        a.set_opt("company_id", p.company_id)
            .set_opt("name", p.name)
            .set_opt("code", p.code)
            .set_opt("address", p.address)
            .set_opt("city", p.city)
            .set_opt("state", p.state)
            .set_opt("is_active", p.is_active);
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_only_touches_sent_fields() {
        let payload: UpdateTax = serde_json::from_str(r#"{"rate": 12.5}"#).unwrap();
        let a = Tax::update_assignments(payload);
        assert_eq!(a.columns(), vec!["rate"]);
    }

    #[test]
    fn percentage_bounds() {
        assert!(validate_percentage(&Decimal::new(18, 0)).is_ok());
        assert!(validate_percentage(&Decimal::new(101, 0)).is_err());
        assert!(validate_percentage(&Decimal::new(-1, 0)).is_err());
    }

    #[test]
    fn create_requires_a_name() {
        let payload: CreateCategory = serde_json::from_str(r#"{"name": ""}"#).unwrap();
        assert!(payload.validate().is_err());
    }
}

// src/models/employee.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::{error::AppError, validation::validate_not_blank},
    models::user::{AddressBlock, BankBlock, RoleFlags, User, UserAddress, UserBankAccount},
};

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Employee {
    pub id: i64,
    pub user_id: i64,
    pub department_id: Option<i64>,
    pub designation_id: Option<i64>,
    pub employee_code: Option<String>,
    pub joining_date: Option<NaiveDate>,
    pub date_of_birth: Option<NaiveDate>,
    pub salary: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Row used by the list/detail endpoints (employee joined with its user).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EmployeeView {
    pub id: i64,
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile: String,
    pub department_id: Option<i64>,
    pub department_name: Option<String>,
    pub designation_id: Option<i64>,
    pub designation_name: Option<String>,
    pub employee_code: Option<String>,
    pub joining_date: Option<NaiveDate>,
    pub date_of_birth: Option<NaiveDate>,
    pub salary: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct EmployeeListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub department_id: Option<i64>,
    pub designation_id: Option<i64>,
}

/// Employee-as-user form: the user, the employee record and optional
/// address / bank blocks, created together or not at all.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEmployeePayload {
    #[validate(custom(function = "validate_not_blank", message = "First name is required."))]
    pub first_name: String,
    #[validate(custom(function = "validate_not_blank", message = "Last name is required."))]
    pub last_name: String,
    #[validate(email(message = "The e-mail provided is invalid."))]
    pub email: String,
    #[validate(length(min = 10, max = 15, message = "Mobile must have 10 to 15 digits."))]
    pub mobile: String,
    #[validate(length(min = 6, message = "The password must have at least 6 characters."))]
    pub password: String,
    #[serde(flatten)]
    pub roles: RoleFlags,

    pub department_id: Option<i64>,
    pub designation_id: Option<i64>,
    pub employee_code: Option<String>,
    /// `YYYY-MM-DD`
    #[schema(example = "2024-04-01")]
    pub joining_date: Option<String>,
    /// `YYYY-MM-DD`
    #[schema(example = "1994-09-12")]
    pub date_of_birth: Option<String>,
    pub salary: Option<Decimal>,

    #[validate(nested)]
    pub permanent_address: Option<AddressBlock>,
    #[validate(nested)]
    pub residential_address: Option<AddressBlock>,
    #[validate(nested)]
    pub bank_account: Option<BankBlock>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateEmployeePayload {
    pub department_id: Option<i64>,
    pub designation_id: Option<i64>,
    pub employee_code: Option<String>,
    pub joining_date: Option<String>,
    pub date_of_birth: Option<String>,
    pub salary: Option<Decimal>,

    #[validate(custom(function = "validate_not_blank", message = "First name cannot be empty."))]
    pub first_name: Option<String>,
    #[validate(custom(function = "validate_not_blank", message = "Last name cannot be empty."))]
    pub last_name: Option<String>,
    #[validate(length(min = 10, max = 15, message = "Mobile must have 10 to 15 digits."))]
    pub mobile: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EmployeeCreated {
    pub user: User,
    pub employee: Employee,
    pub addresses: Vec<UserAddress>,
    pub bank_accounts: Vec<UserBankAccount>,
}

/// Parses an optional `YYYY-MM-DD` form value. Blank means absent.
pub fn parse_form_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                AppError::invalid_field(
                    field,
                    format!("'{}' is not a valid date, expected YYYY-MM-DD", raw),
                )
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_dates_and_ignores_blanks() {
        assert_eq!(
            parse_form_date("joining_date", Some("2024-04-01")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 1)
        );
        assert_eq!(parse_form_date("joining_date", Some("  ")).unwrap(), None);
        assert_eq!(parse_form_date("joining_date", None).unwrap(), None);
    }

    #[test]
    fn bad_dates_point_at_the_field() {
        match parse_form_date("date_of_birth", Some("12/09/1994")) {
            Err(AppError::InvalidField { field, .. }) => assert_eq!(field, "date_of_birth"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn missing_required_fields_fail_validation() {
        let payload: CreateEmployeePayload = serde_json::from_value(serde_json::json!({
            "first_name": "",
            "last_name": "Rao",
            "email": "not-an-email",
            "mobile": "9876543210",
            "password": "secret1"
        }))
        .unwrap();

        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("first_name"));
        assert!(fields.contains_key("email"));
        assert!(!fields.contains_key("mobile"));
    }

    #[test]
    fn whitespace_names_fail_validation() {
        let payload: CreateEmployeePayload = serde_json::from_value(serde_json::json!({
            "first_name": "   ",
            "last_name": "\t",
            "email": "asha@example.com",
            "mobile": "9876543210",
            "password": "secret1"
        }))
        .unwrap();

        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("first_name"));
        assert!(fields.contains_key("last_name"));
        assert_eq!(
            fields["first_name"][0].message.as_deref(),
            Some("First name is required.")
        );

        let update: UpdateEmployeePayload =
            serde_json::from_value(serde_json::json!({ "first_name": "  " })).unwrap();
        assert!(update.validate().is_err());
    }
}

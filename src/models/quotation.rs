// src/models/quotation.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::common::db_utils::Assignments;

/// Upper bound of `NUMERIC(14, 2)` money columns (exclusive).
pub const MAX_MONEY: i64 = 1_000_000_000_000;
/// Upper bound of the `NUMERIC(14, 3)` quantity column (exclusive).
pub const MAX_QUANTITY: i64 = 100_000_000_000;

fn range_error(message: &'static str) -> ValidationError {
    let mut err = ValidationError::new("range");
    err.message = Some(message.into());
    err
}

fn validate_quantity(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        return Err(range_error("The value cannot be negative."));
    }
    if *val >= Decimal::from(MAX_QUANTITY) {
        return Err(range_error("Quantity is too large."));
    }
    Ok(())
}

fn validate_money(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        return Err(range_error("The value cannot be negative."));
    }
    if *val >= Decimal::from(MAX_MONEY) {
        return Err(range_error("The amount is too large."));
    }
    Ok(())
}

fn validate_tax_rate(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() || *val > Decimal::ONE_HUNDRED {
        return Err(range_error("Tax rate must be between 0 and 100."));
    }
    Ok(())
}

// --- Series ---

/// Document numbering scheme: `prefix + zero-padded number + postfix`.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Series {
    pub id: i64,
    pub name: String,
    pub prefix: String,
    pub postfix: String,
    pub next_number: i64,
    pub padding: i32,
    pub company_id: Option<i64>,
    pub company_branch_id: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Series {
    pub fn format_number(&self, number: i64) -> String {
        format_document_number(&self.prefix, number, self.padding, &self.postfix)
    }
}

pub fn format_document_number(prefix: &str, number: i64, padding: i32, postfix: &str) -> String {
    let width = padding.max(0) as usize;
    format!("{}{:0width$}{}", prefix, number, postfix, width = width)
}

#[derive(Debug, Deserialize)]
pub struct SeriesListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub company_id: Option<i64>,
    pub company_branch_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSeriesPayload {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub postfix: String,
    #[validate(range(min = 1, message = "Next number must be at least 1."))]
    pub next_number: Option<i64>,
    #[validate(range(min = 0, max = 12, message = "Padding must be between 0 and 12."))]
    pub padding: Option<i32>,
    pub company_id: Option<i64>,
    pub company_branch_id: Option<i64>,
    pub is_active: Option<bool>,
}

impl CreateSeriesPayload {
    pub fn assignments(self) -> Assignments {
        let mut a = Assignments::new();
        a.set("name", self.name)
            .set("prefix", self.prefix)
            .set("postfix", self.postfix)
            .set_opt("next_number", self.next_number)
            .set_opt("padding", self.padding)
            .set_opt("company_id", self.company_id)
            .set_opt("company_branch_id", self.company_branch_id)
            .set_opt("is_active", self.is_active);
        a
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSeriesPayload {
    #[validate(length(min = 1, message = "Name cannot be empty."))]
    pub name: Option<String>,
    pub prefix: Option<String>,
    pub postfix: Option<String>,
    #[validate(range(min = 1, message = "Next number must be at least 1."))]
    pub next_number: Option<i64>,
    #[validate(range(min = 0, max = 12, message = "Padding must be between 0 and 12."))]
    pub padding: Option<i32>,
    pub company_id: Option<i64>,
    pub company_branch_id: Option<i64>,
    pub is_active: Option<bool>,
}

impl UpdateSeriesPayload {
    pub fn assignments(self) -> Assignments {
        let mut a = Assignments::new();
        a.set_opt("name", self.name)
            .set_opt("prefix", self.prefix)
            .set_opt("postfix", self.postfix)
            .set_opt("next_number", self.next_number)
            .set_opt("padding", self.padding)
            .set_opt("company_id", self.company_id)
            .set_opt("company_branch_id", self.company_branch_id)
            .set_opt("is_active", self.is_active);
        a
    }
}

// --- Quotations ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct QuotationTable {
    pub id: i64,
    pub quotation_no: String,
    pub series_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub quotation_date: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub status: String,
    pub notes: Option<String>,
    pub attachment_path: Option<String>,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct QuotationTableItem {
    pub id: i64,
    pub quotation_id: i64,
    pub product_id: Option<i64>,
    pub product_variant_id: Option<i64>,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub discount: Decimal,
    pub tax_rate: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuotationDetail {
    #[serde(flatten)]
    pub quotation: QuotationTable,
    pub items: Vec<QuotationTableItem>,
}

#[derive(Debug, Deserialize)]
pub struct QuotationListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub customer_id: Option<i64>,
    pub series_id: Option<i64>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

/// One line of a quotation as sent by the client. `id` is present for lines
/// that already exist.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct QuotationItemPayload {
    pub id: Option<i64>,
    pub product_id: Option<i64>,
    pub product_variant_id: Option<i64>,
    pub description: Option<String>,
    #[validate(custom(function = "validate_quantity"))]
    pub quantity: Decimal,
    #[validate(custom(function = "validate_money"))]
    pub rate: Decimal,
    #[validate(custom(function = "validate_money"))]
    #[serde(default)]
    pub discount: Decimal,
    #[validate(custom(function = "validate_tax_rate"))]
    #[serde(default)]
    pub tax_rate: Decimal,
}

/// An item line with its amount worked out, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedItem {
    pub id: Option<i64>,
    pub product_id: Option<i64>,
    pub product_variant_id: Option<i64>,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub discount: Decimal,
    pub tax_rate: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateQuotationPayload {
    pub series_id: Option<i64>,
    pub quotation_no: Option<String>,
    pub customer_id: Option<i64>,
    /// `YYYY-MM-DD`, defaults to today
    pub quotation_date: Option<String>,
    /// `YYYY-MM-DD`
    pub valid_until: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "At least one item is required."), nested)]
    pub items: Vec<QuotationItemPayload>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateQuotationPayload {
    pub customer_id: Option<i64>,
    pub quotation_date: Option<String>,
    pub valid_until: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    /// When present, replaces the item set: lines with an `id` are updated,
    /// lines without one are inserted and lines left out are deleted.
    #[validate(nested)]
    pub items: Option<Vec<QuotationItemPayload>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_numbers_are_zero_padded() {
        assert_eq!(format_document_number("QT/", 7, 4, "/24-25"), "QT/0007/24-25");
        assert_eq!(format_document_number("", 12345, 3, ""), "12345");
        assert_eq!(format_document_number("Q", 5, 0, ""), "Q5");
    }

    #[test]
    fn create_payload_validates_its_items() {
        let ok: CreateQuotationPayload = serde_json::from_value(serde_json::json!({
            "quotation_no": "Q-1",
            "items": [{ "quantity": 2, "rate": 150.5, "tax_rate": 18 }]
        }))
        .unwrap();
        assert!(ok.validate().is_ok());
        assert_eq!(ok.items[0].discount, Decimal::ZERO);

        let empty: CreateQuotationPayload =
            serde_json::from_value(serde_json::json!({ "quotation_no": "Q-2", "items": [] }))
                .unwrap();
        assert!(empty.validate().unwrap_err().field_errors().contains_key("items"));

        let negative: CreateQuotationPayload = serde_json::from_value(serde_json::json!({
            "quotation_no": "Q-3",
            "items": [{ "quantity": -1, "rate": 10 }]
        }))
        .unwrap();
        assert!(negative.validate().is_err());
    }

    #[test]
    fn item_values_must_fit_their_columns() {
        let item = |quantity: i64, rate: i64, tax_rate: f64| -> QuotationItemPayload {
            serde_json::from_value(serde_json::json!({
                "quantity": quantity,
                "rate": rate,
                "tax_rate": tax_rate
            }))
            .unwrap()
        };

        assert!(item(99_999_999_999, 1, 0.0).validate().is_ok());
        assert!(item(100_000_000_000, 1, 0.0).validate().is_err());
        assert!(item(1, 1_000_000_000_000, 0.0).validate().is_err());
        assert!(item(1, 1, 100.5).validate().is_err());

        let mut huge = item(1, 1, 0.0);
        huge.quantity = Decimal::MAX;
        assert!(huge.validate().is_err());
    }
}

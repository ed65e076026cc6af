// src/models/product.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::common::db_utils::Assignments;

fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.message = Some("The value cannot be negative.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub unit_id: Option<i64>,
    pub tax_id: Option<i64>,
    pub hsn_code_id: Option<i64>,
    pub price: Decimal,
    pub image_path: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ProductVariant {
    pub id: i64,
    pub product_id: i64,
    pub size_id: Option<i64>,
    pub sku: Option<String>,
    pub price: Option<Decimal>,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product as listed: `total_stock` is the sum of its variants' stock and has
/// no column of its own.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductWithStock {
    #[serde(flatten)]
    pub product: Product,
    pub total_stock: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub total_stock: i64,
    pub variants: Vec<ProductVariant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortField {
    #[default]
    Id,
    Name,
    Sku,
    Price,
    CreatedAt,
    Stock,
}

impl ProductSortField {
    /// Column for SQL ordering. `Stock` has none.
    pub fn column(&self) -> Option<&'static str> {
        match self {
            ProductSortField::Id => Some("id"),
            ProductSortField::Name => Some("name"),
            ProductSortField::Sku => Some("sku"),
            ProductSortField::Price => Some("price"),
            ProductSortField::CreatedAt => Some("created_at"),
            ProductSortField::Stock => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub is_active: Option<bool>,
    /// Exact match on the derived total stock.
    pub stock: Option<i64>,
    pub sort_by: Option<ProductSortField>,
    pub sort_order: Option<SortOrder>,
}

impl ProductListParams {
    /// Whether the request needs the derived stock for filtering or ordering.
    pub fn needs_stock_in_memory(&self) -> bool {
        self.stock.is_some() || self.sort_by == Some(ProductSortField::Stock)
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct VariantPayload {
    pub size_id: Option<i64>,
    pub sku: Option<String>,
    #[validate(custom(function = "validate_not_negative"))]
    pub price: Option<Decimal>,
    #[validate(range(min = 0, message = "Stock cannot be negative."))]
    #[serde(default)]
    pub stock: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateVariantPayload {
    pub size_id: Option<i64>,
    pub sku: Option<String>,
    #[validate(custom(function = "validate_not_negative"))]
    pub price: Option<Decimal>,
    #[validate(range(min = 0, message = "Stock cannot be negative."))]
    pub stock: Option<i32>,
}

impl UpdateVariantPayload {
    pub fn assignments(self) -> Assignments {
        let mut a = Assignments::new();
        a.set_opt("size_id", self.size_id)
            .set_opt("sku", self.sku)
            .set_opt("price", self.price)
            .set_opt("stock", self.stock);
        a
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductPayload {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
    #[validate(length(min = 1, message = "SKU is required."))]
    pub sku: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub unit_id: Option<i64>,
    pub tax_id: Option<i64>,
    pub hsn_code_id: Option<i64>,
    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub price: Decimal,
    pub is_active: Option<bool>,
    #[validate(nested)]
    #[serde(default)]
    pub variants: Vec<VariantPayload>,
}

impl CreateProductPayload {
    pub fn assignments(&self) -> Assignments {
        let mut a = Assignments::new();
        a.set("name", self.name.clone())
            .set("sku", self.sku.clone())
            .set_opt("description", self.description.clone())
            .set_opt("category_id", self.category_id)
            .set_opt("unit_id", self.unit_id)
            .set_opt("tax_id", self.tax_id)
            .set_opt("hsn_code_id", self.hsn_code_id)
            .set("price", self.price)
            .set_opt("is_active", self.is_active);
        a
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductPayload {
    #[validate(length(min = 1, message = "Name cannot be empty."))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "SKU cannot be empty."))]
    pub sku: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub unit_id: Option<i64>,
    pub tax_id: Option<i64>,
    pub hsn_code_id: Option<i64>,
    #[validate(custom(function = "validate_not_negative"))]
    pub price: Option<Decimal>,
    pub is_active: Option<bool>,
}

impl UpdateProductPayload {
    pub fn assignments(self) -> Assignments {
        let mut a = Assignments::new();
        a.set_opt("name", self.name)
            .set_opt("sku", self.sku)
            .set_opt("description", self.description)
            .set_opt("category_id", self.category_id)
            .set_opt("unit_id", self.unit_id)
            .set_opt("tax_id", self.tax_id)
            .set_opt("hsn_code_id", self.hsn_code_id)
            .set_opt("price", self.price)
            .set_opt("is_active", self.is_active);
        a
    }
}

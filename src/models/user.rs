// src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::common::{db_utils::Assignments, pagination::non_blank, validation::validate_not_blank};

// Central identity record. The role flags are independent of each other:
// the same row can be an employee and a customer at once.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile: String,

    #[serde(skip_serializing)]
    pub password_hash: String,

    pub is_employee: bool,
    pub is_customer: bool,
    pub is_supplier: bool,
    pub is_dealer: bool,
    pub is_distributor: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Role flags as sent by clients; unset flags default to false on create.
#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
pub struct RoleFlags {
    pub is_employee: Option<bool>,
    pub is_customer: Option<bool>,
    pub is_supplier: Option<bool>,
    pub is_dealer: Option<bool>,
    pub is_distributor: Option<bool>,
}

impl RoleFlags {
    pub fn apply(&self, a: &mut Assignments) {
        a.set_opt("is_employee", self.is_employee)
            .set_opt("is_customer", self.is_customer)
            .set_opt("is_supplier", self.is_supplier)
            .set_opt("is_dealer", self.is_dealer)
            .set_opt("is_distributor", self.is_distributor);
    }
}

/// `?role=` filter on the user list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Employee,
    Customer,
    Supplier,
    Dealer,
    Distributor,
}

impl UserRole {
    pub fn column(&self) -> &'static str {
        match self {
            UserRole::Employee => "is_employee",
            UserRole::Customer => "is_customer",
            UserRole::Supplier => "is_supplier",
            UserRole::Dealer => "is_dealer",
            UserRole::Distributor => "is_distributor",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub filter: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
pub struct AutocompleteParams {
    pub q: Option<String>,
    pub role: Option<UserRole>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct UserSuggestion {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub mobile: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserPayload {
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
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserPayload {
    #[validate(custom(function = "validate_not_blank", message = "First name cannot be empty."))]
    pub first_name: Option<String>,
    #[validate(custom(function = "validate_not_blank", message = "Last name cannot be empty."))]
    pub last_name: Option<String>,
    #[validate(email(message = "The e-mail provided is invalid."))]
    pub email: Option<String>,
    #[validate(length(min = 10, max = 15, message = "Mobile must have 10 to 15 digits."))]
    pub mobile: Option<String>,
    #[validate(length(min = 6, message = "The password must have at least 6 characters."))]
    pub password: Option<String>,
    #[serde(flatten)]
    pub roles: RoleFlags,
    pub is_active: Option<bool>,
}

// --- Addresses ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "address_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AddressType {
    Permanent,
    Residential,
    Other,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct UserAddress {
    pub id: i64,
    pub user_id: i64,
    pub address_type: AddressType,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub pincode: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Address fields as they arrive in a form. Every field is optional; a block
/// with nothing filled in is ignored.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct AddressBlock {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    #[validate(length(min = 4, max = 10, message = "Invalid pincode."))]
    pub pincode: Option<String>,
}

impl AddressBlock {
    pub fn is_blank(&self) -> bool {
        [
            &self.line1,
            &self.line2,
            &self.city,
            &self.state,
            &self.country,
            &self.pincode,
        ]
        .iter()
        .all(|f| non_blank(f.as_deref()).is_none())
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAddressPayload {
    pub address_type: AddressType,
    #[serde(flatten)]
    #[validate(nested)]
    pub address: AddressBlock,
}

// --- Bank accounts ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct UserBankAccount {
    pub id: i64,
    pub user_id: i64,
    pub bank_name: Option<String>,
    pub account_holder: Option<String>,
    pub account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub branch: Option<String>,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct BankBlock {
    pub bank_name: Option<String>,
    pub account_holder: Option<String>,
    pub account_number: Option<String>,
    #[validate(length(equal = 11, message = "IFSC code must have 11 characters."))]
    pub ifsc_code: Option<String>,
    pub branch: Option<String>,
}

impl BankBlock {
    pub fn is_blank(&self) -> bool {
        [
            &self.bank_name,
            &self.account_holder,
            &self.account_number,
            &self.ifsc_code,
            &self.branch,
        ]
        .iter()
        .all(|f| non_blank(f.as_deref()).is_none())
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBankAccountPayload {
    #[serde(flatten)]
    #[validate(nested)]
    pub bank: BankBlock,
    #[serde(default)]
    pub is_primary: bool,
}

// --- Documents ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct UserDocument {
    pub id: i64,
    pub user_id: i64,
    pub document_type: String,
    pub file_name: String,
    pub file_path: String,
    pub uploaded_at: DateTime<Utc>,
}

// --- Role mappings ---

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserRoleMapping {
    pub id: i64,
    pub user_id: i64,
    pub role_id: i64,
    pub role_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRolePayload {
    pub role_id: i64,
}

/// User with everything it owns, for the detail endpoint.
#[derive(Debug, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub addresses: Vec<UserAddress>,
    pub bank_accounts: Vec<UserBankAccount>,
    pub documents: Vec<UserDocument>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_only_blocks_are_blank() {
        let block = AddressBlock {
            city: Some("   ".into()),
            ..Default::default()
        };
        assert!(block.is_blank());

        let block = AddressBlock {
            pincode: Some("560001".into()),
            ..Default::default()
        };
        assert!(!block.is_blank());

        assert!(BankBlock::default().is_blank());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            id: 1,
            first_name: "Asha".into(),
            last_name: "Rao".into(),
            email: "asha@example.com".into(),
            mobile: "9876543210".into(),
            password_hash: "secret-hash".into(),
            is_employee: true,
            is_customer: true,
            is_supplier: false,
            is_dealer: false,
            is_distributor: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["is_customer"], true);
    }

    #[test]
    fn role_flags_only_set_what_was_sent() {
        let flags: RoleFlags = serde_json::from_str(r#"{"is_dealer": true}"#).unwrap();
        let mut a = Assignments::new();
        flags.apply(&mut a);
        assert_eq!(a.columns(), vec!["is_dealer"]);
    }
}

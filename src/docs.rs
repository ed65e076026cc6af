// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,
        handlers::auth::get_me,

        // --- Users ---
        handlers::users::get_user,
        handlers::users::create_user,

        // --- Employees ---
        handlers::employees::create_employee,

        // --- Menus / RBAC ---
        handlers::menus::menu_tree,
        handlers::roles::create_role,
        handlers::roles::get_permissions,
        handlers::roles::save_permissions,

        // --- Products ---
        handlers::products::list_products,
        handlers::products::create_product,

        // --- Quotations ---
        handlers::quotations::create_quotation,
        handlers::quotations::update_quotation,

        // --- CRM ---
        handlers::leads::list_leads,
        handlers::leads::create_lead,
        handlers::indiamart::fetch_leads,
        handlers::indiamart::sync_leads,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- Users ---
            models::user::User,
            models::user::RoleFlags,
            models::user::CreateUserPayload,
            models::user::UpdateUserPayload,
            models::user::AddressType,
            models::user::UserAddress,
            models::user::AddressBlock,
            models::user::UserBankAccount,
            models::user::BankBlock,
            models::user::UserDocument,

            // --- Employees ---
            models::employee::Employee,
            models::employee::CreateEmployeePayload,
            models::employee::UpdateEmployeePayload,
            models::employee::EmployeeCreated,

            // --- Menus / RBAC ---
            models::menu::Menu,
            models::menu::MenuTreeNode,
            models::menu::CreateMenuPayload,
            models::menu::UpdateMenuPayload,
            models::rbac::Role,
            models::rbac::CreateRolePayload,
            models::rbac::UpdateRolePayload,
            models::rbac::MenuPermission,
            models::rbac::UpdatePermissionsPayload,
            models::rbac::RolePermissionsResponse,
            models::rbac::SavedPermissionsResponse,

            // --- Products ---
            models::product::Product,
            models::product::ProductVariant,
            models::product::ProductWithStock,
            models::product::ProductDetail,
            models::product::VariantPayload,
            models::product::UpdateVariantPayload,
            models::product::CreateProductPayload,
            models::product::UpdateProductPayload,

            // --- Series / Quotations ---
            models::quotation::Series,
            models::quotation::CreateSeriesPayload,
            models::quotation::UpdateSeriesPayload,
            models::quotation::QuotationTable,
            models::quotation::QuotationTableItem,
            models::quotation::QuotationDetail,
            models::quotation::QuotationItemPayload,
            models::quotation::CreateQuotationPayload,
            models::quotation::UpdateQuotationPayload,

            // --- CRM ---
            models::crm::Lead,
            models::crm::LeadResponse,
            models::crm::CreateLeadPayload,
            models::crm::UpdateLeadPayload,
            models::crm::LeadInteraction,
            models::crm::CreateInteractionPayload,
            models::crm::FollowUpStatus,
            models::crm::LeadFollowUp,
            models::crm::CreateFollowUpPayload,
            models::crm::UpdateFollowUpPayload,
            models::indiamart::IndiaMartQuery,
            models::indiamart::SyncSummary,
        )
    ),
    tags(
        (name = "Auth", description = "Login and current user"),
        (name = "Users", description = "Users, addresses, bank accounts and documents"),
        (name = "Employees", description = "Employees created as users"),
        (name = "Menus", description = "Navigation tree"),
        (name = "RBAC", description = "Roles and per-menu permissions"),
        (name = "Products", description = "Products, variants and derived stock"),
        (name = "Quotations", description = "Numbering series and quotations"),
        (name = "CRM", description = "Leads, interactions, follow-ups and IndiaMART")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

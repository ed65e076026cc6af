// src/routes.rs

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::AppState,
    docs::ApiDoc,
    handlers::{
        auth, employees, indiamart, leads, master, menus, products, quotations, roles, series,
        users,
    },
    middleware::auth::auth_guard,
    models::master::{
        Category, Company, CompanyBranch, Department, Designation, HsnCode, MasterEntity, Size,
        Store, Tax, Unit,
    },
};

/// Uploads (documents, product images, attachments) may be up to 10 MiB.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn master_routes<T: MasterEntity>(path: &str) -> Router<AppState> {
    Router::new()
        .route(path, get(master::list::<T>).post(master::create::<T>))
        .route(
            &format!("{}/{{id}}", path),
            get(master::get::<T>)
                .put(master::update::<T>)
                .delete(master::delete::<T>),
        )
}

pub fn create_router(app_state: AppState) -> Router {
    // Public
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/login", post(auth::login));

    // Master data
    let master_data = Router::new()
        .merge(master_routes::<Category>("/api/categories"))
        .merge(master_routes::<Unit>("/api/units"))
        .merge(master_routes::<Tax>("/api/taxes"))
        .merge(master_routes::<Store>("/api/stores"))
        .merge(master_routes::<Size>("/api/sizes"))
        .merge(master_routes::<HsnCode>("/api/hsn-codes"))
        .merge(master_routes::<Department>("/api/departments"))
        .merge(master_routes::<Designation>("/api/designations"))
        .merge(master_routes::<Company>("/api/companies"))
        .merge(master_routes::<CompanyBranch>("/api/company-branches"));

    // Users and everything hanging off them
    let user_routes = Router::new()
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route("/api/users/search", get(users::search_users))
        .route(
            "/api/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/api/users/{id}/addresses",
            get(users::list_addresses).post(users::create_address),
        )
        .route("/api/addresses/{id}", delete(users::delete_address))
        .route(
            "/api/users/{id}/bank-accounts",
            get(users::list_bank_accounts).post(users::create_bank_account),
        )
        .route("/api/bank-accounts/{id}", delete(users::delete_bank_account))
        .route(
            "/api/users/{id}/documents",
            get(users::list_documents).post(users::upload_document),
        )
        .route("/api/documents/{id}", delete(users::delete_document))
        .route(
            "/api/users/{id}/roles",
            get(users::list_user_roles).post(users::assign_role),
        )
        .route("/api/users/{id}/roles/{role_id}", delete(users::revoke_role));

    // Hierarchy and access control
    let access_routes = Router::new()
        .route(
            "/api/employees",
            get(employees::list_employees).post(employees::create_employee),
        )
        .route(
            "/api/employees/{id}",
            get(employees::get_employee)
                .put(employees::update_employee)
                .delete(employees::delete_employee),
        )
        .route("/api/menus", get(menus::list_menus).post(menus::create_menu))
        .route("/api/menus/tree", get(menus::menu_tree))
        .route(
            "/api/menus/{id}",
            get(menus::get_menu)
                .put(menus::update_menu)
                .delete(menus::delete_menu),
        )
        .route("/api/roles", get(roles::list_roles).post(roles::create_role))
        .route(
            "/api/roles/{id}",
            get(roles::get_role)
                .put(roles::update_role)
                .delete(roles::delete_role),
        )
        .route(
            "/api/roles/{id}/permissions",
            get(roles::get_permissions).put(roles::save_permissions),
        );

    // Catalogue and sales documents
    let sales_routes = Router::new()
        .route(
            "/api/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/api/products/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/api/products/{id}/image", post(products::upload_image))
        .route("/api/products/{id}/variants", post(products::create_variant))
        .route(
            "/api/variants/{id}",
            put(products::update_variant).delete(products::delete_variant),
        )
        .route("/api/series", get(series::list_series).post(series::create_series))
        .route(
            "/api/series/{id}",
            get(series::get_series)
                .put(series::update_series)
                .delete(series::delete_series),
        )
        .route(
            "/api/quotations",
            get(quotations::list_quotations).post(quotations::create_quotation),
        )
        .route(
            "/api/quotations/{id}",
            get(quotations::get_quotation)
                .put(quotations::update_quotation)
                .delete(quotations::delete_quotation),
        )
        .route(
            "/api/quotations/{id}/attachment",
            post(quotations::upload_attachment),
        );

    // CRM
    let crm_routes = Router::new()
        .route("/api/leads", get(leads::list_leads).post(leads::create_lead))
        .route(
            "/api/leads/{id}",
            get(leads::get_lead)
                .put(leads::update_lead)
                .delete(leads::delete_lead),
        )
        .route(
            "/api/leads/{id}/interactions",
            get(leads::list_interactions).post(leads::create_interaction),
        )
        .route("/api/interactions/{id}", delete(leads::delete_interaction))
        .route(
            "/api/leads/{id}/follow-ups",
            get(leads::list_follow_ups).post(leads::create_follow_up),
        )
        .route(
            "/api/follow-ups/{id}",
            put(leads::update_follow_up).delete(leads::delete_follow_up),
        )
        .route("/api/indiamart/leads", get(indiamart::fetch_leads))
        .route("/api/indiamart/sync", post(indiamart::sync_leads));

    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth::get_me))
        .merge(master_data)
        .merge(user_routes)
        .merge(access_routes)
        .merge(sales_routes)
        .merge(crm_routes)
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let uploads = ServeDir::new(&app_state.config.upload_dir);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

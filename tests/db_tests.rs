// tests/db_tests.rs
//
// Runs against a real database only when TEST_DATABASE_URL is set.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use erp_backend::{
    common::error::AppError,
    config::{AppState, IndiaMartConfig},
    db::{
        EmployeeRepository, MenuRepository, QuotationRepository, RbacRepository, SeriesRepository,
        UserRepository,
    },
    models::{
        employee::CreateEmployeePayload,
        menu::CreateMenuPayload,
        quotation::{
            CreateQuotationPayload, CreateSeriesPayload, QuotationItemPayload,
            UpdateQuotationPayload,
        },
        rbac::{MenuPermission, PermissionMap},
        user::{AddressBlock, BankBlock, RoleFlags},
    },
    routes::create_router,
    services::{
        employee_service::EmployeeService, quotation_service::QuotationService,
        rbac_service::RbacService,
    },
};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower::ServiceExt;

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("connect to TEST_DATABASE_URL");
    sqlx::migrate!().run(&pool).await.expect("migrations");
    Some(pool)
}

fn item(id: Option<i64>, qty: i64, rate: i64) -> QuotationItemPayload {
    QuotationItemPayload {
        id,
        product_id: None,
        product_variant_id: None,
        description: Some(format!("{} x {}", qty, rate)),
        quantity: Decimal::from(qty),
        rate: Decimal::from(rate),
        discount: Decimal::ZERO,
        tax_rate: Decimal::ZERO,
    }
}

fn create_payload(series_id: Option<i64>, items: Vec<QuotationItemPayload>) -> CreateQuotationPayload {
    CreateQuotationPayload {
        series_id,
        quotation_no: None,
        customer_id: None,
        quotation_date: Some("2024-06-01".to_string()),
        valid_until: None,
        status: None,
        notes: None,
        items,
    }
}

fn update_items(items: Vec<QuotationItemPayload>) -> UpdateQuotationPayload {
    UpdateQuotationPayload {
        customer_id: None,
        quotation_date: None,
        valid_until: None,
        status: None,
        notes: None,
        items: Some(items),
    }
}

#[tokio::test]
async fn series_numbers_quotations_in_order() {
    let Some(pool) = test_pool().await else { return };

    let series_repo = SeriesRepository::new(pool.clone());
    let prefix = format!("T{}/", uuid::Uuid::new_v4().simple());
    let series = series_repo
        .create(
            CreateSeriesPayload {
                name: "Test quotations".to_string(),
                prefix: prefix.clone(),
                postfix: String::new(),
                next_number: Some(7),
                padding: Some(3),
                company_id: None,
                company_branch_id: None,
                is_active: None,
            }
            .assignments(),
        )
        .await
        .unwrap();

    let service = QuotationService::new(
        QuotationRepository::new(pool.clone()),
        series_repo.clone(),
        pool.clone(),
    );

    let first = service
        .create_quotation(create_payload(Some(series.id), vec![item(None, 2, 50)]))
        .await
        .unwrap();
    let second = service
        .create_quotation(create_payload(Some(series.id), vec![item(None, 1, 10)]))
        .await
        .unwrap();

    assert_eq!(first.quotation.quotation_no, format!("{}007", prefix));
    assert_eq!(second.quotation.quotation_no, format!("{}008", prefix));
    assert_eq!(first.quotation.total_amount, Decimal::from(100));
    assert_eq!(first.items.len(), 1);

    let reloaded = series_repo.find_by_id(series.id).await.unwrap().unwrap();
    assert_eq!(reloaded.next_number, 9);
    assert_eq!(series_repo.count_references(series.id).await.unwrap(), 2);
}

#[tokio::test]
async fn updating_items_keeps_updates_inserts_and_drops_the_rest() {
    let Some(pool) = test_pool().await else { return };

    let service = QuotationService::new(
        QuotationRepository::new(pool.clone()),
        SeriesRepository::new(pool.clone()),
        pool.clone(),
    );

    let mut payload = create_payload(None, vec![item(None, 1, 10), item(None, 2, 20), item(None, 3, 30)]);
    payload.quotation_no = Some(format!("M-{}", uuid::Uuid::new_v4().simple()));
    let created = service.create_quotation(payload).await.unwrap();
    assert_eq!(created.quotation.total_amount, Decimal::from(140));

    let kept = created.items[0].id;
    let updated = service
        .update_quotation(
            created.quotation.id,
            update_items(vec![item(Some(kept), 5, 10), item(None, 1, 1)]),
        )
        .await
        .unwrap();

    assert_eq!(updated.items.len(), 2);
    assert!(updated.items.iter().any(|i| i.id == kept && i.amount == Decimal::from(50)));
    assert_eq!(updated.quotation.total_amount, Decimal::from(51));

    let foreign = service
        .update_quotation(created.quotation.id, update_items(vec![item(Some(i64::MAX), 1, 1)]))
        .await;
    assert!(matches!(foreign, Err(AppError::BadRequest(_))));

    let unchanged = service.get_quotation(created.quotation.id).await.unwrap();
    assert_eq!(unchanged.items.len(), 2);

    service.delete_quotation(created.quotation.id).await.unwrap();
    assert!(matches!(
        service.get_quotation(created.quotation.id).await,
        Err(AppError::NotFound(_))
    ));
}

fn employee_payload(tag: &str, mobile: &str, employee_code: &str) -> CreateEmployeePayload {
    CreateEmployeePayload {
        first_name: "Asha".to_string(),
        last_name: "Verma".to_string(),
        email: format!("asha.{}@example.com", tag),
        mobile: mobile.to_string(),
        password: "secret123".to_string(),
        roles: RoleFlags::default(),
        department_id: None,
        designation_id: None,
        employee_code: Some(employee_code.to_string()),
        joining_date: Some("2024-04-01".to_string()),
        date_of_birth: None,
        salary: None,
        permanent_address: Some(AddressBlock {
            line1: Some("12 MG Road".to_string()),
            city: Some("Pune".to_string()),
            ..Default::default()
        }),
        residential_address: Some(AddressBlock::default()),
        bank_account: Some(BankBlock {
            bank_name: Some("State Bank".to_string()),
            account_number: Some("001122334455".to_string()),
            ..Default::default()
        }),
    }
}

fn unique_mobile() -> String {
    let digits: String = uuid::Uuid::new_v4()
        .as_u128()
        .to_string()
        .chars()
        .take(10)
        .collect();
    format!("9{}", &digits[1..])
}

async fn count(pool: &PgPool, sql: &str, value: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .bind(value)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn employee_is_created_with_its_blocks_in_one_go() {
    let Some(pool) = test_pool().await else { return };

    let service = EmployeeService::new(
        UserRepository::new(pool.clone()),
        EmployeeRepository::new(pool.clone()),
        pool.clone(),
    );
    let tag = uuid::Uuid::new_v4().simple().to_string();

    let created = service
        .create_employee_as_user(employee_payload(&tag, &unique_mobile(), &tag))
        .await
        .unwrap();

    assert!(created.user.is_employee);
    assert_eq!(created.employee.user_id, created.user.id);
    // the blank residential block is skipped
    assert_eq!(created.addresses.len(), 1);
    assert_eq!(created.bank_accounts.len(), 1);
    assert!(created.addresses.iter().all(|a| a.user_id == created.user.id));
    assert_eq!(created.bank_accounts[0].user_id, created.user.id);
}

#[tokio::test]
async fn failed_employee_create_leaves_nothing_behind() {
    let Some(pool) = test_pool().await else { return };

    let service = EmployeeService::new(
        UserRepository::new(pool.clone()),
        EmployeeRepository::new(pool.clone()),
        pool.clone(),
    );
    let tag = uuid::Uuid::new_v4().simple().to_string();
    service
        .create_employee_as_user(employee_payload(&tag, &unique_mobile(), &tag))
        .await
        .unwrap();

    // Same e-mail: rejected at the first insert.
    let duplicate_email = service
        .create_employee_as_user(employee_payload(&tag, &unique_mobile(), "other-code"))
        .await;
    match duplicate_email {
        Err(AppError::Conflict(msg)) => assert_eq!(msg, "email already exists"),
        other => panic!("expected a conflict, got {:?}", other.map(|c| c.user.id)),
    }

    // Fresh user but a taken employee code: rejected at the last insert.
    let other_tag = uuid::Uuid::new_v4().simple().to_string();
    let email = format!("asha.{}@example.com", other_tag);
    let failed = service
        .create_employee_as_user(employee_payload(&other_tag, &unique_mobile(), &tag))
        .await;
    assert!(matches!(failed, Err(AppError::Conflict(_))));

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM users WHERE email = $1", &email).await, 0);
    assert_eq!(
        count(
            &pool,
            "SELECT COUNT(*) FROM user_addresses a JOIN users u ON u.id = a.user_id WHERE u.email = $1",
            &email,
        )
        .await,
        0
    );
}

async fn new_series(series_repo: &SeriesRepository) -> i64 {
    series_repo
        .create(
            CreateSeriesPayload {
                name: "Deletable".to_string(),
                prefix: format!("D{}/", uuid::Uuid::new_v4().simple()),
                postfix: String::new(),
                next_number: None,
                padding: None,
                company_id: None,
                company_branch_id: None,
                is_active: None,
            }
            .assignments(),
        )
        .await
        .unwrap()
        .id
}

async fn delete_series_over_http(pool: &PgPool, id: i64) -> (StatusCode, Value) {
    let config = common::test_config(std::env::temp_dir(), IndiaMartConfig::default());
    let state = AppState::from_pool(pool.clone(), config).unwrap();
    let token = state.auth_service.create_token(1).unwrap();

    let response = create_router(state)
        .oneshot(
            Request::delete(format!("/api/series/{}", id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn referenced_series_cannot_be_deleted() {
    let Some(pool) = test_pool().await else { return };

    let series_repo = SeriesRepository::new(pool.clone());
    let used = new_series(&series_repo).await;
    let unused = new_series(&series_repo).await;

    QuotationService::new(
        QuotationRepository::new(pool.clone()),
        series_repo.clone(),
        pool.clone(),
    )
    .create_quotation(create_payload(Some(used), vec![item(None, 1, 10)]))
    .await
    .unwrap();

    let (status, body) = delete_series_over_http(&pool, used).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["references"], 1);
    assert!(series_repo.find_by_id(used).await.unwrap().is_some());

    let (status, _) = delete_series_over_http(&pool, unused).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(series_repo.find_by_id(unused).await.unwrap().is_none());
}

fn can_view() -> MenuPermission {
    MenuPermission {
        can_view: true,
        ..Default::default()
    }
}

async fn new_menu(menu_repo: &MenuRepository, name: &str) -> i64 {
    menu_repo
        .create(
            CreateMenuPayload {
                parent_id: None,
                name: name.to_string(),
                path: None,
                icon: None,
                sort_order: None,
                is_active: Some(true),
            }
            .assignments(),
        )
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn saved_permissions_are_keyed_by_menu_id() {
    let Some(pool) = test_pool().await else { return };

    let menu_repo = MenuRepository::new(pool.clone());
    let rbac_repo = RbacRepository::new(pool.clone());
    let tag = uuid::Uuid::new_v4().simple().to_string();
    let masters = new_menu(&menu_repo, &format!("Masters {}", tag)).await;
    let units_name = format!("Units {}", tag);
    let units = new_menu(&menu_repo, &units_name).await;
    let role = rbac_repo
        .create_role(&format!("Clerk {}", tag), None)
        .await
        .unwrap();
    let service = RbacService::new(rbac_repo.clone(), menu_repo, pool.clone());

    let mut mixed = PermissionMap::new();
    mixed.insert(masters.to_string(), can_view());
    mixed.insert(units_name, can_view());
    service.save_permissions(role.id, mixed).await.unwrap();

    let stored = rbac_repo.find_permissions(role.id).await.unwrap().unwrap();
    let mut keys: Vec<String> = stored.permissions.0.keys().cloned().collect();
    keys.sort();
    let mut expected = vec![masters.to_string(), units.to_string()];
    expected.sort();
    assert_eq!(keys, expected);
    assert!(keys.iter().all(|k| k.parse::<i64>().is_ok()));

    // An unknown key rejects the write and leaves the stored map alone.
    let mut bad = PermissionMap::new();
    bad.insert(masters.to_string(), MenuPermission::default());
    bad.insert(format!("Nowhere {}", tag), can_view());
    match service.save_permissions(role.id, bad).await {
        Err(AppError::UnknownPermissionKeys(keys)) => {
            assert_eq!(keys, vec![format!("Nowhere {}", tag)]);
        }
        other => panic!("expected unknown keys, got {:?}", other.map(|r| r.role_id)),
    }

    let after = rbac_repo.find_permissions(role.id).await.unwrap().unwrap();
    assert_eq!(after.permissions.0.len(), 2);
    assert!(after.permissions.0[&masters.to_string()].can_view);
    assert_eq!(after.updated_at, stored.updated_at);
}

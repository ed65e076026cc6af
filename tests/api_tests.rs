// tests/api_tests.rs

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use erp_backend::routes::create_router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let app = create_router(common::offline_state());

    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = create_router(common::offline_state());

    for uri in ["/api/auth/me", "/api/employees", "/api/quotations", "/api/categories"] {
        let response = app
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }
}

#[tokio::test]
async fn forged_tokens_are_rejected() {
    let app = create_router(common::offline_state());

    let response = app
        .oneshot(
            Request::get("/api/leads")
                .header(header::AUTHORIZATION, "Bearer not.a.token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_employee_payload_is_a_bad_request() {
    let state = common::offline_state();
    let token = state.auth_service.create_token(1).unwrap();
    let app = create_router(state);

    let payload = serde_json::json!({
        "first_name": "",
        "last_name": "Sharma",
        "email": "not-an-email",
        "mobile": "123",
        "password": "abc"
    });

    let response = app
        .oneshot(
            Request::post("/api/employees")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    let details = body["details"].as_object().unwrap();
    for field in ["first_name", "email", "mobile", "password"] {
        assert!(details.contains_key(field), "missing {}", field);
    }
    assert!(!details.contains_key("last_name"));
}

#[tokio::test]
async fn quotation_without_items_is_a_bad_request() {
    let state = common::offline_state();
    let token = state.auth_service.create_token(1).unwrap();
    let app = create_router(state);

    let response = app
        .oneshot(
            Request::post("/api/quotations")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"quotation_no":"Q-1","items":[]}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let app = create_router(common::offline_state());

    let response = app
        .oneshot(Request::get("/api/does-not-exist").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn openapi_document_lists_the_api() {
    let app = create_router(common::offline_state());

    let response = app
        .oneshot(Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    let paths = doc["paths"].as_object().unwrap();
    assert!(paths.contains_key("/api/auth/login"));
    assert!(paths.contains_key("/api/quotations"));
    assert!(paths.contains_key("/api/indiamart/leads"));
    assert!(doc["components"]["securitySchemes"]["api_jwt"].is_object());
}

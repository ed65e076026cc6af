// tests/indiamart_tests.rs

mod common;

use std::{path::Path, time::Duration};

use erp_backend::{
    common::error::AppError,
    config::IndiaMartConfig,
    db::CrmRepository,
    models::indiamart::IndiaMartQuery,
    services::indiamart_service::{DataSource, IndiaMartService, DATA_SOURCE_HEADER},
};
use wiremock::{
    matchers::{method, query_param},
    Mock, MockServer, ResponseTemplate,
};

const LISTING: &str = r#"{"CODE":200,"STATUS":"SUCCESS","TOTAL_RECORDS":1,"RESPONSE":[{"UNIQUE_QUERY_ID":"901","SENDER_NAME":"Ravi"}]}"#;

fn service(server: &MockServer, snapshot: &Path, max_retries: u32) -> IndiaMartService {
    let config = IndiaMartConfig {
        base_url: server.uri(),
        max_retries,
        backoff: Duration::from_millis(10),
        max_retry_delay: Duration::from_millis(50),
        timeout: Duration::from_secs(5),
        snapshot_path: snapshot.to_path_buf(),
    };
    IndiaMartService::new(config, CrmRepository::new(common::lazy_pool())).unwrap()
}

fn query(key: &str) -> IndiaMartQuery {
    IndiaMartQuery {
        api_key: key.to_string(),
        start_time: None,
        end_time: None,
    }
}

#[tokio::test]
async fn concurrent_requests_share_one_upstream_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("glusr_crm_key", "shared-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(LISTING, "application/json")
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let svc = service(&server, &dir.path().join("leads.json"), 3);

    let q = query("shared-key");
    let (a, b) = tokio::join!(svc.fetch_leads(&q), svc.fetch_leads(&q));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.source, DataSource::Live);
    assert_eq!(a.body, b.body);
    assert_eq!(a.body, LISTING.as_bytes());
}

#[tokio::test]
async fn rate_limited_calls_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(LISTING, "application/json"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("nested").join("leads.json");
    let svc = service(&server, &snapshot, 3);

    let response = svc.fetch_leads(&query("k")).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.source, DataSource::Live);
    assert_eq!(std::fs::read(&snapshot).unwrap(), LISTING.as_bytes());
}

#[tokio::test]
async fn exhausted_retries_fall_back_to_the_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("leads.json");
    std::fs::write(&snapshot, LISTING).unwrap();
    let svc = service(&server, &snapshot, 2);

    let response = svc.fetch_leads(&query("k")).await.unwrap();

    assert_eq!(response.source, DataSource::Cache);
    assert_eq!(response.body, LISTING.as_bytes());
    let http = response.to_response();
    assert_eq!(http.headers()[DATA_SOURCE_HEADER], "cache");
}

#[tokio::test]
async fn exhausted_retries_without_snapshot_are_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let svc = service(&server, &dir.path().join("missing.json"), 1);

    let err = svc.fetch_leads(&query("k")).await.unwrap_err();
    assert!(matches!(err, AppError::RateLimited(_)));
}

#[tokio::test]
async fn other_upstream_errors_pass_through_untagged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream broke"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("leads.json");
    let svc = service(&server, &snapshot, 3);

    let response = svc.fetch_leads(&query("k")).await.unwrap();

    assert_eq!(response.status, 500);
    assert_eq!(response.source, DataSource::Passthrough);
    assert_eq!(response.body, b"upstream broke");
    assert!(response.to_response().headers().get(DATA_SOURCE_HEADER).is_none());
    assert!(!snapshot.exists());
}

#[tokio::test]
async fn failed_listings_do_not_replace_the_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"CODE":402,"STATUS":"FAILURE","MESSAGE":"Invalid key"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("leads.json");
    std::fs::write(&snapshot, LISTING).unwrap();
    let svc = service(&server, &snapshot, 3);

    let response = svc.fetch_leads(&query("bad")).await.unwrap();

    assert_eq!(response.source, DataSource::Live);
    assert_eq!(std::fs::read(&snapshot).unwrap(), LISTING.as_bytes());
}

#[tokio::test]
async fn blank_api_key_is_rejected_without_calling_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let svc = service(&server, &dir.path().join("leads.json"), 3);

    let err = svc.fetch_leads(&query("   ")).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidField { .. }));
}

#[tokio::test]
async fn throttling_reported_in_the_body_falls_back_to_the_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"CODE":429,"STATUS":"FAILURE","MESSAGE":"It is advised to hit this API once in every 5 minutes"}"#,
            "application/json",
        ))
        .expect(3)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("leads.json");
    std::fs::write(&snapshot, LISTING).unwrap();
    let svc = service(&server, &snapshot, 2);

    let response = svc.fetch_leads(&query("k")).await.unwrap();

    assert_eq!(response.source, DataSource::Cache);
    assert_eq!(response.body, LISTING.as_bytes());
    assert_eq!(std::fs::read(&snapshot).unwrap(), LISTING.as_bytes());
}

#[tokio::test]
async fn long_retry_after_values_are_capped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "3600"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(LISTING, "application/json"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let svc = service(&server, &dir.path().join("leads.json"), 3);

    let response = tokio::time::timeout(Duration::from_secs(5), svc.fetch_leads(&query("k")))
        .await
        .expect("the upstream Retry-After should not be obeyed past the cap")
        .unwrap();

    assert_eq!(response.source, DataSource::Live);
}

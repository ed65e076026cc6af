// src/services/indiamart_service.rs

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use tokio::sync::{watch, Mutex};

use crate::{
    common::{error::AppError, pagination::non_blank},
    config::IndiaMartConfig,
    db::CrmRepository,
    models::indiamart::{IndiaMartEnvelope, IndiaMartQuery, SyncSummary},
};

pub const DATA_SOURCE_HEADER: &str = "x-data-source";

/// Where a proxied body came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Live,
    Cache,
    /// Upstream answered with something other than 200 or 429.
    Passthrough,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Live => "live",
            DataSource::Cache => "cache",
            DataSource::Passthrough => "upstream",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub source: DataSource,
}

impl ProxyResponse {
    pub fn to_response(&self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_GATEWAY);
        let content_type = self
            .content_type
            .as_deref()
            .and_then(|c| HeaderValue::from_str(c).ok())
            .unwrap_or_else(|| HeaderValue::from_static("application/json"));

        let mut response = (status, self.body.clone()).into_response();
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, content_type);
        if self.source != DataSource::Passthrough {
            headers.insert(DATA_SOURCE_HEADER, HeaderValue::from_static(self.source.as_str()));
        }
        response
    }
}

/// Shared between the leader and its followers, so it has to be cloneable.
#[derive(Debug, Clone)]
pub enum FetchFailure {
    RateLimited(String),
    Transport(String),
}

impl From<FetchFailure> for AppError {
    fn from(failure: FetchFailure) -> Self {
        match failure {
            FetchFailure::RateLimited(msg) => AppError::RateLimited(msg),
            FetchFailure::Transport(msg) => {
                AppError::InternalServerError(anyhow::anyhow!("IndiaMART request failed: {}", msg))
            }
        }
    }
}

type Outcome = Result<ProxyResponse, FetchFailure>;
type InFlight = Arc<Mutex<HashMap<String, watch::Receiver<Option<Arc<Outcome>>>>>>;

#[derive(Clone)]
pub struct IndiaMartService {
    client: reqwest::Client,
    config: Arc<IndiaMartConfig>,
    crm_repo: CrmRepository,
    in_flight: InFlight,
}

/// `base * 2^attempt`, saturating instead of overflowing.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// Delay requested by the upstream `Retry-After` header, in whole seconds.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// IndiaMART reports throttling either as HTTP 429 or as a 200 whose
/// envelope carries `CODE: 429`.
fn is_rate_limited(status: reqwest::StatusCode, body: &[u8]) -> bool {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    status == reqwest::StatusCode::OK
        && serde_json::from_slice::<IndiaMartEnvelope>(body)
            .map(|env| env.code == Some(429))
            .unwrap_or(false)
}

/// Only bodies that look like a successful listing replace the snapshot.
fn is_snapshot_worthy(body: &[u8]) -> bool {
    serde_json::from_slice::<IndiaMartEnvelope>(body)
        .map(|env| env.code.is_none_or(|c| c == 200))
        .unwrap_or(false)
}

impl IndiaMartService {
    pub fn new(config: IndiaMartConfig, crm_repo: CrmRepository) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            config: Arc::new(config),
            crm_repo,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Concurrent calls with the same API key share one upstream fetch and
    /// all receive its outcome.
    pub async fn fetch_leads(&self, query: &IndiaMartQuery) -> Result<ProxyResponse, AppError> {
        let key = query.api_key.trim().to_string();
        if key.is_empty() {
            return Err(AppError::invalid_field("api_key", "api_key is required"));
        }

        let mut receiver = {
            let mut in_flight = self.in_flight.lock().await;
            match in_flight.get(&key) {
                Some(existing) => {
                    tracing::info!("Joining an in-flight IndiaMART fetch");
                    existing.clone()
                }
                None => {
                    let (sender, receiver) = watch::channel(None);
                    in_flight.insert(key.clone(), receiver.clone());

                    // Runs detached so a cancelled leader still publishes.
                    let service = self.clone();
                    let query = query.clone();
                    tokio::spawn(async move {
                        let outcome = service.fetch_with_retries(&query).await;
                        service.in_flight.lock().await.remove(&key);
                        sender.send_replace(Some(Arc::new(outcome)));
                    });

                    receiver
                }
            }
        };

        let outcome = receiver
            .wait_for(Option::is_some)
            .await
            .map_err(|_| anyhow::anyhow!("IndiaMART fetch task ended without a result"))?
            .clone()
            .ok_or_else(|| anyhow::anyhow!("IndiaMART fetch produced no outcome"))?;

        match outcome.as_ref() {
            Ok(response) => Ok(response.clone()),
            Err(failure) => Err(failure.clone().into()),
        }
    }

    /// Fetches and stores every returned entry as a lead, skipping the ones
    /// already imported.
    pub async fn sync(&self, query: &IndiaMartQuery) -> Result<SyncSummary, AppError> {
        let response = self.fetch_leads(query).await?;
        if response.status != 200 {
            return Err(AppError::BadRequest(format!(
                "IndiaMART responded with status {}",
                response.status
            )));
        }

        let envelope: IndiaMartEnvelope = serde_json::from_slice(&response.body)
            .map_err(|e| anyhow::anyhow!("IndiaMART body is not a lead listing: {}", e))?;
        let entries = envelope.into_leads();
        let inserted = self.crm_repo.import_external_leads(&entries).await?;

        tracing::info!(
            fetched = entries.len(),
            inserted,
            source = response.source.as_str(),
            "✅ IndiaMART leads synchronized"
        );

        Ok(SyncSummary {
            fetched: entries.len(),
            inserted,
            source: response.source.as_str().to_string(),
        })
    }

    async fn fetch_with_retries(&self, query: &IndiaMartQuery) -> Outcome {
        let mut params = vec![("glusr_crm_key", query.api_key.trim())];
        if let Some(start) = non_blank(query.start_time.as_deref()) {
            params.push(("start_time", start));
        }
        if let Some(end) = non_blank(query.end_time.as_deref()) {
            params.push(("end_time", end));
        }

        let mut attempt = 0u32;
        loop {
            let response = self
                .client
                .get(&self.config.base_url)
                .query(&params)
                .send()
                .await
                .map_err(|e| FetchFailure::Transport(e.to_string()))?;

            let status = response.status();
            let requested_delay = retry_after(response.headers());
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response
                .bytes()
                .await
                .map_err(|e| FetchFailure::Transport(e.to_string()))?
                .to_vec();

            if is_rate_limited(status, &body) {
                if attempt >= self.config.max_retries {
                    break;
                }
                let delay = requested_delay
                    .unwrap_or_else(|| backoff_delay(self.config.backoff, attempt))
                    .min(self.config.max_retry_delay);
                attempt += 1;
                tracing::warn!(
                    attempt,
                    max_retries = self.config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "IndiaMART rate limited, retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if status == reqwest::StatusCode::OK {
                if is_snapshot_worthy(&body) {
                    self.write_snapshot(&body).await;
                }
                return Ok(ProxyResponse {
                    status: status.as_u16(),
                    content_type,
                    body,
                    source: DataSource::Live,
                });
            }

            tracing::info!(status = status.as_u16(), "Passing IndiaMART response through");
            return Ok(ProxyResponse {
                status: status.as_u16(),
                content_type,
                body,
                source: DataSource::Passthrough,
            });
        }

        self.read_snapshot().await
    }

    async fn read_snapshot(&self) -> Outcome {
        match tokio::fs::read(&self.config.snapshot_path).await {
            Ok(body) => {
                tracing::warn!(
                    path = %self.config.snapshot_path.display(),
                    "IndiaMART retries exhausted, serving snapshot"
                );
                Ok(ProxyResponse {
                    status: 200,
                    content_type: Some("application/json".to_string()),
                    body,
                    source: DataSource::Cache,
                })
            }
            Err(_) => {
                tracing::warn!("IndiaMART retries exhausted and no snapshot is available");
                Err(FetchFailure::RateLimited(
                    "IndiaMART rate limit reached and no cached leads are available.".to_string(),
                ))
            }
        }
    }

    async fn write_snapshot(&self, body: &[u8]) {
        let path = &self.config.snapshot_path;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if let Err(e) = tokio::fs::create_dir_all(dir).await {
                tracing::warn!("Could not create snapshot dir {}: {}", dir.display(), e);
                return;
            }
        }
        if let Err(e) = tokio::fs::write(path, body).await {
            tracing::warn!("Could not write IndiaMART snapshot {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue as ReqHeaderValue;

    #[test]
    fn backoff_doubles_per_attempt() {
        let base = Duration::from_millis(2000);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(2000));
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(4000));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(16000));
        assert!(backoff_delay(base, 200) > Duration::from_secs(86_400));
    }

    #[test]
    fn retry_after_is_read_in_seconds() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, ReqHeaderValue::from_static("7"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));

        headers.insert(RETRY_AFTER, ReqHeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn throttling_is_detected_in_status_or_body() {
        use reqwest::StatusCode;

        assert!(is_rate_limited(StatusCode::TOO_MANY_REQUESTS, b""));
        assert!(is_rate_limited(
            StatusCode::OK,
            br#"{"CODE":429,"STATUS":"FAILURE","MESSAGE":"Too many requests"}"#
        ));
        assert!(!is_rate_limited(StatusCode::OK, br#"{"CODE":200,"RESPONSE":[]}"#));
        assert!(!is_rate_limited(StatusCode::INTERNAL_SERVER_ERROR, br#"{"CODE":429}"#));
    }

    #[test]
    fn only_successful_listings_replace_the_snapshot() {
        assert!(is_snapshot_worthy(br#"{"CODE":200,"STATUS":"SUCCESS","RESPONSE":[]}"#));
        assert!(is_snapshot_worthy(br#"{"DATA":[]}"#));
        assert!(!is_snapshot_worthy(br#"{"CODE":429,"STATUS":"FAILURE"}"#));
        assert!(!is_snapshot_worthy(b"<html>oops</html>"));
    }

    #[test]
    fn cache_responses_are_tagged() {
        let response = ProxyResponse {
            status: 200,
            content_type: None,
            body: b"{}".to_vec(),
            source: DataSource::Cache,
        }
        .to_response();
        assert_eq!(response.headers()[DATA_SOURCE_HEADER], "cache");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }
}

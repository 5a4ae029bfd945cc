//! Face comparison service client
//!
//! The comparison service is an opaque scored classifier:
//! `POST {base_url}/compare-faces` with `{"known_image", "unknown_image"}`
//! answers `{"score": <0-100>}`. Older deployments answer the same number
//! under `result`, which is accepted too.

use crate::models::ImageRef;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use serde::Serialize;
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("idv-verify/", env!("CARGO_PKG_VERSION"));
const COMPARE_PATH: &str = "/compare-faces";

/// Face comparison errors
#[derive(Debug, Clone, Error)]
pub enum FaceComparisonError {
    /// Connection refused, DNS failure, non-2xx status...
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// No answer within the configured timeout
    #[error("Comparison timed out after {0:?}")]
    Timeout(Duration),

    /// Answer received but no usable score in it
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl FaceComparisonError {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FaceComparisonError::TransportFailure(_) | FaceComparisonError::Timeout(_)
        )
    }
}

/// Something that can score the similarity of two face images
#[async_trait]
pub trait FaceComparator: Send + Sync {
    /// Similarity of `unknown` to `known`, within 0-100
    async fn compare(&self, known: &ImageRef, unknown: &ImageRef) -> Result<f64, FaceComparisonError>;
}

#[derive(Debug, Serialize)]
struct CompareRequest<'a> {
    known_image: &'a str,
    unknown_image: &'a str,
}

/// Pull the confidence out of a response body
///
/// Prefers `score`, falls back to `result` when `score` is absent or null.
/// Anything that is not a number
/// within 0-100 is malformed.
pub fn extract_score(body: &serde_json::Value) -> Result<f64, FaceComparisonError> {
    let field = body
        .get("score")
        .filter(|v| !v.is_null())
        .or_else(|| body.get("result").filter(|v| !v.is_null()))
        .ok_or_else(|| FaceComparisonError::MalformedResponse("missing score field".to_string()))?;

    let score = field.as_f64().ok_or_else(|| {
        FaceComparisonError::MalformedResponse(format!("score is not a number: {}", field))
    })?;

    if !(0.0..=100.0).contains(&score) {
        return Err(FaceComparisonError::MalformedResponse(format!(
            "score {} outside 0-100",
            score
        )));
    }
    Ok(score)
}

/// HTTP client for the comparison service, rate limited
pub struct HttpFaceComparator {
    http_client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    rate_limiter: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl HttpFaceComparator {
    /// * `base_url` - service root, e.g. `http://localhost:8000`
    /// * `timeout` - transport-level timeout per request
    /// * `min_interval` - minimum spacing between requests
    pub fn new(
        base_url: &str,
        timeout: Duration,
        min_interval: Duration,
    ) -> Result<Self, FaceComparisonError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FaceComparisonError::TransportFailure(e.to_string()))?;

        // Quota needs a non-zero period
        let period = min_interval.max(Duration::from_millis(1));
        let quota = Quota::with_period(period)
            .ok_or_else(|| FaceComparisonError::TransportFailure("invalid rate limit period".to_string()))?
            .allow_burst(NonZeroU32::MIN);

        Ok(Self {
            http_client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), COMPARE_PATH),
            timeout,
            rate_limiter: RateLimiter::direct(quota),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl FaceComparator for HttpFaceComparator {
    async fn compare(&self, known: &ImageRef, unknown: &ImageRef) -> Result<f64, FaceComparisonError> {
        self.rate_limiter.until_ready().await;

        tracing::debug!(known = %known, unknown = %unknown, "Requesting face comparison");

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&CompareRequest {
                known_image: known.as_str(),
                unknown_image: unknown.as_str(),
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FaceComparisonError::Timeout(self.timeout)
                } else {
                    FaceComparisonError::TransportFailure(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(FaceComparisonError::TransportFailure(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FaceComparisonError::MalformedResponse(e.to_string()))?;

        let score = extract_score(&body)?;
        tracing::debug!(score, "Face comparison answered");
        Ok(score)
    }
}

//! Client-side helper for guarding sensitive actions with the limiter function.
//!
//! The helper fails open: if the limiter cannot be reached or answers with
//! anything other than a decision, the guarded action is allowed. Only an
//! explicit 429 from the limiter blocks.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::LimiterError;
use crate::models::{LimitedBody, RateLimitRequest};
use crate::rate_limit::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_MINUTES};

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please try again later.";

/// Policy overrides; unset fields fall back to 100 requests per minute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: Option<i64>,
    pub window_minutes: Option<i64>,
}

impl RateLimitPolicy {
    pub fn new(max_requests: i64, window_minutes: i64) -> Self {
        Self {
            max_requests: Some(max_requests),
            window_minutes: Some(window_minutes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitOptions {
    pub endpoint: String,
    pub policy: RateLimitPolicy,
}

impl RateLimitOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            policy: RateLimitPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RateLimitPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: i64,
    pub reset_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RateLimitResult {
    /// Decision used when the limiter itself is unavailable.
    pub fn fail_open(max_requests: i64) -> Self {
        Self {
            allowed: true,
            remaining: max_requests,
            reset_at: String::new(),
            error: None,
        }
    }
}

/// Returned by [`RateLimitClient::with_rate_limit`] instead of running the action.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{error}")]
pub struct RateLimited {
    pub error: String,
    #[serde(rename = "retryAfter")]
    pub retry_after: String,
}

#[derive(Clone)]
pub struct RateLimitClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl RateLimitClient {
    pub fn new(config: ClientConfig) -> Result<Self, LimiterError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Asks the limiter whether `options.endpoint` may proceed. Never fails.
    pub async fn check_rate_limit(&self, options: &RateLimitOptions) -> RateLimitResult {
        let max_requests = options.policy.max_requests.unwrap_or(DEFAULT_MAX_REQUESTS);
        let window_minutes = options.policy.window_minutes.unwrap_or(DEFAULT_WINDOW_MINUTES);

        match self.invoke(&options.endpoint, max_requests, window_minutes).await {
            Ok(result) => result,
            Err(e) => {
                // fail open
                warn!(endpoint = %options.endpoint, error = %e, "Rate limit check failed, allowing request");
                RateLimitResult::fail_open(max_requests)
            }
        }
    }

    /// Runs `callback` once if the limiter allows it, otherwise returns [`RateLimited`].
    pub async fn with_rate_limit<T, F, Fut>(
        &self,
        endpoint: &str,
        callback: F,
        policy: RateLimitPolicy,
    ) -> Result<T, RateLimited>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let options = RateLimitOptions::new(endpoint).with_policy(policy);
        let result = self.check_rate_limit(&options).await;

        if !result.allowed {
            debug!(endpoint, retry_after = %result.reset_at, "Guarded action blocked");
            return Err(RateLimited {
                error: RATE_LIMITED_MESSAGE.to_string(),
                retry_after: result.reset_at,
            });
        }

        Ok(callback().await)
    }

    async fn invoke(
        &self,
        endpoint: &str,
        max_requests: i64,
        window_minutes: i64,
    ) -> Result<RateLimitResult, LimiterError> {
        let body = RateLimitRequest {
            endpoint: Some(endpoint.to_string()),
            max_requests: Some(max_requests),
            window_minutes: Some(window_minutes),
        };

        let mut request = self.http.post(&self.config.function_url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }
        let response = request.send().await?;

        match response.status() {
            StatusCode::OK => response
                .json::<RateLimitResult>()
                .await
                .map_err(|e| LimiterError::MalformedResponse(e.to_string())),
            StatusCode::TOO_MANY_REQUESTS => {
                let limited: LimitedBody = response
                    .json()
                    .await
                    .map_err(|e| LimiterError::MalformedResponse(e.to_string()))?;
                Ok(RateLimitResult {
                    allowed: false,
                    remaining: 0,
                    reset_at: limited.retry_after,
                    error: Some(limited.error),
                })
            }
            status => Err(LimiterError::Store(format!("rate limiter responded with {status}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_open_allows_full_budget() {
        let result = RateLimitResult::fail_open(7);
        assert!(result.allowed);
        assert_eq!(result.remaining, 7);
        assert_eq!(result.reset_at, "");
        assert_eq!(result.error, None);
    }

    #[test]
    fn rate_limited_serializes_retry_after_in_camel_case() {
        let limited = RateLimited {
            error: RATE_LIMITED_MESSAGE.to_string(),
            retry_after: "2026-01-01T12:01:00.000Z".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&limited).unwrap(),
            serde_json::json!({
                "error": "Too many requests. Please try again later.",
                "retryAfter": "2026-01-01T12:01:00.000Z"
            })
        );
        assert_eq!(limited.to_string(), RATE_LIMITED_MESSAGE);
    }

    #[tokio::test]
    async fn unreachable_limiter_fails_open() {
        // port 9 on loopback: nothing listens, connection is refused
        let client = RateLimitClient::new(ClientConfig::new("http://127.0.0.1:9/rate-limiter")).unwrap();
        let options = RateLimitOptions::new("contact-form").with_policy(RateLimitPolicy::new(5, 1));
        let result = client.check_rate_limit(&options).await;
        assert_eq!(result, RateLimitResult::fail_open(5));
    }
}

//! Counting store backed by the hosted database.
//!
//! The database owns the `rate_limits` table and two functions, reached through
//! the REST RPC surface:
//!
//! - `check_rate_limit(p_ip_address, p_endpoint, p_max_requests, p_window_minutes)`
//!   returns a single `{allowed, remaining, reset_at}` row and performs the
//!   upsert-and-increment atomically in one statement.
//! - `cleanup_old_rate_limits()` deletes stale buckets on the database's own terms.

use async_trait::async_trait;
use chrono::TimeDelta;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::error::LimiterError;
use crate::models::RateLimitDecision;
use crate::rate_limit::{CountingStore, window_length};

const STORE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct CheckRateLimitArgs<'a> {
    p_ip_address: &'a str,
    p_endpoint: &'a str,
    p_max_requests: i64,
    p_window_minutes: i64,
}

pub struct PostgrestStore {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl PostgrestStore {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Result<Self, LimiterError> {
        let client = reqwest::Client::builder().timeout(STORE_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
        })
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, function)
    }

    async fn call_rpc<A: Serialize + ?Sized>(
        &self,
        function: &str,
        args: &A,
    ) -> Result<reqwest::Response, LimiterError> {
        let response = self
            .client
            .post(self.rpc_url(function))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(args)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LimiterError::Store(format!("{function} returned {status}: {body}")));
        }
        Ok(response)
    }
}

#[async_trait]
impl CountingStore for PostgrestStore {
    async fn check_rate_limit(
        &self,
        address: &str,
        endpoint: &str,
        max_requests: i64,
        window_minutes: i64,
    ) -> Result<RateLimitDecision, LimiterError> {
        window_length(window_minutes)?;

        let args = CheckRateLimitArgs {
            p_ip_address: address,
            p_endpoint: endpoint,
            p_max_requests: max_requests,
            p_window_minutes: window_minutes,
        };
        let response = self.call_rpc("check_rate_limit", &args).await?;
        let rows: Vec<RateLimitDecision> = response
            .json()
            .await
            .map_err(|e| LimiterError::MalformedResponse(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| LimiterError::MalformedResponse("check_rate_limit returned no rows".into()))
    }

    async fn cleanup_expired(&self, _retention: TimeDelta) -> Result<Option<usize>, LimiterError> {
        // retention is decided by the database function itself
        self.call_rpc("cleanup_old_rate_limits", &serde_json::json!({})).await?;
        debug!("cleanup_old_rate_limits completed");
        Ok(None)
    }
}

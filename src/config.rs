use clap::{Parser, ValueEnum};
use std::time::Duration;

use crate::error::LimiterError;
use crate::rate_limit::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_MINUTES};

pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

// Where buckets live
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Postgrest,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "endpoint-limiter")]
#[command(about = "Per-address, per-endpoint request limiter")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    // Ceiling used when the request body has no max_requests
    #[arg(long, default_value_t = DEFAULT_MAX_REQUESTS)]
    pub default_max_requests: i64,

    // Window used when the request body has no window_minutes
    #[arg(long, default_value_t = DEFAULT_WINDOW_MINUTES, value_parser = clap::value_parser!(i64).range(1..=525_600))]
    pub default_window_minutes: i64,

    #[arg(long, value_enum, default_value_t = StoreKind::Memory)]
    pub store: StoreKind,

    // Hosted database URL (postgrest store only)
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    pub service_role_key: Option<String>,

    // Seconds between stale bucket sweeps
    #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
    pub sweep_interval: u64,

    // Minutes a bucket is kept after its window ends
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(i64).range(0..=525_600))]
    pub sweep_retention: i64,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Args {
    /// URL and key for the postgrest store, or a config error naming what is missing.
    pub fn postgrest_credentials(&self) -> Result<(String, String), LimiterError> {
        let url = self
            .supabase_url
            .clone()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| LimiterError::Config("--supabase-url / SUPABASE_URL is required".into()))?;
        let key = self
            .service_role_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                LimiterError::Config(
                    "--service-role-key / SUPABASE_SERVICE_ROLE_KEY is required".into(),
                )
            })?;
        Ok((url, key))
    }
}

/// Settings for [`crate::client::RateLimitClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Full URL of the limiter function, e.g. `https://host/rate-limiter`
    pub function_url: String,
    /// Sent as `apikey` and bearer token when present
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(function_url: impl Into<String>) -> Self {
        Self {
            function_url: function_url.into(),
            api_key: None,
            timeout: DEFAULT_CLIENT_TIMEOUT,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["endpoint-limiter"]).unwrap();
        assert_eq!(args.port, 8080);
        assert_eq!(args.default_max_requests, 100);
        assert_eq!(args.default_window_minutes, 1);
        assert_eq!(args.store, StoreKind::Memory);
        assert_eq!(args.sweep_interval, 300);
        assert_eq!(args.sweep_retention, 60);
        assert_eq!(args.log_format, LogFormat::Text);
    }

    #[test]
    fn rejects_non_positive_default_window() {
        assert!(Args::try_parse_from(["endpoint-limiter", "--default-window-minutes", "0"]).is_err());
        assert!(Args::try_parse_from(["endpoint-limiter", "--sweep-interval", "0"]).is_err());
    }

    #[test]
    fn postgrest_requires_credentials() {
        let args = Args::try_parse_from([
            "endpoint-limiter",
            "--store",
            "postgrest",
            "--supabase-url",
            "https://db.example.test",
            "--service-role-key",
            "",
        ])
        .unwrap();
        assert!(matches!(args.postgrest_credentials(), Err(LimiterError::Config(_))));

        let args = Args::try_parse_from([
            "endpoint-limiter",
            "--store",
            "postgrest",
            "--supabase-url",
            "https://db.example.test",
            "--service-role-key",
            "secret",
        ])
        .unwrap();
        let (url, key) = args.postgrest_credentials().unwrap();
        assert_eq!(url, "https://db.example.test");
        assert_eq!(key, "secret");
    }

    #[test]
    fn client_config_builder() {
        let config = ClientConfig::new("http://localhost:8080/rate-limiter")
            .with_api_key("anon")
            .with_timeout(Duration::from_millis(250));
        assert_eq!(config.api_key.as_deref(), Some("anon"));
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(ClientConfig::new("x").timeout, DEFAULT_CLIENT_TIMEOUT);
    }
}

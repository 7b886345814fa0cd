use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

// Limiter function request body
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RateLimitRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_requests: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_minutes: Option<i64>,
}

/// Outcome of one counting call. Also the row shape returned by the
/// datastore's `check_rate_limit` function.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: i64,
    pub reset_at: DateTime<Utc>,
}

// 200 body
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct AllowedBody {
    pub allowed: bool,
    pub remaining: i64,
    pub reset_at: String,
}

// 429 body
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct LimitedBody {
    pub error: String,
    pub message: String,
    pub retry_after: String,
}

// 400 / 500 body
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn to_iso8601(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn iso8601_uses_millis_and_zulu() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 12, 1, 0).unwrap();
        assert_eq!(to_iso8601(&at), "2026-01-01T12:01:00.000Z");
    }

    #[test]
    fn request_fields_are_optional() {
        let req: RateLimitRequest = serde_json::from_str(r#"{"endpoint":"contact-form"}"#).unwrap();
        assert_eq!(req.endpoint.as_deref(), Some("contact-form"));
        assert_eq!(req.max_requests, None);
        assert_eq!(req.window_minutes, None);

        let empty: RateLimitRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, RateLimitRequest::default());
    }

    #[test]
    fn decision_parses_datastore_row() {
        let row = r#"{"allowed":true,"remaining":3,"reset_at":"2026-01-01T12:01:00.123456+00:00"}"#;
        let decision: RateLimitDecision = serde_json::from_str(row).unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 3);
        assert_eq!(to_iso8601(&decision.reset_at), "2026-01-01T12:01:00.123Z");
    }
}

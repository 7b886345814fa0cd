use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::cors::{LIMIT_HEADER, REMAINING_HEADER, RESET_HEADER};
use crate::error::{ApiError, LimiterError};
use crate::metrics::{CHECK_LATENCY, CHECKS_TOTAL, REJECTIONS_TOTAL, STORE_ERRORS_TOTAL};
use crate::models::{AllowedBody, LimitedBody, RateLimitRequest, to_iso8601};
use crate::rate_limit::window_length;
use crate::state::AppState;

/// Caller identity: first `x-forwarded-for` entry, then `x-real-ip`, then "unknown".
pub fn client_address(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    forwarded.or(real_ip).unwrap_or("unknown").to_string()
}

/// Counts one request and answers 200 or 429 with rate limit headers.
///
/// Store failures answer 500: this is the system of record, so it never turns
/// its own errors into an allow.
pub async fn check_limit_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    CHECKS_TOTAL.inc();

    let client_ip = client_address(&headers);
    info!(ip = %client_ip, "Rate limit check");

    // parsed regardless of content type
    let request: RateLimitRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidBody(e.to_string()))?;
    let endpoint = match request.endpoint {
        Some(endpoint) if !endpoint.is_empty() => endpoint,
        _ => return Err(ApiError::MissingEndpoint),
    };
    let max_requests = request.max_requests.unwrap_or(state.default_max_requests);
    let window_minutes = request.window_minutes.unwrap_or(state.default_window_minutes);
    window_length(window_minutes)?;

    let start_time = Instant::now();
    let result = state
        .store
        .check_rate_limit(&client_ip, &endpoint, max_requests, window_minutes)
        .await;
    CHECK_LATENCY.observe(start_time.elapsed().as_secs_f64());

    let decision = result.map_err(|e| {
        if !matches!(e, LimiterError::InvalidWindow(_)) {
            STORE_ERRORS_TOTAL.inc();
            error!(ip = %client_ip, endpoint = %endpoint, error = %e, "Rate limit check error");
        }
        ApiError::from(e)
    })?;

    info!(
        ip = %client_ip,
        endpoint = %endpoint,
        allowed = decision.allowed,
        remaining = decision.remaining,
        "Rate limit result"
    );

    let reset_at = to_iso8601(&decision.reset_at);
    let rate_headers = [
        (LIMIT_HEADER, max_requests.to_string()),
        (REMAINING_HEADER, decision.remaining.to_string()),
        (RESET_HEADER, reset_at.clone()),
    ];

    if !decision.allowed {
        REJECTIONS_TOTAL.inc();
        let body = LimitedBody {
            error: "Too many requests".to_string(),
            message: format!("Rate limit exceeded. Try again after {reset_at}"),
            retry_after: reset_at,
        };
        return Ok((StatusCode::TOO_MANY_REQUESTS, rate_headers, Json(body)).into_response());
    }

    let body = AllowedBody {
        allowed: true,
        remaining: decision.remaining,
        reset_at,
    };
    Ok((StatusCode::OK, rate_headers, Json(body)).into_response())
}

// Own test binary: asserts on a process-wide counter.
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::TimeDelta;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use endpoint_limiter::error::LimiterError;
use endpoint_limiter::metrics::STORE_ERRORS_TOTAL;
use endpoint_limiter::models::RateLimitDecision;
use endpoint_limiter::rate_limit::CountingStore;
use endpoint_limiter::router;
use endpoint_limiter::state::AppState;

struct WindowRejectingStore;

#[async_trait]
impl CountingStore for WindowRejectingStore {
    async fn check_rate_limit(&self, _: &str, _: &str, _: i64, window_minutes: i64) -> Result<RateLimitDecision, LimiterError> {
        Err(LimiterError::InvalidWindow(window_minutes))
    }

    async fn cleanup_expired(&self, _: TimeDelta) -> Result<Option<usize>, LimiterError> {
        Ok(None)
    }
}

#[tokio::test]
async fn store_window_rejection_is_not_an_infrastructure_error() {
    let app = router(Arc::new(AppState::new(Arc::new(WindowRejectingStore), 100, 1)));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/rate-limiter")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"endpoint": "contact-form"}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(STORE_ERRORS_TOTAL.get(), 0.0);
}

//! Per-address, per-endpoint request limiter.
//!
//! The crate has three cooperating pieces:
//!
//! - [`rate_limit`]: the counting procedure. A fixed window counter keyed by
//!   (caller address, endpoint name), behind the [`rate_limit::CountingStore`]
//!   trait with an in-process and a hosted-database implementation.
//! - [`handlers`]: the stateless limiter function. Extracts the caller address,
//!   delegates to the store and answers 200/429 with `X-RateLimit-*` headers.
//!   Store failures answer 500.
//! - [`client`]: the helper sensitive actions call through. Fails open on
//!   anything except an explicit 429.

use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;

pub mod client;
pub mod clock;
pub mod config;
pub mod cors;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod postgrest;
pub mod rate_limit;
pub mod state;
pub mod sweeper;

use crate::handlers::{check_limit_handler, health_handler, metrics_handler, not_found_handler};
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(check_limit_handler))
        .route("/rate-limiter", post(check_limit_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .fallback(not_found_handler)
        .layer(cors::cors_layer())
        .with_state(state)
}

use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref CHECKS_TOTAL: Counter =
        register_counter!("limiter_checks_total", "Total number of rate limit checks").expect("register limiter_checks_total");
    pub static ref REJECTIONS_TOTAL: Counter =
        register_counter!("limiter_rejections_total", "Checks answered with 429").expect("register limiter_rejections_total");
    pub static ref STORE_ERRORS_TOTAL: Counter =
        register_counter!("limiter_store_errors_total", "Counting store failures").expect("register limiter_store_errors_total");
    pub static ref CHECK_LATENCY: Histogram = register_histogram!(
        "limiter_check_latency_seconds",
        "Counting store latency in seconds"
    )
    .expect("register limiter_check_latency_seconds");
    pub static ref TRACKED_BUCKETS: Gauge =
        register_gauge!("limiter_tracked_buckets", "Buckets held by the in-memory store").expect("register limiter_tracked_buckets");
}

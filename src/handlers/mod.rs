mod check_limit;
mod fallback;
mod health;
mod metrics;

pub use check_limit::{check_limit_handler, client_address};
pub use fallback::not_found_handler;
pub use health::health_handler;
pub use metrics::metrics_handler;

use std::sync::Arc;

use crate::rate_limit::CountingStore;
// app's shared state

pub struct AppState {
    pub store: Arc<dyn CountingStore>,
    pub default_max_requests: i64, // when the body omits max_requests
    pub default_window_minutes: i64, // when the body omits window_minutes
}

impl AppState {
    pub fn new(store: Arc<dyn CountingStore>, default_max_requests: i64, default_window_minutes: i64) -> Self {
        Self {
            store,
            default_max_requests,
            default_window_minutes,
        }
    }
}

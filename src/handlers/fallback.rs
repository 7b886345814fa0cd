use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::models::ErrorBody;

// any path without a route
pub async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "Not found".to_string(),
        }),
    )
}

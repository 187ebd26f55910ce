#![forbid(unsafe_code)]

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use services::AppServices;

pub mod error;
mod practice;
mod units;

pub use error::ApiError;

/// Build the HTTP router over the assembled services.
#[must_use]
pub fn router(services: AppServices) -> Router {
    Router::new()
        .nest("/api/practice", practice::routes())
        .nest("/api/units", units::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(services)
}

//! Health check endpoints.

use crate::state::AppState;
use axum::{
    body::Body,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

/// Registers health check routes. These sit outside the gate so load
/// balancers never see the login page.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Returns a 200 OK status to indicate the service is running.
async fn health_check() -> impl IntoResponse {
    Response::new(Body::from("OK"))
}

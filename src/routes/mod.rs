//! HTTP route definitions and handlers.
//!
//! The demo site and its health check, with the gate layered over the site.

mod gate_middleware;
mod health_routes;
mod site_routes;

pub use gate_middleware::staging_middleware;

use crate::state::AppState;
use axum::{middleware, Router};

/// Creates the application router.
///
/// The gate wraps the site routes, including their fallback, so it also sees
/// its own `/_staging` assets. Health checks are merged afterwards and bypass
/// it.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(site_routes::routes())
        .layer(middleware::from_fn_with_state(
            state.gate.clone(),
            staging_middleware,
        ))
        .merge(health_routes::routes())
        .with_state(state)
}

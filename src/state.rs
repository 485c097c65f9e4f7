//! Shared application state.

use crate::auth::StagingGate;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// The gate, also handed to the middleware layer.
    pub gate: Arc<StagingGate>,
}

impl AppState {
    pub fn new(gate: StagingGate) -> Self {
        AppState {
            gate: Arc::new(gate),
        }
    }
}

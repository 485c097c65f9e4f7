//! Library exports for staging-gate, shared between the binary and tests.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod routing;
pub mod startup;
pub mod state;
pub mod templates;
pub mod utils;

pub use auth::{Callbacks, RequestContext, StagingGate};
pub use config::{Config, Options};
pub use error::GateError;

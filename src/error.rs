//! Error taxonomy for the gate.
//!
//! Every error here is recovered inside the gate and turned into a response;
//! none of them is ever returned to the host framework.

use http::StatusCode;
use thiserror::Error;

/// The gate is missing a piece of configuration it needs to authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("No password has been configured")]
    MissingPassword,
    #[error("No signing secret has been configured")]
    MissingSecret,
}

/// A visitor presented a credential that was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthenticationFailure {
    #[error("Invalid password")]
    InvalidPassword,
    #[error("Invalid or expired token")]
    InvalidToken,
}

/// A configured route pattern could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("empty route pattern")]
    Empty,
    #[error("route pattern '{0}' contains a run of three or more '*'")]
    InvalidWildcard(String),
    #[error("route pattern '{pattern}' could not be compiled: {reason}")]
    Regex { pattern: String, reason: String },
}

/// Anything that can go wrong while the engine processes a request.
#[derive(Debug, Error)]
pub enum GateError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Authentication(#[from] AuthenticationFailure),
    #[error("Failed to sign token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("Failed to render template: {0}")]
    Template(String),
    #[error("Callback failed: {0}")]
    Callback(String),
}

impl GateError {
    /// Shorthand for adapters reporting a failed callback.
    pub fn callback(message: impl Into<String>) -> Self {
        GateError::Callback(message.into())
    }

    /// Status code used when this error reaches the outer boundary.
    pub fn status(&self) -> StatusCode {
        match self {
            GateError::Authentication(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the visitor. Only the known error kinds
    /// expose their literal message.
    pub fn public_message(&self) -> String {
        match self {
            GateError::Configuration(e) => e.to_string(),
            GateError::Authentication(e) => e.to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

//! The seam between the gate and a web framework.
//!
//! The gate never touches framework types. It asks the adapter for effects
//! through [`Callbacks`]; each request ends with exactly one terminal effect
//! (`send_html`, `send_css`, `redirect` or `next`), or with `failure` when
//! processing itself went wrong.

use async_trait::async_trait;
use http::StatusCode;

use crate::error::GateError;
use crate::utils::cookie::CookieOptions;

#[async_trait]
pub trait Callbacks: Send {
    /// The adapter's native response type.
    type Response: Send;

    async fn send_html(
        &mut self,
        html: String,
        status: StatusCode,
    ) -> Result<Self::Response, GateError>;

    /// Serve the gate's stylesheet with `text/css` and status 200.
    async fn send_css(&mut self, css: &'static str) -> Result<Self::Response, GateError>;

    async fn redirect(&mut self, url: &str, status: StatusCode)
        -> Result<Self::Response, GateError>;

    async fn set_cookie(
        &mut self,
        name: &str,
        value: &str,
        options: &CookieOptions,
    ) -> Result<(), GateError>;

    async fn clear_cookie(&mut self, name: &str) -> Result<(), GateError>;

    /// Hosts with a session store override this together with the two
    /// session methods. Without one the gate keeps the return-to hint in a
    /// short-lived cookie instead.
    fn supports_session(&self) -> bool {
        false
    }

    async fn set_session_value(&mut self, _key: &str, _value: &str) -> Result<(), GateError> {
        Ok(())
    }

    async fn clear_session_value(&mut self, _key: &str) -> Result<(), GateError> {
        Ok(())
    }

    /// Let the request through to the protected application.
    async fn next(&mut self) -> Result<Self::Response, GateError>;

    /// Last-resort response when processing failed. Must not fail.
    fn failure(&mut self, status: StatusCode, message: &str) -> Self::Response;
}

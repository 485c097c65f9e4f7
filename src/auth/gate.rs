//! The per-request decision engine.
//!
//! [`StagingGate::handle`] classifies one request and drives the host through
//! [`Callbacks`]. Checks run in a fixed order and the first one that applies
//! decides the outcome:
//!
//! 1. gate disabled: pass through
//! 2. the gate's stylesheet: serve it
//! 3. anything else under `/_staging`: pass through
//! 4. no signing secret: setup page (500)
//! 5. no password: setup page (500)
//! 6. login form submission: check the password, set the cookie and redirect
//! 7. login path otherwise: login page
//! 8. unprotected path: pass through
//! 9. valid token: pass through
//! 10. stale token: clear it, then as 11
//! 11. remember where the visitor was going and show the login page (401)

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use http::{Method, StatusCode};
use tracing::{debug, error, info, warn};

use crate::auth::callbacks::Callbacks;
use crate::auth::context::RequestContext;
use crate::auth::token;
use crate::config::{Config, Options};
use crate::error::{AuthenticationFailure, GateError};
use crate::routing::{is_protected, normalize};
use crate::templates;
use crate::utils::cookie::CookieOptions;
use crate::utils::crypto::constant_time_eq;

/// Every path under this prefix belongs to the gate itself.
pub const STATIC_PREFIX: &str = "/_staging";
pub const CSS_ROUTE: &str = "/_staging/styles.css";

pub const AUTH_COOKIE: &str = "staging";
pub const RETURN_TO_KEY: &str = "returnTo";
pub const RETURN_TO_COOKIE: &str = "staging_returnTo";
pub const RETURN_TO_MAX_AGE: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct StagingGate {
    config: Arc<Config>,
}

impl StagingGate {
    pub fn new(config: Config) -> Self {
        StagingGate {
            config: Arc::new(config),
        }
    }

    /// Builds a gate from caller options layered over the `STAGING_*`
    /// environment and the built-in defaults.
    pub fn from_options(options: Options) -> Self {
        Self::new(Config::from_env_and(options))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Processes one request. Always produces a response: errors and panics
    /// raised while processing end in `callbacks.failure`.
    pub async fn handle<C: Callbacks>(&self, ctx: RequestContext, callbacks: &mut C) -> C::Response {
        let outcome = AssertUnwindSafe(self.process(&ctx, callbacks))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                error!(path = %ctx.path, "Gate failed to process request: {}", err);
                callbacks.failure(err.status(), &err.public_message())
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(path = %ctx.path, "Gate panicked while processing request: {}", reason);
                callbacks.failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }

    async fn process<C: Callbacks>(
        &self,
        ctx: &RequestContext,
        callbacks: &mut C,
    ) -> Result<C::Response, GateError> {
        let config = &self.config;

        if !config.enabled() {
            debug!(path = %ctx.path, "Gate disabled, passing through");
            return callbacks.next().await;
        }

        let path = normalize(&ctx.path);

        if path == CSS_ROUTE {
            return callbacks.send_css(templates::STYLES).await;
        }
        if is_reserved(&path) {
            return callbacks.next().await;
        }

        if let Err(missing) = config.validate() {
            warn!(path = %path, "Gate is not configured: {}", missing);
            let html = templates::setup_page(config, missing)?;
            return callbacks
                .send_html(html, StatusCode::INTERNAL_SERVER_ERROR)
                .await;
        }

        let on_login_path = path == config.login_path();

        if on_login_path && ctx.method == Method::POST {
            return self.login(ctx, callbacks).await;
        }
        if on_login_path {
            let html = templates::login_page(config, None)?;
            return callbacks.send_html(html, StatusCode::OK).await;
        }

        if !is_protected(&path, config) {
            debug!(path = %path, "Unprotected path, passing through");
            return callbacks.next().await;
        }

        if let Some(token) = auth_cookie(ctx) {
            if token::verify(token, config) {
                debug!(path = %path, "Valid auth token, passing through");
                return callbacks.next().await;
            }
            warn!(path = %path, "{}, clearing cookie", AuthenticationFailure::InvalidToken);
            callbacks.clear_cookie(AUTH_COOKIE).await?;
        }

        self.remember_return_to(ctx, &path, callbacks).await?;
        debug!(path = %path, "Challenging unauthenticated request");
        let html = templates::login_page(config, None)?;
        callbacks.send_html(html, StatusCode::UNAUTHORIZED).await
    }

    async fn login<C: Callbacks>(
        &self,
        ctx: &RequestContext,
        callbacks: &mut C,
    ) -> Result<C::Response, GateError> {
        let config = &self.config;
        let accepted = ctx
            .password
            .as_deref()
            .map(|submitted| constant_time_eq(submitted.as_bytes(), config.password().as_bytes()))
            .unwrap_or(false);

        if !accepted {
            warn!("Rejected login attempt: {}", AuthenticationFailure::InvalidPassword);
            let html = templates::login_page(config, Some(AuthenticationFailure::InvalidPassword))?;
            return callbacks.send_html(html, StatusCode::UNAUTHORIZED).await;
        }

        let token = token::issue(config)?;
        let options = CookieOptions {
            max_age: Some(config.cookie_max_age()),
            secure: config.secure_cookies(),
            ..CookieOptions::default()
        };
        callbacks.set_cookie(AUTH_COOKIE, &token, &options).await?;

        let destination = self.destination_after_login(ctx, callbacks).await?;
        info!(destination = %destination, "Visitor logged in");
        callbacks.redirect(&destination, StatusCode::SEE_OTHER).await
    }

    /// Picks where to send a freshly logged-in visitor and consumes any
    /// return-to hint on the way.
    async fn destination_after_login<C: Callbacks>(
        &self,
        ctx: &RequestContext,
        callbacks: &mut C,
    ) -> Result<String, GateError> {
        let session_hint = non_empty(ctx.session_hints.get(RETURN_TO_KEY));
        let cookie_hint = non_empty(ctx.cookies.get(RETURN_TO_COOKIE));

        if session_hint.is_some() {
            callbacks.clear_session_value(RETURN_TO_KEY).await?;
        }
        if cookie_hint.is_some() {
            callbacks.clear_cookie(RETURN_TO_COOKIE).await?;
        }

        let original = non_empty(ctx.original_url.as_ref())
            .filter(|url| !self.is_login_url(url));

        let destination = session_hint
            .filter(|url| is_local(url))
            .or_else(|| cookie_hint.filter(|url| is_local(url)))
            .or_else(|| original.filter(|url| is_local(url)))
            .map(str::to_string)
            .unwrap_or_else(|| self.config.redirect_url().to_string());

        Ok(destination)
    }

    async fn remember_return_to<C: Callbacks>(
        &self,
        ctx: &RequestContext,
        path: &str,
        callbacks: &mut C,
    ) -> Result<(), GateError> {
        let target = non_empty(ctx.original_url.as_ref()).unwrap_or(path);
        if !is_local(target) || self.is_login_url(target) {
            return Ok(());
        }

        if callbacks.supports_session() {
            callbacks.set_session_value(RETURN_TO_KEY, target).await
        } else {
            let options = CookieOptions {
                max_age: Some(RETURN_TO_MAX_AGE),
                ..CookieOptions::default()
            };
            callbacks.set_cookie(RETURN_TO_COOKIE, target, &options).await
        }
    }

    fn is_login_url(&self, url: &str) -> bool {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        normalize(path) == self.config.login_path()
    }
}

fn auth_cookie(ctx: &RequestContext) -> Option<&str> {
    non_empty(ctx.cookies.get(AUTH_COOKIE))
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// `/_staging` itself and everything beneath it, but not `/_stagingarea`.
fn is_reserved(path: &str) -> bool {
    path.strip_prefix(STATIC_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Only same-site absolute paths are followed. Browsers treat both `//host`
/// and `/\host` as a different host.
fn is_local(url: &str) -> bool {
    let mut chars = url.chars();
    chars.next() == Some('/') && !matches!(chars.next(), Some('/') | Some('\\'))
}

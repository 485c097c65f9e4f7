//! Axum adapter for the gate.
//!
//! [`staging_middleware`] turns an axum request into a [`RequestContext`],
//! runs the gate and maps its effects onto axum responses. Cookies the gate
//! sets before letting a request through are appended to the downstream
//! response.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::extract::{Form, FromRequest, OriginalUri, Request, State};
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use tracing::debug;

use crate::auth::{Callbacks, RequestContext, StagingGate};
use crate::error::GateError;
use crate::routing::normalize;
use crate::utils::cookie::{clear_cookie, parse_cookie_header, CookieOptions};
use crate::utils::http_helpers::HTTPError;

/// Login submissions are tiny; anything larger is not a login form.
const MAX_LOGIN_BODY_BYTES: usize = 16 * 1024;

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(default)]
    password: Option<String>,
}

/// Middleware placing the gate in front of every route of a router.
///
/// ```ignore
/// let app = Router::new()
///     .route("/", get(index))
///     .layer(middleware::from_fn_with_state(gate, staging_middleware));
/// ```
pub async fn staging_middleware(
    State(gate): State<Arc<StagingGate>>,
    request: Request,
    next: Next,
) -> Response {
    let (ctx, request) = match request_context(&gate, request).await {
        Ok(parts) => parts,
        Err(e) => return e.into_response(),
    };

    let mut callbacks = AxumCallbacks::new(request, next);
    gate.handle(ctx, &mut callbacks).await
}

/// Builds the gate's view of the request. The body is only consumed for a
/// login submission, and is put back for the downstream handler.
async fn request_context(
    gate: &StagingGate,
    request: Request,
) -> Result<(RequestContext, Request), HTTPError> {
    let path = request.uri().path().to_string();
    let original_url = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| &uri.0)
        .unwrap_or(request.uri())
        .path_and_query()
        .map(|pq| pq.as_str().to_string());

    let mut cookies = HashMap::new();
    for header in request.headers().get_all(COOKIE) {
        let Ok(header) = header.to_str() else {
            continue;
        };
        for (name, value) in parse_cookie_header(header) {
            cookies.entry(name).or_insert(value);
        }
    }

    let mut ctx = RequestContext::new(request.method().clone(), path).with_cookies(cookies);
    ctx.original_url = original_url;

    let is_login_submission = gate.config().enabled()
        && request.method() == Method::POST
        && normalize(&ctx.path) == gate.config().login_path();
    if !is_login_submission {
        return Ok((ctx, request));
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_LOGIN_BODY_BYTES)
        .await
        .map_err(|e| HTTPError::new(StatusCode::BAD_REQUEST, format!("Unreadable body: {}", e)))?;

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    ctx.password = login_password(&content_type, bytes.clone()).await;

    Ok((ctx, Request::from_parts(parts, Body::from(bytes))))
}

async fn login_password(content_type: &str, bytes: axum::body::Bytes) -> Option<String> {
    if content_type.starts_with("application/json") {
        return serde_json::from_slice::<LoginForm>(&bytes)
            .ok()
            .and_then(|form| form.password);
    }

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(bytes))
        .ok()?;
    match Form::<LoginForm>::from_request(request, &()).await {
        Ok(Form(form)) => form.password,
        Err(rejection) => {
            debug!("Login submission without a usable form body: {}", rejection);
            None
        }
    }
}

/// Effects for one axum request.
struct AxumCallbacks {
    pending: Option<(Request, Next)>,
    cookies: Vec<HeaderValue>,
}

impl AxumCallbacks {
    fn new(request: Request, next: Next) -> Self {
        AxumCallbacks {
            pending: Some((request, next)),
            cookies: Vec::new(),
        }
    }

    fn with_cookies(&mut self, mut response: Response) -> Response {
        let headers = response.headers_mut();
        for cookie in self.cookies.drain(..) {
            headers.append(SET_COOKIE, cookie);
        }
        response
    }

    fn push_cookie(&mut self, header: String) -> Result<(), GateError> {
        let value = HeaderValue::from_str(&header)
            .map_err(|e| GateError::callback(format!("invalid Set-Cookie header: {}", e)))?;
        self.cookies.push(value);
        Ok(())
    }
}

#[async_trait]
impl Callbacks for AxumCallbacks {
    type Response = Response;

    async fn send_html(&mut self, html: String, status: StatusCode) -> Result<Response, GateError> {
        Ok(self.with_cookies((status, Html(html)).into_response()))
    }

    async fn send_css(&mut self, css: &'static str) -> Result<Response, GateError> {
        let response = (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/css; charset=utf-8")],
            css,
        )
            .into_response();
        Ok(self.with_cookies(response))
    }

    async fn redirect(&mut self, url: &str, status: StatusCode) -> Result<Response, GateError> {
        let location = HeaderValue::from_str(url)
            .map_err(|e| GateError::callback(format!("invalid redirect target: {}", e)))?;
        let response = (status, [(LOCATION, location)]).into_response();
        Ok(self.with_cookies(response))
    }

    async fn set_cookie(
        &mut self,
        name: &str,
        value: &str,
        options: &CookieOptions,
    ) -> Result<(), GateError> {
        self.push_cookie(options.to_set_cookie(name, value))
    }

    async fn clear_cookie(&mut self, name: &str) -> Result<(), GateError> {
        self.push_cookie(clear_cookie(name))
    }

    async fn next(&mut self) -> Result<Response, GateError> {
        let (request, next) = self
            .pending
            .take()
            .ok_or_else(|| GateError::callback("request was already forwarded"))?;
        let response = next.run(request).await;
        Ok(self.with_cookies(response))
    }

    fn failure(&mut self, status: StatusCode, message: &str) -> Response {
        HTTPError::new(status, message).into_response()
    }
}

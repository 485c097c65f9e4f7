use std::collections::HashMap;

use http::Method;

/// What the gate needs to know about one inbound request.
///
/// Adapters build one per request; it is owned by that request's processing
/// and dropped once the terminal effect has fired.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Request path without the query string.
    pub path: String,
    pub method: Method,
    /// Password from the login form, only read on a login POST.
    pub password: Option<String>,
    pub cookies: HashMap<String, String>,
    /// Full original URL (path and query) when the host knows it.
    pub original_url: Option<String>,
    /// Values from the host's session, if it has one (e.g. `returnTo`).
    pub session_hints: HashMap<String, String>,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        RequestContext {
            path: path.into(),
            method,
            ..RequestContext::default()
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_cookies(mut self, cookies: HashMap<String, String>) -> Self {
        self.cookies.extend(cookies);
        self
    }

    pub fn with_original_url(mut self, url: impl Into<String>) -> Self {
        self.original_url = Some(url.into());
        self
    }

    pub fn with_session_hint(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.session_hints.insert(key.into(), value.into());
        self
    }
}

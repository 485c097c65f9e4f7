#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use figment::{
    providers::{Format, Yaml},
    Figment,
};
use staging_gate::config::{Config, Options, ServerConfig};
use staging_gate::routes::create_router;
use staging_gate::state::AppState;
use staging_gate::StagingGate;

pub const DEMO_CONFIG: &str = r#"
logging:
  level: "debug"
  format: "json"
staging:
  password: "demo"
  jwt_secret: "integration-secret"
  site_name: "Preview"
"#;

/// Builds the demo router from a YAML server config. The process
/// environment is left out so stray `STAGING_*` variables cannot leak in.
pub fn build_app(yaml: &str) -> (Router, StagingGate) {
    let config: ServerConfig = Figment::new()
        .merge(Yaml::string(yaml))
        .extract()
        .expect("test config should parse");
    let gate = StagingGate::new(Config::merge(
        Options::defaults(),
        Options::default(),
        config.staging,
    ));
    (create_router(AppState::new(gate.clone())), gate)
}

pub fn get(path: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("failed to build request")
}

pub fn post_login(path: &str, content_type: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(CONTENT_TYPE, content_type);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// Value of the first `Set-Cookie` for `name`, if any.
pub fn cookie_value(response: &Response, name: &str) -> Option<String> {
    set_cookies(response).into_iter().find_map(|header| {
        let pair = header.split(';').next()?;
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

pub async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    String::from_utf8(bytes.to_vec()).expect("body should be utf-8")
}

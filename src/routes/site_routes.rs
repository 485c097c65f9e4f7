//! Placeholder site served behind the gate by the demo binary.

use axum::extract::{OriginalUri, State};
use axum::response::{Html, IntoResponse};
use axum::Router;

use crate::state::AppState;
use crate::templates::escape_html;

/// Every path answers with the same page, so any URL can be used to try the
/// gate's return-to behaviour.
pub fn routes() -> Router<AppState> {
    Router::new().fallback(placeholder_page)
}

async fn placeholder_page(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> impl IntoResponse {
    let site_name = escape_html(state.gate.config().site_name());
    let path = escape_html(uri.path());
    Html(format!(
        "<!DOCTYPE html><html><head><title>{site_name}</title></head>\
         <body><h1>{site_name}</h1><p>You are viewing <code>{path}</code>.</p></body></html>"
    ))
}

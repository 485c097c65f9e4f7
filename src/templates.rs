//! Embedded pages and the stylesheet, with `{{name}}` placeholder
//! substitution.

use crate::auth::gate::CSS_ROUTE;
use crate::config::Config;
use crate::error::{AuthenticationFailure, ConfigurationError, GateError};

pub const LOGIN_TEMPLATE: &str = include_str!("../templates/login.html");
pub const SETUP_TEMPLATE: &str = include_str!("../templates/setup.html");
pub const STYLES: &str = include_str!("../templates/styles.css");

/// Replaces every `{{name}}` in `template` with its value in a single pass;
/// substituted values are never rescanned. Values must already be safe HTML.
pub fn render(template: &str, values: &[(&str, &str)]) -> Result<String, GateError> {
    let mut out = String::with_capacity(template.len() + 256);
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| GateError::Template("unterminated placeholder".to_string()))?;
        let name = after[..end].trim();
        let value = values
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
            .ok_or_else(|| GateError::Template(format!("no value for placeholder '{}'", name)))?;
        out.push_str(value);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// The login form, optionally with an inline error.
pub fn login_page(config: &Config, error: Option<AuthenticationFailure>) -> Result<String, GateError> {
    let site_name = escape_html(config.site_name());
    let login_path = escape_html(config.login_path());
    let error_html = match error {
        Some(e) => format!(
            r#"<p class="error" role="alert">{}</p>"#,
            escape_html(&e.to_string())
        ),
        None => String::new(),
    };

    render(
        LOGIN_TEMPLATE,
        &[
            ("siteName", site_name.as_str()),
            ("loginPath", login_path.as_str()),
            ("cssPath", CSS_ROUTE),
            ("error", error_html.as_str()),
        ],
    )
}

/// Instructions shown while the gate lacks a password or a secret.
pub fn setup_page(config: &Config, missing: ConfigurationError) -> Result<String, GateError> {
    let (env_var, option) = match missing {
        ConfigurationError::MissingPassword => ("STAGING_PASSWORD", "password"),
        ConfigurationError::MissingSecret => ("STAGING_JWT_SECRET", "jwt_secret"),
    };
    let site_name = escape_html(config.site_name());
    let message = escape_html(&missing.to_string());

    render(
        SETUP_TEMPLATE,
        &[
            ("siteName", site_name.as_str()),
            ("cssPath", CSS_ROUTE),
            ("message", message.as_str()),
            ("envVar", env_var),
            ("option", option),
        ],
    )
}

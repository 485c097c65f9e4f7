use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::options::{
    Options, BUILTIN_PUBLIC_ROUTES, DEFAULT_COOKIE_MAX_AGE_SECS, DEFAULT_LOGIN_PATH,
    DEFAULT_REDIRECT_URL, DEFAULT_SITE_NAME,
};
use crate::error::ConfigurationError;
use crate::routing::{normalize, normalize_route, RouteSet};
use crate::utils::crypto::random_hex;

/// Value of `jwt_secret` meaning "not configured yet".
pub const UNSET_SECRET: &str = "unset";

/// Fully resolved gate configuration.
///
/// Built once by [`Config::merge`] and shared read-only between requests.
/// Route patterns are normalized and compiled at build time.
#[derive(Clone)]
pub struct Config {
    enabled: bool,
    password: String,
    jwt_secret: Option<String>,
    cookie_max_age: Duration,
    login_path: String,
    site_name: String,
    redirect_url: String,
    public_routes: RouteSet,
    protected_routes: RouteSet,
    secure_cookies: bool,
}

impl Config {
    /// Combines the three option layers.
    ///
    /// Scalars: caller beats environment beats defaults. Route lists are
    /// concatenated (built-in public routes, defaults, environment, caller),
    /// so a caller can add exemptions or protection but never remove one.
    pub fn merge(defaults: Options, env: Options, caller: Options) -> Config {
        let enabled = caller
            .enabled
            .or(env.enabled)
            .or(defaults.enabled)
            .unwrap_or(true);

        let cookie_max_age = caller
            .cookie_max_age
            .or(env.cookie_max_age)
            .or(defaults.cookie_max_age)
            .unwrap_or(DEFAULT_COOKIE_MAX_AGE_SECS);

        let login_path = first_non_empty([
            &caller.login_path,
            &env.login_path,
            &defaults.login_path,
        ])
        .map(normalize)
        .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string());

        let site_name = first_non_empty([&caller.site_name, &env.site_name, &defaults.site_name])
            .unwrap_or(DEFAULT_SITE_NAME)
            .to_string();

        let redirect_url = first_non_empty([
            &caller.redirect_url,
            &env.redirect_url,
            &defaults.redirect_url,
        ])
        .unwrap_or(DEFAULT_REDIRECT_URL)
        .to_string();

        let secure_cookies = caller
            .secure_cookies
            .or(env.secure_cookies)
            .or(defaults.secure_cookies)
            .unwrap_or(false);

        // No default layer, and compared verbatim, so never trimmed.
        let password = [&caller.password, &env.password]
            .into_iter()
            .filter_map(|layer| layer.as_deref())
            .find(|value| !value.is_empty())
            .unwrap_or_default()
            .to_string();

        let generate = caller
            .generate_secret
            .or(env.generate_secret)
            .or(defaults.generate_secret)
            .unwrap_or(true);
        let jwt_secret = resolve_secret(
            [&caller.jwt_secret, &env.jwt_secret, &defaults.jwt_secret],
            generate,
        );

        let public_routes = combine_routes(
            BUILTIN_PUBLIC_ROUTES.iter().copied(),
            [&defaults.public_routes, &env.public_routes, &caller.public_routes],
        );
        let protected_routes = combine_routes(
            std::iter::empty(),
            [
                &defaults.protected_routes,
                &env.protected_routes,
                &caller.protected_routes,
            ],
        );

        let config = Config {
            enabled,
            password,
            jwt_secret,
            cookie_max_age: Duration::from_secs(cookie_max_age),
            login_path,
            site_name,
            redirect_url,
            public_routes,
            protected_routes,
            secure_cookies,
        };

        for (pattern, err) in config
            .public_routes
            .errors()
            .into_iter()
            .chain(config.protected_routes.errors())
        {
            warn!("Ignoring route '{}': {}", pattern, err);
        }
        debug!("Resolved staging configuration: {:?}", config);
        config
    }

    /// Built-in defaults, `STAGING_*` environment variables and the caller's
    /// options. An unreadable environment is logged and skipped.
    pub fn from_env_and(caller: Options) -> Config {
        let env = Options::from_env().unwrap_or_else(|e| {
            warn!("Ignoring STAGING_* environment variables: {}", e);
            Options::default()
        });
        Config::merge(Options::defaults(), env, caller)
    }

    /// Reports the first missing piece, secret before password.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.jwt_secret.is_none() {
            return Err(ConfigurationError::MissingSecret);
        }
        if self.password.is_empty() {
            return Err(ConfigurationError::MissingPassword);
        }
        Ok(())
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Empty when no password is configured.
    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn jwt_secret(&self) -> Option<&str> {
        self.jwt_secret.as_deref()
    }

    pub fn cookie_max_age(&self) -> Duration {
        self.cookie_max_age
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn site_name(&self) -> &str {
        &self.site_name
    }

    pub fn redirect_url(&self) -> &str {
        &self.redirect_url
    }

    pub fn public_routes(&self) -> &RouteSet {
        &self.public_routes
    }

    pub fn protected_routes(&self) -> &RouteSet {
        &self.protected_routes
    }

    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |set: bool| if set { "[SET]" } else { "[NOT SET]" };
        f.debug_struct("Config")
            .field("enabled", &self.enabled)
            .field("password", &redact(!self.password.is_empty()))
            .field("jwt_secret", &redact(self.jwt_secret.is_some()))
            .field("cookie_max_age", &self.cookie_max_age)
            .field("login_path", &self.login_path)
            .field("site_name", &self.site_name)
            .field("redirect_url", &self.redirect_url)
            .field("public_routes", &self.public_routes.sources())
            .field("protected_routes", &self.protected_routes.sources())
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

fn first_non_empty<'a, const N: usize>(layers: [&'a Option<String>; N]) -> Option<&'a str> {
    layers
        .into_iter()
        .filter_map(|layer| layer.as_deref())
        .map(str::trim)
        .find(|value| !value.is_empty())
}

fn resolve_secret<const N: usize>(layers: [&Option<String>; N], generate: bool) -> Option<String> {
    let configured = layers
        .into_iter()
        .filter_map(|layer| layer.as_deref())
        .find(|secret| !secret.trim().is_empty() && *secret != UNSET_SECRET);

    match configured {
        Some(secret) => Some(secret.to_string()),
        None if generate => {
            info!("No signing secret configured, generated a random one; logins will not survive a restart");
            Some(random_hex(32))
        }
        None => None,
    }
}

fn combine_routes<'a, const N: usize>(
    builtin: impl Iterator<Item = &'a str>,
    layers: [&'a Vec<String>; N],
) -> RouteSet {
    let mut routes: Vec<String> = Vec::new();
    let all = builtin.chain(layers.into_iter().flatten().map(String::as_str));
    for route in all {
        if route.trim().is_empty() {
            continue;
        }
        let normalized = normalize_route(route);
        if !routes.contains(&normalized) {
            routes.push(normalized);
        }
    }
    RouteSet::compile(routes)
}

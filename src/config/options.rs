use std::collections::BTreeMap;
use std::path::Path;

use figment::providers::{Format, Serialized, Yaml};
use figment::Figment;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Prefix shared by every environment variable the gate reads.
pub const ENV_PREFIX: &str = "STAGING_";

pub const DEFAULT_COOKIE_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;
pub const DEFAULT_LOGIN_PATH: &str = "/protected";
pub const DEFAULT_SITE_NAME: &str = "Protected Page";
pub const DEFAULT_REDIRECT_URL: &str = "/";
/// Always public, whatever else is configured.
pub const BUILTIN_PUBLIC_ROUTES: [&str; 3] = ["/favicon.ico", "/robots.txt", "/sitemap.xml"];

/// One layer of gate options. Every field is optional; layers are combined
/// by [`Config::merge`](crate::config::Config::merge).
///
/// The same shape is read from the caller, from `STAGING_*` environment
/// variables and from YAML files.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Options {
    /// Turn the gate off entirely. Env: `STAGING_ENABLED`.
    #[serde(deserialize_with = "de::opt_bool")]
    pub enabled: Option<bool>,
    /// The shared password. Env: `STAGING_PASSWORD`.
    #[serde(deserialize_with = "de::opt_string")]
    pub password: Option<String>,
    /// Secret used to sign the auth token. `"unset"` counts as absent.
    /// Env: `STAGING_JWT_SECRET`.
    #[serde(deserialize_with = "de::opt_string")]
    pub jwt_secret: Option<String>,
    /// Lifetime of the auth cookie and token, in seconds.
    /// Env: `STAGING_COOKIE_MAX_AGE`.
    #[serde(deserialize_with = "de::opt_secs")]
    pub cookie_max_age: Option<u64>,
    /// Env: `STAGING_LOGIN_PATH`.
    #[serde(deserialize_with = "de::opt_string")]
    pub login_path: Option<String>,
    /// Name shown on the login page. Env: `STAGING_SITE_NAME`.
    #[serde(deserialize_with = "de::opt_string")]
    pub site_name: Option<String>,
    /// Fallback destination after a successful login.
    /// Env: `STAGING_REDIRECT_URL`.
    #[serde(deserialize_with = "de::opt_string")]
    pub redirect_url: Option<String>,
    /// Env: `STAGING_PROTECTED_ROUTES` (comma separated).
    #[serde(deserialize_with = "de::route_list")]
    pub protected_routes: Vec<String>,
    /// Env: `STAGING_PUBLIC_ROUTES` (comma separated).
    #[serde(deserialize_with = "de::route_list")]
    pub public_routes: Vec<String>,
    /// Mark cookies `Secure`; switch on in production.
    /// Env: `STAGING_SECURE_COOKIES`.
    #[serde(deserialize_with = "de::opt_bool")]
    pub secure_cookies: Option<bool>,
    /// Generate a random signing secret when none is configured.
    /// Env: `STAGING_GENERATE_SECRET`.
    #[serde(deserialize_with = "de::opt_bool")]
    pub generate_secret: Option<bool>,
}

impl Options {
    /// The built-in defaults.
    pub fn defaults() -> Self {
        Options {
            enabled: Some(true),
            password: None,
            jwt_secret: None,
            cookie_max_age: Some(DEFAULT_COOKIE_MAX_AGE_SECS),
            login_path: Some(DEFAULT_LOGIN_PATH.to_string()),
            site_name: Some(DEFAULT_SITE_NAME.to_string()),
            redirect_url: Some(DEFAULT_REDIRECT_URL.to_string()),
            protected_routes: Vec::new(),
            public_routes: BUILTIN_PUBLIC_ROUTES.iter().map(|r| r.to_string()).collect(),
            secure_cookies: Some(false),
            generate_secret: Some(true),
        }
    }

    /// Reads the `STAGING_*` environment variables.
    ///
    /// Values reach the deserializers as the exact strings that were set, so
    /// a password like `007` or ` demo ` is not reinterpreted as a number or
    /// trimmed.
    pub fn from_env() -> Result<Self, figment::Error> {
        Self::from_figment(&Figment::from(Serialized::defaults(env_vars())))
    }

    /// Reads options from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        Self::from_figment(&Figment::new().merge(Yaml::file(path.as_ref())))
    }

    pub fn from_figment(figment: &Figment) -> Result<Self, figment::Error> {
        figment.extract::<Options>()
    }
}

/// `STAGING_*` variables keyed by their lowercased field name. Variables that
/// are not valid unicode are skipped.
fn env_vars() -> BTreeMap<String, String> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .filter_map(|(key, value)| {
            let field = key.strip_prefix(ENV_PREFIX)?.to_ascii_lowercase();
            (!field.is_empty()).then_some((field, value))
        })
        .collect()
}

/// Lenient deserializers. Environment values always arrive as strings while
/// YAML and callers use native types, so scalar fields accept any scalar and
/// route lists accept a comma separated string.
mod de {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Bool(bool),
        UInt(u64),
        Int(i64),
        Float(f64),
        Str(String),
    }

    impl Scalar {
        fn into_string(self) -> String {
            match self {
                Scalar::Bool(b) => b.to_string(),
                Scalar::UInt(n) => n.to_string(),
                Scalar::Int(n) => n.to_string(),
                Scalar::Float(n) => n.to_string(),
                Scalar::Str(s) => s,
            }
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RouteList {
        One(String),
        Many(Vec<String>),
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<Scalar>::deserialize(d)?.map(Scalar::into_string))
    }

    pub fn opt_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(Option::<Scalar>::deserialize(d)?.map(|value| match value {
            Scalar::Bool(b) => b,
            Scalar::UInt(n) => n != 0,
            Scalar::Int(n) => n != 0,
            Scalar::Float(n) => n != 0.0,
            Scalar::Str(s) => s.trim().eq_ignore_ascii_case("true"),
        }))
    }

    pub fn opt_secs<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        match Option::<Scalar>::deserialize(d)? {
            None => Ok(None),
            Some(Scalar::UInt(n)) => Ok(Some(n)),
            Some(Scalar::Str(s)) => s.trim().parse::<u64>().map(Some).map_err(|_| {
                serde::de::Error::custom(format!("invalid cookie max age '{}'", s))
            }),
            Some(_) => Err(serde::de::Error::custom(
                "cookie max age must be a non-negative number of seconds",
            )),
        }
    }

    pub fn route_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        let routes = match Option::<RouteList>::deserialize(d)? {
            None => Vec::new(),
            Some(RouteList::One(s)) => s.split(',').map(str::to_string).collect(),
            Some(RouteList::Many(v)) => v,
        };
        Ok(routes
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn reads_every_environment_key() {
        Jail::expect_with(|jail| {
            jail.set_env("STAGING_ENABLED", "false");
            jail.set_env("STAGING_PASSWORD", "1234");
            jail.set_env("STAGING_JWT_SECRET", "s3cret");
            jail.set_env("STAGING_COOKIE_MAX_AGE", "3600");
            jail.set_env("STAGING_LOGIN_PATH", "/login");
            jail.set_env("STAGING_SITE_NAME", "Preview");
            jail.set_env("STAGING_PROTECTED_ROUTES", "/admin/, /dashboard");
            jail.set_env("STAGING_PUBLIC_ROUTES", "/health,,/status");
            jail.set_env("STAGING_REDIRECT_URL", "/home");
            jail.set_env("STAGING_SECURE_COOKIES", "true");

            let options = Options::from_env()?;
            assert_eq!(options.enabled, Some(false));
            assert_eq!(options.password.as_deref(), Some("1234"));
            assert_eq!(options.jwt_secret.as_deref(), Some("s3cret"));
            assert_eq!(options.cookie_max_age, Some(3600));
            assert_eq!(options.login_path.as_deref(), Some("/login"));
            assert_eq!(options.site_name.as_deref(), Some("Preview"));
            assert_eq!(options.protected_routes, vec!["/admin/", "/dashboard"]);
            assert_eq!(options.public_routes, vec!["/health", "/status"]);
            assert_eq!(options.redirect_url.as_deref(), Some("/home"));
            assert_eq!(options.secure_cookies, Some(true));
            assert_eq!(options.generate_secret, None);
            Ok(())
        });
    }

    #[test]
    fn empty_environment_gives_empty_options() {
        Jail::expect_with(|_| {
            assert_eq!(Options::from_env()?, Options::default());
            Ok(())
        });
    }

    #[test]
    fn environment_strings_are_kept_verbatim() {
        Jail::expect_with(|jail| {
            for raw in ["007", "1.50", "+5", " demo ", "[x]", "true"] {
                jail.set_env("STAGING_PASSWORD", raw);
                jail.set_env("STAGING_JWT_SECRET", raw);
                jail.set_env("STAGING_SITE_NAME", raw);

                let options = Options::from_env()?;
                assert_eq!(options.password.as_deref(), Some(raw));
                assert_eq!(options.jwt_secret.as_deref(), Some(raw));
                assert_eq!(options.site_name.as_deref(), Some(raw));
            }
            Ok(())
        });
    }

    #[test]
    fn odd_secret_does_not_discard_the_environment() {
        Jail::expect_with(|jail| {
            jail.set_env("STAGING_PASSWORD", "007");
            jail.set_env("STAGING_JWT_SECRET", "[x]");
            jail.set_env("STAGING_GENERATE_SECRET", "false");

            let config = crate::config::Config::from_env_and(Options::default());
            assert_eq!(config.password(), "007");
            assert_eq!(config.jwt_secret(), Some("[x]"));
            Ok(())
        });
    }

    #[test]
    fn invalid_max_age_is_an_error() {
        Jail::expect_with(|jail| {
            jail.set_env("STAGING_COOKIE_MAX_AGE", "a week");
            assert!(Options::from_env().is_err());
            Ok(())
        });
    }

    #[test]
    fn reads_yaml_with_route_sequences() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "staging.yaml",
                r#"
password: demo
site_name: Docs preview
cookie_max_age: 60
public_routes:
  - /_next/*
  - /images/**
protected_routes: "/admin/,/billing"
"#,
            )?;

            let options = Options::from_yaml_file("staging.yaml")?;
            assert_eq!(options.password.as_deref(), Some("demo"));
            assert_eq!(options.site_name.as_deref(), Some("Docs preview"));
            assert_eq!(options.cookie_max_age, Some(60));
            assert_eq!(options.public_routes, vec!["/_next/*", "/images/**"]);
            assert_eq!(options.protected_routes, vec!["/admin/", "/billing"]);
            assert_eq!(options.enabled, None);
            Ok(())
        });
    }
}

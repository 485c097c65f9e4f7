//! Issuing and verifying the auth token.
//!
//! The token is an HS256 JWT signed with the configured secret. Nothing is
//! stored server side: a token is valid exactly when its signature checks
//! out and it has not expired. Changing the secret invalidates every token
//! issued before.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

use crate::config::Config;
use crate::error::{ConfigurationError, GateError};
use crate::models::Claims;

/// Issues a token valid for the configured cookie max-age.
pub fn issue(config: &Config) -> Result<String, GateError> {
    let secret = config
        .jwt_secret()
        .ok_or(ConfigurationError::MissingSecret)?;
    let token = issue_at(secret, config.cookie_max_age(), Utc::now().timestamp())?;
    Ok(token)
}

pub(crate) fn issue_at(
    secret: &str,
    lifetime: Duration,
    now: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let lifetime = i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX);
    let claims = Claims::new(now, lifetime);
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// True when `token` was signed with the configured secret and has not
/// expired. Never fails: every problem is simply an invalid token.
pub fn verify(token: &str, config: &Config) -> bool {
    match config.jwt_secret() {
        Some(secret) => verify_with_secret(token, secret),
        None => false,
    }
}

fn verify_with_secret(token: &str, secret: &str) -> bool {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    match decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation) {
        Ok(_) => true,
        Err(e) => {
            debug!("Rejecting auth token: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;

    fn config(secret: &str, max_age: u64) -> Config {
        let caller = Options {
            password: Some("demo".to_string()),
            jwt_secret: Some(secret.to_string()),
            cookie_max_age: Some(max_age),
            ..Options::default()
        };
        Config::merge(Options::defaults(), Options::default(), caller)
    }

    #[test]
    fn issued_token_verifies_with_same_secret() {
        let config = config("first-secret", 3600);
        let token = issue(&config).expect("token issued");
        assert!(verify(&token, &config));
    }

    #[test]
    fn token_fails_with_a_different_secret() {
        let token = issue(&config("first-secret", 3600)).expect("token issued");
        assert!(!verify(&token, &config("rotated-secret", 3600)));
    }

    #[test]
    fn expired_token_fails() {
        let now = Utc::now().timestamp();
        let token = issue_at("first-secret", Duration::from_secs(10), now - 1000)
            .expect("token issued");
        assert!(!verify(&token, &config("first-secret", 10)));
    }

    #[test]
    fn garbage_is_rejected() {
        let config = config("first-secret", 3600);
        assert!(!verify("", &config));
        assert!(!verify("not-a-jwt", &config));
        assert!(!verify("a.b.c", &config));
    }

    #[test]
    fn token_carries_only_timestamps() {
        let now = 1_700_000_000;
        let token = issue_at("first-secret", Duration::from_secs(60), now).expect("token issued");

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        let decoded = decode::<serde_json::Value>(
            &token,
            &DecodingKey::from_secret(b"first-secret"),
            &validation,
        )
        .expect("decodes");

        let claims = decoded.claims.as_object().expect("object claims");
        assert_eq!(claims.len(), 2);
        assert_eq!(claims["iat"], now);
        assert_eq!(claims["exp"], now + 60);
    }

    #[test]
    fn missing_secret_cannot_issue_or_verify() {
        let caller = Options {
            password: Some("demo".to_string()),
            generate_secret: Some(false),
            ..Options::default()
        };
        let config = Config::merge(Options::defaults(), Options::default(), caller);
        assert!(matches!(
            issue(&config),
            Err(GateError::Configuration(ConfigurationError::MissingSecret))
        ));
        let token = issue_at("any", Duration::from_secs(60), Utc::now().timestamp())
            .expect("token issued");
        assert!(!verify(&token, &config));
    }
}

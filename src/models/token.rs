use serde::{Deserialize, Serialize};

/// Claims carried by the auth token.
///
/// The token only proves that the password was presented; it carries no
/// identity, just when it was issued and when it stops being valid.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Claims {
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Claims for a token issued at `now` (unix seconds) living `lifetime_secs`.
    pub fn new(now: i64, lifetime_secs: i64) -> Self {
        Claims {
            iat: now,
            exp: now.saturating_add(lifetime_secs),
        }
    }
}

//! Cookie wire format.
//!
//! Building `Set-Cookie` values and reading a `Cookie` header. Values are
//! percent-encoded outside the RFC 6265 cookie-octet range, so URLs with
//! `;`, `,` or spaces survive the round trip.

use std::collections::HashMap;
use std::time::Duration;

/// Attributes of a cookie the gate asks the host to set. Every gate cookie
/// is `SameSite=Lax`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub max_age: Option<Duration>,
    pub path: String,
    pub http_only: bool,
    pub secure: bool,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            max_age: None,
            path: "/".to_string(),
            http_only: true,
            secure: false,
        }
    }
}

impl CookieOptions {
    /// Build Set-Cookie header value
    pub fn to_set_cookie(&self, name: &str, value: &str) -> String {
        let mut cookie = format!("{}={}", name, encode_value(value));

        if let Some(max_age) = self.max_age {
            cookie.push_str(&format!("; Max-Age={}", max_age.as_secs()));
        }
        cookie.push_str(&format!("; Path={}", self.path));
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str("; SameSite=Lax");

        cookie
    }
}

/// Build Set-Cookie header for deletion (expired)
pub fn clear_cookie(name: &str) -> String {
    format!("{}=; Path=/; Max-Age=0; HttpOnly", name)
}

/// Parse a `Cookie` request header into a name -> value map. The first
/// occurrence of a name wins.
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for pair in header.split(';') {
        if let Some((key, value)) = pair.trim().split_once('=') {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            cookies
                .entry(key.to_string())
                .or_insert_with(|| decode_value(value.trim().trim_matches('"')));
        }
    }
    cookies
}

fn is_cookie_octet(b: u8) -> bool {
    matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E) && b != b'%'
}

fn encode_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        if is_cookie_octet(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

fn decode_value(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

//! Glob-style route patterns.
//!
//! Supported syntax:
//! - `*` matches any run of characters except `/`
//! - `**` matches any run of characters including `/`
//! - `?` matches exactly one character except `/`
//! - everything else is matched literally
//!
//! A pattern ending in `/**` also matches the bare prefix, so `/api/**`
//! covers `/api` as well as everything beneath it.

use regex::Regex;
use tracing::warn;

use crate::error::PatternError;

/// Canonical form of a request path: a single leading `/`, no duplicate
/// slashes and no trailing slash.
pub fn normalize(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Rewrites a configured route into its pattern form.
///
/// Routes ending in `/` protect everything beneath them, and routes under an
/// `/api/` segment implicitly cover their direct children.
pub fn normalize_route(route: &str) -> String {
    let route = route.trim();
    let mut route = if route.starts_with('/') {
        route.to_string()
    } else {
        format!("/{}", route)
    };

    if route.ends_with('/') {
        route.push_str("**");
    } else if route.contains("/api/") && !route.ends_with('*') {
        route.push_str("/*");
    }
    route
}

/// A compiled route pattern.
///
/// Compilation never fails outright: a malformed pattern keeps its error and
/// matches nothing.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    compiled: Result<Regex, PatternError>,
}

impl Pattern {
    pub fn compile(pattern: &str) -> Self {
        let compiled = translate(pattern);
        if let Err(e) = &compiled {
            warn!("Route pattern '{}' rejected, it will match nothing: {}", pattern, e);
        }
        Pattern {
            source: pattern.to_string(),
            compiled,
        }
    }

    /// The pattern as it was configured.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn error(&self) -> Option<&PatternError> {
        self.compiled.as_ref().err()
    }

    /// Tests an already normalized path against this pattern.
    pub fn matches(&self, normalized_path: &str) -> bool {
        match &self.compiled {
            Ok(regex) => regex.is_match(normalized_path),
            Err(_) => false,
        }
    }
}

fn translate(pattern: &str) -> Result<Regex, PatternError> {
    let trimmed = pattern.trim();
    if trimmed.is_empty() {
        return Err(PatternError::Empty);
    }
    if trimmed.contains("***") {
        return Err(PatternError::InvalidWildcard(trimmed.to_string()));
    }

    let normalized = normalize(trimmed);
    let (body, descendants) = match normalized.strip_suffix("/**") {
        Some(prefix) => (prefix, true),
        None => (normalized.as_str(), false),
    };

    let mut expr = String::with_capacity(body.len() * 2 + 16);
    expr.push('^');
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                expr.push_str(".*");
            }
            '*' => expr.push_str("[^/]*"),
            '?' => expr.push_str("[^/]"),
            other => {
                let mut buf = [0u8; 4];
                expr.push_str(&regex::escape(other.encode_utf8(&mut buf)));
            }
        }
    }
    if descendants {
        expr.push_str("(?:/.*)?");
    }
    expr.push('$');

    Regex::new(&expr).map_err(|e| PatternError::Regex {
        pattern: trimmed.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_and_trims_slashes() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("dashboard"), "/dashboard");
        assert_eq!(normalize("//admin///users/"), "/admin/users");
        assert_eq!(normalize("/a/b/c"), "/a/b/c");
    }

    #[test]
    fn normalize_is_idempotent() {
        for path in ["", "/", "a//b/", "///x", "/a/b/c/", "no-slash", "/_staging/styles.css"] {
            let once = normalize(path);
            assert_eq!(normalize(&once), once, "path {:?}", path);
        }
    }

    #[test]
    fn normalize_route_rewrites() {
        assert_eq!(normalize_route("/docs/"), "/docs/**");
        assert_eq!(normalize_route("docs"), "/docs");
        assert_eq!(normalize_route(" /about "), "/about");
        assert_eq!(normalize_route("/api/public"), "/api/public/*");
        assert_eq!(normalize_route("/api/public/*"), "/api/public/*");
        assert_eq!(normalize_route("/api/users/"), "/api/users/**");
        assert_eq!(normalize_route("/api"), "/api");
    }

    #[test]
    fn literal_patterns_match_exactly() {
        let p = Pattern::compile("/favicon.ico");
        assert!(p.matches("/favicon.ico"));
        assert!(!p.matches("/faviconXico"));
        assert!(!p.matches("/favicon.ico/extra"));
    }

    #[test]
    fn single_star_stays_within_a_segment() {
        let p = Pattern::compile("/blog/*");
        assert!(p.matches("/blog/post-1"));
        assert!(p.matches("/blog/"));
        assert!(!p.matches("/blog/2024/post"));
        assert!(!p.matches("/blog"));
    }

    #[test]
    fn double_star_crosses_segments() {
        let p = Pattern::compile("/assets/**/logo.png");
        assert!(p.matches("/assets/img/logo.png"));
        assert!(p.matches("/assets/a/b/c/logo.png"));
        assert!(!p.matches("/assets/logo.svg"));
    }

    #[test]
    fn trailing_double_star_also_matches_prefix() {
        let p = Pattern::compile("/api/**");
        assert!(p.matches("/api"));
        assert!(p.matches("/api/v1/users"));
        assert!(!p.matches("/apiary"));

        let all = Pattern::compile("/**");
        assert!(all.matches("/"));
        assert!(all.matches("/anything/at/all"));
    }

    #[test]
    fn question_mark_matches_one_character() {
        let p = Pattern::compile("/v?/status");
        assert!(p.matches("/v1/status"));
        assert!(!p.matches("/v10/status"));
        assert!(!p.matches("/v//status"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let p = Pattern::compile("/files/(draft)+[1].txt");
        assert!(p.matches("/files/(draft)+[1].txt"));
        assert!(!p.matches("/files/draftdraft1.txt"));
    }

    #[test]
    fn malformed_patterns_match_nothing() {
        let empty = Pattern::compile("   ");
        assert_eq!(empty.error(), Some(&PatternError::Empty));
        assert!(!empty.matches("/"));

        let stars = Pattern::compile("/***");
        assert!(matches!(stars.error(), Some(PatternError::InvalidWildcard(_))));
        assert!(!stars.matches("/anything"));
    }
}

use tracing::trace;

use super::pattern::{normalize, Pattern};
use crate::config::Config;
use crate::error::PatternError;

/// An ordered list of compiled route patterns.
///
/// Matching is a union, so order never changes the outcome; it is kept so
/// that diagnostics list patterns the way they were configured.
#[derive(Debug, Clone, Default)]
pub struct RouteSet {
    patterns: Vec<Pattern>,
}

impl RouteSet {
    /// Compiles every pattern once. Patterns are expected to be in their
    /// normalized route form already.
    pub fn compile<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        RouteSet {
            patterns: patterns
                .into_iter()
                .map(|p| Pattern::compile(p.as_ref()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    /// Pattern sources in configuration order.
    pub fn sources(&self) -> Vec<&str> {
        self.patterns.iter().map(Pattern::source).collect()
    }

    /// Patterns that failed to compile, with their errors.
    pub fn errors(&self) -> Vec<(&str, &PatternError)> {
        self.patterns
            .iter()
            .filter_map(|p| p.error().map(|e| (p.source(), e)))
            .collect()
    }

    pub fn is_match(&self, path: &str) -> bool {
        is_match(path, self)
    }
}

/// True when the normalized `path` matches at least one pattern.
pub fn is_match(path: &str, patterns: &RouteSet) -> bool {
    let normalized = normalize(path);
    patterns.iter().any(|pattern| {
        let matched = pattern.matches(&normalized);
        trace!(
            "Testing path '{}' against pattern '{}' = {}",
            normalized,
            pattern.source(),
            matched
        );
        matched
    })
}

/// Decides whether `path` requires authentication.
///
/// Precedence: the login path is never protected, public routes are never
/// protected, a non-empty protected list is an allow-list of what needs a
/// token, and with no protected list everything else is protected.
pub fn is_protected(path: &str, config: &Config) -> bool {
    let normalized = normalize(path);

    if normalized == config.login_path() {
        return false;
    }

    if is_match(&normalized, config.public_routes()) {
        return false;
    }

    if !config.protected_routes().is_empty() {
        return is_match(&normalized, config.protected_routes());
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;

    fn config_with(public: &[&str], protected: &[&str]) -> Config {
        let caller = Options {
            password: Some("demo".to_string()),
            public_routes: public.iter().map(|s| s.to_string()).collect(),
            protected_routes: protected.iter().map(|s| s.to_string()).collect(),
            ..Options::default()
        };
        Config::merge(Options::defaults(), Options::default(), caller)
    }

    #[test]
    fn route_set_preserves_order() {
        let set = RouteSet::compile(["/b", "/a", "/c/**"]);
        assert_eq!(set.sources(), vec!["/b", "/a", "/c/**"]);
        assert_eq!(set.len(), 3);
        assert!(set.errors().is_empty());
    }

    #[test]
    fn is_match_normalizes_the_path() {
        let set = RouteSet::compile(["/docs/**"]);
        assert!(is_match("//docs//intro/", &set));
        assert!(is_match("docs", &set));
        assert!(!is_match("/doc", &set));
    }

    #[test]
    fn broken_patterns_never_grant_a_match() {
        let set = RouteSet::compile(["", "/ok"]);
        assert_eq!(set.errors().len(), 1);
        assert!(!is_match("/", &set));
        assert!(is_match("/ok", &set));
    }

    #[test]
    fn everything_is_protected_by_default() {
        let config = config_with(&[], &[]);
        assert!(is_protected("/", &config));
        assert!(is_protected("/dashboard", &config));
        assert!(is_protected("/deep/nested/page", &config));
        assert!(!is_protected("/protected", &config));
        assert!(!is_protected("/favicon.ico", &config));
        assert!(!is_protected("/robots.txt", &config));
        assert!(!is_protected("/sitemap.xml", &config));
    }

    #[test]
    fn protected_list_is_an_allow_list() {
        let config = config_with(&[], &["/admin/", "/dashboard"]);
        assert!(is_protected("/admin", &config));
        assert!(is_protected("/admin/users/1", &config));
        assert!(is_protected("/dashboard", &config));
        assert!(!is_protected("/", &config));
        assert!(!is_protected("/blog/post", &config));
    }

    #[test]
    fn public_and_login_exemptions_win_over_protected() {
        let config = config_with(&["/admin/health"], &["/**"]);
        assert!(is_protected("/admin", &config));
        assert!(!is_protected("/admin/health", &config));
        assert!(!is_protected("/protected", &config));
        assert!(!is_protected("/favicon.ico", &config));
    }
}

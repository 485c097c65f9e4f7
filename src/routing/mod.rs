//! Route matching: glob patterns compiled once per configuration and the
//! protected/public decision built on top of them.

pub mod matcher;
pub mod pattern;

pub use matcher::{is_match, is_protected, RouteSet};
pub use pattern::{normalize, normalize_route, Pattern};

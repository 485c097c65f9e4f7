pub mod cookie;
pub mod crypto;
pub mod http_helpers;
pub mod logger;

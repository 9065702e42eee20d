//! HTTP middleware

mod security;
mod tracing;

pub use self::security::security_headers;
pub use self::tracing::request_tracing;

//! Authentication module
//!
//! Supports: Bearer, OAuth2 refresh token, service-account JWT grant
//!
//! The `Authenticator` applies credentials to outgoing requests and caches
//! access tokens for the flows that mint them.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::{AuthConfig, CachedToken, DRIVE_SCOPE, GOOGLE_TOKEN_URL};

#[cfg(test)]
mod tests;

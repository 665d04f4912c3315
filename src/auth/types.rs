//! Auth configuration types
//!
//! These types represent the runtime auth configuration after template
//! interpolation has been applied.

use chrono::{DateTime, Utc};

/// Default OAuth2 token endpoint
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Full read/write scope for the store
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Authentication configuration (after template interpolation)
#[derive(Debug, Clone, Default)]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// Pre-issued access token
    Bearer {
        /// The bearer token
        token: String,
    },

    /// OAuth2 Refresh Token flow
    Oauth2Refresh {
        /// Token endpoint URL
        token_url: String,
        /// Client ID
        client_id: String,
        /// Client secret
        client_secret: String,
        /// Refresh token
        refresh_token: String,
    },

    /// Service account signing an RS256 JWT and exchanging it for a token
    ServiceAccount {
        /// Service account email (iss claim)
        client_email: String,
        /// Private key for signing (PEM format)
        private_key: String,
        /// Requested scopes (scope claim)
        scopes: Vec<String>,
        /// User to impersonate (sub claim)
        subject: Option<String>,
        /// Token endpoint, also used as the aud claim
        token_url: String,
        /// Assertion lifetime in seconds
        token_lifetime_seconds: u64,
    },
}

impl AuthConfig {
    /// Whether this config mints tokens that must be cached
    pub fn needs_token(&self) -> bool {
        matches!(self, Self::Oauth2Refresh { .. } | Self::ServiceAccount { .. })
    }
}

/// Cached token with expiration
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Create a token that expires in N seconds from now
    pub fn expires_in(token: String, seconds: i64) -> Self {
        let expires_at = Utc::now() + chrono::Duration::seconds(seconds);
        Self {
            token,
            expires_at: Some(expires_at),
        }
    }

    /// Check if the token is expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() + chrono::Duration::seconds(30) >= expires_at,
            None => false,
        }
    }
}

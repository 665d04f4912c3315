//! Configuration types for reader definitions
//!
//! This module contains the configuration structures used to describe a
//! store connection and a traversal in YAML format.
//!
//! ```yaml
//! kind: reader
//! name: reports
//! auth:
//!   type: oauth2_refresh
//!   client_id: "{{ env.DRIVE_CLIENT_ID }}"
//!   client_secret: "{{ env.DRIVE_CLIENT_SECRET }}"
//!   refresh_token: "{{ vars.refresh_token }}"
//! source:
//!   folder_name: /Reports/2024
//! traversal:
//!   list_mode: FILES
//!   include_sub_directories: true
//! read:
//!   page_size: 500
//! ```

use crate::auth::{DRIVE_SCOPE, GOOGLE_TOKEN_URL};
use crate::engine::{Addressing, ReadConfig};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::query::TraversalFilter;
use crate::remote::{SearchScope, DEFAULT_API_URL, DEFAULT_PAGE_SIZE, DEFAULT_UPLOAD_URL};
use crate::resolve::{ResolverOptions, RetryPolicy};
use crate::types::{BackoffType, Corpora, JsonValue, ROOT_FOLDER};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Top-Level Reader Config
// ============================================================================

/// Complete reader configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Kind of config (always "reader")
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Stream name used for emitted records
    #[serde(default = "default_name")]
    pub name: String,

    /// Store endpoints
    #[serde(default)]
    pub api: ApiConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfigDef,

    /// HTTP client configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Starting folder
    #[serde(default)]
    pub source: SourceConfig,

    /// What the traversal lists
    #[serde(default)]
    pub traversal: TraversalFilter,

    /// Where listing queries look
    #[serde(default)]
    pub scope: ScopeConfig,

    /// Retry settings for name resolution
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Paging and batching
    #[serde(default)]
    pub read: ReadSettings,

    /// Values available to templates as `{{ vars.x }}`
    #[serde(default)]
    pub vars: JsonValue,
}

fn default_kind() -> String {
    "reader".to_string()
}

fn default_name() -> String {
    "files".to_string()
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            name: default_name(),
            api: ApiConfig::default(),
            auth: AuthConfigDef::default(),
            http: HttpConfig::default(),
            source: SourceConfig::default(),
            traversal: TraversalFilter::default(),
            scope: ScopeConfig::default(),
            resolver: ResolverConfig::default(),
            read: ReadSettings::default(),
            vars: JsonValue::Null,
        }
    }
}

impl ReaderConfig {
    /// Search scope for every listing call
    pub fn search_scope(&self) -> SearchScope {
        SearchScope {
            supports_all_drives: self.traversal.include_shared_drives,
            corpora: self.scope.corpora,
            drive_id: self.scope.drive_id.clone(),
        }
    }

    /// Resolver settings
    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            include_shared_drives: self.traversal.include_shared_drives,
            scope: self.search_scope(),
            retry: self.resolver.retry_policy(),
            page_size: self.read.page_size,
        }
    }

    /// Engine read settings
    pub fn read_config(&self) -> ReadConfig {
        ReadConfig::new()
            .with_page_size(self.read.page_size)
            .with_batch_size(self.read.batch_size)
            .with_max_records(self.read.max_records)
    }

    /// Starting point of the traversal
    pub fn addressing(&self) -> Addressing {
        self.source.addressing()
    }

    /// HTTP client settings
    pub fn http_client_config(&self) -> HttpClientConfig {
        let backoff = &self.http.retry_backoff;
        let builder = HttpClientConfig::builder()
            .timeout(Duration::from_secs(self.http.timeout_seconds))
            .max_retries(self.http.max_retries)
            .backoff(
                backoff.backoff_type,
                Duration::from_millis(backoff.initial_ms),
                Duration::from_millis(backoff.max_ms),
            );

        let builder = if self.http.rate_limit.enabled {
            builder.rate_limit(RateLimiterConfig::new(
                self.http.rate_limit.requests_per_second,
                self.http.rate_limit.burst_size,
            ))
        } else {
            builder.no_rate_limit()
        };

        match &self.http.user_agent {
            Some(agent) => builder.user_agent(agent).build(),
            None => builder.build(),
        }
    }
}

// ============================================================================
// Endpoints
// ============================================================================

/// Store endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Metadata API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Upload API base URL
    #[serde(default = "default_upload_url")]
    pub upload_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            upload_url: default_upload_url(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_upload_url() -> String {
    DEFAULT_UPLOAD_URL.to_string()
}

// ============================================================================
// Auth Config
// ============================================================================

/// Authentication configuration as written in YAML.
///
/// String fields may contain templates; they are rendered when the runtime
/// [`AuthConfig`](crate::auth::AuthConfig) is built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfigDef {
    /// No authentication
    #[default]
    None,

    /// Pre-issued access token
    Bearer {
        /// The token (usually a template)
        token: String,
    },

    /// OAuth2 refresh token grant
    Oauth2Refresh {
        /// Token endpoint
        #[serde(default = "default_token_url")]
        token_url: String,
        /// Client ID
        client_id: String,
        /// Client secret
        client_secret: String,
        /// Refresh token
        refresh_token: String,
    },

    /// Service account JWT bearer grant
    ServiceAccount {
        /// Service account email
        client_email: String,
        /// PEM private key
        private_key: String,
        /// Requested scopes
        #[serde(default = "default_scopes")]
        scopes: Vec<String>,
        /// User to impersonate
        #[serde(default)]
        subject: Option<String>,
        /// Token endpoint
        #[serde(default = "default_token_url")]
        token_url: String,
        /// Assertion lifetime in seconds
        #[serde(default = "default_token_lifetime")]
        token_lifetime_seconds: u64,
    },
}

fn default_token_url() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

fn default_scopes() -> Vec<String> {
    vec![DRIVE_SCOPE.to_string()]
}

fn default_token_lifetime() -> u64 {
    3600
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum number of retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Retry backoff configuration
    #[serde(default)]
    pub retry_backoff: BackoffConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            retry_backoff: BackoffConfig::default(),
            rate_limit: RateLimitConfig::default(),
            user_agent: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

/// Backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
        }
    }
}

fn default_initial_ms() -> u64 {
    100
}

fn default_max_ms() -> u64 {
    60000
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether requests are rate limited at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Requests per second limit
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,

    /// Bucket size
    #[serde(default = "default_rps")]
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: default_rps(),
            burst_size: default_rps(),
        }
    }
}

fn default_rps() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Traversal Config
// ============================================================================

/// Starting folder, by id or by name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Folder identifier
    #[serde(default)]
    pub folder_id: Option<String>,

    /// Folder name or slash-delimited path
    #[serde(default)]
    pub folder_name: Option<String>,
}

impl SourceConfig {
    /// Addressing mode; the store root when nothing is set
    pub fn addressing(&self) -> Addressing {
        match (&self.folder_id, &self.folder_name) {
            (Some(id), _) => Addressing::ById(id.clone()),
            (None, Some(name)) => Addressing::ByName(name.clone()),
            (None, None) => Addressing::ById(ROOT_FOLDER.to_string()),
        }
    }
}

/// Listing scope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Bodies of items to search
    #[serde(default)]
    pub corpora: Option<Corpora>,

    /// Shared drive to search when corpora is `drive`
    #[serde(default)]
    pub drive_id: Option<String>,
}

/// Retry settings for name resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Retries after the first attempt
    #[serde(default = "default_resolver_retries")]
    pub max_retries: u32,

    /// Delay before the first retry, in milliseconds
    #[serde(default = "default_resolver_initial_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for any single delay, in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_backoff_ms: u64,

    /// How the delay grows
    #[serde(default)]
    pub backoff_type: BackoffType,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_retries: default_resolver_retries(),
            initial_backoff_ms: default_resolver_initial_ms(),
            max_backoff_ms: default_max_ms(),
            backoff_type: BackoffType::Exponential,
        }
    }
}

impl ResolverConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            backoff_type: self.backoff_type,
        }
    }
}

fn default_resolver_retries() -> u32 {
    3
}

fn default_resolver_initial_ms() -> u64 {
    1000
}

/// Paging and batching settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadSettings {
    /// Items requested per page (1 to 1000)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Records per emitted batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum records to read (0 = unlimited)
    #[serde(default)]
    pub max_records: usize,
}

impl Default for ReadSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            batch_size: default_batch_size(),
            max_records: 0,
        }
    }
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_batch_size() -> usize {
    1000
}

//! HTTP client module
//!
//! Provides the HTTP client used by the remote store binding.
//!
//! # Features
//!
//! - **Automatic Retries**: Retries 429/5xx, timeouts and connect errors with backoff
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Authentication**: Integration with auth module

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, RequestBody, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};

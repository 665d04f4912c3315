//! Path resolver module
//!
//! Resolves slash-delimited names to resource identifiers.
//!
//! # Overview
//!
//! Multi-segment paths are walked level by level from the root. When a level
//! matches several folders every match is explored, so ambiguity surfaces
//! only at the last segment. Single names fall back to a flat search across
//! the store. Every listing call goes through a [`RetryPolicy`].

mod resolver;
mod retry;

pub use resolver::{is_root_path, path_segments, PathResolver, ResolverOptions};
pub use retry::RetryPolicy;

#[cfg(test)]
mod tests;

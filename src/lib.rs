// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # drivewalk
//!
//! Paginated, cursor-driven folder traversal and resource operations for
//! Drive-style hierarchical stores.
//!
//! ## Features
//!
//! - **Pull-based Listing**: `start` / `advance` / `current` over every resource under a folder
//! - **Path Resolution**: Slash-delimited names to identifiers, with retries
//! - **Resource Operations**: Create, copy, move, trash, delete and upload
//! - **Arrow Output**: Records as Arrow RecordBatches, JSON lines or Parquet
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use drivewalk::engine::{Addressing, ListReader};
//! use drivewalk::query::TraversalFilter;
//! use drivewalk::resolve::{PathResolver, ResolverOptions};
//! use drivewalk::ListMode;
//!
//! let resolver = PathResolver::new(service.clone(), ResolverOptions::default());
//! let filter = TraversalFilter::new(ListMode::Files).recursive(true);
//! let mut reader = ListReader::new(service, resolver, filter);
//!
//! let mut has_item = reader.start(Addressing::ByName("/Reports/2024".into())).await?;
//! while has_item {
//!     let record = reader.current()?;
//!     println!("{} {}", record.id, record.name);
//!     has_item = reader.advance().await?;
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                ListReader / DriveOperations                  │
//! │  start() → advance() → current()    copy / put / delete      │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//! ┌──────────┬──────────┬───────┴──────┬────────────┬───────────┐
//! │  Query   │ Resolve  │    Remote    │   Record   │  Output   │
//! ├──────────┼──────────┼──────────────┼────────────┼───────────┤
//! │ Filter   │ Paths    │ Drive (HTTP) │ Flat rows  │ JSON      │
//! │ Predicate│ Retry    │ Memory store │ Arrow      │ Parquet   │
//! └──────────┴──────────┴──────────────┴────────────┴───────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Authentication implementations
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Filter expressions and query predicates
pub mod query;

/// Remote store abstraction and its implementations
pub mod remote;

/// Name and path resolution
pub mod resolve;

/// Resource to record materialization
pub mod record;

/// Paginated traversal engine
pub mod engine;

/// Resource mutation operations
pub mod ops;

/// Arrow/Parquet output
pub mod output;

/// Reader configuration
pub mod config;

/// YAML loader for reader configurations
pub mod loader;

/// Template interpolation
pub mod template;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::ReaderConfig;
pub use engine::{Addressing, ListReader};
pub use loader::{load_config, load_config_from_str};
pub use ops::DriveOperations;
pub use record::Record;
pub use resolve::PathResolver;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

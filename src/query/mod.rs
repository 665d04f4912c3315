//! Query builder module
//!
//! Turns a traversal filter into the store's filter expression and provides
//! the predicate vocabulary used for name lookups and mutation pre-checks.
//!
//! # Overview
//!
//! - `TraversalFilter` - What a listing session should yield
//! - `FilterExpression` - Per-folder (templated) or whole-store (custom) query
//! - `build_filter` - Deterministic filter -> expression translation
//! - `Predicate` / `Query` - Escaped query fragments joined with ` and `

mod builder;
mod predicate;
mod types;

pub use builder::build_filter;
pub use predicate::{escape, Predicate, Query};
pub use types::{FilterExpression, TraversalFilter, PARENT_ID_VAR};

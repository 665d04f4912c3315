//! Query builder types

use super::predicate::escape;
use crate::error::Result;
use crate::template::{self, TemplateContext};
use crate::types::ListMode;
use serde::{Deserialize, Serialize};

/// Template variable substituted with the folder being expanded
pub const PARENT_ID_VAR: &str = "parent_id";

// ============================================================================
// Traversal Filter
// ============================================================================

/// What a listing session yields and where it looks
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalFilter {
    /// Kinds handed to the caller
    pub list_mode: ListMode,
    /// Queue discovered subfolders for expansion
    pub include_sub_directories: bool,
    /// Keep trashed resources in listings
    pub include_trashed_files: bool,
    /// Consider items shared with the caller during name resolution
    pub include_shared_with_me: bool,
    /// Treat shared drives as pseudo-roots during name resolution
    pub include_shared_drives: bool,
    /// Ignore everything above and run `custom_query` against the whole store
    pub use_custom_query: bool,
    /// Literal query text used when `use_custom_query` is set
    pub custom_query: Option<String>,
}

impl TraversalFilter {
    /// Create a filter for the given list mode
    pub fn new(list_mode: ListMode) -> Self {
        Self {
            list_mode,
            ..Default::default()
        }
    }

    /// Create a custom-query filter
    pub fn custom(query: impl Into<String>) -> Self {
        Self {
            use_custom_query: true,
            custom_query: Some(query.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn recursive(mut self, include_sub_directories: bool) -> Self {
        self.include_sub_directories = include_sub_directories;
        self
    }

    #[must_use]
    pub fn with_trashed(mut self, include_trashed_files: bool) -> Self {
        self.include_trashed_files = include_trashed_files;
        self
    }

    #[must_use]
    pub fn with_shared_with_me(mut self, include: bool) -> Self {
        self.include_shared_with_me = include;
        self
    }

    #[must_use]
    pub fn with_shared_drives(mut self, include: bool) -> Self {
        self.include_shared_drives = include;
        self
    }
}

// ============================================================================
// Filter Expression
// ============================================================================

/// A listing query produced by [`build_filter`](super::build_filter)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpression {
    /// Whole-store query, used verbatim
    Custom(String),
    /// Per-folder query with a `{{ parent_id }}` placeholder
    Template(String),
}

impl FilterExpression {
    /// Raw expression text
    pub fn as_str(&self) -> &str {
        match self {
            Self::Custom(text) | Self::Template(text) => text,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }

    /// Render the query for one folder.
    ///
    /// The identifier is escaped before substitution. Custom expressions
    /// are returned unchanged.
    pub fn for_parent(&self, parent_id: &str) -> Result<String> {
        match self {
            Self::Custom(text) => Ok(text.clone()),
            Self::Template(text) => {
                let ctx = TemplateContext::with_var(PARENT_ID_VAR, escape(parent_id));
                template::render(text, &ctx)
            }
        }
    }
}

//! Common types used throughout drivewalk
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

// ============================================================================
// Store Constants
// ============================================================================

/// Identifier of the store's root folder
pub const ROOT_FOLDER: &str = "root";

/// Content type reported for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Path separator used in hierarchical names
pub const PATH_SEPARATOR: char = '/';

// ============================================================================
// Resource Kind
// ============================================================================

/// Kind of a remote resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceKind {
    File,
    Folder,
}

impl ResourceKind {
    /// Derive the kind from a reported content type
    pub fn from_mime_type(mime_type: &str) -> Self {
        if mime_type == FOLDER_MIME_TYPE {
            Self::Folder
        } else {
            Self::File
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "FILE",
            Self::Folder => "FOLDER",
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Self::Folder)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// List Mode
// ============================================================================

/// Which resource kinds a traversal yields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ListMode {
    /// Only files
    Files,
    /// Only folders
    Directories,
    /// Files and folders
    #[default]
    Both,
}

impl ListMode {
    /// Whether resources of `kind` are handed to the caller
    pub fn accepts(&self, kind: ResourceKind) -> bool {
        match self {
            Self::Files => kind == ResourceKind::File,
            Self::Directories => kind == ResourceKind::Folder,
            Self::Both => true,
        }
    }
}

// ============================================================================
// Lookup Kind
// ============================================================================

/// Kind constraint applied when resolving a name to an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKind {
    File,
    Folder,
    Either,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Folder => f.write_str("folder"),
            Self::Either => f.write_str("file or folder"),
        }
    }
}

// ============================================================================
// Corpora
// ============================================================================

/// Bodies of items a listing query applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corpora {
    #[default]
    User,
    Drive,
    Domain,
    AllDrives,
}

impl Corpora {
    /// Wire value of the `corpora` request parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Drive => "drive",
            Self::Domain => "domain",
            Self::AllDrives => "allDrives",
        }
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.is_empty())
    }
}

impl OptionStringExt for String {
    fn none_if_empty(self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

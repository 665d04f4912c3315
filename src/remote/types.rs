//! Remote store types

use crate::error::{Error, Result};
use crate::types::{Corpora, ResourceKind, FOLDER_MIME_TYPE};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default page size for listing requests
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Fields requested for every listed resource
pub const RESOURCE_FIELDS: &str =
    "id,name,mimeType,modifiedTime,kind,size,parents,trashed,webViewLink";

/// Content type prefix of native documents, which only support export
pub const NATIVE_MIME_PREFIX: &str = "application/vnd.google-apps.";

/// Field selection for listing requests
pub const LIST_FIELDS: &str =
    "files(id,name,mimeType,modifiedTime,kind,size,parents,trashed,webViewLink),nextPageToken";

// ============================================================================
// Remote Resource
// ============================================================================

/// Metadata of a file or folder in the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteResource {
    pub id: String,
    pub name: String,
    pub kind: ResourceKind,
    pub mime_type: String,
    pub modified_time: Option<DateTime<Utc>>,
    pub size: Option<i64>,
    pub trashed: bool,
    pub parents: Option<Vec<String>>,
    pub web_view_link: Option<String>,
}

impl RemoteResource {
    /// Create a file resource
    pub fn file(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_mime_type(id, name, "application/octet-stream")
    }

    /// Create a folder resource
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_mime_type(id, name, FOLDER_MIME_TYPE)
    }

    /// Create a resource whose kind follows its content type
    pub fn with_mime_type(
        id: impl Into<String>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        let mime_type = mime_type.into();
        Self {
            id: id.into(),
            name: name.into(),
            kind: ResourceKind::from_mime_type(&mime_type),
            mime_type,
            modified_time: None,
            size: None,
            trashed: false,
            parents: None,
            web_view_link: None,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parents.get_or_insert_with(Vec::new).push(parent_id.into());
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: i64) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub fn with_modified_time(mut self, modified_time: DateTime<Utc>) -> Self {
        self.modified_time = Some(modified_time);
        self
    }

    #[must_use]
    pub fn with_web_view_link(mut self, link: impl Into<String>) -> Self {
        self.web_view_link = Some(link.into());
        self
    }

    #[must_use]
    pub fn trashed(mut self) -> Self {
        self.trashed = true;
        self
    }

    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }

    /// Whether the resource is a native document without binary content
    pub fn is_native_document(&self) -> bool {
        !self.is_folder() && self.mime_type.starts_with(NATIVE_MIME_PREFIX)
    }

    /// Whether `parent_id` is listed among the parents
    pub fn has_parent(&self, parent_id: &str) -> bool {
        self.parents
            .as_deref()
            .is_some_and(|parents| parents.iter().any(|p| p == parent_id))
    }
}

// ============================================================================
// Listing
// ============================================================================

/// One page of a listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<RemoteResource>,
    pub next_page_token: Option<String>,
}

impl Page {
    pub fn new(items: Vec<RemoteResource>, next_page_token: Option<String>) -> Self {
        Self {
            items,
            next_page_token,
        }
    }
}

/// Where a listing query looks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchScope {
    /// Include shared drive items and accept shared drive ids
    pub supports_all_drives: bool,
    /// Bodies of items to search
    pub corpora: Option<Corpora>,
    /// Shared drive to search when `corpora` is `drive`
    pub drive_id: Option<String>,
}

impl SearchScope {
    /// Build a first-page request for `query` in this scope
    pub fn list_request(&self, query: impl Into<String>, page_size: u32) -> ListRequest {
        ListRequest {
            query: query.into(),
            page_token: None,
            page_size,
            fields: LIST_FIELDS.to_string(),
            supports_all_drives: self.supports_all_drives,
            corpora: self.corpora,
            drive_id: self.drive_id.clone(),
        }
    }
}

/// A single listing call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub query: String,
    pub page_token: Option<String>,
    pub page_size: u32,
    pub fields: String,
    pub supports_all_drives: bool,
    pub corpora: Option<Corpora>,
    pub drive_id: Option<String>,
}

impl ListRequest {
    /// Create a request with default fields and page size
    pub fn new(query: impl Into<String>) -> Self {
        SearchScope::default().list_request(query, DEFAULT_PAGE_SIZE)
    }

    /// Continue at `token`
    #[must_use]
    pub fn with_page_token(mut self, token: Option<String>) -> Self {
        self.page_token = token;
        self
    }
}

// ============================================================================
// Mutations
// ============================================================================

/// Metadata for a resource to be created or copied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewResource {
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub parents: Vec<String>,
}

impl NewResource {
    /// Metadata for a new folder
    pub fn folder(name: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            mime_type: Some(FOLDER_MIME_TYPE.to_string()),
            parents: vec![parent_id.into()],
        }
    }

    /// Metadata for a new file
    pub fn file(name: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            mime_type: None,
            parents: vec![parent_id.into()],
        }
    }

    /// Copy destination, optionally renamed
    pub fn copy_into(parent_id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            name,
            mime_type: None,
            parents: vec![parent_id.into()],
        }
    }
}

/// Partial update of a resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourcePatch {
    pub name: Option<String>,
    pub trashed: Option<bool>,
}

impl ResourcePatch {
    /// Move to trash
    pub fn trash() -> Self {
        Self {
            trashed: Some(true),
            ..Default::default()
        }
    }
}

/// Content uploaded with a new file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Bytes(Bytes),
    LocalFile(PathBuf),
}

impl Content {
    /// Load the content into memory
    pub async fn into_bytes(self) -> Result<Bytes> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::LocalFile(path) => tokio::fs::read(&path).await.map(Bytes::from).map_err(|e| {
                Error::fatal(format!("failed to read '{}': {e}", path.display()))
            }),
        }
    }
}

impl From<Vec<u8>> for Content {
    fn from(data: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(data))
    }
}

impl From<&'static str> for Content {
    fn from(data: &'static str) -> Self {
        Self::Bytes(Bytes::from_static(data.as_bytes()))
    }
}

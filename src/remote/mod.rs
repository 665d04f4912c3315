//! Remote store module
//!
//! The `RemoteService` trait is the only way the rest of the crate talks to
//! a store. Two implementations ship with the crate:
//!
//! - `DriveClient` - Drive v3 REST binding over the crate's HTTP client
//! - `MemoryStore` - in-process store used by tests and fixture mode

mod drive;
mod memory;
mod types;

pub use drive::{DriveClient, DEFAULT_API_URL, DEFAULT_UPLOAD_URL};
pub use memory::{MemoryStore, StoreFixture};
pub use types::{
    Content, ListRequest, NewResource, Page, RemoteResource, ResourcePatch, SearchScope,
    DEFAULT_PAGE_SIZE, LIST_FIELDS, NATIVE_MIME_PREFIX, RESOURCE_FIELDS,
};

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Listing, lookup, mutation and content calls against a remote store
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Fetch one page of resources matching the request's query
    async fn list(&self, request: &ListRequest) -> Result<Page>;

    /// Fetch one resource's metadata
    async fn get(&self, id: &str, fields: &str) -> Result<RemoteResource>;

    /// Create a resource, uploading `content` for files
    async fn create(&self, metadata: NewResource, content: Option<Content>)
        -> Result<RemoteResource>;

    /// Copy a file
    async fn copy(&self, id: &str, metadata: NewResource) -> Result<RemoteResource>;

    /// Permanently delete a resource
    async fn delete(&self, id: &str) -> Result<()>;

    /// Apply a partial update
    async fn update(&self, id: &str, patch: ResourcePatch) -> Result<RemoteResource>;

    /// Binary content of a stored file
    async fn download(&self, id: &str) -> Result<Bytes>;

    /// Content of a native document converted to `mime_type`
    async fn export(&self, id: &str, mime_type: &str) -> Result<Bytes>;
}

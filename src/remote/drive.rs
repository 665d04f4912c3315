//! Drive v3 REST binding
//!
//! Metadata and mutation calls are sent once: the resolver's retry policy
//! is the only retry layer above them, and failures the store may recover
//! from are reported as [`Error::TransientIo`]. Content downloads are plain
//! GETs and use the HTTP client's own retry settings.

use super::types::{
    Content, ListRequest, NewResource, Page, RemoteResource, ResourcePatch, RESOURCE_FIELDS,
};
use super::RemoteService;
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use crate::types::LookupKind;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;
use url::Url;

/// Default metadata API endpoint
pub const DEFAULT_API_URL: &str = "https://www.googleapis.com/drive/v3";

/// Default upload API endpoint
pub const DEFAULT_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";

const MULTIPART_BOUNDARY: &str = "drivewalk_boundary";

/// [`RemoteService`] backed by the Drive v3 REST API
#[derive(Debug)]
pub struct DriveClient {
    http: HttpClient,
    api_url: String,
    upload_url: String,
}

impl DriveClient {
    /// Create a client against the public endpoints
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            api_url: DEFAULT_API_URL.to_string(),
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
        }
    }

    /// Point the client at other endpoints
    pub fn with_urls(http: HttpClient, api_url: &str, upload_url: &str) -> Result<Self> {
        Ok(Self {
            http,
            api_url: normalize_base(api_url)?,
            upload_url: normalize_base(upload_url)?,
        })
    }

    /// Request settings for a call that must not be repeated by the client
    fn single_attempt() -> RequestConfig {
        RequestConfig::new().retries(0)
    }

    fn files_url(&self) -> String {
        format!("{}/files", self.api_url)
    }

    fn file_url(&self, id: &str) -> String {
        format!("{}/files/{id}", self.api_url)
    }

    async fn upload(&self, metadata: Value, content: Content) -> Result<DriveFile> {
        let data = content.into_bytes().await?;

        let mut body = Vec::with_capacity(data.len() + 256);
        body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
        body.extend_from_slice(metadata.to_string().as_bytes());
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(&data);
        body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--").as_bytes());

        let config = Self::single_attempt()
            .query("uploadType", "multipart")
            .query("supportsAllDrives", "true")
            .query("fields", RESOURCE_FIELDS)
            .bytes(
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
                body,
            );

        self.http
            .post_json(&format!("{}/files", self.upload_url), config)
            .await
            .map_err(classify)
    }
}

#[async_trait]
impl RemoteService for DriveClient {
    async fn list(&self, request: &ListRequest) -> Result<Page> {
        let supports_all_drives = request.supports_all_drives.to_string();
        let config = Self::single_attempt()
            .query("q", request.query.as_str())
            .query("pageSize", request.page_size.to_string())
            .query("fields", request.fields.as_str())
            .query("supportsAllDrives", supports_all_drives.as_str())
            .query("includeItemsFromAllDrives", supports_all_drives.as_str())
            .query_opt("pageToken", request.page_token.as_deref())
            .query_opt("corpora", request.corpora.map(|c| c.as_str()))
            .query_opt("driveId", request.drive_id.as_deref());

        debug!(query = %request.query, token = ?request.page_token, "Listing files");
        let list: DriveFileList = self
            .http
            .get_json(&self.files_url(), config)
            .await
            .map_err(classify)?;

        Ok(Page::new(
            list.files.into_iter().map(RemoteResource::from).collect(),
            list.next_page_token.filter(|t| !t.is_empty()),
        ))
    }

    async fn get(&self, id: &str, fields: &str) -> Result<RemoteResource> {
        let config = Self::single_attempt()
            .query("fields", fields)
            .query("supportsAllDrives", "true");

        let file: DriveFile = self
            .http
            .get_json(&self.file_url(id), config)
            .await
            .map_err(|e| not_found_as(e, id))?;
        Ok(file.into())
    }

    async fn create(
        &self,
        metadata: NewResource,
        content: Option<Content>,
    ) -> Result<RemoteResource> {
        let body = metadata_body(&metadata);
        let file = match content {
            Some(content) => self.upload(body, content).await?,
            None => {
                let config = Self::single_attempt()
                    .query("supportsAllDrives", "true")
                    .query("fields", RESOURCE_FIELDS)
                    .json(body);
                self.http
                    .post_json(&self.files_url(), config)
                    .await
                    .map_err(classify)?
            }
        };
        Ok(file.into())
    }

    async fn copy(&self, id: &str, metadata: NewResource) -> Result<RemoteResource> {
        let config = Self::single_attempt()
            .query("supportsAllDrives", "true")
            .query("fields", RESOURCE_FIELDS)
            .json(metadata_body(&metadata));

        let file: DriveFile = self
            .http
            .post_json(&format!("{}/copy", self.file_url(id)), config)
            .await
            .map_err(|e| not_found_as(e, id))?;
        Ok(file.into())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let config = Self::single_attempt().query("supportsAllDrives", "true");
        self.http
            .delete(&self.file_url(id), config)
            .await
            .map_err(|e| not_found_as(e, id))
    }

    async fn update(&self, id: &str, patch: ResourcePatch) -> Result<RemoteResource> {
        let mut body = Map::new();
        if let Some(name) = patch.name {
            body.insert("name".to_string(), Value::String(name));
        }
        if let Some(trashed) = patch.trashed {
            body.insert("trashed".to_string(), Value::Bool(trashed));
        }

        let config = Self::single_attempt()
            .query("supportsAllDrives", "true")
            .query("fields", RESOURCE_FIELDS)
            .json(Value::Object(body));

        let file: DriveFile = self
            .http
            .patch_json(&self.file_url(id), config)
            .await
            .map_err(|e| not_found_as(e, id))?;
        Ok(file.into())
    }

    async fn download(&self, id: &str) -> Result<Bytes> {
        let config = RequestConfig::new()
            .query("alt", "media")
            .query("supportsAllDrives", "true");

        debug!(id, "Downloading content");
        self.http
            .get_bytes(&self.file_url(id), config)
            .await
            .map_err(|e| not_found_as(e, id))
    }

    async fn export(&self, id: &str, mime_type: &str) -> Result<Bytes> {
        let config = RequestConfig::new().query("mimeType", mime_type);

        debug!(id, mime_type, "Exporting document");
        self.http
            .get_bytes(&format!("{}/export", self.file_url(id)), config)
            .await
            .map_err(|e| not_found_as(e, id))
    }
}

fn normalize_base(raw: &str) -> Result<String> {
    let url = Url::parse(raw)?;
    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn metadata_body(metadata: &NewResource) -> Value {
    let mut body = json!({ "parents": metadata.parents });
    if let Some(name) = &metadata.name {
        body["name"] = Value::String(name.clone());
    }
    if let Some(mime_type) = &metadata.mime_type {
        body["mimeType"] = Value::String(mime_type.clone());
    }
    body
}

fn not_found_as(err: Error, id: &str) -> Error {
    match err {
        Error::HttpStatus { status: 404, .. } => Error::not_found(LookupKind::Either, id),
        other => classify(other),
    }
}

/// Report failures worth another attempt as transient
fn classify(err: Error) -> Error {
    let malformed_body = matches!(&err, Error::Http(e) if e.is_decode());
    if err.is_retryable() && !malformed_body {
        Error::transient(err.to_string())
    } else {
        err
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
    modified_time: Option<String>,
    size: Option<String>,
    #[serde(default)]
    trashed: bool,
    parents: Option<Vec<String>>,
    web_view_link: Option<String>,
}

impl From<DriveFile> for RemoteResource {
    fn from(file: DriveFile) -> Self {
        let mut resource = RemoteResource::with_mime_type(file.id, file.name, file.mime_type);
        resource.modified_time = file
            .modified_time
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc));
        resource.size = file.size.and_then(|s| s.parse().ok());
        resource.trashed = file.trashed;
        resource.parents = file.parents;
        resource.web_view_link = file.web_view_link;
        resource
    }
}

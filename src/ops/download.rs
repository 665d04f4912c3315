//! File content retrieval

use super::DriveOperations;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Fields needed to decide between download and export
const GET_FIELDS: &str = "id,name,mimeType";

/// Target format for one native document type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFormat {
    /// Content type requested from the export endpoint
    pub mime_type: String,
    /// File extension without the leading dot
    pub extension: String,
}

impl ExportFormat {
    pub fn new(mime_type: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    /// Office and image formats for the common document types
    pub fn defaults() -> HashMap<String, ExportFormat> {
        [
            (
                "application/vnd.google-apps.document",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                "docx",
            ),
            (
                "application/vnd.google-apps.spreadsheet",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                "xlsx",
            ),
            (
                "application/vnd.google-apps.presentation",
                "application/vnd.openxmlformats-officedocument.presentationml.presentation",
                "pptx",
            ),
            ("application/vnd.google-apps.drawing", "image/png", "png"),
            (
                "application/vnd.google-apps.script",
                "application/vnd.google-apps.script+json",
                "json",
            ),
        ]
        .into_iter()
        .map(|(source, target, ext)| (source.to_string(), ExportFormat::new(target, ext)))
        .collect()
    }
}

/// What to do with a file's content
#[derive(Debug, Clone)]
pub struct GetOptions {
    /// Export format per native document type
    pub export_map: HashMap<String, ExportFormat>,
    /// Write the content to this local file
    pub local_path: Option<PathBuf>,
    /// Append the content's extension to `local_path` when missing
    pub add_ext: bool,
    /// Return the content to the caller
    pub to_bytes: bool,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            export_map: ExportFormat::defaults(),
            local_path: None,
            add_ext: false,
            to_bytes: true,
        }
    }
}

impl GetOptions {
    /// Save to `path` without keeping the content in the result
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            local_path: Some(path.into()),
            to_bytes: false,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_add_ext(mut self, add_ext: bool) -> Self {
        self.add_ext = add_ext;
        self
    }

    #[must_use]
    pub fn with_bytes(mut self, to_bytes: bool) -> Self {
        self.to_bytes = to_bytes;
        self
    }

    #[must_use]
    pub fn with_export(
        mut self,
        source_mime_type: impl Into<String>,
        format: ExportFormat,
    ) -> Self {
        self.export_map.insert(source_mime_type.into(), format);
        self
    }
}

/// Outcome of [`DriveOperations::get`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Downloaded {
    pub id: String,
    /// Content, when requested
    pub content: Option<Bytes>,
    /// Local file written, if any
    pub local_path: Option<PathBuf>,
    /// Content type of the retrieved bytes
    pub mime_type: Option<String>,
}

impl DriveOperations {
    /// Retrieve a file's content.
    ///
    /// Native documents are exported through `export_map`; every other file
    /// is downloaded as is. Nothing is fetched when neither a local file nor
    /// the bytes are asked for.
    pub async fn get(&self, id: &str, options: &GetOptions) -> Result<Downloaded> {
        let resource = self.resolver.metadata(id, GET_FIELDS).await?;
        if resource.is_folder() {
            return Err(Error::fatal(format!(
                "'{}' is a folder and has no content",
                resource.name
            )));
        }

        if options.local_path.is_none() && !options.to_bytes {
            debug!("Skipping {}: no local file and no bytes requested", id);
            return Ok(Downloaded {
                id: id.to_string(),
                ..Default::default()
            });
        }

        let (content, extension, mime_type) = if resource.is_native_document() {
            let format = options.export_map.get(&resource.mime_type).ok_or_else(|| {
                Error::config(format!(
                    "No export format configured for '{}'",
                    resource.mime_type
                ))
            })?;
            let content = self
                .service
                .export(id, &format.mime_type)
                .await
                .map_err(Error::into_fatal)?;
            (content, Some(format.extension.clone()), format.mime_type.clone())
        } else {
            let content = self
                .service
                .download(id)
                .await
                .map_err(Error::into_fatal)?;
            let extension = Path::new(&resource.name)
                .extension()
                .map(|e| e.to_string_lossy().into_owned());
            (content, extension, resource.mime_type.clone())
        };

        let local_path = match &options.local_path {
            Some(path) => {
                let path = if options.add_ext {
                    with_extension(path, extension.as_deref())
                } else {
                    path.clone()
                };
                info!("Writing {} to {}", id, path.display());
                tokio::fs::write(&path, &content).await?;
                Some(path)
            }
            None => None,
        };

        Ok(Downloaded {
            id: id.to_string(),
            content: options.to_bytes.then_some(content),
            local_path,
            mime_type: Some(mime_type),
        })
    }
}

/// Append `.ext` unless the path already ends with it
fn with_extension(path: &Path, extension: Option<&str>) -> PathBuf {
    match extension.filter(|e| !e.is_empty()) {
        Some(ext) if !path.to_string_lossy().ends_with(&format!(".{ext}")) => {
            let mut raw = path.as_os_str().to_os_string();
            raw.push(".");
            raw.push(ext);
            PathBuf::from(raw)
        }
        _ => path.to_path_buf(),
    }
}

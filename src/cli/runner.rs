//! CLI runner - executes commands

use crate::auth::AuthConfig;
use crate::cli::commands::{Cli, Commands, ListModeArg, OutputFormat};
use crate::config::{ReaderConfig, SourceConfig};
use crate::engine::{ListReader, LogLevel, Message};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::loader::{build_auth_config, load_config, render_config, template_context};
use crate::ops::{DriveOperations, ExportFormat, GetOptions};
use crate::output::{arrow_to_json, ParquetWriter, ParquetWriterConfig};
use crate::record::Record;
use crate::remote::{Content, DriveClient, MemoryStore, RemoteService, StoreFixture};
use crate::resolve::{path_segments, PathResolver};
use crate::template::TemplateContext;
use crate::types::LookupKind;
use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Overrides the `list` command applies on top of the config file
#[derive(Debug, Default)]
struct ListOverrides<'a> {
    folder_id: Option<&'a str>,
    folder_name: Option<&'a str>,
    mode: Option<ListModeArg>,
    recursive: bool,
    query: Option<&'a str>,
    max_records: Option<usize>,
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command, writing messages to stdout
    pub async fn run(&self) -> Result<()> {
        let mut stdout = std::io::stdout();
        self.run_to(&mut stdout).await
    }

    /// Run the CLI command, writing messages to `out`
    pub async fn run_to<W: Write>(&self, out: &mut W) -> Result<()> {
        let config = self.load_config()?;

        match &self.cli.command {
            Commands::List {
                folder_id,
                folder_name,
                mode,
                recursive,
                query,
                output,
                max_records,
            } => {
                let overrides = ListOverrides {
                    folder_id: folder_id.as_deref(),
                    folder_name: folder_name.as_deref(),
                    mode: *mode,
                    recursive: *recursive,
                    query: query.as_deref(),
                    max_records: *max_records,
                };
                self.list(out, apply_overrides(config, &overrides), output.as_deref())
                    .await
            }
            Commands::Resolve {
                path,
                kind,
                trashed,
                shared,
            } => {
                let resolver = self.build_resolver(&config)?;
                let kind = LookupKind::from(*kind);
                let id = match kind {
                    LookupKind::Folder => resolver.folder_id(path, *trashed, *shared).await?,
                    _ => resolver.resolve(path, kind, *trashed, *shared).await?,
                };
                self.output_result(out, "resolve", json!({ "path": path, "kind": kind, "id": id }))
            }
            Commands::Mkdir { name, parent } => {
                let ops = self.build_operations(&config)?;
                let parent_id = ops.resolver().folder_id(parent, false, false).await?;
                let id = ops.create_folder(&parent_id, name).await?;
                self.output_result(
                    out,
                    "mkdir",
                    json!({ "name": name, "parent": parent_id, "id": id }),
                )
            }
            Commands::Copy {
                source,
                dest,
                name,
                move_file,
                recursive,
            } => {
                let ops = self.build_operations(&config)?;
                let dest_id = ops.resolver().folder_id(dest, false, false).await?;

                let (source_id, id) = if *recursive {
                    let source_id = ops.resolver().folder_id(source, false, false).await?;
                    let new_name = match name {
                        Some(name) => name.clone(),
                        None => path_segments(source)
                            .pop()
                            .ok_or_else(|| Error::config("Cannot copy the root folder"))?,
                    };
                    let id = ops.copy_folder(&source_id, &dest_id, &new_name).await?;
                    (source_id, id)
                } else {
                    let source_id = ops.resolver().file_id(source, false, false).await?;
                    let id = ops
                        .copy_file(&source_id, &dest_id, name.as_deref(), *move_file)
                        .await?;
                    (source_id, id)
                };

                self.output_result(
                    out,
                    if *move_file { "move" } else { "copy" },
                    json!({ "source": source_id, "dest": dest_id, "id": id }),
                )
            }
            Commands::Delete {
                path,
                permanent,
                shared,
            } => {
                let ops = self.build_operations(&config)?;
                let id = ops.delete_by_name(path, !*permanent, *shared).await?;
                self.output_result(
                    out,
                    "delete",
                    json!({ "path": path, "id": id, "trashed": !*permanent }),
                )
            }
            Commands::Put {
                file,
                parent,
                name,
                overwrite,
            } => {
                let ops = self.build_operations(&config)?;
                let parent_id = ops.resolver().folder_id(parent, false, false).await?;
                let name = match name {
                    Some(name) => name.clone(),
                    None => local_file_name(file)?,
                };
                let created = ops
                    .put(&parent_id, &name, Content::LocalFile(file.clone()), *overwrite)
                    .await?;
                self.output_result(out, "put", serde_json::to_value(Record::from(&created))?)
            }
            Commands::Get {
                path,
                output,
                add_ext,
                exports,
                trashed,
            } => {
                let ops = self.build_operations(&config)?;
                let id = ops.resolver().file_id(path, *trashed, false).await?;

                let mut options = GetOptions::default().with_add_ext(*add_ext);
                options.local_path = output.clone();
                for mapping in exports {
                    let (source, format) = parse_export(mapping)?;
                    options = options.with_export(source, format);
                }

                let downloaded = ops.get(&id, &options).await?;
                let content = downloaded.content.unwrap_or_default();
                let mut result = json!({
                    "path": path,
                    "id": downloaded.id,
                    "mime_type": downloaded.mime_type,
                    "size": content.len(),
                    "file": downloaded.local_path.map(|p| p.display().to_string()),
                });
                if output.is_none() {
                    result["content"] =
                        Value::String(String::from_utf8_lossy(&content).into_owned());
                }
                self.output_result(out, "get", result)
            }
            Commands::Validate => self.output_message(
                out,
                &json!({
                    "type": "LOG",
                    "log": {
                        "level": "INFO",
                        "message": format!("Reader config '{}' is valid", config.name)
                    }
                }),
            ),
        }
    }

    /// Load and render the reader configuration
    fn load_config(&self) -> Result<ReaderConfig> {
        let config = match &self.cli.config {
            Some(path) => load_config(path)?,
            None => ReaderConfig::default(),
        };
        let ctx = template_context(&config)?;
        render_config(&config, &ctx)
    }

    /// Build the store binding, or an in-memory store in fixture mode
    fn build_service(&self, config: &ReaderConfig) -> Result<Arc<dyn RemoteService>> {
        if let Some(path) = &self.cli.fixture {
            let content = fs::read_to_string(path).map_err(|e| {
                Error::config(format!(
                    "Failed to read fixture file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            let fixture: StoreFixture = serde_yaml::from_str(&content)?;
            debug!(
                "Serving {} fixture resources from memory",
                fixture.resources.len()
            );
            return Ok(Arc::new(MemoryStore::from_fixture(fixture)));
        }

        // Templates were rendered with the config, so no context is needed here
        let auth = build_auth_config(&config.auth, &TemplateContext::new())?;
        if matches!(auth, AuthConfig::None) {
            info!("No authentication configured");
        }
        let http = HttpClient::with_auth(config.http_client_config(), auth)?;
        let client = DriveClient::with_urls(http, &config.api.api_url, &config.api.upload_url)?;
        Ok(Arc::new(client))
    }

    fn build_resolver(&self, config: &ReaderConfig) -> Result<PathResolver> {
        let service = self.build_service(config)?;
        Ok(PathResolver::new(service, config.resolver_options()))
    }

    fn build_operations(&self, config: &ReaderConfig) -> Result<DriveOperations> {
        let service = self.build_service(config)?;
        let resolver = PathResolver::new(service.clone(), config.resolver_options());
        Ok(DriveOperations::new(service, resolver))
    }

    /// Read one listing session and emit its records
    async fn list<W: Write>(
        &self,
        out: &mut W,
        config: ReaderConfig,
        output: Option<&Path>,
    ) -> Result<()> {
        let started = Instant::now();

        let mut writer = match (self.cli.format, output) {
            (OutputFormat::Parquet, None) => {
                return Err(Error::config("Parquet format requires --output file"))
            }
            (_, Some(path)) => Some(ParquetWriter::create(path, &ParquetWriterConfig::default())?),
            (_, None) => None,
        };

        let service = self.build_service(&config)?;
        let resolver = PathResolver::new(service.clone(), config.resolver_options());
        let mut reader = ListReader::new(service, resolver, config.traversal.clone())
            .with_config(config.read_config());

        let (messages, stats) = match reader.read_batches(&config.name, config.addressing()).await
        {
            Ok(result) => result,
            Err(e) => {
                self.output_engine_message(
                    out,
                    &Message::error(format!("Error reading stream {}: {e}", config.name)),
                    None,
                )?;
                self.output_message(
                    out,
                    &json!({
                        "type": "SUMMARY",
                        "summary": {
                            "stream": config.name,
                            "status": "FAILED",
                            "error": e.to_string(),
                            "metrics": reader.metrics(),
                            "duration_ms": started.elapsed().as_millis() as u64
                        }
                    }),
                )?;
                return Err(e);
            }
        };

        for msg in &messages {
            self.output_engine_message(out, msg, writer.as_mut())?;
        }

        let output_file: Option<PathBuf> = output.map(Path::to_path_buf);
        if let Some(writer) = writer {
            let rows = writer.close()?;
            debug!("Wrote {} rows to {:?}", rows, output_file);
        }

        self.output_message(
            out,
            &json!({
                "type": "SUMMARY",
                "summary": {
                    "stream": config.name,
                    "status": "SUCCEEDED",
                    "records": stats.records_read,
                    "batches": stats.batches,
                    "pages_fetched": stats.pages_fetched,
                    "total_seen": stats.total_seen,
                    "metrics": reader.metrics(),
                    "duration_ms": started.elapsed().as_millis() as u64,
                    "output": {
                        "format": format_name(self.cli.format),
                        "file": output_file
                    }
                }
            }),
        )
    }

    /// Output a JSON message
    fn output_message<W: Write>(&self, out: &mut W, msg: &Value) -> Result<()> {
        let line = match self.cli.format {
            OutputFormat::Json | OutputFormat::Parquet => serde_json::to_string(msg)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(msg)?,
        };
        writeln!(out, "{line}")?;
        Ok(())
    }

    fn output_result<W: Write>(&self, out: &mut W, operation: &str, result: Value) -> Result<()> {
        self.output_message(
            out,
            &json!({
                "type": "RESULT",
                "operation": operation,
                "result": result
            }),
        )
    }

    /// Output an engine message
    fn output_engine_message<W: Write>(
        &self,
        out: &mut W,
        msg: &Message,
        parquet: Option<&mut ParquetWriter>,
    ) -> Result<()> {
        match msg {
            Message::Record { stream, batch } => {
                if let Some(writer) = parquet {
                    writer.write(batch)?;
                }
                // Parquet format: records go to the file only
                if self.cli.format == OutputFormat::Parquet {
                    return Ok(());
                }

                let emitted_at = chrono::Utc::now().timestamp_millis();
                for record in arrow_to_json(batch)? {
                    self.output_message(
                        out,
                        &json!({
                            "type": "RECORD",
                            "record": {
                                "stream": stream,
                                "data": record,
                                "emitted_at": emitted_at
                            }
                        }),
                    )?;
                }
                Ok(())
            }
            Message::Log { level, message } => {
                if *level == LogLevel::Debug && !self.cli.verbose {
                    return Ok(());
                }
                self.output_message(
                    out,
                    &json!({
                        "type": "LOG",
                        "log": {
                            "level": level,
                            "message": message
                        }
                    }),
                )
            }
        }
    }
}

/// Apply command-line overrides to a loaded configuration
fn apply_overrides(mut config: ReaderConfig, overrides: &ListOverrides<'_>) -> ReaderConfig {
    if let Some(id) = overrides.folder_id {
        config.source = SourceConfig {
            folder_id: Some(id.to_string()),
            folder_name: None,
        };
    }
    if let Some(name) = overrides.folder_name {
        config.source = SourceConfig {
            folder_id: None,
            folder_name: Some(name.to_string()),
        };
    }
    if let Some(mode) = overrides.mode {
        config.traversal.list_mode = mode.into();
    }
    if overrides.recursive {
        config.traversal.include_sub_directories = true;
    }
    if let Some(query) = overrides.query {
        config.traversal.use_custom_query = true;
        config.traversal.custom_query = Some(query.to_string());
    }
    if let Some(max) = overrides.max_records {
        config.read.max_records = max;
    }
    config
}

fn local_file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| Error::config(format!("'{}' has no file name", path.display())))
}

/// Parse `SOURCE_MIME=TARGET_MIME:EXTENSION`
fn parse_export(mapping: &str) -> Result<(String, ExportFormat)> {
    let invalid = || {
        Error::config(format!(
            "Invalid export mapping '{mapping}', expected SOURCE_MIME=TARGET_MIME:EXTENSION"
        ))
    };
    let (source, target) = mapping.split_once('=').ok_or_else(invalid)?;
    let (mime_type, extension) = target.rsplit_once(':').ok_or_else(invalid)?;
    if source.is_empty() || mime_type.is_empty() {
        return Err(invalid());
    }
    Ok((source.to_string(), ExportFormat::new(mime_type, extension)))
}

fn format_name(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Json => "json",
        OutputFormat::Pretty => "pretty",
        OutputFormat::Parquet => "parquet",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_export() {
        let (source, format) =
            parse_export("application/vnd.google-apps.document=application/pdf:pdf").unwrap();
        assert_eq!(source, "application/vnd.google-apps.document");
        assert_eq!(format, ExportFormat::new("application/pdf", "pdf"));

        assert!(parse_export("application/pdf").is_err());
        assert!(parse_export("a=b").is_err());
        assert!(parse_export("=application/pdf:pdf").is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let config = ReaderConfig {
            source: SourceConfig {
                folder_id: Some("abc".to_string()),
                folder_name: None,
            },
            ..ReaderConfig::default()
        };
        let overrides = ListOverrides {
            folder_name: Some("/Reports"),
            mode: Some(ListModeArg::Files),
            recursive: true,
            max_records: Some(5),
            ..ListOverrides::default()
        };

        let config = apply_overrides(config, &overrides);
        assert_eq!(config.source.folder_id, None);
        assert_eq!(config.source.folder_name.as_deref(), Some("/Reports"));
        assert_eq!(config.traversal.list_mode, crate::types::ListMode::Files);
        assert!(config.traversal.include_sub_directories);
        assert_eq!(config.read.max_records, 5);
    }

    #[test]
    fn test_query_override_switches_to_custom_mode() {
        let overrides = ListOverrides {
            query: Some("name contains 'x'"),
            ..ListOverrides::default()
        };
        let config = apply_overrides(ReaderConfig::default(), &overrides);
        assert!(config.traversal.use_custom_query);
        assert_eq!(
            config.traversal.custom_query.as_deref(),
            Some("name contains 'x'")
        );
    }

    #[test]
    fn test_local_file_name() {
        assert_eq!(
            local_file_name(Path::new("/tmp/report.csv")).unwrap(),
            "report.csv"
        );
        assert!(local_file_name(Path::new("/")).is_err());
    }
}

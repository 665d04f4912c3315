//! Traversal engine module
//!
//! Pull-based, page-at-a-time listing of every matching resource under a
//! set of starting folders.
//!
//! # Overview
//!
//! The engine module provides:
//! - `ListReader` - one traversal session with `start` / `advance` / `current`
//! - `TraversalState` - the session cursor and its pure transitions
//! - `ReadConfig` - page size, batch size and record limit
//! - Message types for batched output (Record, Log)
//!
//! # Example
//!
//! ```ignore
//! let mut reader = ListReader::new(service, resolver, filter);
//! let mut has_item = reader.start(Addressing::ByName("/Reports".into())).await?;
//! while has_item {
//!     println!("{}", reader.current()?.name);
//!     has_item = reader.advance().await?;
//! }
//! ```

mod state;
mod types;

pub use state::{PageTarget, Phase, Step, TraversalState};
pub use types::{LogLevel, Message, ReadConfig, ReadStats, SessionMetrics};

use crate::error::{Error, Result};
use crate::query::{build_filter, FilterExpression, TraversalFilter};
use crate::record::{records_to_batch, Record};
use crate::remote::{Page, RemoteResource, RemoteService, SearchScope};
use crate::resolve::PathResolver;
use futures::Stream;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// How the starting folder is named
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Addressing {
    /// Folder identifier, used as is
    ById(String),
    /// Folder name or slash-delimited path, resolved first
    ByName(String),
}

/// One traversal session
pub struct ListReader {
    service: Arc<dyn RemoteService>,
    resolver: PathResolver,
    filter: TraversalFilter,
    expression: FilterExpression,
    scope: SearchScope,
    config: ReadConfig,
    state: TraversalState,
}

impl ListReader {
    /// Create a reader; nothing is fetched until [`start`](Self::start)
    pub fn new(
        service: Arc<dyn RemoteService>,
        resolver: PathResolver,
        filter: TraversalFilter,
    ) -> Self {
        let expression = build_filter(&filter);
        let mut scope = resolver.options().scope.clone();
        scope.supports_all_drives |= filter.include_shared_drives;

        Self {
            service,
            resolver,
            filter,
            expression,
            scope,
            config: ReadConfig::default(),
            state: TraversalState::new(),
        }
    }

    /// Set read configuration
    #[must_use]
    pub fn with_config(mut self, config: ReadConfig) -> Self {
        self.config = config;
        self
    }

    pub fn filter(&self) -> &TraversalFilter {
        &self.filter
    }

    pub fn expression(&self) -> &FilterExpression {
        &self.expression
    }

    /// Get the session cursor
    pub fn state(&self) -> &TraversalState {
        &self.state
    }

    /// Begin the session and move to the first item.
    ///
    /// Returns `false` when the starting folder does not exist or nothing
    /// under it matches. May only be called once.
    #[instrument(skip(self), level = "debug")]
    pub async fn start(&mut self, addressing: Addressing) -> Result<bool> {
        if self.state.phase() != Phase::NotStarted {
            return Err(Error::illegal_state("start() called twice on one session"));
        }
        debug!("Traversal query: {}", self.expression.as_str());

        if self.expression.is_custom() {
            self.state.begin_custom();
            return self.fetch_until_ready().await;
        }

        let (label, folders) = match addressing {
            Addressing::ById(id) => (id.clone(), vec![id]),
            Addressing::ByName(name) => {
                let resolved = self
                    .resolver
                    .folder_ids(
                        &name,
                        self.filter.include_trashed_files,
                        self.filter.include_shared_with_me,
                    )
                    .await;
                match resolved {
                    Ok(ids) => (name, ids),
                    Err(e) if e.is_not_found() => (name, Vec::new()),
                    Err(e) => {
                        self.state.finish();
                        return Err(e);
                    }
                }
            }
        };

        if folders.is_empty() {
            warn!("Folder '{}' does not exist", label);
            self.state.finish();
            return Ok(false);
        }
        if folders.len() > 1 {
            warn!(
                "Found {} folders named '{}', listing all of them",
                folders.len(),
                label
            );
        }

        self.state.begin_folders(folders);
        self.fetch_until_ready().await
    }

    /// Move to the next item, fetching pages as needed.
    ///
    /// Once this returns `false` every later call returns `false`.
    pub async fn advance(&mut self) -> Result<bool> {
        match self.state.phase() {
            Phase::NotStarted => Err(Error::illegal_state("advance() called before start()")),
            Phase::Exhausted => Ok(false),
            Phase::Expanding | Phase::Serving => self.fetch_until_ready().await,
        }
    }

    /// Materialize the item at the current position
    pub fn current(&mut self) -> Result<Record> {
        let resource = self.state.current().ok_or_else(|| {
            Error::illegal_state("no current item; start() or advance() must return true first")
        })?;
        let record = Record::from(resource);
        self.state.mark_yielded();
        Ok(record)
    }

    /// Raw resource at the current position
    pub fn current_resource(&self) -> Option<&RemoteResource> {
        self.state.current()
    }

    /// Session counters
    pub fn metrics(&self) -> SessionMetrics {
        SessionMetrics {
            total_seen: self.state.total_seen,
            yielded_count: self.state.yielded_count,
        }
    }

    async fn fetch_until_ready(&mut self) -> Result<bool> {
        loop {
            match self.state.step() {
                Step::Ready => return Ok(true),
                Step::Exhausted => {
                    debug!("Traversal exhausted: {:?}", self.metrics());
                    return Ok(false);
                }
                Step::Fetch(target) => {
                    let page = match self.fetch(&target).await {
                        Ok(page) => page,
                        Err(e) => {
                            self.state.finish();
                            return Err(e.into_fatal());
                        }
                    };
                    if self.state.apply_page(&target, page, &self.filter) {
                        return Ok(true);
                    }
                }
            }
        }
    }

    async fn fetch(&self, target: &PageTarget) -> Result<Page> {
        let (query, token) = match target {
            PageTarget::Folder { id, token } => (self.expression.for_parent(id)?, token.clone()),
            PageTarget::Custom { token } => (self.expression.as_str().to_string(), token.clone()),
        };
        let request = self
            .scope
            .list_request(query, self.config.page_size)
            .with_page_token(token);

        debug!(query = %request.query, token = ?request.page_token, "Fetching page");
        self.service.list(&request).await
    }

    /// Turn the session into a stream of records
    pub fn into_stream(self, addressing: Addressing) -> impl Stream<Item = Result<Record>> {
        futures::stream::try_unfold(
            (self, Some(addressing)),
            |(mut reader, addressing)| async move {
                let has_item = match addressing {
                    Some(addressing) => reader.start(addressing).await?,
                    None => reader.advance().await?,
                };
                if !has_item {
                    return Ok(None);
                }
                let record = reader.current()?;
                Ok::<_, Error>(Some((record, (reader, None))))
            },
        )
    }

    /// Drain the session into record batches
    pub async fn read_batches(
        &mut self,
        stream_name: &str,
        addressing: Addressing,
    ) -> Result<(Vec<Message>, ReadStats)> {
        let started = Instant::now();
        let mut stats = ReadStats::new();
        let mut messages = vec![Message::info(format!(
            "Starting read for stream: {stream_name}"
        ))];
        let mut buffer = Vec::new();

        let mut has_item = self.start(addressing).await?;
        if !has_item {
            messages.push(Message::warn(format!("No data found for stream: {stream_name}")));
        }

        while has_item {
            buffer.push(self.current()?);
            stats.add_records(1);

            if buffer.len() >= self.config.batch_size {
                messages.push(Message::record(stream_name, records_to_batch(&buffer)?));
                stats.add_batch();
                buffer.clear();
            }

            if self.config.max_records > 0 && stats.records_read >= self.config.max_records {
                messages.push(Message::debug(format!(
                    "Reached max records limit: {}",
                    self.config.max_records
                )));
                break;
            }

            has_item = self.advance().await?;
        }

        if !buffer.is_empty() {
            messages.push(Message::record(stream_name, records_to_batch(&buffer)?));
            stats.add_batch();
        }

        stats.pages_fetched = self.state.pages_fetched;
        stats.total_seen = self.state.total_seen;
        stats.set_duration(started.elapsed().as_millis() as u64);

        info!(
            "Read {} records from {} in {} pages",
            stats.records_read, stream_name, stats.pages_fetched
        );
        messages.push(Message::info(format!(
            "Completed read for {stream_name}: {} records in {} pages",
            stats.records_read, stats.pages_fetched
        )));

        Ok((messages, stats))
    }
}

impl std::fmt::Debug for ListReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListReader")
            .field("filter", &self.filter)
            .field("expression", &self.expression)
            .field("phase", &self.state.phase())
            .finish_non_exhaustive()
    }
}

//! Name to identifier resolution

use super::retry::RetryPolicy;
use crate::error::{Error, Result};
use crate::query::{Predicate, Query};
use crate::remote::{RemoteResource, RemoteService, SearchScope, DEFAULT_PAGE_SIZE};
use crate::types::{LookupKind, PATH_SEPARATOR, ROOT_FOLDER};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Resolver settings
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Treat shared drives as pseudo-roots: root-level lookups search by name only
    pub include_shared_drives: bool,
    /// Scope applied to every listing call
    pub scope: SearchScope,
    /// Retry schedule for listing calls
    pub retry: RetryPolicy,
    /// Page size for listing calls
    pub page_size: u32,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            include_shared_drives: false,
            scope: SearchScope::default(),
            retry: RetryPolicy::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ResolverOptions {
    #[must_use]
    pub fn with_shared_drives(mut self, include_shared_drives: bool) -> Self {
        self.include_shared_drives = include_shared_drives;
        self.scope.supports_all_drives = include_shared_drives;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }
}

/// Whether `path` names the store root
pub fn is_root_path(path: &str) -> bool {
    matches!(path.trim(), "" | "/" | ROOT_FOLDER)
}

/// Split a path into segments, dropping one leading and one trailing separator
pub fn path_segments(path: &str) -> Vec<String> {
    let path = path.trim();
    let path = path.strip_prefix(PATH_SEPARATOR).unwrap_or(path);
    let path = path.strip_suffix(PATH_SEPARATOR).unwrap_or(path);
    path.split(PATH_SEPARATOR).map(str::to_string).collect()
}

/// Resolves names and paths to identifiers
#[derive(Clone)]
pub struct PathResolver {
    service: Arc<dyn RemoteService>,
    options: ResolverOptions,
}

impl PathResolver {
    /// Create a resolver over `service`
    pub fn new(service: Arc<dyn RemoteService>, options: ResolverOptions) -> Self {
        Self { service, options }
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Identifiers of every folder matching `path`.
    ///
    /// Several identifiers may come back when the path is ambiguous; none
    /// is not an error here. A bare name that the walk cannot find is
    /// retried as a store-wide folder search, which must match exactly once.
    #[instrument(skip(self), level = "debug")]
    pub async fn folder_ids(
        &self,
        path: &str,
        search_in_trash: bool,
        include_shared_items: bool,
    ) -> Result<Vec<String>> {
        if is_root_path(path) {
            return Ok(vec![ROOT_FOLDER.to_string()]);
        }

        let segments = path_segments(path);
        let ids = self
            .candidates(&segments, search_in_trash, include_shared_items)
            .await?;

        if ids.is_empty() && !path.contains(PATH_SEPARATOR) {
            debug!("No folder found by walking '{}', searching globally", path);
            let id = self
                .global_search(path, LookupKind::Folder, include_shared_items)
                .await?;
            return Ok(vec![id]);
        }

        debug!("Folder '{}' resolved to {:?}", path, ids);
        Ok(ids)
    }

    /// Resolve `path` to exactly one identifier of the requested kind
    #[instrument(skip(self), level = "debug")]
    pub async fn resolve(
        &self,
        path: &str,
        kind: LookupKind,
        search_in_trash: bool,
        include_shared_items: bool,
    ) -> Result<String> {
        if !path.contains(PATH_SEPARATOR) {
            return self.global_search(path, kind, include_shared_items).await;
        }

        let segments = path_segments(path);
        let (parent_segments, name) = match segments.split_last() {
            Some((name, parents)) => (parents, name.as_str()),
            None => return Err(Error::not_found(kind, path)),
        };

        match kind {
            LookupKind::Folder => {
                let ids = self
                    .candidates(&segments, search_in_trash, include_shared_items)
                    .await?;
                exactly_one(ids, LookupKind::Folder, path)
            }
            LookupKind::File => {
                let parent = self
                    .parent_folder(parent_segments, path, search_in_trash, include_shared_items)
                    .await?;
                self.file_in_folder(name, &parent, search_in_trash).await
            }
            LookupKind::Either => {
                let ids = self
                    .candidates(&segments, search_in_trash, include_shared_items)
                    .await?;
                if let [id] = ids.as_slice() {
                    return Ok(id.clone());
                }
                debug!("No single folder at '{}', looking for a file", path);
                let parent = self
                    .parent_folder(parent_segments, path, search_in_trash, include_shared_items)
                    .await?;
                self.file_in_folder(name, &parent, search_in_trash).await
            }
        }
    }

    /// Identifier of the single folder at `path`
    pub async fn folder_id(
        &self,
        path: &str,
        search_in_trash: bool,
        include_shared_items: bool,
    ) -> Result<String> {
        if is_root_path(path) {
            return Ok(ROOT_FOLDER.to_string());
        }
        self.resolve(path, LookupKind::Folder, search_in_trash, include_shared_items)
            .await
    }

    /// Identifier of the single file at `path`.
    ///
    /// With `search_in_trash` neither the walked folders nor the file itself
    /// are filtered on the trash flag.
    pub async fn file_id(
        &self,
        path: &str,
        search_in_trash: bool,
        include_shared_items: bool,
    ) -> Result<String> {
        self.resolve(path, LookupKind::File, search_in_trash, include_shared_items)
            .await
    }

    /// Identifier of the single file or folder at `path`
    pub async fn file_or_folder_id(
        &self,
        path: &str,
        search_in_trash: bool,
        include_shared_items: bool,
    ) -> Result<String> {
        self.resolve(path, LookupKind::Either, search_in_trash, include_shared_items)
            .await
    }

    /// Fetch selected metadata fields of one resource
    pub async fn metadata(&self, id: &str, fields: &str) -> Result<RemoteResource> {
        self.options
            .retry
            .run("metadata lookup", || self.service.get(id, fields))
            .await
    }

    /// Walk `segments` from the root, following every match at each level.
    ///
    /// Returns the identifiers matching the last segment in depth-first
    /// order. Uses an explicit stack, so path depth does not grow the call
    /// stack.
    pub async fn candidates(
        &self,
        segments: &[String],
        search_in_trash: bool,
        include_shared_items: bool,
    ) -> Result<Vec<String>> {
        let mut results = Vec::new();
        if segments.is_empty() {
            return Ok(results);
        }

        let mut stack: Vec<(usize, String)> = vec![(0, ROOT_FOLDER.to_string())];
        while let Some((level, parent)) = stack.pop() {
            let query = self.level_query(
                &segments[level],
                &parent,
                search_in_trash,
                include_shared_items,
            );
            let matches = self.list_all(&query).await?;
            debug!(
                "Level {} '{}' under '{}': {} match(es)",
                level,
                segments[level],
                parent,
                matches.len()
            );

            let next = level + 1;
            if next == segments.len() {
                results.extend(matches.into_iter().map(|r| r.id));
            } else {
                stack.extend(matches.into_iter().rev().map(|r| (next, r.id)));
            }
        }

        Ok(results)
    }

    /// Query matching folder `name` directly under `parent`
    pub fn level_query(
        &self,
        name: &str,
        parent: &str,
        search_in_trash: bool,
        include_shared_items: bool,
    ) -> String {
        let at_root = parent == ROOT_FOLDER;
        let query = Query::new().and(Predicate::Name(name.to_string()));

        let query = if self.options.include_shared_drives && at_root {
            query
        } else if include_shared_items && at_root {
            query.and(Predicate::RootOrSharedWithMe)
        } else {
            query.and(Predicate::InParents(parent.to_string()))
        };

        query
            .and(Predicate::IsFolder)
            .and_if(!search_in_trash, Predicate::NotTrashed)
            .build()
    }

    /// Store-wide name search scoped by kind
    #[instrument(skip(self), level = "debug")]
    pub async fn global_search(
        &self,
        name: &str,
        kind: LookupKind,
        include_shared_items: bool,
    ) -> Result<String> {
        let query = Query::new().and(Predicate::Name(name.to_string()));
        let query = match kind {
            LookupKind::File => query.and(Predicate::NotFolder),
            LookupKind::Folder => query.and(Predicate::IsFolder),
            LookupKind::Either => query,
        }
        .and_if(!include_shared_items, Predicate::OwnedByMe);

        let ids = self.list_ids(&query.build()).await?;
        exactly_one(ids, kind, name)
    }

    /// Identifier of the non-folder `name` directly in `parent`
    pub async fn file_in_folder(
        &self,
        name: &str,
        parent: &str,
        search_in_trash: bool,
    ) -> Result<String> {
        let query = Query::new()
            .and(Predicate::Name(name.to_string()))
            .and(Predicate::InParents(parent.to_string()))
            .and(Predicate::NotFolder)
            .and_if(!search_in_trash, Predicate::NotTrashed);

        let ids = self.list_ids(&query.build()).await?;
        exactly_one(ids, LookupKind::File, name)
    }

    async fn parent_folder(
        &self,
        parent_segments: &[String],
        path: &str,
        search_in_trash: bool,
        include_shared_items: bool,
    ) -> Result<String> {
        if parent_segments.is_empty() {
            return Ok(ROOT_FOLDER.to_string());
        }
        let ids = self
            .candidates(parent_segments, search_in_trash, include_shared_items)
            .await?;
        exactly_one(ids, LookupKind::Folder, &parent_path(path))
    }

    async fn list_ids(&self, query: &str) -> Result<Vec<String>> {
        Ok(self
            .list_all(query)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect())
    }

    /// Every resource matching `query`, across all pages
    async fn list_all(&self, query: &str) -> Result<Vec<RemoteResource>> {
        let mut request = self.options.scope.list_request(query, self.options.page_size);
        let mut items = Vec::new();

        loop {
            let page = self
                .options
                .retry
                .run("list", || self.service.list(&request))
                .await?;
            items.extend(page.items);

            match page.next_page_token {
                Some(token) => request.page_token = Some(token),
                None => return Ok(items),
            }
        }
    }
}

impl std::fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathResolver")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn exactly_one(mut ids: Vec<String>, kind: LookupKind, name: &str) -> Result<String> {
    match ids.len() {
        0 => Err(Error::not_found(kind, name)),
        1 => Ok(ids.remove(0)),
        count => Err(Error::ambiguous(kind, name, count)),
    }
}

fn parent_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches(PATH_SEPARATOR);
    match trimmed.rfind(PATH_SEPARATOR) {
        Some(0) | None => PATH_SEPARATOR.to_string(),
        Some(index) => trimmed[..index].to_string(),
    }
}

//! In-memory remote store
//!
//! Evaluates the query grammar this crate emits (`and`/`or`, parentheses,
//! `name`, `mimeType`, `trashed`, `in parents`, `in owners`, `sharedWithMe`)
//! over resources kept in insertion order, which is also the listing order.

use super::types::{Content, ListRequest, NewResource, Page, RemoteResource, ResourcePatch};
use super::RemoteService;
use crate::error::{Error, Result};
use crate::types::{LookupKind, FOLDER_MIME_TYPE};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;

#[derive(Debug, Clone)]
struct Entry {
    resource: RemoteResource,
    owned_by_me: bool,
    shared_with_me: bool,
    content: Option<Bytes>,
}

#[derive(Debug, Default)]
struct State {
    entries: Vec<Entry>,
    next_id: u64,
    max_page_size: Option<u32>,
    fail_lists: u32,
    fail_deletes: u32,
    list_requests: Vec<ListRequest>,
}

impl State {
    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.resource.id == id)
    }

    fn entry(&self, id: &str) -> Result<&Entry> {
        self.entries
            .iter()
            .find(|e| e.resource.id == id)
            .ok_or_else(|| Error::not_found(LookupKind::Either, id))
    }

    fn generate_id(&mut self) -> String {
        self.next_id += 1;
        format!("mem-{}", self.next_id)
    }
}

/// In-memory [`RemoteService`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a fixture description
    pub fn from_fixture(fixture: StoreFixture) -> Self {
        let store = Self::new();
        for item in fixture.resources {
            store.insert_entry(item.into_entry());
        }
        store
    }

    /// Cap page size regardless of the requested one
    #[must_use]
    pub fn with_max_page_size(self, max_page_size: u32) -> Self {
        self.lock().max_page_size = Some(max_page_size.max(1));
        self
    }

    /// Add a resource owned by the caller
    #[must_use]
    pub fn with_resource(self, resource: RemoteResource) -> Self {
        self.insert(resource);
        self
    }

    /// Add a resource owned by the caller
    pub fn insert(&self, resource: RemoteResource) {
        self.insert_entry(Entry {
            resource,
            owned_by_me: true,
            shared_with_me: false,
            content: None,
        });
    }

    /// Add a file owned by the caller together with its content
    pub fn insert_with_content(&self, resource: RemoteResource, content: impl Into<Bytes>) {
        let content = content.into();
        let mut resource = resource;
        resource.size = resource.size.or(Some(content.len() as i64));
        self.insert_entry(Entry {
            resource,
            owned_by_me: true,
            shared_with_me: false,
            content: Some(content),
        });
    }

    /// Add a resource someone else owns and shared with the caller
    pub fn insert_shared(&self, resource: RemoteResource) {
        self.insert_entry(Entry {
            resource,
            owned_by_me: false,
            shared_with_me: true,
            content: None,
        });
    }

    fn insert_entry(&self, entry: Entry) {
        let mut state = self.lock();
        match state.position(&entry.resource.id) {
            Some(index) => state.entries[index] = entry,
            None => state.entries.push(entry),
        }
    }

    /// Make the next `count` list calls fail with a transient error
    pub fn fail_next_lists(&self, count: u32) {
        self.lock().fail_lists = count;
    }

    /// Make the next `count` delete calls fail with a transient error
    pub fn fail_next_deletes(&self, count: u32) {
        self.lock().fail_deletes = count;
    }

    /// Every list request received so far, failed ones included
    pub fn list_requests(&self) -> Vec<ListRequest> {
        self.lock().list_requests.clone()
    }

    /// Number of list requests received so far
    pub fn list_count(&self) -> usize {
        self.lock().list_requests.len()
    }

    /// Look up a resource without going through the service API
    pub fn resource(&self, id: &str) -> Option<RemoteResource> {
        self.lock().entry(id).ok().map(|e| e.resource.clone())
    }

    /// Uploaded content of a file
    pub fn content(&self, id: &str) -> Option<Bytes> {
        self.lock().entry(id).ok().and_then(|e| e.content.clone())
    }

    /// Direct children of `parent_id`, in listing order
    pub fn children(&self, parent_id: &str) -> Vec<RemoteResource> {
        self.lock()
            .entries
            .iter()
            .filter(|e| e.resource.has_parent(parent_id))
            .map(|e| e.resource.clone())
            .collect()
    }

    /// Number of stored resources
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RemoteService for MemoryStore {
    async fn list(&self, request: &ListRequest) -> Result<Page> {
        let mut state = self.lock();
        state.list_requests.push(request.clone());

        if state.fail_lists > 0 {
            state.fail_lists -= 1;
            return Err(Error::transient("injected list failure"));
        }

        let expr = Expr::parse(&request.query)?;
        let matching: Vec<&Entry> = state.entries.iter().filter(|e| expr.eval(e)).collect();

        let offset = match &request.page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| Error::fatal(format!("invalid page token '{token}'")))?,
            None => 0,
        };
        let page_size = state
            .max_page_size
            .map_or(request.page_size, |max| request.page_size.min(max))
            .max(1) as usize;

        let end = (offset + page_size).min(matching.len());
        let items: Vec<RemoteResource> = matching
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|e| e.resource.clone())
            .collect();
        let next_page_token = (end < matching.len()).then(|| end.to_string());

        trace!(query = %request.query, offset, returned = items.len(), "memory list");
        Ok(Page::new(items, next_page_token))
    }

    async fn get(&self, id: &str, _fields: &str) -> Result<RemoteResource> {
        Ok(self.lock().entry(id)?.resource.clone())
    }

    async fn create(
        &self,
        metadata: NewResource,
        content: Option<Content>,
    ) -> Result<RemoteResource> {
        let content = match content {
            Some(content) => Some(content.into_bytes().await?),
            None => None,
        };

        let mut state = self.lock();
        let id = state.generate_id();
        let mime_type = metadata
            .mime_type
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let mut resource = RemoteResource::with_mime_type(
            id,
            metadata.name.unwrap_or_default(),
            mime_type,
        )
        .with_modified_time(Utc::now());
        resource.parents = Some(metadata.parents);
        resource.size = content.as_ref().map(|c| c.len() as i64);

        state.entries.push(Entry {
            resource: resource.clone(),
            owned_by_me: true,
            shared_with_me: false,
            content,
        });
        Ok(resource)
    }

    async fn copy(&self, id: &str, metadata: NewResource) -> Result<RemoteResource> {
        let mut state = self.lock();
        let source = state.entry(id)?.clone();
        let new_id = state.generate_id();

        let mut resource = source.resource.clone();
        resource.id = new_id;
        resource.trashed = false;
        resource.modified_time = Some(Utc::now());
        if let Some(name) = metadata.name {
            resource.name = name;
        }
        if !metadata.parents.is_empty() {
            resource.parents = Some(metadata.parents);
        }

        state.entries.push(Entry {
            resource: resource.clone(),
            owned_by_me: true,
            shared_with_me: false,
            content: source.content,
        });
        Ok(resource)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut state = self.lock();
        if state.fail_deletes > 0 {
            state.fail_deletes -= 1;
            return Err(Error::transient("injected delete failure"));
        }
        state.entry(id)?;

        // Descendants go with their folder
        let mut doomed: HashSet<String> = HashSet::from([id.to_string()]);
        loop {
            let before = doomed.len();
            for entry in &state.entries {
                let parents = entry.resource.parents.as_deref().unwrap_or_default();
                if !parents.is_empty() && parents.iter().all(|p| doomed.contains(p)) {
                    doomed.insert(entry.resource.id.clone());
                }
            }
            if doomed.len() == before {
                break;
            }
        }

        state.entries.retain(|e| !doomed.contains(&e.resource.id));
        Ok(())
    }

    async fn update(&self, id: &str, patch: ResourcePatch) -> Result<RemoteResource> {
        let mut state = self.lock();
        let index = state
            .position(id)
            .ok_or_else(|| Error::not_found(LookupKind::Either, id))?;
        let resource = &mut state.entries[index].resource;
        if let Some(name) = patch.name {
            resource.name = name;
        }
        if let Some(trashed) = patch.trashed {
            resource.trashed = trashed;
        }
        resource.modified_time = Some(Utc::now());
        Ok(resource.clone())
    }

    async fn download(&self, id: &str) -> Result<Bytes> {
        let state = self.lock();
        let entry = state.entry(id)?;
        if entry.resource.is_folder() || entry.resource.is_native_document() {
            return Err(Error::fatal(format!(
                "'{}' has no binary content, export it instead",
                entry.resource.name
            )));
        }
        Ok(entry.content.clone().unwrap_or_default())
    }

    async fn export(&self, id: &str, mime_type: &str) -> Result<Bytes> {
        let state = self.lock();
        let entry = state.entry(id)?;
        if !entry.resource.is_native_document() {
            return Err(Error::fatal(format!(
                "'{}' is not a native document and cannot be exported",
                entry.resource.name
            )));
        }
        trace!(id, mime_type, "memory export");
        Ok(entry.content.clone().unwrap_or_default())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Serializable description of a store's contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreFixture {
    #[serde(default)]
    pub resources: Vec<FixtureResource>,
}

/// One resource of a [`StoreFixture`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureResource {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub folder: bool,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub parents: Option<Vec<String>>,
    #[serde(default)]
    pub trashed: bool,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub shared_with_me: bool,
    #[serde(default)]
    pub content: Option<String>,
}

impl FixtureResource {
    fn into_entry(self) -> Entry {
        let mime_type = if self.folder {
            FOLDER_MIME_TYPE.to_string()
        } else {
            self.mime_type
                .unwrap_or_else(|| "application/octet-stream".to_string())
        };
        let content = self.content.map(Bytes::from);
        let mut resource = RemoteResource::with_mime_type(self.id, self.name, mime_type);
        resource.parents = self.parents;
        resource.trashed = self.trashed;
        resource.size = self
            .size
            .or_else(|| content.as_ref().map(|c| c.len() as i64));

        Entry {
            resource,
            owned_by_me: !self.shared_with_me,
            shared_with_me: self.shared_with_me,
            content,
        }
    }
}

// ============================================================================
// Query evaluation
// ============================================================================

#[derive(Debug)]
enum Expr {
    All,
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Clause(Clause),
}

#[derive(Debug)]
enum Clause {
    NameEquals(String),
    NameContains(String),
    MimeType { value: String, negated: bool },
    Trashed(bool),
    InParents(String),
    InOwners(String),
    SharedWithMe,
}

impl Expr {
    fn parse(query: &str) -> Result<Self> {
        let query = strip_outer_parens(query.trim());
        if query.is_empty() {
            return Ok(Self::All);
        }

        let alternatives = split_top_level(query, " or ");
        if alternatives.len() > 1 {
            return alternatives
                .into_iter()
                .map(Self::parse)
                .collect::<Result<Vec<_>>>()
                .map(Self::Or);
        }

        let conjuncts = split_top_level(query, " and ");
        if conjuncts.len() > 1 {
            return conjuncts
                .into_iter()
                .map(Self::parse)
                .collect::<Result<Vec<_>>>()
                .map(Self::And);
        }

        Clause::parse(query).map(Self::Clause)
    }

    fn eval(&self, entry: &Entry) -> bool {
        match self {
            Self::All => true,
            Self::And(parts) => parts.iter().all(|p| p.eval(entry)),
            Self::Or(parts) => parts.iter().any(|p| p.eval(entry)),
            Self::Clause(clause) => clause.eval(entry),
        }
    }
}

impl Clause {
    fn parse(text: &str) -> Result<Self> {
        let unsupported = || Error::fatal(format!("unsupported query clause: {text}"));

        if text == "sharedWithMe" {
            return Ok(Self::SharedWithMe);
        }
        if let Some(lhs) = text.strip_suffix(" in parents") {
            return unquote(lhs).map(Self::InParents).ok_or_else(unsupported);
        }
        if let Some(lhs) = text.strip_suffix(" in owners") {
            return unquote(lhs).map(Self::InOwners).ok_or_else(unsupported);
        }
        if let Some(rhs) = text.strip_prefix("name = ") {
            return unquote(rhs).map(Self::NameEquals).ok_or_else(unsupported);
        }
        if let Some(rhs) = text.strip_prefix("name contains ") {
            return unquote(rhs).map(Self::NameContains).ok_or_else(unsupported);
        }
        if let Some(rhs) = text.strip_prefix("mimeType != ") {
            return unquote(rhs)
                .map(|value| Self::MimeType {
                    value,
                    negated: true,
                })
                .ok_or_else(unsupported);
        }
        if let Some(rhs) = text.strip_prefix("mimeType = ") {
            return unquote(rhs)
                .map(|value| Self::MimeType {
                    value,
                    negated: false,
                })
                .ok_or_else(unsupported);
        }
        match text {
            "trashed = false" => Ok(Self::Trashed(false)),
            "trashed = true" => Ok(Self::Trashed(true)),
            _ => Err(unsupported()),
        }
    }

    fn eval(&self, entry: &Entry) -> bool {
        let resource = &entry.resource;
        match self {
            Self::NameEquals(name) => resource.name == *name,
            Self::NameContains(part) => resource.name.contains(part.as_str()),
            Self::MimeType { value, negated } => (resource.mime_type == *value) != *negated,
            Self::Trashed(trashed) => resource.trashed == *trashed,
            Self::InParents(id) => resource.has_parent(id),
            Self::InOwners(owner) => owner == "me" && entry.owned_by_me,
            Self::SharedWithMe => entry.shared_with_me,
        }
    }
}

/// Split on `sep` outside quotes and parentheses
fn split_top_level<'a>(text: &'a str, sep: &str) -> Vec<&'a str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_quote => i += 1,
            b'\'' => in_quote = !in_quote,
            b'(' if !in_quote => depth += 1,
            b')' if !in_quote => depth = depth.saturating_sub(1),
            _ if !in_quote && depth == 0 && bytes[i..].starts_with(sep.as_bytes()) => {
                parts.push(text[start..i].trim());
                i += sep.len();
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(text[start..].trim());
    parts
}

/// Remove parentheses wrapping the whole expression
fn strip_outer_parens(mut text: &str) -> &str {
    while text.starts_with('(') && text.ends_with(')') && closes_at_end(text) {
        text = text[1..text.len() - 1].trim();
    }
    text
}

fn closes_at_end(text: &str) -> bool {
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut escaped = false;
    for (i, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quote => escaped = true,
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i == text.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

/// Parse a single-quoted literal, resolving backslash escapes
fn unquote(text: &str) -> Option<String> {
    let inner = text.trim().strip_prefix('\'')?.strip_suffix('\'')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            out.push(chars.next()?);
        } else {
            out.push(ch);
        }
    }
    Some(out)
}

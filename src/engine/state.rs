//! Traversal state machine
//!
//! `TraversalState` holds the cursor of one session. All transitions are
//! plain methods without I/O: [`TraversalState::step`] says what to do next
//! and [`TraversalState::apply_page`] folds a fetched page back in.

use crate::query::TraversalFilter;
use crate::remote::{Page, RemoteResource};
use std::collections::VecDeque;

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    NotStarted,
    /// Looking for the next page with items
    Expanding,
    /// `current_index` points at an item
    Serving,
    /// Terminal
    Exhausted,
}

/// Page to fetch next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageTarget {
    /// A page of one folder's children
    Folder { id: String, token: Option<String> },
    /// A page of the whole-store custom query
    Custom { token: Option<String> },
}

impl PageTarget {
    /// Whether this is the first page of its listing
    pub fn is_first_page(&self) -> bool {
        match self {
            Self::Folder { token, .. } | Self::Custom { token } => token.is_none(),
        }
    }
}

/// Outcome of [`TraversalState::step`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// An item is available at `current_index`
    Ready,
    /// A page must be fetched before going on
    Fetch(PageTarget),
    /// Nothing remains
    Exhausted,
}

/// Mutable cursor of one traversal session
#[derive(Debug, Clone, Default)]
pub struct TraversalState {
    /// Folders awaiting expansion, in discovery order
    pub pending_folders: VecDeque<String>,
    /// Folder being expanded; kept only while it has more pages
    pub current_folder: Option<String>,
    /// Continuation token of the current listing
    pub page_token: Option<String>,
    /// Yieldable items of the latest page, in server order
    pub current_page: Vec<RemoteResource>,
    pub current_index: usize,
    pub total_seen: u64,
    pub yielded_count: u64,
    pub pages_fetched: usize,
    phase: Phase,
    custom: bool,
    custom_started: bool,
    position: u64,
    counted: Option<u64>,
}

impl TraversalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_custom(&self) -> bool {
        self.custom
    }

    /// Seed the session with starting folders
    pub fn begin_folders(&mut self, ids: impl IntoIterator<Item = String>) {
        self.pending_folders.extend(ids);
        self.phase = Phase::Expanding;
    }

    /// Seed the session with a single whole-store query
    pub fn begin_custom(&mut self) {
        self.custom = true;
        self.phase = Phase::Expanding;
    }

    /// Move to the terminal phase, dropping all remaining work
    pub fn finish(&mut self) {
        self.phase = Phase::Exhausted;
        self.pending_folders.clear();
        self.current_folder = None;
        self.page_token = None;
        self.current_page.clear();
        self.current_index = 0;
    }

    /// Decide the next move.
    ///
    /// Order: next item of the current page, next page of the current
    /// folder, first page of the next pending folder, next page of the
    /// custom query. Returns [`Step::Exhausted`] once none apply, and keeps
    /// returning it afterwards.
    pub fn step(&mut self) -> Step {
        match self.phase {
            Phase::NotStarted | Phase::Exhausted => return Step::Exhausted,
            Phase::Serving if self.current_index + 1 < self.current_page.len() => {
                self.current_index += 1;
                self.position += 1;
                return Step::Ready;
            }
            Phase::Serving | Phase::Expanding => {}
        }

        self.current_page.clear();
        self.current_index = 0;
        self.phase = Phase::Expanding;

        if self.custom {
            if !self.custom_started {
                self.custom_started = true;
                return Step::Fetch(PageTarget::Custom { token: None });
            }
            if let Some(token) = self.page_token.clone() {
                return Step::Fetch(PageTarget::Custom { token: Some(token) });
            }
        } else {
            if let Some(id) = self.current_folder.clone() {
                return Step::Fetch(PageTarget::Folder {
                    id,
                    token: self.page_token.clone(),
                });
            }
            if let Some(id) = self.pending_folders.pop_front() {
                self.current_folder = Some(id.clone());
                self.page_token = None;
                return Step::Fetch(PageTarget::Folder { id, token: None });
            }
        }

        self.finish();
        Step::Exhausted
    }

    /// Fold a fetched page into the state.
    ///
    /// Returns `true` when the page produced at least one yieldable item,
    /// in which case `current_index` points at the first of them.
    pub fn apply_page(
        &mut self,
        target: &PageTarget,
        page: Page,
        filter: &TraversalFilter,
    ) -> bool {
        self.pages_fetched += 1;
        self.total_seen += page.items.len() as u64;
        self.current_page.clear();
        self.current_index = 0;

        let mut appended = 0usize;
        for item in page.items {
            let appendable = !self.custom && item.is_folder() && filter.include_sub_directories;
            let yieldable = filter.list_mode.accepts(item.kind);

            if appendable {
                self.pending_folders.push_back(item.id.clone());
                appended += 1;
            }
            if yieldable {
                self.current_page.push(item);
            }
        }

        self.page_token = page.next_page_token.filter(|token| !token.is_empty());

        // Retire the folder once its listing ends, or when its first page
        // gave nothing to yield or expand
        if matches!(target, PageTarget::Folder { .. }) {
            let empty_first_page =
                target.is_first_page() && appended + self.current_page.len() == 0;
            if self.page_token.is_none() || empty_first_page {
                self.current_folder = None;
                self.page_token = None;
            }
        }

        if self.current_page.is_empty() {
            self.phase = Phase::Expanding;
            false
        } else {
            self.phase = Phase::Serving;
            self.position += 1;
            true
        }
    }

    /// Item at the current position
    pub fn current(&self) -> Option<&RemoteResource> {
        match self.phase {
            Phase::Serving => self.current_page.get(self.current_index),
            _ => None,
        }
    }

    /// Count the current position as yielded, once
    pub fn mark_yielded(&mut self) {
        if self.counted != Some(self.position) {
            self.counted = Some(self.position);
            self.yielded_count += 1;
        }
    }
}

//! Query predicates

use crate::types::{FOLDER_MIME_TYPE, ROOT_FOLDER};
use std::fmt;

/// A single clause of a listing query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `name = '<name>'`
    Name(String),
    /// `'<id>' in parents`
    InParents(String),
    /// `('root' in parents or sharedWithMe)`
    RootOrSharedWithMe,
    /// `mimeType = '<folder>'`
    IsFolder,
    /// `mimeType != '<folder>'`
    NotFolder,
    /// `trashed = false`
    NotTrashed,
    /// `'me' in owners`
    OwnedByMe,
}

impl Predicate {
    /// Render the clause as query text
    pub fn render(&self) -> String {
        match self {
            Self::Name(name) => format!("name = '{}'", escape(name)),
            Self::InParents(id) => format!("'{}' in parents", escape(id)),
            Self::RootOrSharedWithMe => format!("('{ROOT_FOLDER}' in parents or sharedWithMe)"),
            Self::IsFolder => format!("mimeType = '{FOLDER_MIME_TYPE}'"),
            Self::NotFolder => format!("mimeType != '{FOLDER_MIME_TYPE}'"),
            Self::NotTrashed => "trashed = false".to_string(),
            Self::OwnedByMe => "'me' in owners".to_string(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Escape a literal for use inside single quotes
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == '\\' || ch == '\'' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Conjunction of predicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    predicates: Vec<Predicate>,
}

impl Query {
    /// Create an empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a clause
    #[must_use]
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Append a clause when `condition` holds
    #[must_use]
    pub fn and_if(self, condition: bool, predicate: Predicate) -> Self {
        if condition {
            self.and(predicate)
        } else {
            self
        }
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Render all clauses joined with ` and `
    pub fn build(&self) -> String {
        self.predicates
            .iter()
            .map(Predicate::render)
            .collect::<Vec<_>>()
            .join(" and ")
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

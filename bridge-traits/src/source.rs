//! Source Folder Abstraction
//!
//! The read side of a mirror run: resolve a folder by display name and list
//! the files inside it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::Result;

/// A file in the source folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Stable provider identifier. Doubles as the destination object key.
    pub id: String,
    /// Human-readable display name
    pub name: String,
    /// Creation time, if the provider reported a parseable one
    pub created_at: Option<DateTime<Utc>>,
}

impl SourceFile {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        created_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at,
        }
    }

    /// Ordering for "newest first": later creation times sort before earlier
    /// ones, files without a timestamp sort last.
    pub fn newest_first(a: &SourceFile, b: &SourceFile) -> Ordering {
        match (a.created_at, b.created_at) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

/// Outcome of resolving a folder display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderMatch {
    /// No folder carries the name
    NotFound,
    /// Exactly one folder carries the name
    Unique(String),
    /// Several folders share the name. `chosen` is the first one the
    /// provider returned; `candidates` lists all of them in provider order.
    Ambiguous {
        chosen: String,
        candidates: Vec<String>,
    },
}

impl FolderMatch {
    /// Build a match from folder ids in provider order.
    pub fn from_candidates(mut candidates: Vec<String>) -> Self {
        match candidates.len() {
            0 => FolderMatch::NotFound,
            1 => FolderMatch::Unique(candidates.remove(0)),
            _ => FolderMatch::Ambiguous {
                chosen: candidates[0].clone(),
                candidates,
            },
        }
    }

    /// The folder id a lenient caller would use.
    pub fn folder_id(&self) -> Option<&str> {
        match self {
            FolderMatch::NotFound => None,
            FolderMatch::Unique(id) => Some(id),
            FolderMatch::Ambiguous { chosen, .. } => Some(chosen),
        }
    }
}

/// Cloud folder listing capability.
///
/// Implemented by `provider-google-drive`; tests supply in-memory fakes.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Resolve a folder display name to folder ids.
    async fn resolve_folder(&self, folder_name: &str) -> Result<FolderMatch>;

    /// List non-folder, non-trashed files directly inside `folder_id`,
    /// newest first by creation time, at most `limit` entries.
    async fn list_files(&self, folder_id: &str, limit: usize) -> Result<Vec<SourceFile>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_folder_match_from_candidates() {
        assert_eq!(FolderMatch::from_candidates(vec![]), FolderMatch::NotFound);
        assert_eq!(
            FolderMatch::from_candidates(vec!["a".to_string()]),
            FolderMatch::Unique("a".to_string())
        );

        let ambiguous = FolderMatch::from_candidates(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(ambiguous.folder_id(), Some("a"));
        assert!(matches!(
            ambiguous,
            FolderMatch::Ambiguous { ref candidates, .. } if candidates.len() == 2
        ));
        assert_eq!(FolderMatch::NotFound.folder_id(), None);
    }

    #[test]
    fn test_newest_first_ordering() {
        let old = SourceFile::new("old", "old.txt", Some(Utc.timestamp_opt(100, 0).unwrap()));
        let new = SourceFile::new("new", "new.txt", Some(Utc.timestamp_opt(200, 0).unwrap()));
        let undated = SourceFile::new("undated", "x.txt", None);

        let mut files = vec![undated.clone(), old.clone(), new.clone()];
        files.sort_by(SourceFile::newest_first);

        assert_eq!(files, vec![new, old, undated]);
    }
}

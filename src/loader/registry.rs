//! Per-session resolution state
//!
//! Two maps keyed by canonical identifier: the extracted [`FileInfo`] of every
//! parsed file, and the [`LoadStatus`] of every dispatched fetch. Nothing is
//! evicted; call [`Registry::clear`] to start over.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::parsing::{ModuleReference, SyntaxTree};

/// What was extracted from one parsed file
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub tree: SyntaxTree,
    /// Module references in extraction order
    pub import_modules: Vec<ModuleReference>,
    /// Candidate identifier of each reference, in extraction order; empty
    /// when no fetcher is configured
    pub filepaths: Vec<String>,
}

/// Fetch state of one identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Loading,
    Success,
    Error,
}

impl LoadStatus {
    /// Whether this status rules out starting another fetch
    pub fn blocks_fetch(&self) -> bool {
        matches!(self, LoadStatus::Loading | LoadStatus::Success)
    }
}

/// File and load-status maps shared by one resolution session
#[derive(Debug, Default)]
pub struct Registry {
    files: DashMap<String, Arc<FileInfo>>,
    statuses: DashMap<String, LoadStatus>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_info(&self, identifier: &str) -> Option<Arc<FileInfo>> {
        self.files.get(identifier).map(|entry| Arc::clone(entry.value()))
    }

    pub fn ast(&self, identifier: &str) -> Option<SyntaxTree> {
        self.files.get(identifier).map(|entry| entry.tree.clone())
    }

    /// Store `info` under `identifier`, replacing any previous entry whole.
    pub fn record_file(&self, identifier: impl Into<String>, info: FileInfo) -> Arc<FileInfo> {
        let info = Arc::new(info);
        self.files.insert(identifier.into(), Arc::clone(&info));
        info
    }

    pub fn status(&self, identifier: &str) -> Option<LoadStatus> {
        self.statuses.get(identifier).map(|entry| *entry.value())
    }

    /// Mark `identifier` as loading unless a fetch is running or succeeded.
    ///
    /// Returns true when the caller now owns the fetch. Check and mark happen
    /// under one entry lock.
    pub fn begin_load(&self, identifier: &str) -> bool {
        match self.statuses.entry(identifier.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().blocks_fetch() {
                    false
                } else {
                    entry.insert(LoadStatus::Loading);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(LoadStatus::Loading);
                true
            }
        }
    }

    pub fn set_status(&self, identifier: impl Into<String>, status: LoadStatus) {
        self.statuses.insert(identifier.into(), status);
    }

    /// Identifiers with a recorded file, sorted
    pub fn identifiers(&self) -> Vec<String> {
        let mut identifiers: Vec<String> =
            self.files.iter().map(|entry| entry.key().clone()).collect();
        identifiers.sort();
        identifiers
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Drop every file and status entry
    pub fn clear(&self) {
        self.files.clear();
        self.statuses.clear();
    }
}

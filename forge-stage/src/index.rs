//! Persisted staging index.
//!
//! # Key layout
//!
//! ```text
//! [kind tag: 1 byte]['d' | 'f']
//! [path length: u32 big-endian]
//! [path bytes]
//! ```
//!
//! sled keeps keys in byte order, so within one kind entries come out
//! shortest path first and then lexicographically. An ancestor directory is
//! always shorter than its descendants, which is the order commit needs.
//! Directory keys sort before file keys.
//!
//! Enumeration pages through the tree [`PAGE_SIZE`] keys at a time, resuming
//! strictly after the last key seen. Entries inserted behind the cursor
//! during a scan are not observed by that scan; pages already yielded are
//! never revisited.

use std::collections::VecDeque;
use std::ops::Bound;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sled::IVec;

use forge_core::{ConflictPolicy, EntryKind};

use crate::error::{io_err, StagingError};

/// Raw keys read per page during enumeration.
pub const PAGE_SIZE: usize = 100;

const TREE_NAME: &str = "staging_index";

/// One pending file or directory operation against the target tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingEntry {
    pub target_path: PathBuf,
    pub kind: EntryKind,
    /// Staged content for `file` entries.
    pub blob_path: Option<PathBuf>,
    pub conflict_policy: Option<ConflictPolicy>,
    pub approved: bool,
}

impl StagingEntry {
    /// Directory entries are approved from the start.
    pub fn directory(target_path: impl Into<PathBuf>) -> Self {
        Self {
            target_path: target_path.into(),
            kind: EntryKind::Directory,
            blob_path: None,
            conflict_policy: None,
            approved: true,
        }
    }

    pub fn file(
        target_path: impl Into<PathBuf>,
        blob_path: impl Into<PathBuf>,
        conflict_policy: Option<ConflictPolicy>,
        approved: bool,
    ) -> Self {
        Self {
            target_path: target_path.into(),
            kind: EntryKind::File,
            blob_path: Some(blob_path.into()),
            conflict_policy,
            approved,
        }
    }

    fn key(&self) -> Vec<u8> {
        entry_key(&self.target_path, self.kind)
    }
}

/// Enumeration filter; `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub target_path: Option<PathBuf>,
    pub kind: Option<EntryKind>,
    pub approved: Option<bool>,
}

impl EntryFilter {
    pub fn kind(kind: EntryKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn path(target_path: impl Into<PathBuf>) -> Self {
        Self {
            target_path: Some(target_path.into()),
            ..Self::default()
        }
    }

    pub fn approved(mut self, approved: bool) -> Self {
        self.approved = Some(approved);
        self
    }

    fn matches(&self, entry: &StagingEntry) -> bool {
        self.kind.map_or(true, |k| k == entry.kind)
            && self.approved.map_or(true, |a| a == entry.approved)
            && self
                .target_path
                .as_ref()
                .map_or(true, |p| p == &entry.target_path)
    }
}

// ---------------------------------------------------------------------------
// StagingIndex
// ---------------------------------------------------------------------------

/// Durable keyed store of [`StagingEntry`] records, one per (path, kind).
pub struct StagingIndex {
    db: sled::Db,
    tree: sled::Tree,
    path: PathBuf,
}

impl StagingIndex {
    /// Open (or create) the index stored under `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StagingError> {
        let path = path.as_ref().to_path_buf();
        let db = sled::open(&path)?;
        let tree = db.open_tree(TREE_NAME)?;
        tracing::debug!(path = %path.display(), "opened staging index");
        Ok(Self { db, tree, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Exact lookup by (path, kind).
    pub fn get(&self, target_path: &Path, kind: EntryKind) -> Result<Option<StagingEntry>, StagingError> {
        match self.tree.get(entry_key(target_path, kind))? {
            Some(raw) => Ok(Some(decode(&raw)?)),
            None => Ok(None),
        }
    }

    /// Insert or fully replace the entry for its key. Returns the replaced
    /// entry, if any.
    pub fn upsert(&self, entry: &StagingEntry) -> Result<Option<StagingEntry>, StagingError> {
        let value = bincode::serialize(entry)?;
        let previous = self.tree.insert(entry.key(), value)?;
        previous.map(|raw| decode(&raw)).transpose()
    }

    /// Mark the file entry for `target_path` approved. Returns `false` when
    /// no such entry exists.
    pub fn set_approved(&self, target_path: &Path) -> Result<bool, StagingError> {
        let key = entry_key(target_path, EntryKind::File);
        let Some(raw) = self.tree.get(&key)? else {
            return Ok(false);
        };
        let mut entry = decode(&raw)?;
        if !entry.approved {
            entry.approved = true;
            self.tree.insert(key, bincode::serialize(&entry)?)?;
        }
        Ok(true)
    }

    /// Lazily enumerate entries matching `filter`, in depth order.
    ///
    /// Each call starts a fresh scan.
    pub fn entries(&self, filter: EntryFilter) -> Entries {
        Entries::new(self.tree.clone(), filter)
    }

    /// Close the store and delete its files.
    pub fn destroy(self) -> Result<(), StagingError> {
        let StagingIndex { db, tree, path } = self;
        drop(tree);
        drop(db);
        if path.exists() {
            std::fs::remove_dir_all(&path).map_err(|e| io_err(&path, e))?;
        }
        tracing::debug!(path = %path.display(), "destroyed staging index");
        Ok(())
    }
}

fn kind_tag(kind: EntryKind) -> u8 {
    match kind {
        EntryKind::Directory => b'd',
        EntryKind::File => b'f',
    }
}

fn entry_key(path: &Path, kind: EntryKind) -> Vec<u8> {
    let bytes = path.as_os_str().as_encoded_bytes();
    let mut key = Vec::with_capacity(1 + 4 + bytes.len());
    key.push(kind_tag(kind));
    key.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    key.extend_from_slice(bytes);
    key
}

fn decode(raw: &[u8]) -> Result<StagingEntry, StagingError> {
    Ok(bincode::deserialize(raw)?)
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

enum Source {
    /// Point lookups for a path filter (at most one key per kind).
    Keys(VecDeque<Vec<u8>>),
    /// Paged range scan over keys starting with `prefix`.
    Scan {
        prefix: Vec<u8>,
        cursor: Option<IVec>,
        exhausted: bool,
    },
}

/// Paged, depth-ordered iterator over staging entries.
///
/// Holds its own handle on the index tree, so the index may be mutated while
/// an enumeration is in flight.
pub struct Entries {
    tree: sled::Tree,
    filter: EntryFilter,
    source: Source,
    page: VecDeque<StagingEntry>,
    failed: bool,
}

impl Entries {
    fn new(tree: sled::Tree, filter: EntryFilter) -> Self {
        let source = match (&filter.target_path, filter.kind) {
            (Some(path), Some(kind)) => Source::Keys(VecDeque::from([entry_key(path, kind)])),
            (Some(path), None) => Source::Keys(VecDeque::from([
                entry_key(path, EntryKind::Directory),
                entry_key(path, EntryKind::File),
            ])),
            (None, kind) => Source::Scan {
                prefix: kind.map(|k| vec![kind_tag(k)]).unwrap_or_default(),
                cursor: None,
                exhausted: false,
            },
        };
        Self {
            tree,
            filter,
            source,
            page: VecDeque::new(),
            failed: false,
        }
    }

    fn fetch_page(&mut self) -> Result<(), StagingError> {
        match &mut self.source {
            Source::Keys(keys) => {
                while let Some(key) = keys.pop_front() {
                    if let Some(raw) = self.tree.get(&key)? {
                        let entry = decode(&raw)?;
                        if self.filter.matches(&entry) {
                            self.page.push_back(entry);
                        }
                    }
                }
            }
            Source::Scan {
                prefix,
                cursor,
                exhausted,
            } => {
                if *exhausted {
                    return Ok(());
                }
                let start = match cursor.take() {
                    Some(last) => Bound::Excluded(last),
                    None => Bound::Included(IVec::from(prefix.as_slice())),
                };
                let mut scanned = 0;
                let mut last_key = None;
                for item in self.tree.range::<IVec, _>((start, Bound::Unbounded)) {
                    let (key, raw) = item?;
                    if !key.starts_with(prefix) {
                        *exhausted = true;
                        break;
                    }
                    let entry = decode(&raw)?;
                    if self.filter.matches(&entry) {
                        self.page.push_back(entry);
                    }
                    last_key = Some(key);
                    scanned += 1;
                    if scanned == PAGE_SIZE {
                        break;
                    }
                }
                if scanned < PAGE_SIZE {
                    *exhausted = true;
                }
                *cursor = last_key;
            }
        }
        Ok(())
    }

    fn has_more_pages(&self) -> bool {
        match &self.source {
            Source::Keys(keys) => !keys.is_empty(),
            Source::Scan { exhausted, .. } => !*exhausted,
        }
    }
}

impl Iterator for Entries {
    type Item = Result<StagingEntry, StagingError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.page.pop_front() {
                return Some(Ok(entry));
            }
            if self.failed || !self.has_more_pages() {
                return None;
            }
            if let Err(e) = self.fetch_page() {
                self.failed = true;
                return Some(Err(e));
            }
        }
    }
}

//! # forge-stage
//!
//! Transactional file staging for a forge run.
//!
//! Generated files are written into a run-scoped temp area and recorded in a
//! persisted staging index; nothing reaches the target tree until
//! [`TempArea::commit`]. [`resolve_conflicts`] decides which staged files may
//! overwrite existing ones, and [`TempArea::rollback`] discards everything.
//!
//! - [`equality`]: streaming byte-for-byte file comparison
//! - [`index`]: sled-backed [`StagingIndex`] with depth-ordered paging
//! - [`temp_area`]: blob allocation, staging writes, commit / rollback
//! - [`staging`]: [`StagingArea`] façade resolving run-relative paths
//! - [`conflicts`]: conflict resolution against the real filesystem

pub mod conflicts;
pub mod equality;
pub mod error;
pub mod index;
pub mod staging;
pub mod temp_area;

pub use conflicts::{conflict_question, resolve_conflicts, ConflictSummary, Resolution};
pub use equality::files_equal;
pub use error::StagingError;
pub use index::{Entries, EntryFilter, StagingEntry, StagingIndex, PAGE_SIZE};
pub use staging::StagingArea;
pub use temp_area::{sweep_blobs, CommitSummary, TempArea, BLOB_SUFFIX, INDEX_DIR};

// ============================================================================
// durable-list
// ============================================================================

//! In-memory ordered collections with atomic per-mutation file persistence.
//!
//! A [`PersistentList`] owns an ordered sequence of [`Value`]s and a backing
//! file; every mutating call re-encodes the whole sequence and atomically
//! replaces the file (write-temp-then-rename) before returning, so the file
//! always decodes to exactly the in-memory state. The process-wide
//! [`ListRegistry`] hands out one shared instance per path.

pub mod codec;
pub mod collection;
pub mod core;
pub mod registry;

// Re-export main types for convenience
pub use codec::{Codec, JsonCodec, MessagePackCodec};
pub use collection::{DurabilityMode, Iter, ListOptions, ListStats, PersistentList};
pub use core::{ListError, Result, Value};
pub use registry::ListRegistry;

use std::path::Path;
use std::sync::Arc;

// ============================================================================
// High-level API (global registry)
// ============================================================================

/// Collection handle for `path`, shared process-wide.
///
/// Uses the global [`ListRegistry`]: the first call for a path opens (or
/// starts) the collection, every later call for the same path returns a
/// handle to the same instance.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let path = dir.path().join("pending_uploads.bin");
///
/// let uploads = durable_list::open_or_create(&path)?;
/// uploads.add_all(["a.jpg", "b.jpg"])?;
///
/// // A second lookup anywhere in the process sees the same collection.
/// let same = durable_list::open_or_create(&path)?;
/// assert_eq!(same.count()?, 2);
///
/// durable_list::purge(&path, true)?;
/// assert!(!path.exists());
/// # Ok(())
/// # }
/// ```
pub fn open_or_create(path: impl AsRef<Path>) -> Result<Arc<PersistentList>> {
    ListRegistry::global().get_or_create(path)
}

/// Like [`open_or_create`] with explicit codec and durability options.
pub fn open_or_create_with(
    path: impl AsRef<Path>,
    options: ListOptions,
) -> Result<Arc<PersistentList>> {
    ListRegistry::global().get_or_create_with(path, options)
}

/// Remove the collection at `path` from the global registry.
///
/// Returns whether an in-memory instance existed. With `delete_from_disk`,
/// also deletes the backing file of a removed instance; see
/// [`ListRegistry::purge`] for the exact semantics.
pub fn purge(path: impl AsRef<Path>, delete_from_disk: bool) -> Result<bool> {
    ListRegistry::global().purge(path, delete_from_disk)
}

//! Persistence-coupled ordered collection.
//!
//! Every mutating operation re-encodes the whole item sequence and atomically
//! replaces the backing file before it returns, so the file always holds a
//! fully-valid snapshot of the in-memory state.

use crate::codec::{Codec, MessagePackCodec};
use crate::core::{ListError, Result, Value};
use chrono::Utc;
use log::debug;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tempfile::NamedTempFile;

// ============================================================================
// Options
// ============================================================================

/// Whether the temp file is fsynced before the atomic rename.
///
/// `Sync` guarantees the new snapshot is on stable storage when a mutating
/// call returns; `Async` leaves flushing to the OS and trades durability
/// for write latency. Atomicity of the replacement holds in both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    #[default]
    Sync,
    Async,
}

/// Construction options for a [`PersistentList`].
///
/// # Examples
///
/// ```
/// use durable_list::{ListOptions, JsonCodec, DurabilityMode};
///
/// let options = ListOptions::new()
///     .codec(JsonCodec)
///     .durability(DurabilityMode::Async);
/// ```
pub struct ListOptions {
    codec: Box<dyn Codec>,
    durability: DurabilityMode,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the on-disk format. MessagePack is the default.
    pub fn codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    pub fn durability(mut self, durability: DurabilityMode) -> Self {
        self.durability = durability;
        self
    }
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            codec: Box::new(MessagePackCodec),
            durability: DurabilityMode::default(),
        }
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Point-in-time snapshot of a collection's persistence counters.
#[derive(Debug, Clone)]
pub struct ListStats {
    pub path: String,
    pub item_count: usize,
    pub writes: u64,
    pub codec: &'static str,
    pub durability: DurabilityMode,
    pub last_persisted_at: Option<String>,
}

// ============================================================================
// PersistentList
// ============================================================================

#[derive(Debug)]
struct ListState {
    items: Vec<Value>,
    writes: u64,
    last_persisted_at: Option<String>,
}

/// Ordered in-memory collection backed by a single file.
///
/// All operations take `&self`; the item sequence lives behind an internal
/// `RwLock`, so a shared `Arc<PersistentList>` can be mutated from many
/// threads. Mutations are serialized against each other and against reads,
/// and the disk write happens under the same exclusive lock, so memory and
/// file commit together.
///
/// # Examples
///
/// ```
/// use durable_list::PersistentList;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let path = dir.path().join("events.bin");
///
/// let list = PersistentList::open_or_create(&path)?;
/// list.add("first")?;
/// list.add_all(["second", "third"])?;
/// assert_eq!(list.count()?, 3);
///
/// // A reopened collection sees exactly what was persisted.
/// let reopened = PersistentList::open_or_create(&path)?;
/// assert_eq!(reopened.at(1)?.as_str(), Some("second"));
/// # Ok(())
/// # }
/// ```
pub struct PersistentList {
    path: PathBuf,
    codec: Box<dyn Codec>,
    durability: DurabilityMode,
    state: RwLock<ListState>,
}

impl std::fmt::Debug for PersistentList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentList")
            .field("path", &self.path)
            .field("durability", &self.durability)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl PersistentList {
    /// Open the collection at `path` with default options.
    ///
    /// If a file exists there it is decoded into the initial items; a file
    /// that does not decode is an error, never silently an empty collection.
    /// A missing file means an empty collection. Opening performs no write.
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_or_create_with(path, ListOptions::default())
    }

    /// Open the collection at `path` with explicit codec and durability.
    pub fn open_or_create_with(path: impl AsRef<Path>, options: ListOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let items = match fs::read(&path) {
            Ok(bytes) => options.codec.decode(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => {
                return Err(ListError::Io(format!(
                    "Failed to read '{}': {}",
                    path.display(),
                    err
                )));
            }
        };
        debug!("opened '{}' with {} item(s)", path.display(), items.len());

        Ok(Self {
            path,
            codec: options.codec,
            durability: options.durability,
            state: RwLock::new(ListState {
                items,
                writes: 0,
                last_persisted_at: None,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `value`, then persist.
    ///
    /// On encode or write failure the appended value is rolled back and the
    /// file is left untouched.
    pub fn add(&self, value: impl Into<Value>) -> Result<()> {
        let mut state = self.state.write()?;
        let rollback = state.items.clone();
        state.items.push(value.into());
        self.commit(&mut state, rollback)
    }

    /// Append a batch of values in order with a single write.
    ///
    /// An empty batch changes nothing and does not touch the file.
    pub fn add_all<I>(&self, values: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let mut incoming: Vec<Value> = values.into_iter().map(Into::into).collect();
        if incoming.is_empty() {
            return Ok(());
        }
        let mut state = self.state.write()?;
        let rollback = state.items.clone();
        state.items.append(&mut incoming);
        self.commit(&mut state, rollback)
    }

    /// Remove and return the element at `index`, then persist.
    ///
    /// Fails with [`ListError::IndexOutOfRange`] (and performs no write)
    /// when `index >= count`.
    pub fn remove_at(&self, index: usize) -> Result<Value> {
        let mut state = self.state.write()?;
        if index >= state.items.len() {
            return Err(ListError::IndexOutOfRange {
                index,
                len: state.items.len(),
            });
        }
        let rollback = state.items.clone();
        let removed = state.items.remove(index);
        self.commit(&mut state, rollback)?;
        Ok(removed)
    }

    /// Remove the first element equal to `value`, then persist.
    ///
    /// Returns whether an element was removed. An absent value is not an
    /// error: the call returns `Ok(false)` and the file stays untouched.
    pub fn remove(&self, value: &Value) -> Result<bool> {
        let mut state = self.state.write()?;
        let Some(index) = state.items.iter().position(|item| item == value) else {
            return Ok(false);
        };
        let rollback = state.items.clone();
        state.items.remove(index);
        self.commit(&mut state, rollback)?;
        Ok(true)
    }

    /// Remove every element and persist a valid empty snapshot.
    ///
    /// The backing file is rewritten, not deleted; reopening yields an empty
    /// collection.
    pub fn clear(&self) -> Result<()> {
        let mut state = self.state.write()?;
        let rollback = std::mem::take(&mut state.items);
        self.commit(&mut state, rollback)
    }

    /// Current element count. No I/O.
    pub fn count(&self) -> Result<usize> {
        Ok(self.state.read()?.items.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.state.read()?.items.is_empty())
    }

    /// Clone of the element at `index`, or [`ListError::IndexOutOfRange`].
    pub fn at(&self, index: usize) -> Result<Value> {
        let state = self.state.read()?;
        state
            .items
            .get(index)
            .cloned()
            .ok_or(ListError::IndexOutOfRange {
                index,
                len: state.items.len(),
            })
    }

    /// Whether any element equals `value`.
    pub fn contains(&self, value: &Value) -> Result<bool> {
        Ok(self.state.read()?.items.iter().any(|item| item == value))
    }

    /// Index of the first element for which `predicate` holds.
    ///
    /// The predicate receives the element, its index, and a stop flag; setting
    /// the flag ends the scan after the current element, whether or not it
    /// matched.
    ///
    /// # Examples
    ///
    /// ```
    /// use durable_list::PersistentList;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let dir = tempfile::tempdir()?;
    /// let list = PersistentList::open_or_create(dir.path().join("l.bin"))?;
    /// list.add_all(["x", "y", "z"])?;
    ///
    /// let hit = list.find_index(|value, _idx, _stop| value.as_str() == Some("y"))?;
    /// assert_eq!(hit, Some(1));
    /// # Ok(())
    /// # }
    /// ```
    pub fn find_index<F>(&self, mut predicate: F) -> Result<Option<usize>>
    where
        F: FnMut(&Value, usize, &mut bool) -> bool,
    {
        let state = self.state.read()?;
        for (index, value) in state.items.iter().enumerate() {
            let mut stop = false;
            if predicate(value, index, &mut stop) {
                return Ok(Some(index));
            }
            if stop {
                break;
            }
        }
        Ok(None)
    }

    /// Point-in-time copy of the items.
    ///
    /// The copy is taken under the read lock and owned by the caller, so it
    /// never reflects mutations made after this call returns.
    pub fn snapshot(&self) -> Result<Vec<Value>> {
        Ok(self.state.read()?.items.clone())
    }

    /// Iterate over a point-in-time snapshot in insertion order.
    ///
    /// The iterator holds no lock; mutating the collection mid-iteration is
    /// safe and does not affect an iteration already started.
    pub fn iter(&self) -> Result<Iter> {
        Ok(Iter {
            inner: self.snapshot()?.into_iter(),
        })
    }

    pub fn stats(&self) -> Result<ListStats> {
        let state = self.state.read()?;
        Ok(ListStats {
            path: self.path.to_string_lossy().to_string(),
            item_count: state.items.len(),
            writes: state.writes,
            codec: self.codec.name(),
            durability: self.durability,
            last_persisted_at: state.last_persisted_at.clone(),
        })
    }

    /// Persist the current items; restore `rollback` if that fails.
    ///
    /// Called with the write lock held, so a failed mutation is never
    /// observable from another thread.
    fn commit(&self, state: &mut ListState, rollback: Vec<Value>) -> Result<()> {
        match self.persist(state) {
            Ok(()) => Ok(()),
            Err(err) => {
                state.items = rollback;
                Err(err)
            }
        }
    }

    fn persist(&self, state: &mut ListState) -> Result<()> {
        let bytes = self.codec.encode(&state.items)?;
        atomic_write(&self.path, &bytes, self.durability)?;
        state.writes += 1;
        state.last_persisted_at = Some(Utc::now().to_rfc3339());
        debug!(
            "persisted {} item(s) ({} bytes, {}) to '{}'",
            state.items.len(),
            bytes.len(),
            self.codec.name(),
            self.path.display()
        );
        Ok(())
    }
}

/// Owning iterator over a collection snapshot.
pub struct Iter {
    inner: std::vec::IntoIter<Value>,
}

impl Iterator for Iter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Iter {}

// ============================================================================
// Atomic write
// ============================================================================

/// Write `bytes` to a unique temp file next to `path`, then rename it over
/// `path`. A reader of `path` observes either the previous contents or the
/// new contents, never a partial write.
fn atomic_write(path: &Path, bytes: &[u8], durability: DurabilityMode) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|err| {
        ListError::Io(format!(
            "Failed to create parent directory '{}': {}",
            parent.display(),
            err
        ))
    })?;

    let mut tmp = NamedTempFile::new_in(&parent).map_err(|err| {
        ListError::Io(format!(
            "Failed to create temp file in '{}': {}",
            parent.display(),
            err
        ))
    })?;
    tmp.write_all(bytes).map_err(|err| {
        ListError::Io(format!(
            "Failed to write temp file in '{}': {}",
            parent.display(),
            err
        ))
    })?;
    tmp.flush().map_err(|err| {
        ListError::Io(format!(
            "Failed to flush temp file in '{}': {}",
            parent.display(),
            err
        ))
    })?;
    if durability == DurabilityMode::Sync {
        tmp.as_file().sync_all().map_err(|err| {
            ListError::Io(format!(
                "Failed to sync temp file in '{}': {}",
                parent.display(),
                err
            ))
        })?;
    }

    tmp.persist(path).map_err(|err| {
        ListError::Io(format!(
            "Failed to rename temp file into '{}': {}",
            path.display(),
            err.error
        ))
    })?;
    Ok(())
}

//! Process-wide path-to-collection registry.
//!
//! At most one live [`PersistentList`] exists per canonical path; every
//! caller asking for the same path shares the same instance.

use crate::collection::{ListOptions, PersistentList};
use crate::core::{ListError, Result};
use lazy_static::lazy_static;
use log::warn;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

lazy_static! {
    static ref GLOBAL_REGISTRY: ListRegistry = ListRegistry::new();
}

/// Guarded map from canonicalized path to the live collection for that path.
///
/// `get_or_create` holds the map lock across its check-then-create sequence,
/// so concurrent calls for one path construct exactly one instance and every
/// caller gets a handle to it.
pub struct ListRegistry {
    instances: Mutex<HashMap<PathBuf, Arc<PersistentList>>>,
}

impl ListRegistry {
    pub fn new() -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// The registry shared across the whole process.
    ///
    /// Backs the crate-level [`open_or_create`](crate::open_or_create) and
    /// [`purge`](crate::purge) conveniences.
    pub fn global() -> &'static ListRegistry {
        &GLOBAL_REGISTRY
    }

    /// Return the live collection for `path`, opening it on first use.
    pub fn get_or_create(&self, path: impl AsRef<Path>) -> Result<Arc<PersistentList>> {
        self.get_or_create_with(path, ListOptions::default())
    }

    /// Like [`get_or_create`](Self::get_or_create) with explicit options.
    ///
    /// Options apply only when this call opens the collection; a handle that
    /// already exists for `path` is returned as-is.
    pub fn get_or_create_with(
        &self,
        path: impl AsRef<Path>,
        options: ListOptions,
    ) -> Result<Arc<PersistentList>> {
        let key = canonical_key(path.as_ref())?;
        let mut instances = self.instances.lock()?;
        if let Some(existing) = instances.get(&key) {
            return Ok(Arc::clone(existing));
        }
        let list = Arc::new(PersistentList::open_or_create_with(&key, options)?);
        instances.insert(key, Arc::clone(&list));
        Ok(list)
    }

    /// Drop the registry entry for `path`; returns whether one existed.
    ///
    /// With `delete_from_disk`, also deletes the backing file of the entry
    /// that was removed. A deletion failure is logged and does not reverse
    /// the removal. When no entry exists the disk is never touched, even if
    /// `delete_from_disk` is set.
    pub fn purge(&self, path: impl AsRef<Path>, delete_from_disk: bool) -> Result<bool> {
        let key = canonical_key(path.as_ref())?;
        let removed = self.instances.lock()?.remove(&key);
        let Some(list) = removed else {
            return Ok(false);
        };

        if delete_from_disk {
            match fs::remove_file(list.path()) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    warn!(
                        "purge removed '{}' from the registry but could not delete its file: {}",
                        list.path().display(),
                        err
                    );
                }
            }
        }
        Ok(true)
    }

    /// Whether a live collection is registered for `path`.
    pub fn contains(&self, path: impl AsRef<Path>) -> Result<bool> {
        let key = canonical_key(path.as_ref())?;
        Ok(self.instances.lock()?.contains_key(&key))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.instances.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.instances.lock()?.is_empty())
    }

    /// Canonical paths of all registered collections.
    pub fn paths(&self) -> Result<Vec<PathBuf>> {
        Ok(self.instances.lock()?.keys().cloned().collect())
    }
}

impl Default for ListRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical absolute form of `path`, usable as a registry key before the
/// file exists.
///
/// `fs::canonicalize` requires the full path to exist, so for a yet-unwritten
/// file the nearest existing ancestor is canonicalized and the remaining
/// components are re-joined. Lookups through symlinked parents therefore
/// collapse to one key whether or not the file has been created.
fn canonical_key(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|err| ListError::Io(format!("Failed to resolve working directory: {}", err)))?
            .join(path)
    };

    if let Ok(resolved) = absolute.canonicalize() {
        return Ok(resolved);
    }

    let mut existing = absolute.as_path();
    let mut tail: Vec<&std::ffi::OsStr> = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name);
                existing = parent;
            }
            _ => break,
        }
    }

    let mut key = existing.canonicalize().map_err(|err| {
        ListError::Io(format!(
            "Failed to canonicalize '{}': {}",
            existing.display(),
            err
        ))
    })?;
    for component in tail.iter().rev() {
        key.push(component);
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_same_path_shares_one_instance() {
        let temp_dir = TempDir::new().unwrap();
        let registry = ListRegistry::new();
        let path = temp_dir.path().join("shared.bin");

        let first = registry.get_or_create(&path).unwrap();
        let second = registry.get_or_create(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len().unwrap(), 1);
    }

    #[test]
    fn test_relative_and_absolute_spellings_collapse() {
        let temp_dir = TempDir::new().unwrap();
        let registry = ListRegistry::new();
        let path = temp_dir.path().join("spelled.bin");
        let dotted = temp_dir.path().join(".").join("spelled.bin");

        let first = registry.get_or_create(&path).unwrap();
        let second = registry.get_or_create(&dotted).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_purge_untracked_path_is_false_and_keeps_file() {
        let temp_dir = TempDir::new().unwrap();
        let registry = ListRegistry::new();
        let path = temp_dir.path().join("orphan.bin");
        fs::write(&path, b"keep me").unwrap();

        assert!(!registry.purge(&path, true).unwrap());
        assert!(path.exists());
    }

    #[test]
    fn test_purge_without_disk_delete_keeps_file() {
        let temp_dir = TempDir::new().unwrap();
        let registry = ListRegistry::new();
        let path = temp_dir.path().join("kept.bin");

        let list = registry.get_or_create(&path).unwrap();
        list.add("x").unwrap();
        assert!(registry.purge(&path, false).unwrap());
        assert!(path.exists());
        assert!(!registry.contains(&path).unwrap());
    }

    #[test]
    fn test_purge_with_disk_delete_removes_file() {
        let temp_dir = TempDir::new().unwrap();
        let registry = ListRegistry::new();
        let path = temp_dir.path().join("gone.bin");

        let list = registry.get_or_create(&path).unwrap();
        list.add("x").unwrap();
        assert!(registry.purge(&path, true).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_purge_with_never_written_file_still_succeeds() {
        let temp_dir = TempDir::new().unwrap();
        let registry = ListRegistry::new();
        let path = temp_dir.path().join("never_written.bin");

        registry.get_or_create(&path).unwrap();
        // No mutation happened, so there is no file; purge still removes the
        // registry entry and treats the missing file as already deleted.
        assert!(registry.purge(&path, true).unwrap());
        assert_eq!(registry.len().unwrap(), 0);
    }
}

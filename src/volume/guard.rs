//! Readers-writer coordination of the accesses to a volume's files.
//!
//! Every volume handle holds one [`ConcurrencyGuard`]. Reads take it in
//! shared mode, writes and header edits in exclusive mode. By default each
//! handle gets its own guard, so two handles opened separately on the same
//! file are not coordinated with each other. Handles opened through
//! options carrying the same [`LockRegistry`] share one guard per file.
//!
//! [`ConcurrencyGuard`]: ./struct.ConcurrencyGuard.html
//! [`LockRegistry`]: ./struct.LockRegistry.html

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

/// A shared/exclusive lock over the files of a volume.
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyGuard {
    lock: Arc<RwLock<()>>,
}

impl ConcurrencyGuard {
    /// Create a guard which is not shared with anyone.
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until shared access is granted.
    pub fn read(&self) -> RwLockReadGuard<()> {
        self.lock.read()
    }

    /// Block until exclusive access is granted.
    pub fn write(&self) -> RwLockWriteGuard<()> {
        self.lock.write()
    }

    /// Whether both guards coordinate through the same lock.
    pub fn is_shared_with(&self, other: &ConcurrencyGuard) -> bool {
        Arc::ptr_eq(&self.lock, &other.lock)
    }
}

/// A table of guards keyed by canonical file path.
///
/// Entries are held weakly: once every handle of a file is dropped, its
/// lock is released and the entry becomes stale until the next
/// [`purge`](#method.purge) or lookup of the same path.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<PathBuf, Weak<RwLock<()>>>>,
}

impl LockRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve the guard of the given file, creating it if no live handle
    /// holds one.
    pub fn guard_for<P: AsRef<Path>>(&self, path: P) -> ConcurrencyGuard {
        let key = canonical_key(path.as_ref());
        let mut locks = self.locks.lock();
        if let Some(lock) = locks.get(&key).and_then(Weak::upgrade) {
            return ConcurrencyGuard { lock };
        }
        let lock = Arc::new(RwLock::new(()));
        let _ = locks.insert(key, Arc::downgrade(&lock));
        ConcurrencyGuard { lock }
    }

    /// Forget the guard of the given file. Handles which already hold it
    /// keep it; handles opened afterwards get a new one.
    pub fn invalidate<P: AsRef<Path>>(&self, path: P) {
        let _ = self.locks.lock().remove(&canonical_key(path.as_ref()));
    }

    /// Drop every entry whose lock is no longer held by any handle.
    pub fn purge(&self) {
        self.locks.lock().retain(|_, lock| lock.strong_count() > 0);
    }

    /// Number of entries, stale ones included.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    /// Whether the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The canonical form of a path which may not exist yet: the file name
/// joined to its canonicalized parent directory.
fn canonical_key(path: &Path) -> PathBuf {
    if let Ok(p) = path.canonicalize() {
        return p;
    }
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|d| d.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let parent = absolute.parent().and_then(|p| p.canonicalize().ok());
    match (parent, absolute.file_name()) {
        (Some(parent), Some(name)) => parent.join(name),
        _ => absolute.clone(),
    }
}

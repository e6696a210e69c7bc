//! Exclusive writer lock for the detection log.

use crate::constants::{LOCK_FILE_EXTENSION, STALE_LOCK_AGE};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Lock file content for debugging.
#[derive(Debug, Serialize, Deserialize)]
pub struct LockInfo {
    /// Process ID that holds the lock.
    pub pid: u32,
    /// Hostname of the machine.
    pub hostname: String,
    /// When the lock was acquired.
    pub started: DateTime<Utc>,
    /// The locked store.
    pub store: PathBuf,
}

/// RAII guard held by a pass while it rewrites the store.
#[derive(Debug)]
pub struct StoreLock {
    lock_path: PathBuf,
}

impl StoreLock {
    /// Acquire the lock for `store`, failing immediately if it is held.
    ///
    /// A lock left behind by a dead process (same host, pid gone) or one
    /// older than [`STALE_LOCK_AGE`] is removed and acquisition retried once.
    /// The store's directory must already exist.
    pub fn acquire(store: &Path) -> Result<Self> {
        match Self::try_create(store) {
            Err(Error::StoreLocked { path }) if Self::is_stale(store, STALE_LOCK_AGE) => {
                warn!("Removing stale lock {}", path.display());
                Self::remove_stale(store)?;
                Self::try_create(store)
            }
            result => result,
        }
    }

    fn try_create(store: &Path) -> Result<Self> {
        let lock_path = Self::lock_path_for(store);

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path);

        match file {
            Ok(mut f) => {
                let info = LockInfo {
                    pid: std::process::id(),
                    hostname: current_hostname(),
                    started: Utc::now(),
                    store: store.to_path_buf(),
                };

                let json = serde_json::to_string_pretty(&info).unwrap_or_else(|_| "{}".to_string());
                let _ = f.write_all(json.as_bytes());

                register_lock(&lock_path);
                debug!("Acquired lock {}", lock_path.display());

                Ok(Self { lock_path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(Error::StoreLocked { path: lock_path })
            }
            Err(e) => Err(Error::LockCreate {
                path: lock_path,
                source: e,
            }),
        }
    }

    /// Check whether an existing lock can no longer belong to a live writer.
    pub fn is_stale(store: &Path, max_age: Duration) -> bool {
        let lock_path = Self::lock_path_for(store);

        if let Some(info) = Self::read_info(store)
            && info.hostname == current_hostname()
            && process_alive(info.pid) == Some(false)
        {
            return true;
        }

        fs::metadata(&lock_path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|age| age > max_age)
    }

    /// Read the holder recorded in an existing lock file.
    pub fn read_info(store: &Path) -> Option<LockInfo> {
        let content = fs::read_to_string(Self::lock_path_for(store)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Remove a stale lock file.
    pub fn remove_stale(store: &Path) -> Result<()> {
        let lock_path = Self::lock_path_for(store);
        match fs::remove_file(&lock_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::LockRemove {
                path: lock_path,
                source: e,
            }),
        }
    }

    /// `<store>.lock`, next to the store.
    pub fn lock_path_for(store: &Path) -> PathBuf {
        let name = store
            .file_name()
            .map_or_else(|| "store".into(), |n| n.to_string_lossy());
        store.with_file_name(format!("{name}{LOCK_FILE_EXTENSION}"))
    }

    /// Check if the store is locked.
    pub fn is_locked(store: &Path) -> bool {
        Self::lock_path_for(store).exists()
    }

    /// Path of the held lock file.
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
        unregister_lock(&self.lock_path);
    }
}

fn current_hostname() -> String {
    hostname::get().map_or_else(
        |_| "unknown".to_string(),
        |h| h.to_string_lossy().into_owned(),
    )
}

/// Whether `pid` is running on this host, when the platform can tell.
#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> Option<bool> {
    Some(Path::new(&format!("/proc/{pid}")).exists())
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> Option<bool> {
    None
}

/// Active lock paths, removed on Ctrl+C.
static ACTIVE_LOCKS: LazyLock<Mutex<Vec<PathBuf>>> = LazyLock::new(|| Mutex::new(Vec::new()));

fn register_lock(path: &Path) {
    if let Ok(mut locks) = ACTIVE_LOCKS.lock() {
        locks.push(path.to_path_buf());
    }
}

fn unregister_lock(path: &Path) {
    if let Ok(mut locks) = ACTIVE_LOCKS.lock() {
        locks.retain(|p| p != path);
    }
}

/// Remove every held lock file. Called from the Ctrl+C handler.
pub fn cleanup_all_locks() {
    if let Ok(locks) = ACTIVE_LOCKS.lock() {
        for lock_path in locks.iter() {
            let _ = fs::remove_file(lock_path);
        }
    }
}

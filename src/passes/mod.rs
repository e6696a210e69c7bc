//! The pipeline passes over the detection log.
//!
//! `detect`, `metadata` and `classify` rewrite the log under a
//! [`StoreLock`]; `sort`, `visualize` and `export` only read it.

pub mod classify;
pub mod detect;
pub mod export;
pub mod metadata;
mod outcome;
pub mod sort;
pub mod visualize;

pub use outcome::{ImageOutcome, PassSummary, SkipReason};

use crate::error::{Error, Result};
use crate::locking::StoreLock;
use std::path::Path;

/// Lock a store that must already exist.
pub(crate) fn lock_existing(store_path: &Path) -> Result<StoreLock> {
    if !store_path.is_file() {
        return Err(Error::StoreNotFound {
            path: store_path.to_path_buf(),
        });
    }
    StoreLock::acquire(store_path)
}

//! # Offline Cache Error Types
//!
//! A missing track is not an error: lookups return `Ok(None)` / `Ok(false)`.

use core_library::{LibraryError, TrackId};
use thiserror::Error;

/// Errors returned by the offline cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The store could not be opened, or no connection/transaction could be started.
    #[error("Offline store unavailable: {source}")]
    StoreUnavailable {
        #[source]
        source: LibraryError,
    },

    /// An operation was invoked before `initialize()` completed.
    #[error("Offline cache is not ready")]
    NotReady,

    /// Admission of a track did not commit. Capacity accounting is unchanged.
    #[error("Failed to cache track {id}: {source}")]
    WriteFailed {
        id: TrackId,
        #[source]
        source: LibraryError,
    },

    /// Removal of a track did not commit. Capacity accounting is unchanged.
    #[error("Failed to remove cached track {id}: {source}")]
    DeleteFailed {
        id: TrackId,
        #[source]
        source: LibraryError,
    },

    /// A full wipe did not commit. Capacity accounting is unchanged.
    #[error("Failed to clear offline cache: {source}")]
    ClearFailed {
        #[source]
        source: LibraryError,
    },

    /// A lookup, listing or aggregate query failed.
    #[error("Failed to read offline cache: {source}")]
    ReadFailed {
        #[source]
        source: LibraryError,
    },

    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    pub(crate) fn read(source: LibraryError) -> Self {
        if source.is_store_unavailable() {
            CacheError::StoreUnavailable { source }
        } else {
            CacheError::ReadFailed { source }
        }
    }

    pub(crate) fn write(id: &TrackId, source: LibraryError) -> Self {
        if source.is_store_unavailable() {
            CacheError::StoreUnavailable { source }
        } else {
            CacheError::WriteFailed {
                id: id.clone(),
                source,
            }
        }
    }

    pub(crate) fn delete(id: &TrackId, source: LibraryError) -> Self {
        if source.is_store_unavailable() {
            CacheError::StoreUnavailable { source }
        } else {
            CacheError::DeleteFailed {
                id: id.clone(),
                source,
            }
        }
    }

    pub(crate) fn clear(source: LibraryError) -> Self {
        if source.is_store_unavailable() {
            CacheError::StoreUnavailable { source }
        } else {
            CacheError::ClearFailed { source }
        }
    }

    /// Returns `true` if retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CacheError::StoreUnavailable { .. } | CacheError::NotReady
        )
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    /// A stored row exists but could not be decoded into a cache entry.
    #[error("Corrupt cache row: {0}")]
    Corrupt(String),
}

impl LibraryError {
    /// Returns `true` when the store itself could not be reached.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, LibraryError::Bridge(e) if e.is_connection_error())
    }
}

impl From<serde_json::Error> for LibraryError {
    fn from(err: serde_json::Error) -> Self {
        LibraryError::Corrupt(format!("metadata is not valid JSON: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;

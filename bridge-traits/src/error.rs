use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// The store could not be opened, or no connection/transaction could be acquired.
    #[error("Storage unavailable: {0}")]
    ConnectionFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A stored value could not be decoded into the expected shape.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

impl BridgeError {
    /// Returns `true` when the failure happened before any statement could run.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, BridgeError::ConnectionFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

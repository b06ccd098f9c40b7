use crate::address::StorageAddress;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(String),

    /// The object key is not a valid relative name.
    #[error("invalid object key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// The root address cannot back a store.
    #[error("invalid storage root {address}: {reason}")]
    InvalidRoot {
        address: StorageAddress,
        reason: String,
    },

    /// No backend is registered for the address scheme.
    #[error("no storage backend registered for scheme {0:?}")]
    UnsupportedScheme(String),

    /// The backend does not implement an optional capability.
    #[error("operation not supported by this backend: {0}")]
    Unsupported(&'static str),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` if this error reports a missing object.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

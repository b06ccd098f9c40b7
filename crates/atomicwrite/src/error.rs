use std::fmt;

use atomicwrite_store::{StorageAddress, StoreError};
use thiserror::Error;

use crate::writer::WriterState;

/// Step of the finalize protocol that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinalizeStage {
    /// Closing the temp writer.
    CloseTemp,
    /// Renaming the temp object over the final key.
    Rename,
    /// Opening a reader on the temp object.
    OpenTempReader,
    /// Opening the writer on the final key.
    OpenFinalWriter,
    /// Copying bytes from temp to final.
    Copy,
    /// Closing the final writer.
    CloseFinalWriter,
}

impl fmt::Display for FinalizeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CloseTemp => write!(f, "close-temp"),
            Self::Rename => write!(f, "rename"),
            Self::OpenTempReader => write!(f, "open-temp-reader"),
            Self::OpenFinalWriter => write!(f, "open-final-writer"),
            Self::Copy => write!(f, "copy"),
            Self::CloseFinalWriter => write!(f, "close-final-writer"),
        }
    }
}

/// Errors produced while constructing, writing, or closing an atomic writer.
#[derive(Debug, Error)]
pub enum AtomicWriteError {
    /// The address is neither a usable path nor a scheme-qualified URI.
    #[error("failed to parse address {input:?}: {reason}")]
    Parse { input: String, reason: String },

    /// The backend could not be opened at the resolved root.
    #[error("failed to open storage at {address}: {source}")]
    BackendOpen {
        address: StorageAddress,
        #[source]
        source: StoreError,
    },

    /// Every temp-key candidate collided with an existing object.
    #[error("no free temp key for {final_key} after {attempts} attempts")]
    Allocation { final_key: String, attempts: usize },

    /// A backend call made while preparing the staged object failed.
    #[error("failed to {operation} {key}: {source}")]
    Backend {
        operation: &'static str,
        key: String,
        #[source]
        source: StoreError,
    },

    /// Writing to the staged object failed.
    #[error("failed to write to {temp_key}: {source}")]
    Write {
        temp_key: String,
        #[source]
        source: std::io::Error,
    },

    /// Promoting the staged object to its final key failed.
    #[error("failed to finalize {key} ({stage}): {source}")]
    Finalize {
        stage: FinalizeStage,
        key: String,
        #[source]
        source: StoreError,
    },

    /// The writer is past the point where this call is valid.
    #[error("atomic writer is already {state}")]
    AlreadyClosed { state: WriterState },
}

impl AtomicWriteError {
    pub(crate) fn parse(input: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn finalize(stage: FinalizeStage, key: impl fmt::Display, source: StoreError) -> Self {
        Self::Finalize {
            stage,
            key: key.to_string(),
            source,
        }
    }

    /// The finalize stage, if this is a finalize failure.
    pub fn finalize_stage(&self) -> Option<FinalizeStage> {
        match self {
            Self::Finalize { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<AtomicWriteError> for std::io::Error {
    fn from(err: AtomicWriteError) -> Self {
        use std::io::ErrorKind;

        let kind = match &err {
            AtomicWriteError::Write { source, .. } => source.kind(),
            AtomicWriteError::Parse { .. } => ErrorKind::InvalidInput,
            _ => ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}

/// Result alias for atomic write operations.
pub type AtomicWriteResult<T> = Result<T, AtomicWriteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_display() {
        assert_eq!(FinalizeStage::CloseTemp.to_string(), "close-temp");
        assert_eq!(FinalizeStage::CloseFinalWriter.to_string(), "close-final-writer");
    }

    #[test]
    fn finalize_message_names_stage_and_key() {
        let err = AtomicWriteError::finalize(
            FinalizeStage::Copy,
            "out.txt",
            StoreError::Unsupported("copy"),
        );
        let msg = err.to_string();
        assert!(msg.contains("out.txt"));
        assert!(msg.contains("(copy)"));
        assert_eq!(err.finalize_stage(), Some(FinalizeStage::Copy));
    }

    #[test]
    fn source_chain_is_kept() {
        use std::error::Error as _;

        let err = AtomicWriteError::BackendOpen {
            address: StorageAddress::mem("x"),
            source: StoreError::UnsupportedScheme("mem".into()),
        };
        assert!(err.source().is_some());
        assert!(err.finalize_stage().is_none());
    }

    #[test]
    fn io_conversion_keeps_write_kind() {
        let err = AtomicWriteError::Write {
            temp_key: "t".into(),
            source: std::io::Error::new(std::io::ErrorKind::WriteZero, "full"),
        };
        let io: std::io::Error = err.into();
        assert_eq!(io.kind(), std::io::ErrorKind::WriteZero);
    }
}

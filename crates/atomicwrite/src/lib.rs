//! All-or-nothing writes to a storage address.
//!
//! An [`AtomicWriter`] stages bytes under a fresh temp key next to the
//! destination and only promotes them to the destination key on
//! [`close`](AtomicWriter::close). Readers of the destination either see
//! what was there before or the complete new contents, never a partial
//! write.
//!
//! ```
//! use std::io::Write;
//! use atomicwrite::AtomicWriter;
//!
//! let mut w = AtomicWriter::new("mem://docs/hello.txt").unwrap();
//! w.write_all(b"Hello world").unwrap();
//! w.close().unwrap();
//! ```
//!
//! # Addresses
//!
//! - bare paths (`out.txt`, `/var/data/out.txt`) and `file://` URIs go to
//!   the local filesystem
//! - `mem://bucket/key` goes to a process-local memory store
//!
//! Other schemes plug in through a [`StoreRegistry`] passed to
//! [`AtomicWriter::open_in`].
//!
//! # Design Rules
//!
//! 1. The temp key is claimed exclusively before any byte is written.
//! 2. The destination key is touched only during `close`.
//! 3. `close` runs to completion; there is no cancellation.
//! 4. The temp object is removed after promotion, success or not, except
//!    when closing the temp object itself failed.
//! 5. Failing to remove the temp object never fails a committed write.

pub mod error;
pub mod options;
pub mod resolve;
pub mod temp_key;
pub mod writer;

#[cfg(test)]
mod test_support;

// Re-export primary types at crate root for ergonomic imports.
pub use atomicwrite_store::{
    ObjectKey, ObjectStore, StorageAddress, StoreError, StoreRegistry, WriterOptions,
};
pub use error::{AtomicWriteError, AtomicWriteResult, FinalizeStage};
pub use options::{AtomicWriteOptions, FinalizeStrategy};
pub use resolve::{resolve, ResolvedUri};
pub use temp_key::{SuffixSource, TempKeyAllocator, MAX_TEMP_KEY_ATTEMPTS};
pub use writer::{default_registry, AtomicWriter, WriterState};

/// Atomically replace the contents at `address` with `contents`.
pub fn write(address: &str, contents: impl AsRef<[u8]>) -> AtomicWriteResult<()> {
    let mut writer = AtomicWriter::new(address)?;
    writer.stage(contents.as_ref())?;
    writer.commit()
}

/// Read the object at `address` in full.
pub fn read(address: &str) -> AtomicWriteResult<Vec<u8>> {
    let resolved = resolve(address)?;
    let store = default_registry()
        .open(&resolved.address)
        .map_err(|source| AtomicWriteError::BackendOpen {
            address: resolved.address.clone(),
            source,
        })?;
    store
        .read_object(&resolved.key)
        .map_err(|source| AtomicWriteError::Backend {
            operation: "read",
            key: resolved.key.to_string(),
            source,
        })
}

use std::fmt;
use std::io::{Read, Write};

use crate::address::StorageAddress;
use crate::error::{StoreError, StoreResult};
use crate::key::ObjectKey;
use crate::options::WriterOptions;

/// A readable stream over one stored object.
pub type ObjectReader = Box<dyn Read + Send>;

/// A writable stream bound to one object key.
///
/// Bytes written are not guaranteed to be stored until [`close`] returns
/// `Ok`. Dropping a writer without closing it publishes nothing new.
///
/// [`close`]: ObjectWriter::close
pub trait ObjectWriter: Write + Send {
    /// Flush all buffered bytes and make the object durable as far as the
    /// backend allows.
    fn close(self: Box<Self>) -> StoreResult<()>;
}

/// Root-addressed byte store.
///
/// All implementations must satisfy these invariants:
/// - `exists` reports absence as `Ok(false)`, never as an error.
/// - `open_writer` creates or truncates the object.
/// - `open_reader` fails with [`StoreError::NotFound`] for missing keys.
/// - `delete` of a missing key may fail with `NotFound`; callers tolerate it.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync + fmt::Debug {
    /// The root address this store was opened at.
    fn address(&self) -> &StorageAddress;

    /// Check whether an object exists.
    fn exists(&self, key: &ObjectKey) -> StoreResult<bool>;

    /// Open a writer that creates or truncates the object.
    fn open_writer(
        &self,
        key: &ObjectKey,
        options: &WriterOptions,
    ) -> StoreResult<Box<dyn ObjectWriter>>;

    /// Open a reader over the object.
    fn open_reader(&self, key: &ObjectKey) -> StoreResult<ObjectReader>;

    /// Delete an object.
    fn delete(&self, key: &ObjectKey) -> StoreResult<()>;

    /// Open a writer only if no object exists at `key`.
    ///
    /// Returns `Ok(None)` if the key is taken. The default implementation
    /// checks and then opens, leaving a window in which another writer can
    /// claim the same key. Backends with an exclusive-create primitive
    /// override this.
    fn create_new(
        &self,
        key: &ObjectKey,
        options: &WriterOptions,
    ) -> StoreResult<Option<Box<dyn ObjectWriter>>> {
        if self.exists(key)? {
            return Ok(None);
        }
        self.open_writer(key, options).map(Some)
    }

    /// Whether [`rename`](ObjectStore::rename) replaces the destination in
    /// a single step.
    fn supports_rename(&self) -> bool {
        false
    }

    /// Move `from` to `to`, replacing any object at `to`.
    fn rename(&self, from: &ObjectKey, to: &ObjectKey) -> StoreResult<()> {
        let _ = (from, to);
        Err(StoreError::Unsupported("rename"))
    }

    /// Read a whole object into memory.
    ///
    /// Default implementation drains [`open_reader`](ObjectStore::open_reader).
    fn read_object(&self, key: &ObjectKey) -> StoreResult<Vec<u8>> {
        let mut reader = self.open_reader(key)?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Write a whole object and close the writer.
    fn write_object(&self, key: &ObjectKey, data: &[u8]) -> StoreResult<()> {
        let mut writer = self.open_writer(key, &WriterOptions::default())?;
        writer.write_all(data)?;
        writer.close()
    }
}

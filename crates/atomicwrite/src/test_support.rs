//! Store wrappers for exercising failure paths.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

use atomicwrite_store::{
    InMemoryObjectStore, ObjectKey, ObjectReader, ObjectStore, ObjectWriter, StorageAddress,
    StoreError, StoreResult, WriterOptions,
};

fn injected(what: &str) -> StoreError {
    StoreError::Io(io::Error::other(format!("injected {what} fault")))
}

/// Delegates to a memory store without exclusive create or rename, counting
/// `exists` calls.
#[derive(Debug)]
pub struct CountingStore {
    inner: InMemoryObjectStore,
    exists_calls: AtomicUsize,
}

impl CountingStore {
    pub fn check_then_act(inner: InMemoryObjectStore) -> Self {
        Self {
            inner,
            exists_calls: AtomicUsize::new(0),
        }
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }
}

impl ObjectStore for CountingStore {
    fn address(&self) -> &StorageAddress {
        self.inner.address()
    }

    fn exists(&self, key: &ObjectKey) -> StoreResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.exists(key)
    }

    fn open_writer(
        &self,
        key: &ObjectKey,
        options: &WriterOptions,
    ) -> StoreResult<Box<dyn ObjectWriter>> {
        self.inner.open_writer(key, options)
    }

    fn open_reader(&self, key: &ObjectKey) -> StoreResult<ObjectReader> {
        self.inner.open_reader(key)
    }

    fn delete(&self, key: &ObjectKey) -> StoreResult<()> {
        self.inner.delete(key)
    }
}

/// Faults to inject, by operation.
#[derive(Clone, Copy, Debug, Default)]
pub struct Faults {
    /// Number of initial temp writes that fail.
    pub temp_writes: usize,
    pub close_temp: bool,
    pub open_reader: bool,
    pub read: bool,
    pub open_final_writer: bool,
    pub close_final_writer: bool,
    pub rename: bool,
    pub delete: bool,
}

/// Memory store that fails the operations named in [`Faults`].
///
/// Writers opened through `create_new` are treated as temp writers, writers
/// opened through `open_writer` as final writers.
#[derive(Debug)]
pub struct FaultyStore {
    inner: InMemoryObjectStore,
    faults: Faults,
    rename: bool,
}

impl FaultyStore {
    pub fn new(inner: InMemoryObjectStore, faults: Faults) -> Self {
        Self {
            inner,
            faults,
            rename: false,
        }
    }

    pub fn with_rename(mut self) -> Self {
        self.rename = true;
        self
    }
}

impl ObjectStore for FaultyStore {
    fn address(&self) -> &StorageAddress {
        self.inner.address()
    }

    fn exists(&self, key: &ObjectKey) -> StoreResult<bool> {
        self.inner.exists(key)
    }

    fn open_writer(
        &self,
        key: &ObjectKey,
        options: &WriterOptions,
    ) -> StoreResult<Box<dyn ObjectWriter>> {
        if self.faults.open_final_writer {
            return Err(injected("open writer"));
        }
        Ok(Box::new(FaultyWriter {
            inner: self.inner.open_writer(key, options)?,
            failing_writes: 0,
            fail_close: self.faults.close_final_writer,
        }))
    }

    fn open_reader(&self, key: &ObjectKey) -> StoreResult<ObjectReader> {
        if self.faults.open_reader {
            return Err(injected("open reader"));
        }
        let inner = self.inner.open_reader(key)?;
        if self.faults.read {
            return Ok(Box::new(FaultyReader { inner, served: false }));
        }
        Ok(inner)
    }

    fn delete(&self, key: &ObjectKey) -> StoreResult<()> {
        if self.faults.delete {
            return Err(injected("delete"));
        }
        self.inner.delete(key)
    }

    fn create_new(
        &self,
        key: &ObjectKey,
        options: &WriterOptions,
    ) -> StoreResult<Option<Box<dyn ObjectWriter>>> {
        let Some(inner) = self.inner.create_new(key, options)? else {
            return Ok(None);
        };
        Ok(Some(Box::new(FaultyWriter {
            inner,
            failing_writes: self.faults.temp_writes,
            fail_close: self.faults.close_temp,
        })))
    }

    fn supports_rename(&self) -> bool {
        self.rename
    }

    fn rename(&self, from: &ObjectKey, to: &ObjectKey) -> StoreResult<()> {
        if self.faults.rename {
            return Err(injected("rename"));
        }
        self.inner.rename(from, to)
    }
}

struct FaultyWriter {
    inner: Box<dyn ObjectWriter>,
    failing_writes: usize,
    fail_close: bool,
}

impl Write for FaultyWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(io::Error::other("injected write fault"));
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl ObjectWriter for FaultyWriter {
    fn close(self: Box<Self>) -> StoreResult<()> {
        if self.fail_close {
            return Err(injected("close"));
        }
        self.inner.close()
    }
}

/// Serves one short read, then fails.
struct FaultyReader {
    inner: ObjectReader,
    served: bool,
}

impl Read for FaultyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.served {
            return Err(io::Error::other("injected read fault"));
        }
        self.served = true;
        let n = buf.len().min(3);
        self.inner.read(&mut buf[..n])
    }
}

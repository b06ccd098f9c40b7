//! The atomic writer state machine.
//!
//! ```text
//!            write*               close
//! Writing ──────────► Writing ──────────► Finalizing ──┬──► Committed
//!    │                                                 └──► FinalizeFailed
//!    └── abort / drop ──► Aborted
//! ```
//!
//! Bytes go to a temp object claimed next to the final key. `close`
//! promotes the temp object to the final key, by rename when the backend can
//! replace in one step and by copy otherwise, then removes the temp object.
//! Until promotion starts, readers of the final key see whatever was there
//! before.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, OnceLock};

use atomicwrite_store::{
    ObjectKey, ObjectStore, ObjectWriter, StorageAddress, StoreRegistry, WriterOptions,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{AtomicWriteError, AtomicWriteResult, FinalizeStage};
use crate::options::{AtomicWriteOptions, FinalizeStrategy};
use crate::resolve::resolve;
use crate::temp_key::{SuffixSource, TempKeyAllocator};

/// Lifecycle state of an [`AtomicWriter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriterState {
    /// Accepting writes.
    Writing,
    /// `close` is promoting the staged object.
    Finalizing,
    /// The final key holds the written bytes.
    Committed,
    /// Promotion failed; the writer is unusable.
    FinalizeFailed,
    /// The staged object was discarded without promotion.
    Aborted,
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Writing => write!(f, "writing"),
            Self::Finalizing => write!(f, "finalizing"),
            Self::Committed => write!(f, "committed"),
            Self::FinalizeFailed => write!(f, "finalize-failed"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Registry with the `file` and `mem` backends, shared by the process.
///
/// Objects written to `mem://` addresses through it live until the process
/// exits.
pub fn default_registry() -> &'static StoreRegistry {
    static REGISTRY: OnceLock<StoreRegistry> = OnceLock::new();
    REGISTRY.get_or_init(StoreRegistry::with_defaults)
}

/// A writer whose bytes become visible at the destination all at once, on
/// [`close`](AtomicWriter::close), or not at all.
pub struct AtomicWriter {
    store: Arc<dyn ObjectStore>,
    final_key: ObjectKey,
    temp_key: ObjectKey,
    temp_writer: Option<Box<dyn ObjectWriter>>,
    state: WriterState,
    finalize: FinalizeStrategy,
    bytes_written: u64,
    stray_temp: bool,
}

impl AtomicWriter {
    /// Open an atomic writer for `address` with default options.
    ///
    /// `address` is a bare path or a `file://` / `mem://` URI.
    pub fn new(address: &str) -> AtomicWriteResult<Self> {
        Self::with_options(address, AtomicWriteOptions::default())
    }

    /// Open an atomic writer for `address` with custom options.
    pub fn with_options(address: &str, options: AtomicWriteOptions) -> AtomicWriteResult<Self> {
        Self::open_in(default_registry(), address, options)
    }

    /// Open an atomic writer, looking the backend up in `registry`.
    pub fn open_in(
        registry: &StoreRegistry,
        address: &str,
        options: AtomicWriteOptions,
    ) -> AtomicWriteResult<Self> {
        let resolved = resolve(address)?;
        let store = registry
            .open(&resolved.address)
            .map_err(|source| AtomicWriteError::BackendOpen {
                address: resolved.address.clone(),
                source,
            })?;
        Self::create(
            store,
            resolved.key,
            options,
            &mut TempKeyAllocator::from_thread_rng(),
        )
    }

    /// Open an atomic writer on an already-open store.
    pub fn create<S: SuffixSource>(
        store: Arc<dyn ObjectStore>,
        final_key: ObjectKey,
        options: AtomicWriteOptions,
        allocator: &mut TempKeyAllocator<S>,
    ) -> AtomicWriteResult<Self> {
        let (temp_key, temp_writer) =
            allocator.allocate(store.as_ref(), &final_key, &options.writer)?;
        debug!(
            address = %store.address(),
            %final_key,
            %temp_key,
            "staging atomic write"
        );
        Ok(Self {
            store,
            final_key,
            temp_key,
            temp_writer: Some(temp_writer),
            state: WriterState::Writing,
            finalize: options.finalize,
            bytes_written: 0,
            stray_temp: false,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Root address of the backing store.
    pub fn address(&self) -> &StorageAddress {
        self.store.address()
    }

    /// Key the bytes end up at.
    pub fn final_key(&self) -> &ObjectKey {
        &self.final_key
    }

    /// Key the bytes are staged at.
    pub fn temp_key(&self) -> &ObjectKey {
        &self.temp_key
    }

    /// Bytes accepted so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// The temp key, if cleanup after finalize failed to remove it.
    pub fn stray_temp_key(&self) -> Option<&ObjectKey> {
        self.stray_temp.then_some(&self.temp_key)
    }

    /// Write all of `data` to the staged object.
    ///
    /// On failure the writer stays in [`WriterState::Writing`]; the caller
    /// may retry or close.
    pub fn stage(&mut self, data: &[u8]) -> AtomicWriteResult<()> {
        let result = self.temp_writer_mut()?.write_all(data);
        match result {
            Ok(()) => {
                self.bytes_written += data.len() as u64;
                Ok(())
            }
            Err(source) => Err(self.write_error(source)),
        }
    }

    /// Promote the staged bytes to the final key.
    ///
    /// Runs to completion before returning. A failure to remove the temp
    /// object afterwards is logged and reported by
    /// [`stray_temp_key`](Self::stray_temp_key), never returned. Calling
    /// `close` again fails with [`AtomicWriteError::AlreadyClosed`].
    pub fn close(&mut self) -> AtomicWriteResult<()> {
        if self.state != WriterState::Writing {
            return Err(AtomicWriteError::AlreadyClosed { state: self.state });
        }
        let Some(temp_writer) = self.temp_writer.take() else {
            return Err(AtomicWriteError::AlreadyClosed { state: self.state });
        };
        self.state = WriterState::Finalizing;

        if let Err(source) = temp_writer.close() {
            self.state = WriterState::FinalizeFailed;
            return Err(AtomicWriteError::finalize(
                FinalizeStage::CloseTemp,
                &self.temp_key,
                source,
            ));
        }

        let result = self.promote();
        match &result {
            Ok(()) => {
                self.state = WriterState::Committed;
                debug!(
                    final_key = %self.final_key,
                    bytes = self.bytes_written,
                    "atomic write committed"
                );
            }
            Err(_) => self.state = WriterState::FinalizeFailed,
        }
        result
    }

    /// Close, consuming the writer.
    pub fn commit(mut self) -> AtomicWriteResult<()> {
        self.close()
    }

    /// Discard the staged object without touching the final key.
    pub fn abort(mut self) -> AtomicWriteResult<()> {
        if self.state != WriterState::Writing {
            return Err(AtomicWriteError::AlreadyClosed { state: self.state });
        }
        self.discard()
            .map_err(|source| AtomicWriteError::Backend {
                operation: "delete temp object",
                key: self.temp_key.to_string(),
                source,
            })
    }

    fn temp_writer_mut(&mut self) -> AtomicWriteResult<&mut Box<dyn ObjectWriter>> {
        if self.state != WriterState::Writing {
            return Err(AtomicWriteError::AlreadyClosed { state: self.state });
        }
        self.temp_writer
            .as_mut()
            .ok_or(AtomicWriteError::AlreadyClosed { state: self.state })
    }

    fn write_error(&self, source: io::Error) -> AtomicWriteError {
        debug!(temp_key = %self.temp_key, error = %source, "staged write failed");
        AtomicWriteError::Write {
            temp_key: self.temp_key.to_string(),
            source,
        }
    }

    fn promote(&mut self) -> AtomicWriteResult<()> {
        let store = self.store.as_ref();
        let temp_key = &self.temp_key;
        let final_key = &self.final_key;
        let mut staged = StagedObject {
            store,
            key: temp_key,
            stray: &mut self.stray_temp,
            armed: true,
        };

        if self.finalize == FinalizeStrategy::Auto && store.supports_rename() {
            store.rename(temp_key, final_key).map_err(|source| {
                AtomicWriteError::finalize(FinalizeStage::Rename, final_key, source)
            })?;
            staged.armed = false;
            debug!(%temp_key, %final_key, "renamed temp object into place");
            return Ok(());
        }

        let mut reader = store.open_reader(temp_key).map_err(|source| {
            AtomicWriteError::finalize(FinalizeStage::OpenTempReader, temp_key, source)
        })?;
        let mut writer = store
            .open_writer(final_key, &WriterOptions::default())
            .map_err(|source| {
                AtomicWriteError::finalize(FinalizeStage::OpenFinalWriter, final_key, source)
            })?;
        let copied = io::copy(&mut reader, &mut writer).map_err(|source| {
            AtomicWriteError::finalize(FinalizeStage::Copy, final_key, source.into())
        })?;
        writer.close().map_err(|source| {
            AtomicWriteError::finalize(FinalizeStage::CloseFinalWriter, final_key, source)
        })?;
        debug!(%temp_key, %final_key, copied, "copied temp object into place");
        Ok(())
    }

    fn discard(&mut self) -> atomicwrite_store::StoreResult<()> {
        self.temp_writer.take();
        self.state = WriterState::Aborted;
        match self.store.delete(&self.temp_key) {
            Err(e) if !e.is_not_found() => Err(e),
            _ => {
                debug!(temp_key = %self.temp_key, "discarded staged object");
                Ok(())
            }
        }
    }
}

impl Write for AtomicWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let result = self.temp_writer_mut()?.write(buf);
        match result {
            Ok(n) => {
                self.bytes_written += n as u64;
                Ok(n)
            }
            Err(source) => Err(self.write_error(source).into()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let result = self.temp_writer_mut()?.flush();
        result.map_err(|source| self.write_error(source).into())
    }
}

impl Drop for AtomicWriter {
    fn drop(&mut self) {
        if self.state != WriterState::Writing {
            return;
        }
        warn!(
            final_key = %self.final_key,
            temp_key = %self.temp_key,
            "atomic writer dropped without close; discarding staged object"
        );
        if let Err(e) = self.discard() {
            warn!(temp_key = %self.temp_key, error = %e, "failed to remove temp object");
        }
    }
}

impl fmt::Debug for AtomicWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicWriter")
            .field("address", &self.store.address().to_string())
            .field("final_key", &self.final_key)
            .field("temp_key", &self.temp_key)
            .field("state", &self.state)
            .field("bytes_written", &self.bytes_written)
            .finish()
    }
}

/// Removes the temp object when dropped, unless disarmed.
struct StagedObject<'a> {
    store: &'a dyn ObjectStore,
    key: &'a ObjectKey,
    stray: &'a mut bool,
    armed: bool,
}

impl Drop for StagedObject<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.store.delete(self.key) {
            Ok(()) => debug!(temp_key = %self.key, "removed temp object"),
            Err(e) if e.is_not_found() => debug!(temp_key = %self.key, "temp object already gone"),
            Err(e) => {
                *self.stray = true;
                warn!(temp_key = %self.key, error = %e, "failed to remove temp object");
            }
        }
    }
}

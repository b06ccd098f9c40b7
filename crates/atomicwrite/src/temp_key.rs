//! Temp-key allocation.
//!
//! A temp key is the final key with `-<n>` inserted before its extension,
//! where `n` is drawn from a [`SuffixSource`]. Allocation claims the first
//! candidate no other object holds, giving up after
//! [`MAX_TEMP_KEY_ATTEMPTS`] collisions.

use atomicwrite_store::{ObjectKey, ObjectStore, ObjectWriter, StoreError, WriterOptions};
use rand::RngCore;
use tracing::debug;

use crate::error::{AtomicWriteError, AtomicWriteResult};

/// Number of candidates tried before allocation fails.
pub const MAX_TEMP_KEY_ATTEMPTS: usize = 15;

/// Source of temp-key suffixes.
pub trait SuffixSource {
    /// Next non-negative suffix.
    fn next_suffix(&mut self) -> u64;
}

impl<R: RngCore> SuffixSource for R {
    fn next_suffix(&mut self) -> u64 {
        // Keep it within i63 so the rendered key never looks negative to
        // tools that parse it back as a signed integer.
        self.next_u64() >> 1
    }
}

/// Derives and claims temp keys for a final key.
pub struct TempKeyAllocator<S> {
    source: S,
}

impl TempKeyAllocator<rand::rngs::ThreadRng> {
    /// Allocator drawing from the thread-local RNG.
    pub fn from_thread_rng() -> Self {
        Self::new(rand::thread_rng())
    }
}

impl<S: SuffixSource> TempKeyAllocator<S> {
    /// Allocator drawing from `source`.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Build one candidate temp key.
    pub fn candidate(&mut self, final_key: &ObjectKey) -> ObjectKey {
        final_key.with_suffix(self.source.next_suffix())
    }

    /// Find a candidate for which `exists` reports `false`.
    ///
    /// Check-only: nothing stops another writer from taking the key before
    /// the caller opens it. Prefer [`allocate`](Self::allocate).
    pub fn probe<F>(&mut self, final_key: &ObjectKey, mut exists: F) -> AtomicWriteResult<ObjectKey>
    where
        F: FnMut(&ObjectKey) -> Result<bool, StoreError>,
    {
        for attempt in 1..=MAX_TEMP_KEY_ATTEMPTS {
            let candidate = self.candidate(final_key);
            let taken = exists(&candidate).map_err(|source| AtomicWriteError::Backend {
                operation: "check existence of",
                key: candidate.to_string(),
                source,
            })?;
            if !taken {
                debug!(%candidate, attempt, "temp key is free");
                return Ok(candidate);
            }
            debug!(%candidate, attempt, "temp key collision");
        }
        Err(AtomicWriteError::Allocation {
            final_key: final_key.to_string(),
            attempts: MAX_TEMP_KEY_ATTEMPTS,
        })
    }

    /// Claim a temp key and open its writer in one step per candidate.
    ///
    /// Uses [`ObjectStore::create_new`], so the claim is exclusive on
    /// backends that implement it atomically.
    pub fn allocate(
        &mut self,
        store: &dyn ObjectStore,
        final_key: &ObjectKey,
        options: &WriterOptions,
    ) -> AtomicWriteResult<(ObjectKey, Box<dyn ObjectWriter>)> {
        for attempt in 1..=MAX_TEMP_KEY_ATTEMPTS {
            let candidate = self.candidate(final_key);
            let claimed = store.create_new(&candidate, options).map_err(|source| {
                AtomicWriteError::Backend {
                    operation: "open temp object",
                    key: candidate.to_string(),
                    source,
                }
            })?;
            match claimed {
                Some(writer) => {
                    debug!(%candidate, attempt, "claimed temp key");
                    return Ok((candidate, writer));
                }
                None => debug!(%candidate, attempt, "temp key collision"),
            }
        }
        Err(AtomicWriteError::Allocation {
            final_key: final_key.to_string(),
            attempts: MAX_TEMP_KEY_ATTEMPTS,
        })
    }
}

impl<S> std::fmt::Debug for TempKeyAllocator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TempKeyAllocator").finish_non_exhaustive()
    }
}

//! Scheme-keyed backend registry.
//!
//! A [`StoreRegistry`] maps a URI scheme to the [`StoreOpener`] that knows how
//! to turn a [`StorageAddress`] of that scheme into an open store. Registries
//! are plain values: build one at startup with the backends this binary
//! carries and pass it to whatever needs to open stores.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::address::{StorageAddress, FILE_SCHEME, MEM_SCHEME};
use crate::error::{StoreError, StoreResult};
use crate::fs::FsObjectStore;
use crate::memory::InMemoryObjectStore;
use crate::traits::ObjectStore;

/// Opens stores for one scheme.
pub trait StoreOpener: Send + Sync {
    /// Open the store rooted at `address`.
    fn open(&self, address: &StorageAddress) -> StoreResult<Arc<dyn ObjectStore>>;
}

impl<F> StoreOpener for F
where
    F: Fn(&StorageAddress) -> StoreResult<Arc<dyn ObjectStore>> + Send + Sync,
{
    fn open(&self, address: &StorageAddress) -> StoreResult<Arc<dyn ObjectStore>> {
        self(address)
    }
}

/// Opens `file://` addresses as [`FsObjectStore`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsOpener;

impl StoreOpener for FsOpener {
    fn open(&self, address: &StorageAddress) -> StoreResult<Arc<dyn ObjectStore>> {
        Ok(Arc::new(FsObjectStore::open_address(address.clone())?))
    }
}

/// Opens `mem://` addresses, handing out the same store for the same
/// address for as long as the opener lives.
#[derive(Default)]
pub struct MemoryOpener {
    stores: Mutex<HashMap<StorageAddress, InMemoryObjectStore>>,
}

impl MemoryOpener {
    /// Create an opener with no stores yet.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreOpener for MemoryOpener {
    fn open(&self, address: &StorageAddress) -> StoreResult<Arc<dyn ObjectStore>> {
        let mut stores = self.stores.lock().expect("lock poisoned");
        let store = stores
            .entry(address.clone())
            .or_insert_with(|| InMemoryObjectStore::at(address.clone()))
            .clone();
        Ok(Arc::new(store))
    }
}

/// Map from scheme to backend opener.
#[derive(Clone, Default)]
pub struct StoreRegistry {
    openers: BTreeMap<String, Arc<dyn StoreOpener>>,
}

impl StoreRegistry {
    /// Create a registry with no backends.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the `file` and `mem` backends.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(FILE_SCHEME, FsOpener);
        registry.register(MEM_SCHEME, MemoryOpener::new());
        registry
    }

    /// Register (or replace) the opener for `scheme`.
    pub fn register(&mut self, scheme: &str, opener: impl StoreOpener + 'static) {
        let scheme = scheme.to_ascii_lowercase();
        debug!(%scheme, "registered storage backend");
        self.openers.insert(scheme, Arc::new(opener));
    }

    /// Whether a backend is registered for `scheme`.
    pub fn supports(&self, scheme: &str) -> bool {
        self.openers.contains_key(&scheme.to_ascii_lowercase())
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        self.openers.keys().map(String::as_str).collect()
    }

    /// Open the store at `address` with the backend for its scheme.
    pub fn open(&self, address: &StorageAddress) -> StoreResult<Arc<dyn ObjectStore>> {
        let opener = self
            .openers
            .get(address.scheme())
            .ok_or_else(|| StoreError::UnsupportedScheme(address.scheme().to_string()))?;
        opener.open(address)
    }
}

impl fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

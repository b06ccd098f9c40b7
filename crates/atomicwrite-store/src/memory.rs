use std::collections::HashMap;
use std::io::{self, Cursor, Write};
use std::sync::{Arc, RwLock};

use crate::address::StorageAddress;
use crate::error::{StoreError, StoreResult};
use crate::key::ObjectKey;
use crate::options::WriterOptions;
use crate::traits::{ObjectReader, ObjectStore, ObjectWriter};

/// One object held by the memory backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryObject {
    /// Object bytes, shared with any open readers.
    pub data: Arc<[u8]>,
    /// Content type recorded by the writer, if any.
    pub content_type: Option<String>,
}

impl MemoryObject {
    fn empty() -> Self {
        Self {
            data: Arc::from(Vec::new()),
            content_type: None,
        }
    }
}

type ObjectMap = HashMap<String, MemoryObject>;

/// In-memory, HashMap-based object store.
///
/// Objects live as long as some clone of the store does. Clones share the
/// same map, so a store handed out by the registry for `mem://scratch`
/// sees every object written through any other handle to it. Readers get a
/// snapshot of the bytes at open time.
#[derive(Clone)]
pub struct InMemoryObjectStore {
    address: StorageAddress,
    objects: Arc<RwLock<ObjectMap>>,
}

impl InMemoryObjectStore {
    /// Create a new empty store at `mem://`.
    pub fn new() -> Self {
        Self::at(StorageAddress::mem(""))
    }

    /// Create a new empty store reporting the given address.
    pub fn at(address: StorageAddress) -> Self {
        Self {
            address,
            objects: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored objects.
    pub fn total_bytes(&self) -> u64 {
        self.objects
            .read()
            .expect("lock poisoned")
            .values()
            .map(|obj| obj.data.len() as u64)
            .sum()
    }

    /// Remove all objects from the store.
    pub fn clear(&self) {
        self.objects.write().expect("lock poisoned").clear();
    }

    /// Return a sorted list of all keys in the store.
    pub fn keys(&self) -> Vec<String> {
        let map = self.objects.read().expect("lock poisoned");
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Fetch a stored object with its attributes.
    pub fn get(&self, key: &ObjectKey) -> Option<MemoryObject> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(key.as_str())
            .cloned()
    }

    fn writer_for(&self, key: &ObjectKey, options: &WriterOptions) -> Box<dyn ObjectWriter> {
        Box::new(MemoryWriter {
            objects: Arc::clone(&self.objects),
            key: key.as_str().to_string(),
            buf: Vec::new(),
            content_type: options.content_type.clone(),
        })
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn address(&self) -> &StorageAddress {
        &self.address
    }

    fn exists(&self, key: &ObjectKey) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(key.as_str()))
    }

    fn open_writer(
        &self,
        key: &ObjectKey,
        options: &WriterOptions,
    ) -> StoreResult<Box<dyn ObjectWriter>> {
        Ok(self.writer_for(key, options))
    }

    fn open_reader(&self, key: &ObjectKey) -> StoreResult<ObjectReader> {
        let map = self.objects.read().expect("lock poisoned");
        let obj = map
            .get(key.as_str())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        Ok(Box::new(Cursor::new(Arc::clone(&obj.data))))
    }

    fn delete(&self, key: &ObjectKey) -> StoreResult<()> {
        let mut map = self.objects.write().expect("lock poisoned");
        match map.remove(key.as_str()) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    fn create_new(
        &self,
        key: &ObjectKey,
        options: &WriterOptions,
    ) -> StoreResult<Option<Box<dyn ObjectWriter>>> {
        let mut map = self.objects.write().expect("lock poisoned");
        if map.contains_key(key.as_str()) {
            return Ok(None);
        }
        // Reserve the key so a concurrent claim sees it taken.
        map.insert(key.as_str().to_string(), MemoryObject::empty());
        drop(map);
        Ok(Some(self.writer_for(key, options)))
    }

    fn supports_rename(&self) -> bool {
        true
    }

    fn rename(&self, from: &ObjectKey, to: &ObjectKey) -> StoreResult<()> {
        let mut map = self.objects.write().expect("lock poisoned");
        let obj = map
            .remove(from.as_str())
            .ok_or_else(|| StoreError::NotFound(from.to_string()))?;
        map.insert(to.as_str().to_string(), obj);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryObjectStore")
            .field("address", &self.address.to_string())
            .field("object_count", &count)
            .finish()
    }
}

/// Buffers bytes and publishes them under one lock on close.
struct MemoryWriter {
    objects: Arc<RwLock<ObjectMap>>,
    key: String,
    buf: Vec<u8>,
    content_type: Option<String>,
}

impl Write for MemoryWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ObjectWriter for MemoryWriter {
    fn close(self: Box<Self>) -> StoreResult<()> {
        let MemoryWriter {
            objects,
            key,
            buf,
            content_type,
        } = *self;
        let obj = MemoryObject {
            data: Arc::from(buf),
            content_type,
        };
        objects.write().expect("lock poisoned").insert(key, obj);
        Ok(())
    }
}

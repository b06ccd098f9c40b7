//! Local filesystem backend.
//!
//! Objects are regular files below a root directory; nested keys map to
//! subdirectories, which are created on write.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::address::{StorageAddress, FILE_SCHEME};
use crate::error::{StoreError, StoreResult};
use crate::key::ObjectKey;
use crate::options::WriterOptions;
use crate::traits::{ObjectReader, ObjectStore, ObjectWriter};

/// Object store rooted at a directory on the local filesystem.
#[derive(Clone, Debug)]
pub struct FsObjectStore {
    address: StorageAddress,
    root: PathBuf,
}

impl FsObjectStore {
    /// Open a store at an existing directory.
    pub fn open(root: &Path) -> StoreResult<Self> {
        Self::open_address(StorageAddress::file(root))
    }

    /// Open a store from a `file://` address.
    pub fn open_address(address: StorageAddress) -> StoreResult<Self> {
        if address.scheme() != FILE_SCHEME {
            return Err(StoreError::UnsupportedScheme(address.scheme().to_string()));
        }
        let root = address.to_path();
        if address.location().is_empty() {
            return Err(StoreError::InvalidRoot {
                address,
                reason: "empty directory path".into(),
            });
        }
        let meta = match fs::metadata(&root) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::InvalidRoot {
                    address,
                    reason: "directory does not exist".into(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        if !meta.is_dir() {
            return Err(StoreError::InvalidRoot {
                address,
                reason: "not a directory".into(),
            });
        }
        debug!(root = %root.display(), "opened filesystem store");
        Ok(Self { address, root })
    }

    /// Filesystem path of an object.
    pub fn path_of(&self, key: &ObjectKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if parent != self.root => fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }

    fn writer_for(file: File, path: PathBuf, options: &WriterOptions) -> Box<dyn ObjectWriter> {
        Box::new(FsWriter {
            inner: BufWriter::with_capacity(options.buffer_size.max(1), file),
            path,
            sync_on_close: options.sync_on_close,
        })
    }
}

impl ObjectStore for FsObjectStore {
    fn address(&self) -> &StorageAddress {
        &self.address
    }

    fn exists(&self, key: &ObjectKey) -> StoreResult<bool> {
        match fs::metadata(self.path_of(key)) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn open_writer(
        &self,
        key: &ObjectKey,
        options: &WriterOptions,
    ) -> StoreResult<Box<dyn ObjectWriter>> {
        let path = self.path_of(key);
        self.ensure_parent(&path)?;
        let file = File::create(&path)?;
        Ok(Self::writer_for(file, path, options))
    }

    fn open_reader(&self, key: &ObjectKey) -> StoreResult<ObjectReader> {
        match File::open(self.path_of(key)) {
            Ok(file) => Ok(Box::new(io::BufReader::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, key: &ObjectKey) -> StoreResult<()> {
        match fs::remove_file(self.path_of(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn create_new(
        &self,
        key: &ObjectKey,
        options: &WriterOptions,
    ) -> StoreResult<Option<Box<dyn ObjectWriter>>> {
        let path = self.path_of(key);
        self.ensure_parent(&path)?;
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => Ok(Some(Self::writer_for(file, path, options))),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn supports_rename(&self) -> bool {
        true
    }

    fn rename(&self, from: &ObjectKey, to: &ObjectKey) -> StoreResult<()> {
        let dest = self.path_of(to);
        self.ensure_parent(&dest)?;
        match fs::rename(self.path_of(from), &dest) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(from.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Buffered file writer; `close` flushes and optionally syncs.
struct FsWriter {
    inner: BufWriter<File>,
    path: PathBuf,
    sync_on_close: bool,
}

impl Write for FsWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl ObjectWriter for FsWriter {
    fn close(self: Box<Self>) -> StoreResult<()> {
        let FsWriter {
            inner,
            path,
            sync_on_close,
        } = *self;
        let file = inner.into_inner().map_err(|e| e.into_error())?;
        if sync_on_close {
            file.sync_all()?;
        }
        debug!(path = %path.display(), synced = sync_on_close, "closed file writer");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    fn key(name: &str) -> ObjectKey {
        ObjectKey::new(name).unwrap()
    }

    fn temp_store() -> (tempfile::TempDir, FsObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn open_missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = FsObjectStore::open(&missing).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRoot { .. }));
    }

    #[test]
    fn open_file_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, b"x").unwrap();
        let err = FsObjectStore::open(&file).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRoot { .. }));
    }

    #[test]
    fn open_rejects_other_scheme() {
        let err = FsObjectStore::open_address(StorageAddress::mem("x")).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedScheme(_)));
    }

    #[test]
    fn write_and_read_back() {
        let (dir, store) = temp_store();
        store.write_object(&key("a.txt"), b"hello world").unwrap();
        assert_eq!(fs::read(dir.path().join("a.txt")).unwrap(), b"hello world");
        assert_eq!(store.read_object(&key("a.txt")).unwrap(), b"hello world");
    }

    #[test]
    fn nested_key_creates_directories() {
        let (dir, store) = temp_store();
        store.write_object(&key("a/b/c.bin"), b"deep").unwrap();
        assert_eq!(fs::read(dir.path().join("a/b/c.bin")).unwrap(), b"deep");
    }

    #[test]
    fn writer_with_sync() {
        let (_dir, store) = temp_store();
        let opts = WriterOptions::default().with_sync_on_close(true).with_buffer_size(4);
        let mut w = store.open_writer(&key("s.txt"), &opts).unwrap();
        w.write_all(b"synced bytes").unwrap();
        w.close().unwrap();
        assert_eq!(store.read_object(&key("s.txt")).unwrap(), b"synced bytes");
    }

    #[test]
    fn exists_and_delete() {
        let (_dir, store) = temp_store();
        assert!(!store.exists(&key("x")).unwrap());
        store.write_object(&key("x"), b"1").unwrap();
        assert!(store.exists(&key("x")).unwrap());
        store.delete(&key("x")).unwrap();
        assert!(!store.exists(&key("x")).unwrap());
        assert!(store.delete(&key("x")).unwrap_err().is_not_found());
    }

    #[test]
    fn directory_is_not_an_object() {
        let (dir, store) = temp_store();
        fs::create_dir(dir.path().join("sub")).unwrap();
        assert!(!store.exists(&key("sub")).unwrap());
    }

    #[test]
    fn read_missing_is_not_found() {
        let (_dir, store) = temp_store();
        let err = store.open_reader(&key("missing")).err().unwrap();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn create_new_is_exclusive() {
        let (_dir, store) = temp_store();
        let opts = WriterOptions::default();
        let mut w = store.create_new(&key("t.txt"), &opts).unwrap().unwrap();
        assert!(store.create_new(&key("t.txt"), &opts).unwrap().is_none());
        w.write_all(b"mine").unwrap();
        w.close().unwrap();
        assert_eq!(store.read_object(&key("t.txt")).unwrap(), b"mine");
    }

    #[test]
    fn rename_replaces_destination() {
        let (_dir, store) = temp_store();
        store.write_object(&key("tmp.txt"), b"new").unwrap();
        store.write_object(&key("final.txt"), b"old contents").unwrap();
        store.rename(&key("tmp.txt"), &key("final.txt")).unwrap();
        assert!(!store.exists(&key("tmp.txt")).unwrap());
        let mut r = store.open_reader(&key("final.txt")).unwrap();
        let mut buf = String::new();
        r.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "new");
    }

    #[test]
    fn rename_missing_source() {
        let (_dir, store) = temp_store();
        let err = store.rename(&key("nope"), &key("final")).unwrap_err();
        assert!(err.is_not_found());
    }
}

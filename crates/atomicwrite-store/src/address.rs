//! Root addresses for object stores.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Scheme of the local filesystem backend.
pub const FILE_SCHEME: &str = "file";

/// Scheme of the in-process memory backend.
pub const MEM_SCHEME: &str = "mem";

/// A scheme-qualified root location, such as a directory or a bucket.
///
/// The scheme selects the backend; the location is interpreted by that
/// backend alone. The address renders as `scheme://location`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StorageAddress {
    scheme: String,
    location: String,
}

impl StorageAddress {
    /// Create an address from a scheme and a backend-specific location.
    ///
    /// The scheme is stored lowercase.
    pub fn new(scheme: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into().to_ascii_lowercase(),
            location: location.into(),
        }
    }

    /// Address of a directory on the local filesystem.
    pub fn file(dir: &Path) -> Self {
        Self::new(FILE_SCHEME, dir.to_string_lossy())
    }

    /// Address of a named in-memory store.
    pub fn mem(name: impl Into<String>) -> Self {
        Self::new(MEM_SCHEME, name)
    }

    /// The scheme, lowercase.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The backend-specific location after `scheme://`.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The location as a filesystem path.
    pub fn to_path(&self) -> PathBuf {
        PathBuf::from(&self.location)
    }
}

impl fmt::Display for StorageAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let addr = StorageAddress::new("file", "/tmp/data");
        assert_eq!(addr.to_string(), "file:///tmp/data");
    }

    #[test]
    fn empty_location() {
        let addr = StorageAddress::mem("");
        assert_eq!(addr.scheme(), "mem");
        assert_eq!(addr.location(), "");
        assert_eq!(addr.to_string(), "mem://");
    }

    #[test]
    fn scheme_is_lowercased() {
        let addr = StorageAddress::new("MEM", "x");
        assert_eq!(addr.scheme(), "mem");
    }

    #[test]
    fn file_address_from_path() {
        let addr = StorageAddress::file(Path::new("/var/lib"));
        assert_eq!(addr.scheme(), FILE_SCHEME);
        assert_eq!(addr.to_path(), PathBuf::from("/var/lib"));
    }

    #[test]
    fn serde_roundtrip() {
        let addr = StorageAddress::mem("scratch");
        let json = serde_json::to_string(&addr).unwrap();
        let back: StorageAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);
    }
}

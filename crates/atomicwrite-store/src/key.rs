//! Object key validation and temp-key naming helpers.
//!
//! Valid keys:
//! - Must be non-empty
//! - Must not start with `/`
//! - Must not contain NUL or other control characters
//! - Components between slashes must be non-empty and not `.` or `..`

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// A relative object name within a [`StorageAddress`](crate::StorageAddress).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Validate and wrap a key.
    ///
    /// # Examples
    ///
    /// ```
    /// use atomicwrite_store::ObjectKey;
    ///
    /// assert!(ObjectKey::new("report.csv").is_ok());
    /// assert!(ObjectKey::new("nested/report.csv").is_ok());
    /// assert!(ObjectKey::new("").is_err());
    /// assert!(ObjectKey::new("../escape").is_err());
    /// ```
    pub fn new(key: impl Into<String>) -> StoreResult<Self> {
        let key = key.into();
        validate_key(&key)?;
        Ok(Self(key))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last `/`-separated component.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The extension of the last component, including the leading dot.
    ///
    /// Empty if the name has no dot. A leading-dot name such as `.env` is
    /// all extension.
    pub fn extension(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(idx) => &name[idx..],
            None => "",
        }
    }

    /// A sibling key with `-{suffix}` inserted immediately before the
    /// extension.
    ///
    /// ```
    /// use atomicwrite_store::ObjectKey;
    ///
    /// let key = ObjectKey::new("out/data.tar.gz").unwrap();
    /// assert_eq!(key.with_suffix(7).as_str(), "out/data.tar-7.gz");
    /// ```
    pub fn with_suffix(&self, suffix: u64) -> Self {
        let ext = self.extension();
        let stem = &self.0[..self.0.len() - ext.len()];
        Self(format!("{stem}-{suffix}{ext}"))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ObjectKey {
    type Error = StoreError;

    fn try_from(key: String) -> StoreResult<Self> {
        Self::new(key)
    }
}

impl TryFrom<&str> for ObjectKey {
    type Error = StoreError;

    fn try_from(key: &str) -> StoreResult<Self> {
        Self::new(key)
    }
}

impl From<ObjectKey> for String {
    fn from(key: ObjectKey) -> Self {
        key.0
    }
}

fn validate_key(key: &str) -> StoreResult<()> {
    let invalid = |reason: &str| StoreError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    if key.is_empty() {
        return Err(invalid("key must not be empty"));
    }
    if key.starts_with('/') {
        return Err(invalid("key must be relative"));
    }
    if key.chars().any(|c| c.is_control()) {
        return Err(invalid("key must not contain control characters"));
    }
    for component in key.split('/') {
        match component {
            "" => return Err(invalid("path components must not be empty")),
            "." | ".." => return Err(invalid("must not contain '.' or '..' components")),
            _ => {}
        }
    }
    Ok(())
}

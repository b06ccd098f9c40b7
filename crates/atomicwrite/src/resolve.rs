//! Address resolution: split a caller-supplied address into the root the
//! backend is opened at and the key of the object inside it.
//!
//! Two forms are accepted:
//!
//! - A bare filesystem path, absolute or relative to the working directory.
//!   Its parent directory becomes a `file://` root and its base name the key.
//! - A scheme-qualified URI such as `file:///tmp/out.txt` or
//!   `mem://scratch/out.txt`. The last path segment becomes the key and
//!   everything before it stays scheme-qualified as the root.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use atomicwrite_store::address::FILE_SCHEME;
use atomicwrite_store::{ObjectKey, StorageAddress};
use serde::Serialize;
use url::Url;

use crate::error::{AtomicWriteError, AtomicWriteResult};

/// A resolved address: backend root plus final object key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedUri {
    /// Root the backend is opened at.
    pub address: StorageAddress,
    /// Object key within the root.
    pub key: ObjectKey,
}

impl fmt::Display for ResolvedUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let root = self.address.to_string();
        if root.ends_with('/') {
            write!(f, "{root}{}", self.key)
        } else {
            write!(f, "{root}/{}", self.key)
        }
    }
}

/// Resolve `input` into a root address and object key.
///
/// # Examples
///
/// ```
/// use atomicwrite::resolve;
///
/// let r = resolve("mem://scratch/report.csv").unwrap();
/// assert_eq!(r.address.to_string(), "mem://scratch");
/// assert_eq!(r.key.as_str(), "report.csv");
///
/// let r = resolve("/var/tmp/report.csv").unwrap();
/// assert_eq!(r.address.to_string(), "file:///var/tmp");
///
/// assert!(resolve("").is_err());
/// ```
pub fn resolve(input: &str) -> AtomicWriteResult<ResolvedUri> {
    if input.is_empty() {
        return Err(AtomicWriteError::parse(input, "address is empty"));
    }
    if input.chars().any(char::is_control) {
        return Err(AtomicWriteError::parse(input, "address contains control characters"));
    }
    if input.trim() != input {
        return Err(AtomicWriteError::parse(input, "address has leading or trailing whitespace"));
    }

    match Url::parse(input) {
        Ok(url) if url.scheme() == FILE_SCHEME => resolve_file_url(input, &url),
        Ok(url) => resolve_uri(input, url.scheme()),
        Err(url::ParseError::RelativeUrlWithoutBase) => resolve_path(input),
        Err(e) => Err(AtomicWriteError::parse(input, e.to_string())),
    }
}

fn resolve_path(input: &str) -> AtomicWriteResult<ResolvedUri> {
    let path = Path::new(input);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = std::env::current_dir().map_err(|e| {
            AtomicWriteError::parse(input, format!("cannot resolve relative path: {e}"))
        })?;
        cwd.join(path)
    };
    split_path(input, &normalize(&absolute))
}

fn resolve_file_url(input: &str, url: &Url) -> AtomicWriteResult<ResolvedUri> {
    if url.query().is_some() || url.fragment().is_some() {
        return Err(AtomicWriteError::parse(input, "query strings and fragments are not supported"));
    }
    let path = url
        .to_file_path()
        .map_err(|()| AtomicWriteError::parse(input, "not a local file path"))?;
    split_path(input, &normalize(&path))
}

fn resolve_uri(input: &str, scheme: &str) -> AtomicWriteResult<ResolvedUri> {
    // `Url` lowercases the scheme; slice by length to keep the original text.
    let rest = &input[scheme.len() + 1..];
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    if rest.contains(['?', '#']) {
        return Err(AtomicWriteError::parse(input, "query strings and fragments are not supported"));
    }

    let (location, name) = match rest.rfind('/') {
        Some(0) => ("/", &rest[1..]),
        Some(idx) => (&rest[..idx], &rest[idx + 1..]),
        None => ("", rest),
    };
    if name.is_empty() {
        return Err(AtomicWriteError::parse(input, "address has no object name"));
    }
    let key = ObjectKey::new(name).map_err(|e| AtomicWriteError::parse(input, e.to_string()))?;

    Ok(ResolvedUri {
        address: StorageAddress::new(scheme, location),
        key,
    })
}

fn split_path(input: &str, path: &Path) -> AtomicWriteResult<ResolvedUri> {
    let name = path
        .file_name()
        .ok_or_else(|| AtomicWriteError::parse(input, "path has no file name"))?
        .to_str()
        .ok_or_else(|| AtomicWriteError::parse(input, "file name is not valid UTF-8"))?;
    let parent = path
        .parent()
        .ok_or_else(|| AtomicWriteError::parse(input, "path has no parent directory"))?;
    if parent.to_str().is_none() {
        return Err(AtomicWriteError::parse(input, "directory is not valid UTF-8"));
    }
    let key = ObjectKey::new(name).map_err(|e| AtomicWriteError::parse(input, e.to_string()))?;

    Ok(ResolvedUri {
        address: StorageAddress::file(parent),
        key,
    })
}

/// Lexically normalize an absolute path: drop `.`, resolve `..`.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_parse_err(input: &str) {
        match resolve(input) {
            Err(AtomicWriteError::Parse { .. }) => {}
            other => panic!("expected parse error for {input:?}, got {other:?}"),
        }
    }

    #[test]
    fn padded_addresses_are_rejected() {
        assert_parse_err(" mem://x.txt");
        assert_parse_err("mem://x.txt ");
        assert_parse_err(" file:///tmp/x.txt");
        assert_parse_err("/tmp/x.txt ");
    }

    // -----------------------------------------------------------------------
    // Bare paths
    // -----------------------------------------------------------------------

    #[test]
    fn absolute_path() {
        let r = resolve("/tmp/atomicwrite.txt").unwrap();
        assert_eq!(r.address, StorageAddress::new("file", "/tmp"));
        assert_eq!(r.key.as_str(), "atomicwrite.txt");
    }

    #[test]
    fn relative_path_uses_working_directory() {
        let cwd = std::env::current_dir().unwrap();
        let r = resolve("out/data.bin").unwrap();
        assert_eq!(r.address, StorageAddress::file(&cwd.join("out")));
        assert_eq!(r.key.as_str(), "data.bin");
    }

    #[test]
    fn path_is_normalized() {
        let r = resolve("/tmp/./a/../b/c.txt").unwrap();
        assert_eq!(r.address.location(), "/tmp/b");
        assert_eq!(r.key.as_str(), "c.txt");
    }

    #[test]
    fn parent_above_root_stays_at_root() {
        let r = resolve("/../x.txt").unwrap();
        assert_eq!(r.address.location(), "/");
        assert_eq!(r.key.as_str(), "x.txt");
    }

    #[test]
    fn path_with_spaces() {
        let r = resolve("/tmp/my file.txt").unwrap();
        assert_eq!(r.key.as_str(), "my file.txt");
    }

    #[test]
    fn root_path_has_no_name() {
        assert_parse_err("/");
        assert_parse_err("/..");
    }

    // -----------------------------------------------------------------------
    // file:// URIs
    // -----------------------------------------------------------------------

    #[test]
    fn file_uri_matches_bare_path() {
        let from_uri = resolve("file:///tmp/atomicwrite.txt").unwrap();
        let from_path = resolve("/tmp/atomicwrite.txt").unwrap();
        assert_eq!(from_uri, from_path);
    }

    #[test]
    fn file_uri_is_percent_decoded() {
        let r = resolve("file:///tmp/my%20file.txt").unwrap();
        assert_eq!(r.key.as_str(), "my file.txt");
    }

    #[test]
    fn file_uri_with_remote_host_fails() {
        assert_parse_err("file://somehost/tmp/x.txt");
    }

    #[test]
    fn file_uri_with_query_fails() {
        assert_parse_err("file:///tmp/x.txt?mode=1");
    }

    // -----------------------------------------------------------------------
    // Other schemes
    // -----------------------------------------------------------------------

    #[test]
    fn mem_uri_without_bucket() {
        let r = resolve("mem://atomicwrite.txt").unwrap();
        assert_eq!(r.address, StorageAddress::mem(""));
        assert_eq!(r.key.as_str(), "atomicwrite.txt");
        assert_eq!(r.to_string(), "mem://atomicwrite.txt");
    }

    #[test]
    fn mem_uri_with_bucket_and_prefix() {
        let r = resolve("mem://bucket/dir/a.txt").unwrap();
        assert_eq!(r.address, StorageAddress::mem("bucket/dir"));
        assert_eq!(r.key.as_str(), "a.txt");
        assert_eq!(r.to_string(), "mem://bucket/dir/a.txt");
    }

    #[test]
    fn scheme_case_is_normalized() {
        let r = resolve("MEM://x.txt").unwrap();
        assert_eq!(r.address.scheme(), "mem");
    }

    #[test]
    fn unregistered_scheme_still_resolves() {
        let r = resolve("s3://bucket/key.json").unwrap();
        assert_eq!(r.address.to_string(), "s3://bucket");
        assert_eq!(r.key.as_str(), "key.json");
    }

    #[test]
    fn uri_without_object_name_fails() {
        assert_parse_err("mem://");
        assert_parse_err("mem://bucket/");
        assert_parse_err("mem://bucket/..");
    }

    // -----------------------------------------------------------------------
    // Malformed input
    // -----------------------------------------------------------------------

    #[test]
    fn empty_input_fails() {
        assert_parse_err("");
    }

    #[test]
    fn control_characters_fail() {
        assert_parse_err("\u{7f}");
        assert_parse_err("/tmp/a\0b.txt");
        assert_parse_err("mem://a\nb");
    }

    #[test]
    fn malformed_uri_fails() {
        assert_parse_err("http://[::1/x.txt");
    }
}

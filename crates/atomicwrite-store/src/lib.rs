//! Scheme-addressed object storage for atomicwrite.
//!
//! This crate defines the minimal capability an `AtomicWriter` needs from a
//! storage backend and ships the two backends every build carries. Objects are
//! plain byte strings named by a relative [`ObjectKey`] inside a root
//! [`StorageAddress`] such as `file:///var/data` or `mem://scratch`.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`FsObjectStore`] -- a directory on the local filesystem (`file://`)
//! - [`InMemoryObjectStore`] -- `HashMap`-based store living for the process (`mem://`)
//!
//! Backends are looked up by scheme through a [`StoreRegistry`].
//!
//! # Design Rules
//!
//! 1. Absence is not an error for `exists`; it is for `open_reader`.
//! 2. A writer publishes nothing a reader can rely on until `close` returns.
//! 3. `create_new` is the allocation primitive: it claims a key or reports
//!    that someone else holds it.
//! 4. Backends that can replace an object in one step advertise `rename`.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod address;
pub mod error;
pub mod fs;
pub mod key;
pub mod memory;
pub mod options;
pub mod registry;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use address::StorageAddress;
pub use error::{StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use key::ObjectKey;
pub use memory::InMemoryObjectStore;
pub use options::WriterOptions;
pub use registry::{StoreOpener, StoreRegistry};
pub use traits::{ObjectReader, ObjectStore, ObjectWriter};

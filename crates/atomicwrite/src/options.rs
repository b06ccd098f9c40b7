use atomicwrite_store::WriterOptions;
use serde::{Deserialize, Serialize};

/// How the staged object is promoted to its final key on close.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizeStrategy {
    /// Rename into place when the backend supports it, otherwise copy.
    #[default]
    Auto,
    /// Always stream-copy temp to final, then delete temp.
    Copy,
}

/// Options for an [`AtomicWriter`](crate::AtomicWriter).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtomicWriteOptions {
    /// Backend options for the temp writer. The final writer of a copy
    /// always uses defaults.
    pub writer: WriterOptions,
    /// Promotion strategy.
    pub finalize: FinalizeStrategy,
}

impl AtomicWriteOptions {
    /// Sets the temp writer options.
    pub fn with_writer(mut self, writer: WriterOptions) -> Self {
        self.writer = writer;
        self
    }

    /// Sets the promotion strategy.
    pub fn with_finalize(mut self, finalize: FinalizeStrategy) -> Self {
        self.finalize = finalize;
        self
    }
}

use serde::{Deserialize, Serialize};

/// Default write buffer size (64 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Backend options for opening a writer.
///
/// Each backend honours the fields that make sense for it and ignores the
/// rest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    /// Capacity of the write buffer in front of the backend.
    pub buffer_size: usize,
    /// `fsync` the object when the writer is closed (filesystem only).
    pub sync_on_close: bool,
    /// MIME type recorded with the object (memory only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            sync_on_close: false,
            content_type: None,
        }
    }
}

impl WriterOptions {
    /// Sets the write buffer capacity.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Requests an `fsync` on close.
    pub fn with_sync_on_close(mut self, sync: bool) -> Self {
        self.sync_on_close = sync;
        self
    }

    /// Sets the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

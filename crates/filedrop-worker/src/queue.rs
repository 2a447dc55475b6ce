//! In-memory queue of uploads waiting to be persisted.

use std::collections::VecDeque;
use std::sync::Mutex;

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// An upload received by a request handler and not yet written to storage.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    /// Client-supplied file name. Untrusted.
    pub filename: String,
    /// Client-declared MIME type.
    pub content_type: Option<String>,
    /// Client-declared size in bytes.
    pub declared_size: u64,
    /// Full file contents.
    pub payload: Bytes,
    /// When the handler enqueued the upload.
    pub received_at: DateTime<Utc>,
}

impl PendingUpload {
    /// Create a pending upload stamped with the current time.
    pub fn new(
        filename: impl Into<String>,
        content_type: Option<String>,
        declared_size: u64,
        payload: Bytes,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            declared_size,
            payload,
            received_at: Utc::now(),
        }
    }
}

/// Unbounded FIFO shared between upload handlers and the drain job.
///
/// Neither operation waits on anything but the internal lock, which is
/// held only for a push or a swap.
#[derive(Debug, Default)]
pub struct UploadQueue {
    items: Mutex<VecDeque<PendingUpload>>,
}

impl UploadQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an upload to the tail of the queue.
    pub fn enqueue(&self, upload: PendingUpload) {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.push_back(upload);
        tracing::trace!(queued = items.len(), "Upload enqueued");
    }

    /// Remove and return everything currently queued, oldest first.
    pub fn drain(&self) -> Vec<PendingUpload> {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        Vec::from(std::mem::take(&mut *items))
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }

    /// Number of queued uploads.
    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

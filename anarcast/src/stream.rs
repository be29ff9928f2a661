//! Per-mountpoint stream state: a rolling window of finished HLS segments
//! shared between the writing worker and concurrent HTTP readers.

use std::collections::VecDeque;

use bytes::Bytes;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

/// Segments retained per stream.
const CHUNK_WINDOW: usize = 10;

/// A stream becomes serviceable once it can fill a three-entry chunklist.
const CHUNKLIST_LEN: usize = 3;

/// Advertised bandwidth, fixed for compatibility with the reference
/// playlist regardless of the actual bitrate.
const BANDWIDTH: u32 = 52850;

/// One finished HLS segment: a run of whole 188-byte TS packets.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: u64,
    pub duration_nanos: u64,
    pub data: Bytes,
}

/// Chunk window plus lifecycle signal. The worker is the only writer; HTTP
/// handlers read through the same lock, so they always observe a
/// consistent window.
pub struct Stream {
    chunks: RwLock<VecDeque<Chunk>>,
    done: CancellationToken,
}

impl Stream {
    #[must_use]
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(VecDeque::with_capacity(CHUNK_WINDOW + 1)),
            done: CancellationToken::new(),
        }
    }

    pub fn bandwidth(&self) -> u32 {
        BANDWIDTH
    }

    /// Appends a finished segment and evicts from the front once the
    /// window is full.
    pub fn push_chunk(&self, chunk: Chunk) {
        let mut chunks = self.chunks.write();
        chunks.push_back(chunk);
        while chunks.len() > CHUNK_WINDOW {
            chunks.pop_front();
        }
    }

    /// Drops every buffered segment; readers immediately see the stream as
    /// not serviceable.
    pub fn clear(&self) {
        self.chunks.write().clear();
    }

    /// Segment bytes by index, if still in the window.
    pub fn chunk(&self, index: u64) -> Option<Bytes> {
        self.chunks
            .read()
            .iter()
            .find(|c| c.index == index)
            .map(|c| c.data.clone())
    }

    /// True once enough segments are buffered to serve clients.
    pub fn ok(&self) -> bool {
        self.chunks.read().len() > CHUNKLIST_LEN - 1
    }

    /// The newest chunklist entries as `(index, duration_nanos)` pairs;
    /// empty until the stream is serviceable.
    pub fn index(&self) -> Vec<(u64, u64)> {
        let chunks = self.chunks.read();
        if chunks.len() < CHUNKLIST_LEN {
            return Vec::new();
        }
        chunks
            .iter()
            .skip(chunks.len() - CHUNKLIST_LEN)
            .map(|c| (c.index, c.duration_nanos))
            .collect()
    }

    pub fn mark_done(&self) {
        self.done.cancel();
    }

    pub fn is_done(&self) -> bool {
        self.done.is_cancelled()
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::new()
    }
}

//! Per-mountpoint stream worker.
//!
//! Connects to the origin, splits the body into ADTS frames (a reader
//! sub-task feeding a depth-1 pipe, so a slow packetizer stalls the
//! upstream read), packetizes them into transport-stream packets, and
//! folds those into the stream's rolling chunk window. Any failure ends
//! the worker; after a fixed backoff the done signal fires and the
//! supervisor starts a replacement.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anarcast_media::{AdtsSync, Frame, IcyDemuxer, PacketOrBoundary, Packetizer, PacketizeError};
use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::stream::{Chunk, Stream};
use crate::upstream::{self, UpstreamError};

/// Delay before a failed stream may be restarted.
const RETRY_BACKOFF: Duration = Duration::from_secs(20);

/// Target segment length in seconds of audio.
const SEGMENT_INTERVAL_SECS: u64 = 10;

/// Added to the wall-clock starting PTS to keep the 90 kHz clock away from
/// wrap edge cases near zero.
const PTS_OFFSET: Duration = Duration::from_secs(3120);

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Packetize(#[from] PacketizeError),
}

pub struct StreamWorker {
    mount: String,
    base: String,
    client: reqwest::Client,
    stream: Arc<Stream>,
}

impl StreamWorker {
    /// Starts a worker task for `mount` and returns its stream handle. The
    /// stream's done signal fires once the worker has ended and sat out
    /// its backoff.
    pub fn spawn(mount: String, base: String, client: reqwest::Client) -> Arc<Stream> {
        let stream = Arc::new(Stream::new());
        let worker = Self {
            mount: mount.clone(),
            base,
            client,
            stream: Arc::clone(&stream),
        };

        let handle = Arc::clone(&stream);
        tokio::spawn(async move {
            match worker.run().await {
                Ok(()) => info!(mount = %mount, "upstream ended"),
                Err(e) => warn!(mount = %mount, error = %e, "stream worker failed"),
            }
            tokio::time::sleep(RETRY_BACKOFF).await;
            handle.mark_done();
        });

        stream
    }

    async fn run(self) -> Result<(), WorkerError> {
        let upstream = upstream::connect(&self.client, &self.base, &self.mount).await?;
        info!(
            mount = %self.mount,
            metaint = upstream.metaint,
            headers = ?upstream.headers,
            "connected to origin"
        );

        let (tx, mut rx) = mpsc::channel::<Bytes>(1);
        tokio::spawn(read_frames(
            upstream.response,
            upstream.metaint,
            tx,
            self.mount.clone(),
        ));

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let start = now.as_nanos() as u64 + PTS_OFFSET.as_nanos() as u64;
        let mut packetizer = Packetizer::new(start, SEGMENT_INTERVAL_SECS, true);
        let mut segmenter = Segmenter::new(
            self.mount.clone(),
            Arc::clone(&self.stream),
            now.as_secs() / 10,
        );

        while let Some(frame) = rx.recv().await {
            let items = match packetizer.packetize(Frame::new(&frame)) {
                Ok(items) => items,
                Err(e) => {
                    self.stream.clear();
                    return Err(e.into());
                }
            };
            for item in items {
                segmenter.apply(item);
            }
        }

        Ok(())
    }
}

/// Reads the origin body, strips ICY metadata, and pushes whole ADTS
/// frames into the pipe. Ends on EOF, on a read error, or as soon as the
/// synchronizer reports bytes it could not frame.
async fn read_frames(
    mut response: reqwest::Response,
    metaint: usize,
    tx: mpsc::Sender<Bytes>,
    mount: String,
) {
    let mut demux = IcyDemuxer::new(metaint);
    let mut sync = AdtsSync::new();
    let mut in_sync = true;

    loop {
        let chunk = match response.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => return,
            Err(e) => {
                warn!(mount = %mount, error = %e, "upstream read failed");
                return;
            }
        };

        let mut frames: Vec<Bytes> = Vec::new();
        demux.feed(&chunk, &mut |bytes, is_metadata| {
            if is_metadata {
                if !bytes.is_empty() {
                    debug!(mount = %mount, metadata = %String::from_utf8_lossy(bytes), "icy metadata");
                }
            } else if in_sync {
                sync.feed(bytes, &mut |frame, ok| {
                    if !ok {
                        in_sync = false;
                        return false;
                    }
                    frames.push(Bytes::copy_from_slice(frame));
                    true
                });
            }
        });

        for frame in frames {
            if tx.send(frame).await.is_err() {
                return;
            }
        }

        if !in_sync {
            warn!(mount = %mount, "lost adts sync");
            return;
        }
    }
}

/// Folds packetizer output into chunks: wire packets accumulate, a
/// boundary seals the accumulated bytes into the stream's window.
struct Segmenter {
    mount: String,
    stream: Arc<Stream>,
    index: u64,
    data: BytesMut,
}

impl Segmenter {
    fn new(mount: String, stream: Arc<Stream>, index: u64) -> Self {
        Self {
            mount,
            stream,
            index,
            data: BytesMut::with_capacity(100_000),
        }
    }

    fn apply(&mut self, item: PacketOrBoundary) {
        match item {
            PacketOrBoundary::Packet(packet) => {
                self.data.extend_from_slice(packet.as_bytes());
            }
            PacketOrBoundary::Boundary {
                timestamp_nanos,
                duration_nanos,
            } => {
                if self.data.is_empty() {
                    return;
                }
                let data = self.data.split().freeze();
                debug!(
                    mount = %self.mount,
                    index = self.index,
                    bytes = data.len(),
                    duration_ms = duration_nanos / 1_000_000,
                    pts_secs = timestamp_nanos / 1_000_000_000,
                    "segment complete"
                );
                self.stream.push_chunk(Chunk {
                    index: self.index,
                    duration_nanos,
                    data,
                });
                self.index += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adts_frame(payload_len: usize) -> Vec<u8> {
        let len = 7 + payload_len;
        let mut f = vec![0xff, 0xf1, 0x4c]; // 48 kHz
        f.push(0x80 | ((len >> 11) & 0x03) as u8);
        f.push(((len >> 3) & 0xff) as u8);
        f.push((((len & 0x07) << 5) as u8) | 0x1f);
        f.push(0xfc);
        f.extend(std::iter::repeat(0x42u8).take(payload_len));
        f
    }

    #[test]
    fn boundary_seals_a_chunk() {
        let stream = Arc::new(Stream::new());
        let mut segmenter = Segmenter::new("test".into(), Arc::clone(&stream), 7);

        let packet = anarcast_media::mpegts::transport_stream_packet(
            true,
            false,
            257,
            0,
            None,
            &[0u8; 184],
        );
        segmenter.apply(PacketOrBoundary::Packet(packet.clone()));
        segmenter.apply(PacketOrBoundary::Packet(packet));
        segmenter.apply(PacketOrBoundary::Boundary {
            timestamp_nanos: 0,
            duration_nanos: 2_000_000_000,
        });

        let data = stream.chunk(7).expect("chunk 7 buffered");
        assert_eq!(data.len(), 2 * 188);
        assert_eq!(segmenter.index, 8);
        assert!(segmenter.data.is_empty());
    }

    #[test]
    fn empty_segment_is_skipped() {
        let stream = Arc::new(Stream::new());
        let mut segmenter = Segmenter::new("test".into(), Arc::clone(&stream), 0);

        segmenter.apply(PacketOrBoundary::Boundary {
            timestamp_nanos: 0,
            duration_nanos: 1,
        });

        assert!(stream.chunk(0).is_none());
        assert_eq!(segmenter.index, 0);
    }

    // Frames through the packetizer and segmenter end-to-end: chunks are
    // whole runs of 188-byte packets, the first starting with PAT.
    #[test]
    fn segments_are_whole_ts_packet_runs() {
        let stream = Arc::new(Stream::new());
        let mut segmenter = Segmenter::new("test".into(), Arc::clone(&stream), 100);
        let mut packetizer = Packetizer::new(3_120_000_000_000, 1, true);

        // ~47 frames per second at 48 kHz; several seconds' worth crosses
        // multiple one-second segment boundaries.
        for _ in 0..200 {
            let frame = adts_frame(100);
            for item in packetizer.packetize(Frame::new(&frame)).unwrap() {
                segmenter.apply(item);
            }
        }

        let window = stream.index();
        assert!(stream.ok());
        assert_eq!(window.len(), 3);
        assert!(window.windows(2).all(|w| w[1].0 == w[0].0 + 1));

        let first = stream.chunk(window[0].0).unwrap();
        assert_eq!(first.len() % 188, 0);
        assert_eq!(first[0], 0x47);
        assert!(first[1] & 0x40 != 0); // payload unit start on the PAT
        // Segment duration covers the frames it holds.
        let frame_nanos = 21_333_333u64;
        assert_eq!(window[0].1 % frame_nanos, 0);
    }
}

//! Registry and supervisor for the configured mountpoints.
//!
//! A one-second tick keeps the registry converged: every configured mount
//! gets a worker, and workers whose done signal has fired (upstream ended
//! or failed, backoff elapsed) are reaped so the next tick starts fresh.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::stream::Stream;
use crate::worker::StreamWorker;

const SUPERVISOR_TICK: Duration = Duration::from_secs(1);

pub struct Directory {
    streams: DashMap<String, Arc<Stream>>,
    base: String,
    mounts: Vec<String>,
    client: reqwest::Client,
}

impl Directory {
    #[must_use]
    pub fn new(base: String, mounts: Vec<String>, client: reqwest::Client) -> Arc<Self> {
        Arc::new(Self {
            streams: DashMap::new(),
            base,
            mounts,
            client,
        })
    }

    /// Spawns the supervisor task; it runs until `shutdown` fires.
    pub fn start(self: &Arc<Self>, shutdown: CancellationToken) {
        let directory = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(SUPERVISOR_TICK);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    _ = tick.tick() => directory.tick(),
                }
            }
        });
    }

    fn tick(&self) {
        for mount in &self.mounts {
            if !self.streams.contains_key(mount) {
                info!(mount = %mount, "starting stream worker");
                let stream =
                    StreamWorker::spawn(mount.clone(), self.base.clone(), self.client.clone());
                self.streams.insert(mount.clone(), stream);
            }
        }

        self.streams.retain(|mount, stream| {
            if stream.is_done() {
                info!(mount = %mount, "reaping finished stream");
                false
            } else {
                true
            }
        });
    }

    pub fn find(&self, mount: &str) -> Option<Arc<Stream>> {
        self.streams.get(mount).map(|entry| entry.value().clone())
    }

    /// Names of the streams currently serviceable.
    pub fn list(&self) -> Vec<String> {
        self.streams
            .iter()
            .filter(|entry| entry.value().ok())
            .map(|entry| entry.key().clone())
            .collect()
    }
}

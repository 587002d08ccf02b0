// Stream module - dedicated analysis thread for live frame sources
//
// Frame producers (audio callbacks, render loops) must never block, so they
// hand frames over through a lock-free SPSC ring buffer. A dedicated worker
// thread pops frames, ticks the tracker, and broadcasts each snapshot to
// any number of subscribers. Each stream owns its own tracker and history
// set; nothing is shared across streams except the read-only configuration.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rtrb::{Consumer, PopError};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::analysis::{BandTracker, DetectionResult, SpectralFrame};
use crate::config::DetectorConfig;

/// Broadcast buffer size for detection snapshots
const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

/// Idle back-off while the ring buffer is empty
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// One tick's full detection output, as broadcast to subscribers
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DetectionSnapshot {
    /// Tick number since the stream started
    pub tick: u64,
    /// Band name -> result, including composites
    pub results: BTreeMap<String, DetectionResult>,
}

/// Handle to a running stream detector
///
/// Dropping the handle (or calling [`stop`](Self::stop)) shuts the worker
/// down between ticks; in-flight ticks are short and synchronous, so no
/// cooperative cancellation is needed.
pub struct StreamDetector {
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    snapshot_tx: broadcast::Sender<DetectionSnapshot>,
}

impl StreamDetector {
    /// Spawn a worker thread consuming frames from `frames`
    ///
    /// # Arguments
    /// * `config` - Shared read-only band registry
    /// * `sample_rate` - Sample rate of the frame source in Hz
    /// * `buffer_length` - Number of magnitude bins per frame
    /// * `frames` - Consumer side of the producer's ring buffer
    pub fn spawn(
        config: Arc<DetectorConfig>,
        sample_rate: u32,
        buffer_length: usize,
        frames: Consumer<SpectralFrame>,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let (snapshot_tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);

        let worker_shutdown = Arc::clone(&shutdown);
        let worker_tx = snapshot_tx.clone();
        let worker = thread::Builder::new()
            .name("band-stream".to_string())
            .spawn(move || {
                run_worker(config, sample_rate, buffer_length, frames, worker_shutdown, worker_tx);
            })
            .expect("failed to spawn band-stream worker thread");

        Self {
            shutdown,
            worker: Some(worker),
            snapshot_tx,
        }
    }

    /// Subscribe to detection snapshots
    ///
    /// Slow subscribers that fall more than the channel capacity behind
    /// observe a lagged error and resume from the oldest retained snapshot.
    pub fn subscribe(&self) -> broadcast::Receiver<DetectionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Subscribe as an async `Stream` of snapshots
    pub fn snapshot_stream(&self) -> BroadcastStream<DetectionSnapshot> {
        BroadcastStream::new(self.subscribe())
    }

    /// Stop the worker and join it
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("[Stream] Worker thread panicked during shutdown");
            }
        }
    }
}

impl Drop for StreamDetector {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

fn run_worker(
    config: Arc<DetectorConfig>,
    sample_rate: u32,
    buffer_length: usize,
    mut frames: Consumer<SpectralFrame>,
    shutdown: Arc<AtomicBool>,
    snapshot_tx: broadcast::Sender<DetectionSnapshot>,
) {
    let mut tracker = BandTracker::new(config, sample_rate, buffer_length);
    tracing::info!(
        "[Stream] Worker started: {} bands, {} Hz, {} bins",
        tracker.config().bands.len(),
        sample_rate,
        buffer_length
    );

    while !shutdown.load(Ordering::Acquire) {
        match frames.pop() {
            Ok(frame) => match tracker.tick(&frame) {
                Ok(results) => {
                    // Send fails only when no subscriber is connected
                    let _ = snapshot_tx.send(DetectionSnapshot {
                        tick: tracker.ticks(),
                        results,
                    });
                }
                Err(err) => {
                    tracing::warn!("[Stream] Tick skipped: {}", err);
                }
            },
            Err(PopError::Empty) => {
                thread::sleep(IDLE_SLEEP);
            }
        }
    }

    tracing::info!("[Stream] Worker stopped after {} ticks", tracker.ticks());
}

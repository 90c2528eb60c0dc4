//! Batch playback shared by every sample source.
//!
//! A playback owns a prepared, time-ordered sample sequence and hands it to a
//! callback batch by batch from a background thread, optionally paced by the
//! sample timestamps and optionally re-delivering batches to exercise
//! duplicate suppression downstream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{Sample, SampleBatch, SampleBatchCallback, SampleSource};
use metrics::counter;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

/// How fast batches are released
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Pacing {
    /// As fast as the consumer takes them
    #[default]
    Unpaced,
    /// Follow sample timestamps, scaled by `speed` (1.0 = real time)
    Realtime { speed: f64 },
}

/// Delivery options common to all sources
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackConfig {
    /// Samples per batch
    pub batch_size: usize,
    pub pacing: Pacing,
    /// Re-send every n-th batch once more right after it
    pub duplicate_every: Option<usize>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            pacing: Pacing::Unpaced,
            duplicate_every: None,
        }
    }
}

/// Background delivery state for one source
#[derive(Debug)]
pub(crate) struct Playback {
    source_id: String,
    session_id: String,
    samples: Arc<Vec<Sample>>,
    config: PlaybackConfig,
    listening: Arc<AtomicBool>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Playback {
    pub(crate) fn new(
        source_id: String,
        session_id: String,
        samples: Vec<Sample>,
        config: PlaybackConfig,
    ) -> Self {
        Self {
            source_id,
            session_id,
            samples: Arc::new(samples),
            config,
            listening: Arc::new(AtomicBool::new(false)),
            thread_handle: Mutex::new(None),
        }
    }

    pub(crate) fn source_id(&self) -> &str {
        &self.source_id
    }

    pub(crate) fn session_id(&self) -> &str {
        &self.session_id
    }

    pub(crate) fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub(crate) fn listen(&self, callback: SampleBatchCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let listening = Arc::clone(&self.listening);
        let samples = Arc::clone(&self.samples);
        let config = self.config.clone();
        let source_id = self.source_id.clone();
        let session_id = self.session_id.clone();

        let handle = thread::spawn(move || {
            deliver(&source_id, &session_id, &samples, &config, &listening, &callback);
            listening.store(false, Ordering::SeqCst);
        });

        *self.thread_handle.lock() = Some(handle);
    }

    /// Stop delivery and wait for the thread to exit
    pub(crate) fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.lock().take() {
            let _ = handle.join();
        }
    }

    pub(crate) fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.listening.store(false, Ordering::SeqCst);
    }
}

fn deliver(
    source_id: &str,
    session_id: &str,
    samples: &[Sample],
    config: &PlaybackConfig,
    listening: &AtomicBool,
    callback: &SampleBatchCallback,
) {
    let batch_size = config.batch_size.max(1);
    let started = Instant::now();
    let first_timestamp = samples.first().map(|s| s.timestamp).unwrap_or(0.0);
    let mut delivered: u64 = 0;

    debug!(
        source_id,
        session_id,
        samples = samples.len(),
        batch_size,
        "Playback started"
    );

    for (index, chunk) in samples.chunks(batch_size).enumerate() {
        if let Pacing::Realtime { speed } = config.pacing {
            let last = chunk.last().map(|s| s.timestamp).unwrap_or(first_timestamp);
            let offset = ((last - first_timestamp) / speed.max(0.01)).max(0.0);
            let target = Duration::from_secs_f64(offset);
            let elapsed = started.elapsed();
            if target > elapsed {
                thread::sleep(target - elapsed);
            }
        }

        if !listening.load(Ordering::Relaxed) {
            debug!(source_id, "Playback stopped");
            return;
        }

        callback(SampleBatch::new(session_id, chunk.to_vec()));
        delivered += 1;

        let redeliver = config
            .duplicate_every
            .is_some_and(|n| n > 0 && (index + 1) % n == 0);
        if redeliver {
            trace!(source_id, batch = index, "Re-delivering batch");
            counter!("swing_tracker_source_redelivered_batches_total").increment(1);
            callback(SampleBatch::new(session_id, chunk.to_vec()));
            delivered += 1;
        }
    }

    counter!("swing_tracker_source_batches_total").increment(delivered);
    info!(source_id, session_id, batches = delivered, "Playback completed");
}

/// Bridge a source's callback into a bounded channel
///
/// Batches are handed over with a blocking send from the source thread, so a
/// slow consumer slows the source instead of losing data. The source starts
/// listening immediately.
pub fn batch_channel<S>(source: &S, capacity: usize) -> mpsc::Receiver<SampleBatch>
where
    S: SampleSource + ?Sized,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let source_id = source.source_id().to_string();

    source.listen(Arc::new(move |batch| {
        if tx.blocking_send(batch).is_err() {
            trace!(source_id = %source_id, "Receiver dropped, batch discarded");
        }
    }));

    rx
}

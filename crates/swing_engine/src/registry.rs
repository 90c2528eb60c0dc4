//! Live session registry.
//!
//! The registry owns every `Recording` session. The map lock is taken for
//! writing only on `start`/`end`; `ingest` holds the read lock just long
//! enough to clone the session handle, so different sessions proceed in
//! parallel while batches of one session are applied strictly in order.
//! Events are published while the session lock is held, which keeps each
//! session's event stream ordered.

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{
    DetectorConfig, DetectorStats, EventPublisher, FinishedSession, NullPublisher, Sample,
    SampleBatch, SessionEvent, SessionState, SessionSummary, Swing,
};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::clock::{session_id_from_start_time, Clock, SystemClock};
use crate::error::TrackerError;
use crate::tracker::{IngestOutcome, SessionInfo, SessionTracker};

type SessionHandle = Arc<Mutex<SessionTracker>>;

/// Concurrent map of live sessions
pub struct SessionRegistry {
    config: DetectorConfig,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn EventPublisher>,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("config", &self.config)
            .field("active_sessions", &self.sessions.read().len())
            .finish()
    }
}

impl SessionRegistry {
    pub fn new(
        config: DetectorConfig,
        clock: Arc<dyn Clock>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            config,
            clock,
            publisher,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Registry with the system clock and no persistence
    pub fn detached(config: DetectorConfig) -> Self {
        Self::new(config, Arc::new(SystemClock), Arc::new(NullPublisher))
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Begin recording `session_id`
    ///
    /// # Errors
    /// `DuplicateSession` if the id is already recording.
    #[instrument(name = "session_registry_start", skip(self), fields(session_id = %session_id))]
    pub fn start(&self, session_id: &str, device: &str) -> Result<SessionInfo, TrackerError> {
        let info = {
            let mut sessions = self.sessions.write();
            if sessions.contains_key(session_id) {
                warn!(session_id, "Session already recording");
                return Err(TrackerError::duplicate_session(session_id));
            }

            let tracker =
                SessionTracker::new(session_id, device, self.config.clone(), self.clock.now());
            let info = tracker.info();
            let handle = Arc::new(Mutex::new(tracker));

            // Publish before the session becomes visible so `Started` precedes any batch
            self.publish(SessionEvent::Started {
                session_id: info.session_id.clone(),
                device: info.device.clone(),
                start_time: info.start_time,
            });

            sessions.insert(session_id.to_string(), handle);
            observability::record_active_sessions(sessions.len());
            info
        };

        observability::record_session_started();
        info!(
            session_id = %info.session_id,
            device = %info.device,
            start_time = %info.start_time,
            "Session started"
        );
        Ok(info)
    }

    /// Begin recording under an id derived from `prefix` and the current time
    pub fn start_auto(&self, prefix: &str, device: &str) -> Result<SessionInfo, TrackerError> {
        let session_id = session_id_from_start_time(prefix, self.clock.now());
        self.start(&session_id, device)
    }

    /// Feed one batch, returning newly detected swings in order
    ///
    /// # Errors
    /// `UnknownSession` if the id is not recording.
    #[instrument(
        level = "debug",
        name = "session_registry_ingest",
        skip(self, samples),
        fields(session_id = %session_id, batch_len = samples.len())
    )]
    pub fn ingest(&self, session_id: &str, samples: &[Sample]) -> Result<Vec<Swing>, TrackerError> {
        let handle = self.handle(session_id)?;
        let mut tracker = handle.lock();

        let outcome = tracker.ingest(samples)?;
        self.record_outcome(session_id, samples.len(), &outcome);

        let IngestOutcome { swings, raw, .. } = outcome;
        if let Some(raw) = raw {
            self.publish(SessionEvent::RawBuffer {
                session_id: session_id.to_string(),
                start_timestamp: raw.start_timestamp,
                end_timestamp: raw.end_timestamp,
                samples: raw.samples,
            });
        }
        for swing in &swings {
            observability::record_swing_detected(swing.rotation_magnitude);
            self.publish(SessionEvent::SwingDetected(swing.clone()));
        }

        Ok(swings)
    }

    /// `ingest` for a batch that carries its own session id
    pub fn ingest_batch(&self, batch: &SampleBatch) -> Result<Vec<Swing>, TrackerError> {
        self.ingest(&batch.session_id, &batch.samples)
    }

    /// Stop recording and return the summary
    ///
    /// # Errors
    /// `UnknownSession` if the id is not recording.
    pub fn end(&self, session_id: &str) -> Result<SessionSummary, TrackerError> {
        self.end_finished(session_id).map(|finished| finished.summary)
    }

    /// Stop recording and return the summary together with every swing
    ///
    /// # Errors
    /// `UnknownSession` if the id is not recording.
    #[instrument(name = "session_registry_end", skip(self), fields(session_id = %session_id))]
    pub fn end_finished(&self, session_id: &str) -> Result<FinishedSession, TrackerError> {
        let handle = {
            let mut sessions = self.sessions.write();
            let handle = sessions
                .remove(session_id)
                .ok_or_else(|| TrackerError::unknown_session(session_id))?;
            observability::record_active_sessions(sessions.len());
            handle
        };

        // Waits for an in-flight ingest of this session to finish
        let finished = {
            let mut tracker = handle.lock();
            let finished = tracker.finish(self.clock.now())?;
            self.publish(SessionEvent::Finished(finished.clone()));
            finished
        };

        let summary = &finished.summary;
        observability::record_session_ended(summary);
        info!(
            session_id = %summary.session_id,
            samples = summary.total_samples_ingested,
            swings = summary.total_swings_detected,
            elapsed_s = summary.elapsed_seconds,
            rate_hz = summary.effective_sample_rate_hz,
            duplicate_batches = summary.diagnostics.duplicate_batches,
            skipped_samples = summary.diagnostics.skipped_samples(),
            "Session ended"
        );

        Ok(finished)
    }

    /// Publish an already computed `Finished` event again
    ///
    /// Returns whether the event was queued.
    pub fn republish(&self, finished: &FinishedSession) -> bool {
        debug!(session_id = %finished.summary.session_id, "Republishing finished session");
        self.publish(SessionEvent::Finished(finished.clone()))
    }

    /// `Recording` for live sessions, `Idle` otherwise
    pub fn state(&self, session_id: &str) -> SessionState {
        match self.sessions.read().get(session_id) {
            Some(handle) => handle.lock().state(),
            None => SessionState::Idle,
        }
    }

    /// Live detector statistics of one session
    pub fn stats(&self, session_id: &str) -> Option<DetectorStats> {
        let handle = self.sessions.read().get(session_id).cloned()?;
        let now = self.clock.now();
        let stats = handle.lock().stats(now);
        Some(stats)
    }

    /// Ids of all recording sessions, sorted
    pub fn active_sessions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    fn handle(&self, session_id: &str) -> Result<SessionHandle, TrackerError> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| TrackerError::unknown_session(session_id))
    }

    fn publish(&self, event: SessionEvent) -> bool {
        let kind = event.kind();
        let queued = self.publisher.publish(event);
        observability::record_event_published(kind, queued);
        if !queued {
            warn!(kind, "Session event dropped, persistence queue full");
        }
        queued
    }

    fn record_outcome(&self, session_id: &str, batch_len: usize, outcome: &IngestOutcome) {
        if outcome.duplicate {
            observability::record_duplicate_batch(session_id, batch_len);
            return;
        }
        if outcome.accepted_samples > 0 {
            observability::record_batch_ingested(session_id, outcome.accepted_samples);
        }
        if outcome.non_finite_samples > 0 {
            observability::record_samples_skipped("non_finite", outcome.non_finite_samples as u64);
        }
        if outcome.out_of_order_samples > 0 {
            observability::record_samples_skipped(
                "out_of_order",
                outcome.out_of_order_samples as u64,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{DateTime, TimeZone, Utc};
    use contracts::Vector3;
    use std::thread;

    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<SessionEvent>>,
    }

    impl RecordingPublisher {
        fn events(&self) -> Vec<SessionEvent> {
            self.events.lock().clone()
        }

        fn kinds(&self) -> Vec<&'static str> {
            self.events.lock().iter().map(SessionEvent::kind).collect()
        }
    }

    impl EventPublisher for RecordingPublisher {
        fn publish(&self, event: SessionEvent) -> bool {
            self.events.lock().push(event);
            true
        }
    }

    struct FullPublisher;

    impl EventPublisher for FullPublisher {
        fn publish(&self, _event: SessionEvent) -> bool {
            false
        }
    }

    fn config() -> DetectorConfig {
        DetectorConfig {
            window_capacity: 300,
            height_threshold: 2.0,
            min_separation: 50,
            nominal_rate_hz: 100.0,
            retain_raw_samples: true,
        }
    }

    fn setup() -> (SessionRegistry, Arc<ManualClock>, Arc<RecordingPublisher>) {
        let clock = Arc::new(ManualClock::default());
        let publisher = Arc::new(RecordingPublisher::default());
        let registry = SessionRegistry::new(config(), clock.clone(), publisher.clone());
        (registry, clock, publisher)
    }

    fn batch(offset: usize, magnitudes: &[f64]) -> Vec<Sample> {
        magnitudes
            .iter()
            .enumerate()
            .map(|(i, &m)| {
                Sample::new(
                    (offset + i) as f64 * 0.01,
                    Vector3::new(m, 0.0, 0.0),
                    Vector3::new(0.0, 0.0, 0.3),
                )
            })
            .collect()
    }

    fn bump(len: usize, peak: usize) -> Vec<f64> {
        (0..len)
            .map(|i| {
                let d = i.abs_diff(peak) as f64;
                f64::max(0.2, 4.0 - d * 0.5)
            })
            .collect()
    }

    #[test]
    fn test_start_twice_is_duplicate() {
        let (registry, _, _) = setup();
        registry.start("s1", "AppleWatch").unwrap();

        let err = registry.start("s1", "AppleWatch").unwrap_err();
        assert_eq!(err, TrackerError::duplicate_session("s1"));
        assert!(err.is_protocol_error());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_ingest_unknown_session() {
        let (registry, _, publisher) = setup();
        let err = registry.ingest("ghost", &batch(0, &[0.1])).unwrap_err();
        assert_eq!(err, TrackerError::unknown_session("ghost"));

        assert!(registry.is_empty());
        assert_eq!(registry.state("ghost"), SessionState::Idle);
        assert!(registry.stats("ghost").is_none());
        assert!(publisher.events().is_empty());
    }

    #[test]
    fn test_end_unknown_session() {
        let (registry, _, _) = setup();
        assert!(matches!(
            registry.end("ghost"),
            Err(TrackerError::UnknownSession { .. })
        ));
    }

    #[test]
    fn test_ended_session_rejects_ingest_and_end() {
        let (registry, _, _) = setup();
        registry.start("s1", "AppleWatch").unwrap();
        registry.end("s1").unwrap();

        assert!(registry.ingest("s1", &batch(0, &[0.1])).is_err());
        assert!(registry.end("s1").is_err());
        assert_eq!(registry.state("s1"), SessionState::Idle);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_summary_counts_and_rate() {
        let (registry, clock, _) = setup();
        registry.start("s1", "AppleWatch").unwrap();

        for n in 0..10 {
            registry.ingest("s1", &batch(n * 100, &[0.5; 100])).unwrap();
        }
        clock.advance_secs(10.0);

        let summary = registry.end("s1").unwrap();
        assert_eq!(summary.total_samples_ingested, 1000);
        assert_eq!(summary.total_swings_detected, 0);
        assert!((summary.elapsed_seconds - 10.0).abs() < 1e-9);
        assert!((summary.effective_sample_rate_hz - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_event_stream_order() {
        let (registry, clock, publisher) = setup();
        registry.start("s1", "AppleWatch").unwrap();

        let swings = registry.ingest("s1", &batch(0, &bump(100, 40))).unwrap();
        assert_eq!(swings.len(), 1);
        registry.ingest("s1", &batch(0, &bump(100, 40))).unwrap();
        clock.advance_secs(1.0);
        let finished = registry.end_finished("s1").unwrap();

        assert_eq!(
            publisher.kinds(),
            vec!["started", "raw_buffer", "swing_detected", "finished"]
        );
        assert_eq!(finished.swings, swings);
        assert_eq!(finished.summary.diagnostics.duplicate_batches, 1);
    }

    #[test]
    fn test_republish_finished_session() {
        let (registry, _, publisher) = setup();
        registry.start("s1", "AppleWatch").unwrap();
        let finished = registry.end_finished("s1").unwrap();

        assert!(registry.republish(&finished));
        let events = publisher.events();
        let finished_events: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Finished(_)))
            .collect();
        assert_eq!(finished_events.len(), 2);
        assert_eq!(finished_events[0].event_key(), finished_events[1].event_key());
    }

    #[test]
    fn test_restart_after_end() {
        let (registry, _, _) = setup();
        registry.start("s1", "AppleWatch").unwrap();
        registry.ingest("s1", &batch(0, &[0.1; 10])).unwrap();
        registry.end("s1").unwrap();

        registry.start("s1", "AppleWatch").unwrap();
        let stats = registry.stats("s1").unwrap();
        assert_eq!(stats.total_samples_ingested, 0);
        assert_eq!(stats.window_len, 0);
    }

    #[test]
    fn test_start_auto_uses_clock() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 11, 8, 2, 49, 42).unwrap(),
        ));
        let registry = SessionRegistry::new(config(), clock, Arc::new(NullPublisher));

        let info = registry.start_auto("watch", "AppleWatch").unwrap();
        assert_eq!(info.session_id, "watch_20251108_024942");
        assert_eq!(registry.state("watch_20251108_024942"), SessionState::Recording);
    }

    #[test]
    fn test_dropped_events_do_not_affect_detection() {
        let registry = SessionRegistry::new(
            config(),
            Arc::new(ManualClock::default()),
            Arc::new(FullPublisher),
        );
        registry.start("s1", "AppleWatch").unwrap();
        let swings = registry.ingest("s1", &batch(0, &bump(100, 40))).unwrap();
        assert_eq!(swings.len(), 1);
        assert_eq!(registry.end("s1").unwrap().total_swings_detected, 1);
    }

    #[test]
    fn test_stats_reflect_live_session() {
        let (registry, clock, _) = setup();
        registry.start("s1", "AppleWatch").unwrap();
        registry.ingest("s1", &batch(0, &[0.1; 200])).unwrap();
        clock.advance_secs(2.0);

        let stats = registry.stats("s1").unwrap();
        assert_eq!(stats.state, SessionState::Recording);
        assert_eq!(stats.window_len, 200);
        assert_eq!(stats.window_capacity, 300);
        assert!((stats.sample_rate_hz - 100.0).abs() < 1e-6);
        assert!(registry.stats("ghost").is_none());
    }

    #[test]
    fn test_concurrent_sessions_are_isolated() {
        let registry = Arc::new(SessionRegistry::new(
            config(),
            Arc::new(ManualClock::new(DateTime::<Utc>::UNIX_EPOCH)),
            Arc::new(NullPublisher),
        ));

        let ids: Vec<String> = (0..4).map(|i| format!("s{i}")).collect();
        for id in &ids {
            registry.start(id, "AppleWatch").unwrap();
        }
        assert_eq!(registry.active_sessions(), ids);

        // Session k sees k+1 swings spaced 1 s apart
        let workers: Vec<_> = ids
            .iter()
            .enumerate()
            .map(|(k, id)| {
                let registry = Arc::clone(&registry);
                let id = id.clone();
                thread::spawn(move || {
                    let mut signal = vec![0.2; 100 * (k + 2)];
                    for s in 0..=k {
                        let peak = 50 + s * 100;
                        for (i, value) in signal.iter_mut().enumerate() {
                            let d = i.abs_diff(peak) as f64;
                            *value = f64::max(*value, 4.0 - d * 0.5);
                        }
                    }
                    let mut total = 0;
                    for (n, chunk) in signal.chunks(25).enumerate() {
                        total += registry.ingest(&id, &batch(n * 25, chunk)).unwrap().len();
                    }
                    total
                })
            })
            .collect();

        for (k, worker) in workers.into_iter().enumerate() {
            assert_eq!(worker.join().unwrap(), k + 1);
        }
        for (k, id) in ids.iter().enumerate() {
            assert_eq!(
                registry.end(id).unwrap().total_swings_detected,
                k as u64 + 1
            );
        }
    }
}

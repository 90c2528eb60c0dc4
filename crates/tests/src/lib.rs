//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - Configuration snapshot driving the detector
//! - Mock and replayed streams through registry, event bus and dispatcher
//! - Sink isolation, re-publication and session protocol errors

#[cfg(test)]
mod support {
    use std::sync::Arc;

    use contracts::{
        ContractError, DetectorConfig, SampleSource, SessionEvent, SessionSink, Swing,
    };
    use dispatcher::{Dispatcher, EventBus, MetricsSnapshot, RetryPolicy, SinkHandle};
    use ingestion::batch_channel;
    use parking_lot::Mutex;
    use swing_engine::{SessionRegistry, SystemClock};
    use tokio::task::JoinHandle;

    /// Keeps every event it is handed
    #[derive(Clone)]
    pub struct RecordingSink {
        name: String,
        pub events: Arc<Mutex<Vec<SessionEvent>>>,
    }

    impl RecordingSink {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                events: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl SessionSink for RecordingSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(&mut self, event: &SessionEvent) -> Result<(), ContractError> {
            self.events.lock().push(event.clone());
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    /// Rejects every write
    pub struct FailingSink;

    impl SessionSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        async fn write(&mut self, _event: &SessionEvent) -> Result<(), ContractError> {
            Err(ContractError::sink_write("failing", "storage unavailable"))
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    /// Registry wired to a running dispatcher
    pub struct Harness {
        pub registry: Arc<SessionRegistry>,
        bus: Arc<EventBus>,
        dispatcher: JoinHandle<Vec<(String, MetricsSnapshot)>>,
    }

    impl Harness {
        pub fn with_handles(config: DetectorConfig, handles: Vec<SinkHandle>) -> Self {
            let (bus, rx) = EventBus::new(1024);
            Self::with_dispatcher(config, bus, Dispatcher::with_handles(handles, rx))
        }

        pub fn with_dispatcher(config: DetectorConfig, bus: EventBus, dispatcher: Dispatcher) -> Self {
            let bus = Arc::new(bus);
            let registry = Arc::new(SessionRegistry::new(
                config,
                Arc::new(SystemClock),
                bus.clone(),
            ));
            Self {
                registry,
                bus,
                dispatcher: dispatcher.spawn(),
            }
        }

        /// Harness with a single recording sink
        pub fn recording(config: DetectorConfig) -> (Self, RecordingSink) {
            let sink = RecordingSink::new("recording");
            let handle = SinkHandle::spawn(sink.clone(), 256, RetryPolicy::NONE);
            (Self::with_handles(config, vec![handle]), sink)
        }

        /// Close the bus and wait for every sink to drain
        pub async fn finish(self) -> Vec<(String, MetricsSnapshot)> {
            assert_eq!(self.bus.dropped_count(), 0, "event bus dropped events");
            drop(self.registry);
            drop(self.bus);
            self.dispatcher.await.unwrap()
        }
    }

    /// Feed a source into an already started session until it is exhausted
    pub async fn stream_into(registry: &SessionRegistry, source: &dyn SampleSource) -> Vec<Swing> {
        let mut rx = batch_channel(source, 8);
        let mut swings = Vec::new();
        while let Some(batch) = rx.recv().await {
            swings.extend(registry.ingest_batch(&batch).unwrap());
        }
        source.stop();
        swings
    }
}

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use ingestion::MockSourceConfig;
    use swing_engine::SessionRegistry;

    const CONFIG: &str = r#"
version = "V1"

[detector]
window_capacity = 300
height_threshold = 2.0
min_separation = 50

[pipeline]
batch_size = 50

[[sinks]]
name = "log"
sink_type = "log"
"#;

    fn swings_for(config: &str) -> usize {
        let blueprint = ConfigLoader::load_from_str(config, ConfigFormat::Toml).unwrap();
        let registry = SessionRegistry::detached(blueprint.detector);
        registry.start("s1", &blueprint.pipeline.device).unwrap();

        let samples = MockSourceConfig {
            duration_s: 10.0,
            ..Default::default()
        }
        .generate();

        let swings: usize = samples
            .chunks(blueprint.pipeline.batch_size)
            .map(|chunk| registry.ingest("s1", chunk).unwrap().len())
            .sum();
        let summary = registry.end("s1").unwrap();
        assert_eq!(summary.total_swings_detected, swings as u64);
        swings
    }

    #[test]
    fn test_configured_detector_finds_planted_swings() {
        assert_eq!(swings_for(CONFIG), 3);
    }

    #[test]
    fn test_threshold_above_peaks_finds_nothing() {
        let config = CONFIG.replace("height_threshold = 2.0", "height_threshold = 7.0");
        assert_eq!(swings_for(&config), 0);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::Write;
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{
        DetectorConfig, FinishedSession, Sample, SampleSource, SessionEvent, SessionState,
        SinkConfig,
    };
    use dispatcher::{create_dispatcher, EventBus, RetryPolicy, SinkHandle};
    use ingestion::{CsvReplaySource, MockSampleSource, MockSourceConfig, PlaybackConfig};
    use observability::SessionMetricsAggregator;
    use swing_engine::{SessionRegistry, TrackerError};

    use crate::support::{stream_into, FailingSink, Harness, RecordingSink};

    fn mock(session_id: &str, config: MockSourceConfig) -> MockSampleSource {
        MockSampleSource::new("mock", session_id, config)
    }

    fn ten_seconds() -> MockSourceConfig {
        MockSourceConfig {
            duration_s: 10.0,
            ..Default::default()
        }
    }

    /// End-to-end: MockSampleSource -> SessionRegistry -> EventBus -> Dispatcher -> sink
    #[tokio::test]
    async fn test_e2e_mock_pipeline() {
        let (harness, sink) = Harness::recording(DetectorConfig::default());
        let source = mock("s1", ten_seconds());

        harness.registry.start("s1", "AppleWatch").unwrap();
        let swings = stream_into(&harness.registry, &source).await;
        let finished = harness.registry.end_finished("s1").unwrap();

        let metrics = harness.finish().await;
        assert_eq!(metrics[0].1.write_count, 15);

        assert_eq!(swings.len(), source.expected_swings());
        assert_eq!(finished.swings, swings);
        let sequence: Vec<u32> = swings.iter().map(|s| s.sequence_number).collect();
        assert_eq!(sequence, vec![1, 2, 3]);
        for (swing, planted) in swings.iter().zip(source.config().swing_times()) {
            assert!((swing.timestamp - planted).abs() < 0.05);
        }

        let events = sink.events.lock();
        assert!(matches!(events.first(), Some(SessionEvent::Started { .. })));
        assert!(matches!(events.last(), Some(SessionEvent::Finished(_))));
        let kinds = |kind: &str| events.iter().filter(|e| e.kind() == kind).count();
        assert_eq!(kinds("raw_buffer"), 10);
        assert_eq!(kinds("swing_detected"), 3);
    }

    #[tokio::test]
    async fn test_redelivered_batches_change_nothing() {
        let plain = mock("s1", ten_seconds());
        let noisy = mock(
            "s1",
            MockSourceConfig {
                playback: PlaybackConfig {
                    duplicate_every: Some(1),
                    ..Default::default()
                },
                ..ten_seconds()
            },
        );

        let mut results = Vec::new();
        for source in [&plain, &noisy] {
            let registry = SessionRegistry::detached(DetectorConfig::default());
            registry.start("s1", "AppleWatch").unwrap();
            stream_into(&registry, source).await;
            results.push(registry.end_finished("s1").unwrap());
        }

        assert_eq!(results[0].swings, results[1].swings);
        assert_eq!(
            results[0].summary.total_samples_ingested,
            results[1].summary.total_samples_ingested
        );
        assert_eq!(results[0].summary.diagnostics.duplicate_batches, 0);
        assert_eq!(results[1].summary.diagnostics.duplicate_batches, 10);
        assert_eq!(results[1].summary.diagnostics.duplicate_samples, 1000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sessions_are_isolated() {
        let (harness, sink) = Harness::recording(DetectorConfig::default());

        let mut tasks = Vec::new();
        for (i, interval) in [2.0, 3.0, 4.0, 5.0].into_iter().enumerate() {
            let session_id = format!("s{i}");
            let source = mock(
                &session_id,
                MockSourceConfig {
                    duration_s: 20.0,
                    swing_interval_s: interval,
                    seed: i as u64,
                    ..Default::default()
                },
            );
            let registry = Arc::clone(&harness.registry);
            tasks.push(tokio::spawn(async move {
                registry.start(&session_id, "AppleWatch").unwrap();
                let swings = stream_into(&registry, &source).await;
                let finished = registry.end_finished(&session_id).unwrap();
                (source.expected_swings(), swings, finished)
            }));
        }

        let mut aggregate = SessionMetricsAggregator::new();
        let mut total_swings = 0;
        for task in tasks {
            let (expected, swings, finished) = task.await.unwrap();
            let session_id = &finished.summary.session_id;

            assert_eq!(swings.len(), expected, "session {session_id}");
            assert!(swings.iter().all(|s| &s.session_id == session_id));
            assert_eq!(finished.summary.total_samples_ingested, 2000);
            total_swings += expected;
            aggregate.update(&finished.summary);
        }
        assert!(harness.registry.is_empty());
        harness.finish().await;

        let summary = aggregate.summary();
        assert_eq!(summary.total_sessions, 4);
        assert_eq!(summary.total_swings, total_swings as u64);

        let events = sink.events.lock();
        let swing_events = events.iter().filter(|e| e.kind() == "swing_detected").count();
        assert_eq!(swing_events, total_swings);
        for i in 0..4 {
            let session_id = format!("s{i}");
            let own: Vec<&SessionEvent> = events
                .iter()
                .filter(|e| e.session_id() == session_id)
                .collect();
            assert!(matches!(own.first(), Some(SessionEvent::Started { .. })));
            assert!(matches!(own.last(), Some(SessionEvent::Finished(_))));
        }
    }

    fn write_wristmotion_csv(samples: &[Sample]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(
            file,
            "time,seconds_elapsed,rotationRateX,rotationRateY,rotationRateZ,\
gravityX,gravityY,gravityZ,accelerationX,accelerationY,accelerationZ,\
quaternionW,quaternionX,quaternionY,quaternionZ"
        )
        .unwrap();
        for s in samples {
            writeln!(
                file,
                "0,{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
                s.timestamp,
                s.rotation_rate.x,
                s.rotation_rate.y,
                s.rotation_rate.z,
                s.gravity.x,
                s.gravity.y,
                s.gravity.z,
                s.acceleration.x,
                s.acceleration.y,
                s.acceleration.z,
                s.orientation.w,
                s.orientation.x,
                s.orientation.y,
                s.orientation.z,
            )
            .unwrap();
        }
        file
    }

    /// Replayed CSV persisted through a FileSink built from configuration
    #[tokio::test]
    async fn test_csv_replay_to_file_sink() {
        let recorded = ten_seconds().generate();
        let csv = write_wristmotion_csv(&recorded);
        let out = tempfile::tempdir().unwrap();

        let source =
            CsvReplaySource::load(csv.path(), "csv", "replay", PlaybackConfig::default()).unwrap();
        assert_eq!(source.samples(), recorded.as_slice());

        let (bus, rx) = EventBus::new(1024);
        let dispatcher =
            create_dispatcher(vec![SinkConfig::file("files", out.path().to_string_lossy())], rx)
                .await
                .unwrap();
        let harness = Harness::with_dispatcher(DetectorConfig::default(), bus, dispatcher);

        harness.registry.start(source.session_id(), "AppleWatch").unwrap();
        let swings = stream_into(&harness.registry, &source).await;
        harness.registry.end("replay").unwrap();
        let metrics = harness.finish().await;
        assert_eq!(metrics[0].1.failure_count, 0);
        assert_eq!(swings.len(), 3);

        let session_dir = out.path().join("replay");
        let stored: FinishedSession = serde_json::from_str(
            &std::fs::read_to_string(session_dir.join("session.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(stored.swings, swings);
        assert_eq!(stored.summary.total_samples_ingested, 1000);
        assert_eq!(std::fs::read_dir(session_dir.join("swings")).unwrap().count(), 3);
        assert_eq!(std::fs::read_dir(session_dir.join("raw")).unwrap().count(), 10);
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_affect_others() {
        let sink = RecordingSink::new("recording");
        let handles = vec![
            SinkHandle::spawn(sink.clone(), 256, RetryPolicy::NONE),
            SinkHandle::spawn(
                FailingSink,
                256,
                RetryPolicy {
                    max_retries: 1,
                    backoff: Duration::from_millis(1),
                },
            ),
        ];
        let harness = Harness::with_handles(DetectorConfig::default(), handles);

        harness.registry.start("s1", "AppleWatch").unwrap();
        let swings = stream_into(&harness.registry, &mock("s1", ten_seconds())).await;
        let summary = harness.registry.end("s1").unwrap();
        let metrics = harness.finish().await;

        assert_eq!(summary.total_swings_detected, swings.len() as u64);
        assert_eq!(sink.events.lock().len(), 15);

        let (name, failing) = &metrics[1];
        assert_eq!(name, "failing");
        assert_eq!(failing.write_count, 0);
        assert_eq!(failing.failure_count, 15);
        assert_eq!(failing.retry_count, 15);
    }

    #[tokio::test]
    async fn test_republish_finished_session() {
        let (harness, sink) = Harness::recording(DetectorConfig {
            retain_raw_samples: false,
            ..Default::default()
        });

        harness.registry.start("s1", "AppleWatch").unwrap();
        stream_into(&harness.registry, &mock("s1", ten_seconds())).await;
        let finished = harness.registry.end_finished("s1").unwrap();
        assert!(harness.registry.republish(&finished));
        harness.finish().await;

        let events = sink.events.lock();
        assert!(events.iter().all(|e| e.kind() != "raw_buffer"));
        let finished_events: Vec<&FinishedSession> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Finished(f) => Some(f),
                _ => None,
            })
            .collect();
        assert_eq!(finished_events, vec![&finished, &finished]);
    }

    #[tokio::test]
    async fn test_session_protocol() {
        let registry = SessionRegistry::detached(DetectorConfig::default());
        let samples = ten_seconds().generate();

        assert_eq!(
            registry.ingest("s1", &samples[..10]),
            Err(TrackerError::unknown_session("s1"))
        );

        registry.start("s1", "AppleWatch").unwrap();
        assert_eq!(
            registry.start("s1", "AppleWatch").err(),
            Some(TrackerError::duplicate_session("s1"))
        );
        assert_eq!(registry.state("s1"), SessionState::Recording);

        registry.ingest("s1", &samples[..100]).unwrap();
        registry.end("s1").unwrap();
        assert_eq!(registry.state("s1"), SessionState::Idle);
        assert!(registry.end("s1").is_err());

        // An ended id can be recorded again from scratch
        registry.start("s1", "AppleWatch").unwrap();
        let stats = registry.stats("s1").unwrap();
        assert_eq!(stats.total_samples_ingested, 0);
    }
}

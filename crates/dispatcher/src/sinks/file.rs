//! FileSink - writes session events to disk, one JSON file per record
//!
//! Layout under `base_path`:
//!
//! ```text
//! <session_id>/session.json              Started, later replaced by Finished
//! <session_id>/swings/<seq>.json         one per swing
//! <session_id>/raw/<start>_<end>.json    one per retained batch
//! ```
//!
//! Each record is written to a temporary file and renamed into place, so a
//! re-delivered event overwrites its record with identical content.

use contracts::{raw_range_label, ContractError, SessionEvent, SessionSink};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./sessions"));

        Self { base_path }
    }
}

/// Sink that persists session events as JSON files
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    created_dirs: HashSet<PathBuf>,
    records_written: u64,
}

impl FileSink {
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
            created_dirs: HashSet::new(),
            records_written: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        Self::new(name, FileSinkConfig::from_params(params))
    }

    pub fn base_path(&self) -> &Path {
        &self.config.base_path
    }

    /// Path the given event is stored at
    ///
    /// Fails for session ids that are not a single plain path component,
    /// which would place records outside `base_path`.
    pub fn record_path(&self, event: &SessionEvent) -> Result<PathBuf, ContractError> {
        let session_dir = self.session_dir(event.session_id())?;
        Ok(match event {
            SessionEvent::Started { .. } | SessionEvent::Finished(_) => {
                session_dir.join("session.json")
            }
            SessionEvent::SwingDetected(swing) => session_dir
                .join("swings")
                .join(format!("{}.json", swing.sequence_number)),
            SessionEvent::RawBuffer {
                start_timestamp,
                end_timestamp,
                ..
            } => session_dir.join("raw").join(format!(
                "{}.json",
                raw_range_label(*start_timestamp, *end_timestamp)
            )),
        })
    }

    fn session_dir(&self, session_id: &str) -> Result<PathBuf, ContractError> {
        let mut components = Path::new(session_id).components();
        let plain = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) && !session_id.contains(['/', '\\']);

        if !plain {
            return Err(ContractError::sink_write(
                &self.name,
                format!("session id {session_id:?} is not a plain directory name"),
            ));
        }
        Ok(self.config.base_path.join(session_id))
    }

    fn write_event_to_disk(&mut self, path: &Path, event: &SessionEvent) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            self.ensure_dir(dir)?;
        }

        match event {
            SessionEvent::Finished(finished) => write_json_atomic(path, finished),
            SessionEvent::SwingDetected(swing) => write_json_atomic(path, swing),
            SessionEvent::Started { .. } | SessionEvent::RawBuffer { .. } => {
                write_json_atomic(path, event)
            }
        }
    }

    fn ensure_dir(&mut self, dir: &Path) -> std::io::Result<()> {
        if !self.created_dirs.contains(dir) {
            fs::create_dir_all(dir)?;
            self.created_dirs.insert(dir.to_path_buf());
        }
        Ok(())
    }

    fn persist_event(&mut self, event: &SessionEvent) -> Result<(), ContractError> {
        let path = self.record_path(event).inspect_err(|e| {
            error!(sink = %self.name, event_key = %event.event_key(), error = %e, "Rejected record path");
        })?;
        self.write_event_to_disk(&path, event).map_err(|e| {
            error!(
                sink = %self.name,
                event_key = %event.event_key(),
                error = %e,
                "Write failed"
            );
            ContractError::sink_write(&self.name, e.to_string())
        })?;
        self.records_written += 1;
        Ok(())
    }
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        serde_json::to_writer_pretty(&mut writer, value)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writer.flush()?;
    }
    fs::rename(tmp_path, path)
}

impl SessionSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, event),
        fields(sink = %self.name, kind = event.kind())
    )]
    async fn write(&mut self, event: &SessionEvent) -> Result<(), ContractError> {
        self.persist_event(event)
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(
            sink = %self.name,
            records = self.records_written,
            "FileSink closed"
        );
        Ok(())
    }
}

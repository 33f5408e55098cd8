use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Everything a session can report about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    AnalysisStarted {
        video_reference: Option<String>,
        attachments: usize,
    },
    TransportRetry {
        attempt: u32,
        reason: String,
        delay_ms: u64,
    },
    AnalysisCompleted {
        score: u8,
        categories: usize,
        todos: usize,
    },
    AnalysisFailed {
        kind: String,
        message: String,
    },
    ExportToggled {
        export_mode: bool,
    },
    ChecklistToggled {
        id: usize,
        checked: bool,
    },
    SessionRestarted,
}

/// One line of the log: the event plus who emitted it and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub session_id: String,
    pub ts: String,
    #[serde(flatten)]
    pub event: SessionEvent,
}

/// Append-only JSONL sink shared by the transport and the state machine.
/// Clones write to the same open file.
#[derive(Debug, Clone)]
pub struct EventLog {
    session_id: String,
    file: Arc<Mutex<File>>,
}

impl EventLog {
    pub fn open(path: &Path, session_id: impl Into<String>) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open event log {}", path.display()))?;
        Ok(Self {
            session_id: session_id.into(),
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn record(&self, event: SessionEvent) -> Result<EventRecord> {
        let record = EventRecord {
            session_id: self.session_id.clone(),
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            event,
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow!("event log lock poisoned"))?;
        file.write_all(line.as_bytes())?;
        Ok(record)
    }
}

/// Lines that are not session events are skipped.
pub fn read_events(path: &Path) -> Result<Vec<EventRecord>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read event log {}", path.display()))?;
    Ok(raw
        .lines()
        .filter_map(|line| serde_json::from_str::<EventRecord>(line).ok())
        .collect())
}

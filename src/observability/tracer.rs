// src/observability/tracer.rs — Trace events and the JSON file recorder

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single recorded event, keyed by trace (session) id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span: Option<String>,
    pub agent: String,
    pub event_type: String,
    /// Unix time in seconds.
    pub timestamp: f64,
    pub payload: Option<serde_json::Value>,
}

/// Side-channel receiver for controller events.
pub trait TraceSink: Send + Sync {
    fn trace_id(&self) -> &str;

    /// Record an event. Returns the new span id.
    fn log(
        &self,
        agent: &str,
        event_type: &str,
        payload: Option<serde_json::Value>,
        parent_span: Option<&str>,
    ) -> String;
}

/// Buffers events in memory and writes them to `<dir>/<trace_id>.json` on flush.
pub struct FileTracer {
    trace_id: String,
    dir: PathBuf,
    events: Mutex<Vec<TraceEvent>>,
}

impl FileTracer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_id(dir, Uuid::new_v4().to_string())
    }

    pub fn with_id(dir: impl Into<PathBuf>, trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            dir: dir.into(),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn file_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.trace_id))
    }

    /// Snapshot of the buffered events.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.buffer().to_vec()
    }

    /// A panic while recording poisons the lock; the events recorded so far
    /// are still valid, so keep using them.
    fn buffer(&self) -> MutexGuard<'_, Vec<TraceEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(trace_id = %self.trace_id, "Trace buffer lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Write all buffered events, replacing any previous flush of this trace.
    pub fn flush(&self) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.file_path();
        let events = self.events();
        std::fs::write(&path, serde_json::to_string_pretty(&events)?)?;
        tracing::debug!(trace_id = %self.trace_id, events = events.len(), "Trace flushed");
        Ok(path)
    }
}

impl TraceSink for FileTracer {
    fn trace_id(&self) -> &str {
        &self.trace_id
    }

    fn log(
        &self,
        agent: &str,
        event_type: &str,
        payload: Option<serde_json::Value>,
        parent_span: Option<&str>,
    ) -> String {
        let span_id = Uuid::new_v4().to_string();
        let event = TraceEvent {
            trace_id: self.trace_id.clone(),
            span_id: span_id.clone(),
            parent_span: parent_span.map(str::to_string),
            agent: agent.to_string(),
            event_type: event_type.to_string(),
            timestamp: unix_now(),
            payload,
        };
        self.buffer().push(event);
        span_id
    }
}

fn unix_now() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

/// Load one trace file, sorted by timestamp.
pub fn load_trace(path: &Path) -> anyhow::Result<Vec<TraceEvent>> {
    let raw = std::fs::read_to_string(path)?;
    let mut events: Vec<TraceEvent> = serde_json::from_str(&raw)?;
    events.sort_by(|a, b| {
        a.timestamp
            .partial_cmp(&b.timestamp)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(events)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraceSummary {
    pub trace_id: String,
    pub path: PathBuf,
    pub events: usize,
}

/// List recorded traces in `dir`. Unreadable or empty files are skipped.
pub fn list_traces(dir: &Path) -> anyhow::Result<Vec<TraceSummary>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match load_trace(&path) {
            Ok(events) if !events.is_empty() => out.push(TraceSummary {
                trace_id: events[0].trace_id.clone(),
                path,
                events: events.len(),
            }),
            Ok(_) => {}
            Err(e) => tracing::debug!("Skipping trace {}: {}", path.display(), e),
        }
    }
    out.sort_by(|a, b| a.trace_id.cmp(&b.trace_id));
    Ok(out)
}

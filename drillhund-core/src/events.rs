//! Drill data model: events, questions, snapshots, and updates.
//!
//! Field names on the wire stay camelCase (`statusMessage`, `questionId`) and
//! the legacy aliases `type`/`timeout` are kept so recorded scenario files and
//! the task service speak the same dialect.

use serde::{Deserialize, Serialize};

/// Display mode of a terminal channel. Exactly one kind is active at a time;
/// the last event that names a kind wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalKind {
    #[default]
    Log,
    Monitor,
    Capture,
}

/// One resource-monitor sample. Only the latest sample per terminal is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorMetrics {
    pub cpu: f64,
    pub memory: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<f64>,
}

/// One row of a packet-capture table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub time: String,
    pub source: String,
    pub destination: String,
    pub protocol: String,
    pub info: String,
}

/// A unit of simulated activity targeting one terminal, delivered after a
/// relative delay. Immutable once issued by the task service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    pub terminal: u32,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TerminalKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Delay relative to the start of the batch, in seconds.
    #[serde(rename = "timeout", default)]
    pub offset_secs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MonitorMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture: Option<CaptureRecord>,
}

impl TaskEvent {
    /// Plain log line event.
    pub fn log(terminal: u32, offset_secs: f64, text: impl Into<String>) -> Self {
        Self {
            terminal,
            kind: None,
            title: None,
            offset_secs,
            text: Some(text.into()),
            metrics: None,
            capture: None,
        }
    }

    /// Resource-monitor sample event.
    pub fn monitor(terminal: u32, offset_secs: f64, metrics: MonitorMetrics) -> Self {
        Self {
            terminal,
            kind: Some(TerminalKind::Monitor),
            title: None,
            offset_secs,
            text: None,
            metrics: Some(metrics),
            capture: None,
        }
    }

    /// Packet-capture row event.
    pub fn capture(terminal: u32, offset_secs: f64, record: CaptureRecord) -> Self {
        Self {
            terminal,
            kind: Some(TerminalKind::Capture),
            title: None,
            offset_secs,
            text: None,
            metrics: None,
            capture: Some(record),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Trimmed title, or `None` when absent or whitespace-only.
    pub fn clean_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
    }
}

/// A multiple-choice question. The `id` round-trips with the submitted
/// answer so the grading side can match them up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub options: Vec<String>,
}

/// Full initial state for a task: one question plus the seed event batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub question: Question,
    #[serde(default)]
    pub events: Vec<TaskEvent>,
}

/// Server-declared session status carried by an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusSignal {
    Continue,
    Win,
    Lose,
}

/// Incremental delta produced after an answer submission: a new question
/// and/or more events and/or a session status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<Question>,
    #[serde(default)]
    pub events: Vec<TaskEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusSignal>,
    #[serde(rename = "statusMessage", default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

/// Wire shape of a submitted answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub answer: usize,
    #[serde(rename = "questionId")]
    pub question_id: String,
}

//! ## drillhund-core::terminal
//! **Per-terminal channel state**
//!
//! Each terminal id owns one `TerminalChannel` with an active display kind,
//! a title, and the accumulated payload. Events are folded in one at a time
//! through per-kind reducers; `log` and `captures` are append-only for the
//! lifetime of a session, `latest_metrics` keeps only the newest sample.

use std::collections::BTreeMap;

use tracing::trace;

use crate::events::{CaptureRecord, MonitorMetrics, TaskEvent, TerminalKind};

/// Appended to the log when an event carries neither text nor a payload the
/// channel can summarize.
pub const NO_DETAILS_LINE: &str = "Event with no details";

/// State of a single virtual terminal feed.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalChannel {
    pub id: u32,
    pub kind: TerminalKind,
    pub title: String,
    pub log: Vec<String>,
    pub latest_metrics: Option<MonitorMetrics>,
    pub captures: Vec<CaptureRecord>,
}

impl TerminalChannel {
    fn new(id: u32) -> Self {
        Self {
            id,
            kind: TerminalKind::Log,
            title: format!("Terminal {id}"),
            log: Vec::new(),
            latest_metrics: None,
            captures: Vec::new(),
        }
    }
}

/// Holds every terminal channel seen so far, keyed and iterated by ascending
/// terminal id.
#[derive(Debug, Default)]
pub struct TerminalStore {
    channels: BTreeMap<u32, TerminalChannel>,
}

impl TerminalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all channels. Part of the hard reset on snapshot load.
    pub fn clear(&mut self) {
        self.channels.clear();
    }

    /// Replaces the channel set with default-constructed channels for `ids`.
    pub fn initialize(&mut self, ids: impl IntoIterator<Item = u32>) {
        self.channels.clear();
        for id in ids {
            self.channels.insert(id, TerminalChannel::new(id));
        }
    }

    /// Returns the channel for `id`, creating a default one on first access.
    /// Creation is explicit here so callers never mutate a channel that does
    /// not exist yet.
    pub fn upsert(&mut self, id: u32) -> &mut TerminalChannel {
        self.channels.entry(id).or_insert_with(|| {
            trace!(terminal = id, "creating terminal channel");
            TerminalChannel::new(id)
        })
    }

    pub fn get(&self, id: u32) -> Option<&TerminalChannel> {
        self.channels.get(&id)
    }

    pub fn channels(&self) -> impl Iterator<Item = &TerminalChannel> {
        self.channels.values()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.channels.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Kind an event resolves to: the event's own kind, else the channel's
    /// current kind, else `Log` for a channel that does not exist yet.
    pub fn resolve_kind(&self, event: &TaskEvent) -> TerminalKind {
        event
            .kind
            .or_else(|| self.channels.get(&event.terminal).map(|ch| ch.kind))
            .unwrap_or_default()
    }

    /// Folds one delivered event into its channel.
    pub fn apply_event(&mut self, event: &TaskEvent) {
        let kind = self.resolve_kind(event);
        let line = display_line(event, kind);
        let channel = self.upsert(event.terminal);
        channel.kind = kind;
        if let Some(title) = event.clean_title() {
            channel.title = title.to_string();
        }

        match kind {
            TerminalKind::Log => {}
            TerminalKind::Monitor => {
                // Latest sample only; an event without metrics clears it.
                channel.latest_metrics = event.metrics.clone();
            }
            TerminalKind::Capture => {
                if let Some(record) = &event.capture {
                    channel.captures.push(record.clone());
                }
            }
        }

        channel.log.push(line);
    }

    /// Merges only channel metadata from an event that has just arrived in an
    /// incremental update: lazy creation, kind, title, and the monitor sample.
    /// Capture rows are left to the delivery-time reducer so they are appended
    /// exactly once.
    pub fn merge_metadata(&mut self, event: &TaskEvent) {
        let channel = self.upsert(event.terminal);
        if let Some(kind) = event.kind {
            channel.kind = kind;
        }
        if let Some(title) = event.clean_title() {
            channel.title = title.to_string();
        }
        if event.kind == Some(TerminalKind::Monitor) {
            if let Some(metrics) = &event.metrics {
                channel.latest_metrics = Some(metrics.clone());
            }
        }
    }

    /// Seeds channel state from a snapshot event ahead of the timed stream,
    /// so tab titles and initial gauges are correct before the first delivery.
    /// Only title-carrying events participate, matching the snapshot contract.
    pub fn seed_channel(&mut self, event: &TaskEvent) {
        let Some(title) = event.clean_title() else {
            return;
        };
        let title = title.to_string();
        let channel = self.upsert(event.terminal);
        channel.title = title;
        match event.kind {
            Some(TerminalKind::Monitor) => {
                if let Some(metrics) = &event.metrics {
                    channel.latest_metrics = Some(metrics.clone());
                }
            }
            Some(TerminalKind::Capture) => {
                if let Some(record) = &event.capture {
                    channel.captures = vec![record.clone()];
                }
            }
            _ => {}
        }
    }
}

/// Builds the display line for a delivered event: explicit text first, then a
/// summary derived from the payload, then the literal fallback.
fn display_line(event: &TaskEvent, kind: TerminalKind) -> String {
    if let Some(text) = event.text.as_deref().filter(|text| !text.is_empty()) {
        return text.to_string();
    }
    let synthesized = match kind {
        TerminalKind::Log => event
            .metrics
            .as_ref()
            .map(metrics_line)
            .or_else(|| event.capture.as_ref().map(capture_line)),
        TerminalKind::Monitor => event.metrics.as_ref().map(metrics_line),
        TerminalKind::Capture => event.capture.as_ref().map(capture_line),
    };
    synthesized.unwrap_or_else(|| NO_DETAILS_LINE.to_string())
}

fn metrics_line(metrics: &MonitorMetrics) -> String {
    let mut line = format!("CPU: {}% | RAM: {}%", metrics.cpu, metrics.memory);
    if let Some(network) = metrics.network {
        line.push_str(&format!(" | NET: {network} MB/s"));
    }
    line
}

fn capture_line(record: &CaptureRecord) -> String {
    let mut line = format!(
        "{}: {} -> {}",
        record.protocol, record.source, record.destination
    );
    if !record.info.is_empty() {
        line.push_str(&format!(" ({})", record.info));
    }
    line
}

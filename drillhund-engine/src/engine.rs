//! ## drillhund-engine::engine
//! **Update reconciler and session owner**
//!
//! `DrillEngine` owns the scheduler, the terminal store, and the session
//! state machine, and is the single entry point for snapshots and updates.
//! A snapshot is a hard reset of everything; an update merges against the
//! existing state. Consumers never touch engine internals: after every
//! mutation an immutable [`TaskView`] is published on a watch channel.

use std::collections::BTreeSet;

use tokio::sync::watch;
use tracing::{debug, info};

use drillhund_core::events::{
    CaptureRecord, MonitorMetrics, Question, TaskSnapshot, TaskUpdate, TerminalKind,
};
use drillhund_core::session::{SessionOutcome, SessionState, SessionStatus};
use drillhund_core::terminal::TerminalStore;
use drillhund_core::time::Clock;

use crate::scheduler::EventScheduler;

pub const DEFAULT_TITLE: &str = "Training drill";

/// Immutable snapshot of one terminal channel for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalView {
    pub id: u32,
    pub kind: TerminalKind,
    pub title: String,
    pub log: Vec<String>,
    pub latest_metrics: Option<MonitorMetrics>,
    pub captures: Vec<CaptureRecord>,
}

/// Immutable snapshot of the whole session, published after every mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskView {
    pub task_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub question: Option<Question>,
    pub selected_option: Option<usize>,
    pub submission_status: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
    pub degraded: bool,
    pub terminals: Vec<TerminalView>,
    pub stream_active: bool,
    pub session_status: SessionStatus,
    pub session_message: Option<String>,
}

impl Default for TaskView {
    fn default() -> Self {
        Self {
            task_id: None,
            title: DEFAULT_TITLE.to_string(),
            description: None,
            question: None,
            selected_option: None,
            submission_status: None,
            loading: false,
            error: None,
            degraded: false,
            terminals: Vec::new(),
            stream_active: false,
            session_status: SessionStatus::InProgress,
            session_message: None,
        }
    }
}

/// Reconciles task snapshots and incremental updates into terminal, session,
/// and question state.
pub struct DrillEngine<C: Clock + Clone> {
    clock: C,
    scheduler: EventScheduler<C>,
    terminals: TerminalStore,
    session: SessionState,
    task_id: Option<String>,
    title: String,
    description: Option<String>,
    question: Option<Question>,
    selected_option: Option<usize>,
    submission_status: Option<String>,
    loading: bool,
    error: Option<String>,
    degraded: bool,
    epoch: u64,
    views: watch::Sender<TaskView>,
}

impl<C: Clock + Clone> DrillEngine<C> {
    pub fn new(clock: C) -> Self {
        let (views, _) = watch::channel(TaskView::default());
        Self {
            scheduler: EventScheduler::new(clock.clone()),
            clock,
            terminals: TerminalStore::new(),
            session: SessionState::new(),
            task_id: None,
            title: DEFAULT_TITLE.to_string(),
            description: None,
            question: None,
            selected_option: None,
            submission_status: None,
            loading: false,
            error: None,
            degraded: false,
            epoch: 0,
            views,
        }
    }

    /// Subscribes to immutable state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<TaskView> {
        self.views.subscribe()
    }

    /// Builds the current immutable snapshot.
    pub fn view(&self) -> TaskView {
        TaskView {
            task_id: self.task_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            question: self.question.clone(),
            selected_option: self.selected_option,
            submission_status: self.submission_status.clone(),
            loading: self.loading,
            error: self.error.clone(),
            degraded: self.degraded,
            terminals: self
                .terminals
                .channels()
                .map(|channel| TerminalView {
                    id: channel.id,
                    kind: channel.kind,
                    title: channel.title.clone(),
                    log: channel.log.clone(),
                    latest_metrics: channel.latest_metrics.clone(),
                    captures: channel.captures.clone(),
                })
                .collect(),
            stream_active: self.scheduler.is_draining(),
            session_status: self.session.status(),
            session_message: self.session.message().map(str::to_string),
        }
    }

    fn publish(&self) {
        self.views.send_replace(self.view());
    }

    /// Session epoch, bumped on every load/reset. A response fetched for an
    /// older epoch must be discarded by the caller.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    pub fn selected_option(&self) -> Option<usize> {
        self.selected_option
    }

    pub fn session_status(&self) -> SessionStatus {
        self.session.status()
    }

    pub fn pending_count(&self) -> usize {
        self.scheduler.pending_count()
    }

    pub fn now_ns(&self) -> u64 {
        self.clock.now_ns()
    }

    /// Deadline of the next scheduled delivery, if the stream is active.
    pub fn next_deadline_ns(&self) -> Option<u64> {
        self.scheduler.next_deadline_ns()
    }

    /// Prepares the engine for a fresh task load: cancels everything from the
    /// previous session and returns the new epoch the load must match.
    pub fn begin_session(&mut self, task_id: &str) -> u64 {
        self.scheduler.reset();
        self.terminals.clear();
        self.session.reset();
        self.task_id = Some(task_id.to_string());
        self.title = DEFAULT_TITLE.to_string();
        self.description = None;
        self.question = None;
        self.selected_option = None;
        self.submission_status = None;
        self.loading = true;
        self.error = None;
        self.degraded = false;
        self.epoch += 1;
        self.publish();
        self.epoch
    }

    /// Marks a load as failed before any retrieval was attempted.
    pub fn fail_load(&mut self, message: &str) {
        self.loading = false;
        self.error = Some(message.to_string());
        self.publish();
    }

    /// Flags the session as running on the built-in fallback drill.
    pub fn mark_degraded(&mut self, advisory: &str) {
        self.degraded = true;
        self.error = Some(advisory.to_string());
        self.publish();
    }

    pub fn select_option(&mut self, index: usize) {
        self.selected_option = Some(index);
        self.submission_status = None;
        self.publish();
    }

    pub fn set_submission_status(&mut self, message: Option<&str>) {
        self.submission_status = message.map(str::to_string);
        self.publish();
    }

    /// Hard reset from a full task snapshot: all terminal and session state
    /// is rebuilt, then the event batch starts a fresh delivery timeline.
    pub fn apply_snapshot(&mut self, snapshot: TaskSnapshot) {
        info!(task = %snapshot.id, events = snapshot.events.len(), "applying task snapshot");
        self.scheduler.reset();
        self.session.reset();
        self.title = snapshot.title;
        self.description = snapshot.description;
        self.question = Some(snapshot.question);
        self.selected_option = None;
        self.submission_status = None;
        self.loading = false;

        let ids: BTreeSet<u32> = snapshot.events.iter().map(|event| event.terminal).collect();
        self.terminals.initialize(ids);
        // Titles and initial gauges must be right before the first delivery.
        for event in &snapshot.events {
            self.terminals.seed_channel(event);
        }

        self.scheduler.schedule(&snapshot.events, true);
        self.publish();
    }

    /// Merges an incremental update: optional question swap, channel metadata
    /// for new events, continued (or fresh) delivery timeline, then the
    /// session status signal.
    pub fn apply_update(&mut self, update: TaskUpdate) {
        // A finished session accepts nothing until the next snapshot or
        // reset: no question swap, no scheduling, no state transition.
        if self.session.status().is_terminal() {
            debug!(status = ?self.session.status(), "session finished, dropping update");
            return;
        }

        if let Some(question) = update.question {
            // A new question invalidates any in-flight selection.
            debug!(question = %question.id, "replacing active question");
            self.question = Some(question);
            self.selected_option = None;
            self.submission_status = None;
        }

        for event in &update.events {
            self.terminals.merge_metadata(event);
        }

        let reset_cursor = !self.scheduler.is_draining();
        self.scheduler.schedule(&update.events, reset_cursor);

        if let SessionOutcome::Finished(status) = self
            .session
            .apply(update.status, update.status_message.as_deref())
        {
            info!(?status, cancelled = self.scheduler.pending_count(), "session finished");
            self.scheduler.reset();
        }

        self.publish();
    }

    /// Delivers every due event into the terminal store. Returns how many
    /// fired.
    pub fn tick(&mut self) -> usize {
        let due = self.scheduler.take_due();
        if due.is_empty() {
            return 0;
        }
        for event in &due {
            self.terminals.apply_event(event);
        }
        debug!(delivered = due.len(), pending = self.scheduler.pending_count(), "tick");
        self.publish();
        due.len()
    }

    pub fn session_finished(&self) -> bool {
        self.session.status().is_terminal()
    }

    /// Full teardown back to the pristine state (trainee navigated away).
    pub fn reset(&mut self) {
        self.scheduler.reset();
        self.terminals.clear();
        self.session.reset();
        self.task_id = None;
        self.title = DEFAULT_TITLE.to_string();
        self.description = None;
        self.question = None;
        self.selected_option = None;
        self.submission_status = None;
        self.loading = false;
        self.error = None;
        self.degraded = false;
        self.epoch += 1;
        self.publish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drillhund_core::events::{StatusSignal, TaskEvent};
    use drillhund_core::session::DEFAULT_WIN_MESSAGE;
    use drillhund_core::time::{VirtualClock, NANOS_PER_SEC};

    fn snapshot(events: Vec<TaskEvent>) -> TaskSnapshot {
        TaskSnapshot {
            id: "t-1".into(),
            title: "Suspicious traffic".into(),
            description: Some("Watch the terminals.".into()),
            question: Question {
                id: "q1".into(),
                text: "What first?".into(),
                options: vec!["Isolate".into(), "Ignore".into()],
            },
            events,
        }
    }

    fn engine() -> (DrillEngine<VirtualClock>, VirtualClock) {
        let clock = VirtualClock::new(0);
        (DrillEngine::new(clock.clone()), clock)
    }

    fn drain(engine: &mut DrillEngine<VirtualClock>, clock: &VirtualClock) {
        while let Some(deadline) = engine.next_deadline_ns() {
            let now = clock.now_ns();
            if deadline > now {
                clock.advance(deadline - now);
            }
            engine.tick();
        }
    }

    #[test]
    fn snapshot_initializes_channels_before_stream() {
        let (mut engine, _clock) = engine();
        engine.apply_snapshot(snapshot(vec![
            TaskEvent::log(1, 1.0, "proxy: GET /login.php").with_title("proxy"),
            TaskEvent::log(2, 4.0, "siem: rule matched"),
        ]));

        let view = engine.view();
        assert_eq!(view.title, "Suspicious traffic");
        assert!(view.stream_active);
        assert_eq!(view.terminals.len(), 2);
        assert_eq!(view.terminals[0].title, "proxy");
        assert_eq!(view.terminals[1].title, "Terminal 2");
        // Nothing delivered yet.
        assert!(view.terminals.iter().all(|t| t.log.is_empty()));
    }

    #[test]
    fn simultaneous_offsets_keep_input_order() {
        let (mut engine, clock) = engine();
        engine.apply_snapshot(snapshot(vec![
            TaskEvent::log(1, 1.0, "a"),
            TaskEvent::log(1, 1.0, "b"),
        ]));

        clock.advance(NANOS_PER_SEC);
        assert_eq!(engine.tick(), 2);
        let view = engine.view();
        assert_eq!(view.terminals[0].log, vec!["a".to_string(), "b".to_string()]);
        assert!(!view.stream_active);
    }

    #[test]
    fn win_update_cancels_pending_deliveries() {
        let (mut engine, _clock) = engine();
        engine.apply_snapshot(snapshot(vec![
            TaskEvent::log(1, 1.0, "a"),
            TaskEvent::log(1, 2.0, "b"),
            TaskEvent::log(1, 3.0, "c"),
        ]));
        assert_eq!(engine.pending_count(), 3);

        engine.apply_update(TaskUpdate {
            status: Some(StatusSignal::Win),
            ..TaskUpdate::default()
        });

        assert_eq!(engine.pending_count(), 0);
        let view = engine.view();
        assert_eq!(view.session_status, SessionStatus::Win);
        assert_eq!(view.session_message.as_deref(), Some(DEFAULT_WIN_MESSAGE));
        assert!(!view.stream_active);
    }

    #[test]
    fn cancelled_deliveries_never_mutate_state() {
        let (mut engine, clock) = engine();
        engine.apply_snapshot(snapshot(vec![TaskEvent::log(1, 1.0, "late")]));
        engine.apply_update(TaskUpdate {
            status: Some(StatusSignal::Lose),
            ..TaskUpdate::default()
        });

        clock.advance(10 * NANOS_PER_SEC);
        assert_eq!(engine.tick(), 0);
        assert!(engine.view().terminals[0].log.is_empty());
    }

    #[test]
    fn finished_session_schedules_nothing_from_late_updates() {
        let (mut engine, _clock) = engine();
        engine.apply_snapshot(snapshot(vec![]));
        engine.apply_update(TaskUpdate {
            status: Some(StatusSignal::Win),
            ..TaskUpdate::default()
        });

        engine.apply_update(TaskUpdate {
            events: vec![TaskEvent::log(1, 1.0, "late")],
            question: Some(Question {
                id: "q9".into(),
                text: "Too late?".into(),
                options: vec!["Yes".into()],
            }),
            ..TaskUpdate::default()
        });

        assert_eq!(engine.pending_count(), 0);
        let view = engine.view();
        assert_eq!(view.question.as_ref().unwrap().id, "q1");
        assert_eq!(view.session_status, SessionStatus::Win);
    }

    #[test]
    fn terminal_status_is_sticky_across_updates() {
        let (mut engine, _clock) = engine();
        engine.apply_snapshot(snapshot(vec![]));
        engine.apply_update(TaskUpdate {
            status: Some(StatusSignal::Win),
            ..TaskUpdate::default()
        });
        engine.apply_update(TaskUpdate {
            status: Some(StatusSignal::Continue),
            status_message: Some("keep going".into()),
            ..TaskUpdate::default()
        });
        assert_eq!(engine.session_status(), SessionStatus::Win);
        assert_eq!(engine.view().session_message.as_deref(), Some(DEFAULT_WIN_MESSAGE));
    }

    #[test]
    fn update_question_clears_selection_and_status_text() {
        let (mut engine, _clock) = engine();
        engine.apply_snapshot(snapshot(vec![]));
        engine.select_option(1);
        engine.set_submission_status(Some("Sending answer..."));

        engine.apply_update(TaskUpdate {
            question: Some(Question {
                id: "q2".into(),
                text: "Next?".into(),
                options: vec!["Escalate".into()],
            }),
            ..TaskUpdate::default()
        });

        let view = engine.view();
        assert_eq!(view.question.as_ref().unwrap().id, "q2");
        assert_eq!(view.selected_option, None);
        assert_eq!(view.submission_status, None);
    }

    #[test]
    fn update_creates_unknown_terminals_lazily() {
        let (mut engine, clock) = engine();
        engine.apply_snapshot(snapshot(vec![TaskEvent::log(1, 1.0, "first")]));
        drain(&mut engine, &clock);

        engine.apply_update(TaskUpdate {
            events: vec![TaskEvent::log(42, 1.0, "new feed").with_title("edr")],
            ..TaskUpdate::default()
        });
        // Channel exists with its metadata before the delivery fires.
        let view = engine.view();
        let edr = view.terminals.iter().find(|t| t.id == 42).unwrap();
        assert_eq!(edr.title, "edr");
        assert!(edr.log.is_empty());

        drain(&mut engine, &clock);
        let view = engine.view();
        let edr = view.terminals.iter().find(|t| t.id == 42).unwrap();
        assert_eq!(edr.log, vec!["new feed".to_string()]);
    }

    #[test]
    fn update_while_drained_starts_fresh_timeline() {
        let (mut engine, clock) = engine();
        engine.apply_snapshot(snapshot(vec![TaskEvent::log(1, 1.0, "first")]));
        drain(&mut engine, &clock);

        let now = clock.now_ns();
        engine.apply_update(TaskUpdate {
            events: vec![TaskEvent::log(1, 2.0, "second")],
            ..TaskUpdate::default()
        });
        assert_eq!(engine.next_deadline_ns(), Some(now + 2 * NANOS_PER_SEC));
    }

    #[test]
    fn status_is_evaluated_even_without_events() {
        let (mut engine, _clock) = engine();
        engine.apply_snapshot(snapshot(vec![TaskEvent::log(1, 5.0, "pending")]));
        engine.apply_update(TaskUpdate {
            status: Some(StatusSignal::Lose),
            status_message: Some("Data left the network.".into()),
            ..TaskUpdate::default()
        });
        assert_eq!(engine.session_status(), SessionStatus::Lose);
        assert_eq!(engine.pending_count(), 0);
    }

    #[test]
    fn begin_session_discards_previous_state_and_bumps_epoch() {
        let (mut engine, _clock) = engine();
        engine.apply_snapshot(snapshot(vec![TaskEvent::log(1, 1.0, "old")]));
        let first_epoch = engine.epoch();

        let epoch = engine.begin_session("t-2");
        assert!(epoch > first_epoch);
        let view = engine.view();
        assert!(view.loading);
        assert!(view.terminals.is_empty());
        assert_eq!(view.title, DEFAULT_TITLE);
        assert_eq!(engine.pending_count(), 0);
    }

    #[test]
    fn watch_subscribers_see_published_views() {
        let (mut engine, clock) = engine();
        let mut receiver = engine.subscribe();
        engine.apply_snapshot(snapshot(vec![TaskEvent::log(1, 1.0, "line")]));
        assert!(receiver.has_changed().unwrap());
        assert_eq!(receiver.borrow_and_update().title, "Suspicious traffic");

        clock.advance(NANOS_PER_SEC);
        engine.tick();
        assert!(receiver.has_changed().unwrap());
        assert_eq!(receiver.borrow_and_update().terminals[0].log.len(), 1);
    }

    #[test]
    fn reset_returns_to_pristine_view() {
        let (mut engine, _clock) = engine();
        engine.apply_snapshot(snapshot(vec![TaskEvent::log(1, 1.0, "x")]));
        engine.mark_degraded("demo mode");
        engine.reset();
        assert_eq!(engine.view(), TaskView::default());
    }
}

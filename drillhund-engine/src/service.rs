//! ## drillhund-engine::service
//! **Rendering-facing task operations**
//!
//! `TaskService` is what a front end calls: load a task, select an option,
//! submit, reset. It owns the provider seam and the fallback policy; the
//! engine behind it only ever sees well-formed snapshots and updates.
//!
//! Cancel-before-replace: every load or reset bumps the engine epoch, and a
//! retrieval response that comes back for an older epoch is dropped instead
//! of corrupting the new session.

use std::sync::Arc;

use opentelemetry::KeyValue;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, warn};

use drillhund_core::events::AnswerSubmission;
use drillhund_core::time::Clock;
use drillhund_telemetry::{EventLogger, MetricsRecorder};

use crate::demo::{demo_snapshot, demo_update, DEMO_ADVISORY, DEMO_SUBMIT_MESSAGE};
use crate::engine::{DrillEngine, TaskView};
use crate::provider::TaskProvider;

pub const MSG_MISSING_ID: &str = "No task id was provided.";
pub const MSG_SELECT_FIRST: &str = "Select an answer first.";
pub const MSG_NO_TASK: &str = "No active task.";
pub const MSG_NO_QUESTION: &str = "No active question.";
pub const MSG_SENDING: &str = "Sending the answer...";
pub const MSG_SENT: &str = "Answer sent.";
pub const MSG_SEND_FAILED: &str = "Could not send the answer. Try again.";

pub struct TaskService<C: Clock + Clone> {
    engine: Arc<Mutex<DrillEngine<C>>>,
    provider: Option<Arc<dyn TaskProvider>>,
    metrics: Arc<MetricsRecorder>,
}

impl<C: Clock + Clone> TaskService<C> {
    pub fn new(
        engine: Arc<Mutex<DrillEngine<C>>>,
        provider: Option<Arc<dyn TaskProvider>>,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        Self {
            engine,
            provider,
            metrics,
        }
    }

    pub fn view(&self) -> TaskView {
        self.engine.lock().view()
    }

    pub fn subscribe(&self) -> watch::Receiver<TaskView> {
        self.engine.lock().subscribe()
    }

    /// Loads a task, falling back to the built-in demo drill when the
    /// provider is missing or fails. Never fatal.
    pub async fn load_task(&self, task_id: &str) {
        let task_id = task_id.trim();
        if task_id.is_empty() {
            self.engine.lock().fail_load(MSG_MISSING_ID);
            return;
        }

        let epoch = self.engine.lock().begin_session(task_id);

        let Some(provider) = self.provider.clone() else {
            // Offline mode is a first-class way to run the drill.
            self.engine.lock().apply_snapshot(demo_snapshot(task_id));
            self.sync_pending_gauge();
            return;
        };

        match provider.fetch_task(task_id).await {
            Ok(snapshot) => {
                let mut engine = self.engine.lock();
                if engine.epoch() != epoch {
                    debug!(task = task_id, "discarding snapshot for superseded session");
                    return;
                }
                engine.apply_snapshot(snapshot);
            }
            Err(error) => {
                warn!(task = task_id, %error, "task retrieval failed, using demo drill");
                self.metrics.fallback_activations.inc();
                EventLogger::log_event(
                    "fallback_activated",
                    vec![
                        KeyValue::new("task_id", task_id.to_string()),
                        KeyValue::new("error", error.to_string()),
                    ],
                )
                .await;

                let mut engine = self.engine.lock();
                if engine.epoch() != epoch {
                    debug!(task = task_id, "discarding fallback for superseded session");
                    return;
                }
                engine.apply_snapshot(demo_snapshot(task_id));
                engine.mark_degraded(DEMO_ADVISORY);
            }
        }
        self.sync_pending_gauge();
    }

    /// Pure local selection; clears any prior submission status text.
    pub fn select_option(&self, index: usize) {
        self.engine.lock().select_option(index);
    }

    /// Submits the current selection. Rejected locally when there is nothing
    /// to submit; a provider failure leaves selection and question intact
    /// behind a retryable message.
    pub async fn submit_answer(&self) {
        let (task_id, submission, epoch) = {
            let mut engine = self.engine.lock();
            let Some(selected) = engine.selected_option() else {
                engine.set_submission_status(Some(MSG_SELECT_FIRST));
                return;
            };
            let Some(task_id) = engine.task_id().map(str::to_string) else {
                engine.set_submission_status(Some(MSG_NO_TASK));
                return;
            };
            // Can happen while the stream is still running and the next
            // question has not arrived yet.
            let Some(question) = engine.question() else {
                engine.set_submission_status(Some(MSG_NO_QUESTION));
                return;
            };
            let submission = AnswerSubmission {
                answer: selected,
                question_id: question.id.clone(),
            };
            engine.set_submission_status(Some(MSG_SENDING));
            (task_id, submission, engine.epoch())
        };

        let Some(provider) = self.provider.clone() else {
            let update = demo_update();
            let status_text = update.message.clone().unwrap_or_else(|| DEMO_SUBMIT_MESSAGE.into());
            let mut engine = self.engine.lock();
            if engine.epoch() == epoch {
                engine.apply_update(update);
                engine.set_submission_status(Some(status_text.as_str()));
            }
            drop(engine);
            self.sync_pending_gauge();
            return;
        };

        match provider.submit_answer(&task_id, &submission).await {
            Ok(update) => {
                let status_text = update.message.clone().unwrap_or_else(|| MSG_SENT.into());
                let mut engine = self.engine.lock();
                if engine.epoch() != epoch {
                    debug!(task = %task_id, "discarding update for superseded session");
                    return;
                }
                engine.apply_update(update);
                engine.set_submission_status(Some(status_text.as_str()));
            }
            Err(error) => {
                warn!(task = %task_id, %error, "answer submission failed");
                let mut engine = self.engine.lock();
                if engine.epoch() == epoch {
                    engine.set_submission_status(Some(MSG_SEND_FAILED));
                }
            }
        }
        self.sync_pending_gauge();
    }

    /// Full teardown; stale in-flight responses are discarded afterwards.
    pub fn reset_task(&self) {
        self.engine.lock().reset();
        self.sync_pending_gauge();
    }

    fn sync_pending_gauge(&self) {
        let pending = self.engine.lock().pending_count();
        self.metrics.pending_deliveries.set(pending as f64);
    }
}

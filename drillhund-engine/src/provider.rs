//! ## drillhund-engine::provider
//! **Retrieval seam for task data**
//!
//! The engine never talks to a transport directly; it asks a `TaskProvider`
//! for snapshots and grading. Provider failures are never fatal to a running
//! session: the service downgrades to the built-in demo drill or surfaces a
//! retryable message.

use async_trait::async_trait;
use thiserror::Error;

use drillhund_core::events::{AnswerSubmission, TaskSnapshot, TaskUpdate};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("task '{0}' not found")]
    TaskNotFound(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("malformed task payload: {0}")]
    Decode(String),
}

/// Read/write access to task data.
#[async_trait]
pub trait TaskProvider: Send + Sync {
    /// Returns the full initial state for a task.
    async fn fetch_task(&self, task_id: &str) -> Result<TaskSnapshot, ProviderError>;

    /// Grades a submitted answer and returns the follow-up delta.
    async fn submit_answer(
        &self,
        task_id: &str,
        submission: &AnswerSubmission,
    ) -> Result<TaskUpdate, ProviderError>;
}

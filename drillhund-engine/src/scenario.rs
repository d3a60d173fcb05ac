//! ## drillhund-engine::scenario
//! **File-backed scenario provider**
//!
//! A scenario file holds the whole branching exercise: a question map with
//! the correct option and explicit `next` chaining, and event blocks keyed
//! `initial` / `<question>_correct` / `<question>_wrong`. Grading follows the
//! block naming: the matching block is replayed, and a question without a
//! `next` ends the drill with win or lose.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use async_trait::async_trait;

use drillhund_core::events::{
    AnswerSubmission, Question, StatusSignal, TaskEvent, TaskSnapshot, TaskUpdate,
};

use crate::provider::{ProviderError, TaskProvider};

pub const INITIAL_BLOCK: &str = "initial";

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("scenario file not found: {0}")]
    NotFound(PathBuf),

    #[error("scenario I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("scenario YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("scenario JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("scenario references unknown question '{0}'")]
    UnknownQuestion(String),
}

/// One question inside a scenario file, with its grading key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioQuestion {
    pub text: String,
    pub options: Vec<String>,
    /// Index of the correct option.
    pub correct: usize,
    /// Question asked next when the drill continues; `None` ends the drill.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// A complete branching exercise loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioFile {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "initialQuestionId")]
    pub initial_question_id: String,
    pub questions: BTreeMap<String, ScenarioQuestion>,
    /// Event blocks: `initial` plus `<question>_correct` / `<question>_wrong`.
    #[serde(default)]
    pub events: BTreeMap<String, Vec<TaskEvent>>,
}

impl ScenarioFile {
    /// Loads YAML by default, JSON for `.json` files.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        if !path.exists() {
            return Err(ScenarioError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        let scenario = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&raw)?,
            _ => serde_yaml::from_str(&raw)?,
        };
        Ok(scenario)
    }

    fn question_by_id(&self, question_id: &str) -> Result<Question, ScenarioError> {
        let question = self
            .questions
            .get(question_id)
            .ok_or_else(|| ScenarioError::UnknownQuestion(question_id.to_string()))?;
        Ok(Question {
            id: question_id.to_string(),
            text: question.text.clone(),
            options: question.options.clone(),
        })
    }

    fn block(&self, name: &str) -> Vec<TaskEvent> {
        self.events.get(name).cloned().unwrap_or_default()
    }

    /// The full initial state: first question plus the `initial` block.
    pub fn snapshot(&self) -> Result<TaskSnapshot, ScenarioError> {
        Ok(TaskSnapshot {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            question: self.question_by_id(&self.initial_question_id)?,
            events: self.block(INITIAL_BLOCK),
        })
    }

    /// Grades one submission: replay the matching event block, then either
    /// chain to the next question or end the drill.
    pub fn grade(&self, submission: &AnswerSubmission) -> Result<TaskUpdate, ScenarioError> {
        let question = self
            .questions
            .get(&submission.question_id)
            .ok_or_else(|| ScenarioError::UnknownQuestion(submission.question_id.clone()))?;

        let correct = submission.answer == question.correct;
        let block_name = format!(
            "{}_{}",
            submission.question_id,
            if correct { "correct" } else { "wrong" }
        );
        let events = self.block(&block_name);
        debug!(
            question = %submission.question_id,
            correct,
            block = %block_name,
            events = events.len(),
            "graded submission"
        );

        match &question.next {
            Some(next_id) => Ok(TaskUpdate {
                status: Some(StatusSignal::Continue),
                message: Some("Answer accepted.".into()),
                question: Some(self.question_by_id(next_id)?),
                events,
                status_message: None,
            }),
            None => Ok(TaskUpdate {
                status: Some(if correct {
                    StatusSignal::Win
                } else {
                    StatusSignal::Lose
                }),
                status_message: Some("The drill is complete.".into()),
                message: Some(if correct {
                    "Correct answer!".into()
                } else {
                    "Wrong answer.".into()
                }),
                question: None,
                events,
            }),
        }
    }
}

/// Where a provider resolves scenarios from.
enum ScenarioRoot {
    /// Look up `task_<id>.yaml` / `task_<id>.json` inside a directory.
    Dir(PathBuf),
    /// Serve one fixed file regardless of the requested id.
    File(PathBuf),
}

/// `TaskProvider` backed by scenario files on disk.
pub struct ScenarioProvider {
    root: ScenarioRoot,
}

impl ScenarioProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            root: ScenarioRoot::Dir(dir.into()),
        }
    }

    pub fn single(path: impl Into<PathBuf>) -> Self {
        Self {
            root: ScenarioRoot::File(path.into()),
        }
    }

    fn resolve(&self, task_id: &str) -> Result<ScenarioFile, ScenarioError> {
        match &self.root {
            ScenarioRoot::File(path) => ScenarioFile::load(path),
            ScenarioRoot::Dir(dir) => {
                let yaml = dir.join(format!("task_{task_id}.yaml"));
                if yaml.exists() {
                    return ScenarioFile::load(&yaml);
                }
                let json = dir.join(format!("task_{task_id}.json"));
                if json.exists() {
                    return ScenarioFile::load(&json);
                }
                Err(ScenarioError::NotFound(yaml))
            }
        }
    }
}

impl From<ScenarioError> for ProviderError {
    fn from(error: ScenarioError) -> Self {
        match error {
            ScenarioError::NotFound(path) => {
                ProviderError::TaskNotFound(path.to_string_lossy().into_owned())
            }
            other => ProviderError::Decode(other.to_string()),
        }
    }
}

#[async_trait]
impl TaskProvider for ScenarioProvider {
    async fn fetch_task(&self, task_id: &str) -> Result<TaskSnapshot, ProviderError> {
        let scenario = self.resolve(task_id)?;
        Ok(scenario.snapshot()?)
    }

    async fn submit_answer(
        &self,
        task_id: &str,
        submission: &AnswerSubmission,
    ) -> Result<TaskUpdate, ProviderError> {
        let scenario = self.resolve(task_id)?;
        Ok(scenario.grade(submission)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> ScenarioFile {
        let yaml = r#"
id: t-7
title: Phishing follow-up
initialQuestionId: q1
questions:
  q1:
    text: What first?
    options: [Isolate, Notify, Ignore]
    correct: 0
    next: q2
  q2:
    text: And then?
    options: [Escalate, Close]
    correct: 0
events:
  initial:
    - { terminal: 1, title: proxy, text: "proxy: GET /login.php", timeout: 1 }
  q1_correct:
    - { terminal: 2, title: siem, text: "siem: host isolated", timeout: 2 }
  q1_wrong:
    - { terminal: 2, title: siem, text: "siem: exfiltration continues", timeout: 2 }
"#;
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn snapshot_serves_initial_question_and_block() {
        let snapshot = scenario().snapshot().unwrap();
        assert_eq!(snapshot.question.id, "q1");
        assert_eq!(snapshot.events.len(), 1);
        assert_eq!(snapshot.events[0].terminal, 1);
    }

    #[test]
    fn correct_answer_chains_to_next_question() {
        let update = scenario()
            .grade(&AnswerSubmission {
                answer: 0,
                question_id: "q1".into(),
            })
            .unwrap();
        assert_eq!(update.status, Some(StatusSignal::Continue));
        assert_eq!(update.question.unwrap().id, "q2");
        assert_eq!(update.events[0].text.as_deref(), Some("siem: host isolated"));
    }

    #[test]
    fn wrong_answer_replays_wrong_block() {
        let update = scenario()
            .grade(&AnswerSubmission {
                answer: 2,
                question_id: "q1".into(),
            })
            .unwrap();
        assert_eq!(update.status, Some(StatusSignal::Continue));
        assert_eq!(
            update.events[0].text.as_deref(),
            Some("siem: exfiltration continues")
        );
    }

    #[test]
    fn last_question_ends_with_win_or_lose() {
        let file = scenario();
        let win = file
            .grade(&AnswerSubmission {
                answer: 0,
                question_id: "q2".into(),
            })
            .unwrap();
        assert_eq!(win.status, Some(StatusSignal::Win));
        assert!(win.question.is_none());

        let lose = file
            .grade(&AnswerSubmission {
                answer: 1,
                question_id: "q2".into(),
            })
            .unwrap();
        assert_eq!(lose.status, Some(StatusSignal::Lose));
    }

    #[test]
    fn unknown_question_is_an_error() {
        let error = scenario()
            .grade(&AnswerSubmission {
                answer: 0,
                question_id: "q9".into(),
            })
            .unwrap_err();
        assert!(matches!(error, ScenarioError::UnknownQuestion(_)));
    }

    #[tokio::test]
    async fn provider_resolves_tasks_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task_7.yaml");
        std::fs::write(&path, serde_yaml::to_string(&scenario()).unwrap()).unwrap();

        let provider = ScenarioProvider::new(dir.path());
        let snapshot = provider.fetch_task("7").await.unwrap();
        assert_eq!(snapshot.id, "t-7");

        let missing = provider.fetch_task("8").await.unwrap_err();
        assert!(matches!(missing, ProviderError::TaskNotFound(_)));
    }
}

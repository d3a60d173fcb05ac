//! # Drillhund Engine
//!
//! The task simulation engine for the incident-response trainer. It turns a
//! task snapshot into timed deliveries across virtual terminals, reconciles
//! incremental updates after each answer, and runs the win/lose session
//! state machine.
//!
//! ## Key Components:
//! - **Event Scheduler:** relative offsets on an injectable clock.
//! - **Drill Engine:** snapshot/update reconciler publishing immutable views.
//! - **Task Service:** load/select/submit/reset with fallback policy.
//! - **Providers:** scenario files on disk or the built-in demo drill.

pub mod demo;
pub mod driver;
pub mod engine;
pub mod error;
pub mod provider;
pub mod scenario;
pub mod scheduler;
pub mod service;

pub use engine::{DrillEngine, TaskView, TerminalView};
pub use error::DrillError;
pub use provider::{ProviderError, TaskProvider};
pub use scenario::{ScenarioFile, ScenarioProvider};
pub use scheduler::EventScheduler;
pub use service::TaskService;

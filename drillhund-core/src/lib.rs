//! # drillhund-core
//!
//! Foundation layer for the incident-response drill engine.
//! Deterministic-first: every time-dependent component is driven through an
//! injectable clock so a full drill can be replayed without wall-clock waits.
//!
//! ### Key Submodules:
//! - `events`: wire-level drill data model (events, questions, snapshots)
//! - `terminal`: per-terminal channel state with per-kind reducers
//! - `session`: the in-progress/win/lose session state machine
//! - `time`: `Clock` trait with `VirtualClock` and `MonotonicClock`

pub mod events;
pub mod session;
pub mod terminal;
pub mod time;

pub mod prelude {
    pub use crate::events::*;
    pub use crate::session::*;
    pub use crate::terminal::*;
    pub use crate::time::*;
}

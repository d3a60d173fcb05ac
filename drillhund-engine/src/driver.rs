//! ## drillhund-engine::driver
//! **Delivery pumps for the scheduler**
//!
//! Two ways to move a drill forward: the async pump sleeps on a real clock
//! until the next deadline, while the virtual drain advances a `VirtualClock`
//! deadline-by-deadline for deterministic headless replays. Both end when the
//! stream drains or the session reaches a terminal state.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;

use drillhund_core::time::{Clock, VirtualClock};
use drillhund_telemetry::MetricsRecorder;

use crate::engine::{DrillEngine, TaskView};

/// Pumps deliveries in real time until the current stream drains or the
/// session finishes.
pub async fn run_until_drained<C: Clock + Clone>(
    engine: Arc<Mutex<DrillEngine<C>>>,
    metrics: Arc<MetricsRecorder>,
) {
    loop {
        let (deadline, now) = {
            let engine = engine.lock();
            if engine.session_finished() {
                break;
            }
            (engine.next_deadline_ns(), engine.now_ns())
        };
        let Some(deadline) = deadline else {
            break;
        };

        if deadline > now {
            tokio::time::sleep(Duration::from_nanos(deadline - now)).await;
        }

        let (delivered, pending) = {
            let mut engine = engine.lock();
            let delivered = engine.tick();
            (delivered, engine.pending_count())
        };
        metrics.record_deliveries(delivered, pending);
    }
    info!("delivery stream drained");
}

/// Drains every scheduled delivery by advancing the virtual clock straight to
/// each deadline. Returns the number of delivered events.
pub fn drain_virtual(engine: &mut DrillEngine<VirtualClock>, clock: &VirtualClock) -> usize {
    let mut delivered = 0;
    while let Some(deadline) = engine.next_deadline_ns() {
        let now = clock.now_ns();
        if deadline > now {
            clock.advance(deadline - now);
        }
        delivered += engine.tick();
    }
    delivered
}

/// Deterministic digest of everything a trainee would have seen: terminal
/// contents in id order plus the session outcome. Two replays of the same
/// scenario with the same answers produce the same hash.
pub fn transcript_hash(view: &TaskView) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(view.title.as_bytes());
    for terminal in &view.terminals {
        hasher.update(&terminal.id.to_le_bytes());
        hasher.update(terminal.title.as_bytes());
        for line in &terminal.log {
            hasher.update(line.as_bytes());
        }
        for capture in &terminal.captures {
            hasher.update(capture.time.as_bytes());
            hasher.update(capture.source.as_bytes());
            hasher.update(capture.destination.as_bytes());
            hasher.update(capture.protocol.as_bytes());
            hasher.update(capture.info.as_bytes());
        }
    }
    hasher.update(format!("{:?}", view.session_status).as_bytes());
    if let Some(message) = &view.session_message {
        hasher.update(message.as_bytes());
    }
    hex::encode(hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::demo_snapshot;

    #[test]
    fn virtual_drain_delivers_everything() {
        let clock = VirtualClock::new(0);
        let mut engine = DrillEngine::new(clock.clone());
        let snapshot = demo_snapshot("demo");
        let expected = snapshot.events.len();
        engine.apply_snapshot(snapshot);

        assert_eq!(drain_virtual(&mut engine, &clock), expected);
        assert_eq!(engine.pending_count(), 0);
    }

    #[test]
    fn replays_hash_identically() {
        let run = || {
            let clock = VirtualClock::new(0);
            let mut engine = DrillEngine::new(clock.clone());
            engine.apply_snapshot(demo_snapshot("demo"));
            drain_virtual(&mut engine, &clock);
            transcript_hash(&engine.view())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn different_transcripts_hash_differently() {
        let clock = VirtualClock::new(0);
        let mut engine = DrillEngine::new(clock.clone());
        engine.apply_snapshot(demo_snapshot("demo"));
        let before = transcript_hash(&engine.view());
        drain_virtual(&mut engine, &clock);
        let after = transcript_hash(&engine.view());
        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn async_pump_stops_when_session_finishes() {
        use drillhund_core::events::{StatusSignal, TaskUpdate};

        let clock = VirtualClock::new(0);
        let engine = Arc::new(Mutex::new(DrillEngine::new(clock.clone())));
        engine.lock().apply_snapshot(demo_snapshot("demo"));
        engine.lock().apply_update(TaskUpdate {
            status: Some(StatusSignal::Win),
            ..TaskUpdate::default()
        });

        // All deliveries were cancelled, so the pump returns immediately.
        run_until_drained(engine.clone(), Arc::new(MetricsRecorder::new())).await;
        assert_eq!(engine.lock().pending_count(), 0);
    }
}

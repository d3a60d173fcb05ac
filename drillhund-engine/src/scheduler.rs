//! ## drillhund-engine::scheduler
//! **Delayed event delivery with preserved relative spacing**
//!
//! Turns a batch of events carrying relative offsets into absolute delivery
//! deadlines on an injectable clock. Deliveries sit in an explicit min-queue
//! keyed by `(due_ns, sequence)`: no hidden timers, so a virtual clock can
//! replay an entire drill deterministically.
//!
//! The cursor keeps batches appended mid-drain on one continuous timeline;
//! once everything has fired it snaps back to "now" so unrelated future
//! batches do not inherit stale drift.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::{debug, trace};

use drillhund_core::events::TaskEvent;
use drillhund_core::time::{secs_to_ns, Clock};

struct Pending {
    due_ns: u64,
    seq: u64,
    event: TaskEvent,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.due_ns == other.due_ns && self.seq == other.seq
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    // Reversed so the BinaryHeap pops the earliest deadline first; the
    // sequence number keeps simultaneous deliveries in scheduling order.
    fn cmp(&self, other: &Self) -> Ordering {
        (other.due_ns, other.seq).cmp(&(self.due_ns, self.seq))
    }
}

/// Schedules batched events for delayed delivery while preserving their
/// relative spacing.
pub struct EventScheduler<C: Clock> {
    clock: C,
    cursor_ns: u64,
    next_seq: u64,
    pending: BinaryHeap<Pending>,
}

impl<C: Clock> EventScheduler<C> {
    pub fn new(clock: C) -> Self {
        let cursor_ns = clock.now_ns();
        Self {
            clock,
            cursor_ns,
            next_seq: 0,
            pending: BinaryHeap::new(),
        }
    }

    /// Number of deliveries scheduled but not yet fired.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// True while at least one delivery is still queued.
    pub fn is_draining(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Queues a batch for delivery. The batch is walked in ascending offset
    /// order (stable, so equal offsets keep arrival order) and each event is
    /// placed `max(offset - previous_offset, 0)` seconds after the cursor.
    ///
    /// With `reset_cursor`, or when nothing is pending, the timeline restarts
    /// at "now"; otherwise the batch continues the in-flight timeline.
    pub fn schedule(&mut self, batch: &[TaskEvent], reset_cursor: bool) {
        if batch.is_empty() {
            return;
        }

        let now = self.clock.now_ns();
        if reset_cursor || self.pending.is_empty() {
            self.cursor_ns = now;
        }

        let mut sorted: Vec<&TaskEvent> = batch.iter().collect();
        sorted.sort_by(|a, b| a.offset_secs.total_cmp(&b.offset_secs));

        let mut previous_offset = 0.0_f64;
        for event in sorted {
            let delta_secs = event.offset_secs - previous_offset;
            self.cursor_ns = self.cursor_ns.saturating_add(secs_to_ns(delta_secs));
            previous_offset = event.offset_secs;

            // No delivery may fire before the schedule call itself.
            let due_ns = self.cursor_ns.max(now);
            trace!(
                terminal = event.terminal,
                offset_secs = event.offset_secs,
                due_ns,
                "queueing delivery"
            );
            self.pending.push(Pending {
                due_ns,
                seq: self.next_seq,
                event: event.clone(),
            });
            self.next_seq += 1;
        }

        debug!(
            queued = batch.len(),
            pending = self.pending.len(),
            reset_cursor,
            "batch scheduled"
        );
    }

    /// Absolute deadline of the next delivery, if any.
    pub fn next_deadline_ns(&self) -> Option<u64> {
        self.pending.peek().map(|pending| pending.due_ns)
    }

    /// Pops every delivery due at the current clock reading, in deadline
    /// order with scheduling order breaking ties. When the queue drains, the
    /// cursor snaps back to "now".
    pub fn take_due(&mut self) -> Vec<TaskEvent> {
        let now = self.clock.now_ns();
        let mut due = Vec::new();
        while self
            .pending
            .peek()
            .is_some_and(|pending| pending.due_ns <= now)
        {
            if let Some(pending) = self.pending.pop() {
                due.push(pending.event);
            }
        }
        if !due.is_empty() && self.pending.is_empty() {
            self.cursor_ns = now;
        }
        due
    }

    /// Atomically drops every queued delivery and restarts the timeline.
    /// Required before loading a different task or tearing the session down.
    pub fn reset(&mut self) {
        let dropped = self.pending.len();
        self.pending.clear();
        self.cursor_ns = self.clock.now_ns();
        if dropped > 0 {
            debug!(dropped, "scheduler reset, pending deliveries cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drillhund_core::time::{VirtualClock, NANOS_PER_SEC};
    use proptest::prelude::*;

    fn batch(offsets: &[f64]) -> Vec<TaskEvent> {
        offsets
            .iter()
            .enumerate()
            .map(|(index, &offset)| TaskEvent::log(1, offset, format!("line-{index}")))
            .collect()
    }

    fn drain_all(scheduler: &mut EventScheduler<VirtualClock>, clock: &VirtualClock) -> Vec<TaskEvent> {
        let mut delivered = Vec::new();
        while let Some(deadline) = scheduler.next_deadline_ns() {
            let now = clock.now_ns();
            if deadline > now {
                clock.advance(deadline - now);
            }
            delivered.extend(scheduler.take_due());
        }
        delivered
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let clock = VirtualClock::new(0);
        let mut scheduler = EventScheduler::new(clock);
        scheduler.schedule(&[], true);
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(scheduler.next_deadline_ns(), None);
    }

    #[test]
    fn deliveries_follow_offset_order_not_arrival_order() {
        let clock = VirtualClock::new(0);
        let mut scheduler = EventScheduler::new(clock.clone());
        scheduler.schedule(&batch(&[5.0, 1.0, 3.0]), true);
        let delivered = drain_all(&mut scheduler, &clock);
        let texts: Vec<_> = delivered.iter().map(|e| e.text.clone().unwrap()).collect();
        assert_eq!(texts, vec!["line-1", "line-2", "line-0"]);
    }

    #[test]
    fn offsets_map_to_relative_deadlines() {
        // Events at offsets [1, 4] land at t0+1s and t0+4s: the second delta
        // is 3s from the first event, not recomputed from "now" at delivery.
        let clock = VirtualClock::new(0);
        let mut scheduler = EventScheduler::new(clock.clone());
        scheduler.schedule(&batch(&[1.0, 4.0]), true);

        assert_eq!(scheduler.next_deadline_ns(), Some(NANOS_PER_SEC));
        clock.advance(NANOS_PER_SEC);
        assert_eq!(scheduler.take_due().len(), 1);

        assert_eq!(scheduler.next_deadline_ns(), Some(4 * NANOS_PER_SEC));
        clock.advance(3 * NANOS_PER_SEC);
        assert_eq!(scheduler.take_due().len(), 1);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn equal_offsets_deliver_simultaneously_in_input_order() {
        let clock = VirtualClock::new(0);
        let mut scheduler = EventScheduler::new(clock.clone());
        let events = vec![TaskEvent::log(1, 1.0, "a"), TaskEvent::log(1, 1.0, "b")];
        scheduler.schedule(&events, true);

        clock.advance(NANOS_PER_SEC);
        let due = scheduler.take_due();
        let texts: Vec<_> = due.iter().map(|e| e.text.clone().unwrap()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn negative_offsets_clamp_to_immediate_delivery() {
        let clock = VirtualClock::new(10 * NANOS_PER_SEC);
        let mut scheduler = EventScheduler::new(clock.clone());
        scheduler.schedule(&batch(&[-3.0]), true);
        // Due immediately, never before the schedule call.
        assert_eq!(scheduler.next_deadline_ns(), Some(clock.now_ns()));
        assert_eq!(scheduler.take_due().len(), 1);
    }

    #[test]
    fn second_batch_continues_in_flight_timeline() {
        let clock = VirtualClock::new(0);
        let mut scheduler = EventScheduler::new(clock.clone());
        scheduler.schedule(&batch(&[1.0, 4.0]), true);

        clock.advance(NANOS_PER_SEC);
        assert_eq!(scheduler.take_due().len(), 1);

        // Still draining: the new batch extends the cursor at t0+4s.
        scheduler.schedule(&batch(&[2.0]), false);
        clock.advance(3 * NANOS_PER_SEC);
        assert_eq!(scheduler.take_due().len(), 1);
        assert_eq!(scheduler.next_deadline_ns(), Some(6 * NANOS_PER_SEC));
    }

    #[test]
    fn appending_mid_drain_never_moves_issued_deadlines() {
        let clock = VirtualClock::new(0);
        let mut scheduler = EventScheduler::new(clock.clone());
        scheduler.schedule(&batch(&[2.0]), true);
        let before = scheduler.next_deadline_ns();
        scheduler.schedule(&batch(&[1.0]), false);
        assert_eq!(scheduler.next_deadline_ns(), before);
    }

    #[test]
    fn drained_scheduler_starts_fresh_timeline() {
        let clock = VirtualClock::new(0);
        let mut scheduler = EventScheduler::new(clock.clone());
        scheduler.schedule(&batch(&[1.0]), true);
        clock.advance(NANOS_PER_SEC);
        assert_eq!(scheduler.take_due().len(), 1);

        // Long idle gap, then a new batch measured from "now".
        clock.advance(60 * NANOS_PER_SEC);
        scheduler.schedule(&batch(&[2.0]), false);
        assert_eq!(scheduler.next_deadline_ns(), Some(63 * NANOS_PER_SEC));
    }

    #[test]
    fn reset_is_total_and_idempotent() {
        let clock = VirtualClock::new(0);
        let mut scheduler = EventScheduler::new(clock.clone());
        scheduler.schedule(&batch(&[1.0, 2.0, 3.0]), true);
        assert_eq!(scheduler.pending_count(), 3);

        scheduler.reset();
        assert_eq!(scheduler.pending_count(), 0);
        clock.advance(60 * NANOS_PER_SEC);
        assert!(scheduler.take_due().is_empty());
        scheduler.reset();
        assert_eq!(scheduler.pending_count(), 0);
    }

    proptest! {
        #[test]
        fn delivery_order_is_non_decreasing(offsets in proptest::collection::vec(0.0_f64..60.0, 0..32)) {
            let clock = VirtualClock::new(0);
            let mut scheduler = EventScheduler::new(clock.clone());
            let events = batch(&offsets);
            let scheduled_at = clock.now_ns();
            scheduler.schedule(&events, true);
            prop_assert_eq!(scheduler.pending_count(), events.len());
            if let Some(deadline) = scheduler.next_deadline_ns() {
                prop_assert!(deadline >= scheduled_at);
            }

            let delivered = drain_all(&mut scheduler, &clock);
            prop_assert_eq!(delivered.len(), events.len());
            for pair in delivered.windows(2) {
                prop_assert!(pair[0].offset_secs <= pair[1].offset_secs);
            }
        }
    }
}

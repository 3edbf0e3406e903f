//! Timer system for framestep.
//!
//! Provides one-shot timers that the host drives from its own event loop. The
//! manager never sleeps or spawns anything: the host asks how long until the
//! next deadline, arranges to call back, and then calls
//! [`TimerManager::process_expired`] to collect the timers that are due.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

use slotmap::{SlotMap, new_key_type};

use crate::clock::Clock;
use crate::error::{Result, TimerError};

new_key_type! {
    /// A unique identifier for a timer.
    pub struct TimerId;
}

/// An entry in the timer queue (min-heap by fire time).
#[derive(Debug, Clone, Copy)]
struct TimerQueueEntry {
    id: TimerId,
    fire_time: Duration,
    /// Insertion order, so timers with equal deadlines fire first-in first-out.
    seq: u64,
}

impl PartialEq for TimerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time && self.seq == other.seq
    }
}

impl Eq for TimerQueueEntry {}

impl PartialOrd for TimerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap.
        other
            .fire_time
            .cmp(&self.fire_time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Manages pending one-shot timers.
pub struct TimerManager {
    clock: Arc<dyn Clock>,
    /// Deadlines of all pending timers.
    timers: SlotMap<TimerId, Duration>,
    /// Priority queue of pending fires. May hold stale entries for cancelled timers.
    queue: BinaryHeap<TimerQueueEntry>,
    next_seq: u64,
}

impl TimerManager {
    /// Create a new timer manager reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            timers: SlotMap::with_key(),
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// The clock this manager schedules against.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Start a one-shot timer that fires after the specified duration.
    ///
    /// Returns the timer ID that can be used to cancel the timer.
    pub fn start_one_shot(&mut self, duration: Duration) -> TimerId {
        let fire_time = self.clock.now() + duration;
        let id = self.timers.insert(fire_time);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(TimerQueueEntry { id, fire_time, seq });
        tracing::trace!(target: "framestep_core::timer", ?id, ?duration, "timer started");
        id
    }

    /// Cancel a pending timer.
    pub fn cancel(&mut self, id: TimerId) -> Result<()> {
        match self.timers.remove(id) {
            Some(_) => Ok(()),
            None => Err(TimerError::InvalidTimerId.into()),
        }
    }

    /// Check if a timer is still pending.
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.contains_key(id)
    }

    /// Get the duration until the next timer fires, if any.
    pub fn time_until_next(&mut self) -> Option<Duration> {
        self.discard_stale();
        let now = self.clock.now();
        self.queue
            .peek()
            .map(|entry| entry.fire_time.saturating_sub(now))
    }

    /// Remove and return every timer whose deadline has passed, earliest first.
    #[tracing::instrument(skip(self), target = "framestep_core::timer", level = "trace")]
    pub fn process_expired(&mut self) -> Vec<TimerId> {
        let now = self.clock.now();
        let mut fired = Vec::new();

        while let Some(entry) = self.queue.peek().copied() {
            if entry.fire_time > now {
                break;
            }
            self.queue.pop();

            if self.timers.remove(entry.id).is_some() {
                tracing::trace!(target: "framestep_core::timer", id = ?entry.id, "timer fired");
                fired.push(entry.id);
            }
        }

        fired
    }

    /// Cancel every pending timer.
    pub fn clear(&mut self) {
        self.timers.clear();
        self.queue.clear();
    }

    /// Get the number of pending timers.
    pub fn pending_count(&self) -> usize {
        self.timers.len()
    }

    fn discard_stale(&mut self) {
        while let Some(entry) = self.queue.peek() {
            if self.timers.contains_key(entry.id) {
                break;
            }
            self.queue.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn manager() -> (Arc<ManualClock>, TimerManager) {
        let clock = Arc::new(ManualClock::new());
        let timers = TimerManager::new(clock.clone());
        (clock, timers)
    }

    #[test]
    fn fires_in_deadline_order() {
        let (clock, mut timers) = manager();
        let late = timers.start_one_shot(Duration::from_millis(900));
        let early = timers.start_one_shot(Duration::from_millis(100));

        clock.advance(Duration::from_secs(1));
        assert_eq!(timers.process_expired(), vec![early, late]);
        assert_eq!(timers.pending_count(), 0);
    }

    #[test]
    fn equal_deadlines_fire_in_start_order() {
        let (clock, mut timers) = manager();
        let first = timers.start_one_shot(Duration::from_millis(700));
        let second = timers.start_one_shot(Duration::from_millis(700));

        clock.advance(Duration::from_millis(700));
        assert_eq!(timers.process_expired(), vec![first, second]);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let (clock, mut timers) = manager();
        let id = timers.start_one_shot(Duration::from_millis(10));
        assert!(timers.is_pending(id));
        timers.cancel(id).unwrap();
        assert!(!timers.is_pending(id));
        assert!(timers.cancel(id).is_err());

        clock.advance(Duration::from_millis(20));
        assert!(timers.process_expired().is_empty());
        assert_eq!(timers.time_until_next(), None);
    }

    #[test]
    fn time_until_next_counts_down() {
        let (clock, mut timers) = manager();
        timers.start_one_shot(Duration::from_millis(700));
        clock.advance(Duration::from_millis(200));
        assert_eq!(timers.time_until_next(), Some(Duration::from_millis(500)));
        clock.advance(Duration::from_secs(5));
        assert_eq!(timers.time_until_next(), Some(Duration::ZERO));
    }
}

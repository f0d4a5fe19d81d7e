//! Timer abstraction for the trigger poll loop.
//!
//! The host owns real time. The evaluator only asks for a repeating interval and
//! later cancels it; the host calls back with the handle on every tick.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Identifies one scheduled interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerHandle(pub Uuid);

impl TimerHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TimerHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Host-provided timer service.
pub trait Scheduler {
    fn schedule_interval(&mut self, interval: Duration) -> TimerHandle;

    /// Cancelling an unknown or already-cancelled handle is a no-op.
    fn cancel(&mut self, handle: TimerHandle);
}

/// A due tick produced by [`ManualScheduler::advance_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub handle: TimerHandle,
    /// Time the tick was due, in milliseconds.
    pub at_ms: u64,
}

#[derive(Debug, Clone)]
struct Timer {
    handle: TimerHandle,
    interval_ms: u64,
    /// `None` once the next tick would fall past `u64::MAX`.
    next_due_ms: Option<u64>,
}

/// Deterministic scheduler driven by explicit time steps.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    now_ms: u64,
    timers: Vec<Timer>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the clock at a given time.
    pub fn starting_at(now_ms: u64) -> Self {
        Self {
            now_ms,
            timers: Vec::new(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }

    /// Move the clock forward and return every tick that came due, in time order.
    pub fn advance_to(&mut self, now_ms: u64) -> Vec<Tick> {
        let now_ms = now_ms.max(self.now_ms);
        let mut ticks = Vec::new();

        for timer in &mut self.timers {
            while let Some(due) = timer.next_due_ms.filter(|due| *due <= now_ms) {
                ticks.push(Tick {
                    handle: timer.handle,
                    at_ms: due,
                });
                timer.next_due_ms = due.checked_add(timer.interval_ms);
            }
        }

        self.now_ms = now_ms;
        ticks.sort_by_key(|t| t.at_ms);
        ticks
    }

    pub fn advance_by(&mut self, ms: u64) -> Vec<Tick> {
        self.advance_to(self.now_ms.saturating_add(ms))
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_interval(&mut self, interval: Duration) -> TimerHandle {
        let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX).max(1);
        let handle = TimerHandle::new();
        self.timers.push(Timer {
            handle,
            interval_ms,
            next_due_ms: self.now_ms.checked_add(interval_ms),
        });
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.timers.retain(|t| t.handle != handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_come_due() {
        let mut scheduler = ManualScheduler::new();
        let handle = scheduler.schedule_interval(Duration::from_millis(100));

        assert!(scheduler.advance_to(99).is_empty());
        assert_eq!(
            scheduler.advance_to(100),
            vec![Tick {
                handle,
                at_ms: 100
            }]
        );

        let ticks = scheduler.advance_by(250);
        assert_eq!(
            ticks.iter().map(|t| t.at_ms).collect::<Vec<_>>(),
            vec![200, 300]
        );
    }

    #[test]
    fn test_cancel_stops_ticks() {
        let mut scheduler = ManualScheduler::starting_at(1_000);
        let handle = scheduler.schedule_interval(Duration::from_millis(10));

        scheduler.cancel(handle);
        scheduler.cancel(handle);

        assert!(scheduler.advance_by(1_000).is_empty());
        assert_eq!(scheduler.active_timers(), 0);
    }

    #[test]
    fn test_clock_end_does_not_overflow() {
        let mut scheduler = ManualScheduler::new();
        let handle = scheduler.schedule_interval(Duration::from_millis(u64::MAX / 2));

        let ticks = scheduler.advance_to(u64::MAX);
        assert_eq!(
            ticks,
            vec![
                Tick {
                    handle,
                    at_ms: u64::MAX / 2
                },
                Tick {
                    handle,
                    at_ms: u64::MAX - 1
                },
            ]
        );
        assert!(scheduler.advance_by(1).is_empty());
        assert_eq!(scheduler.now_ms(), u64::MAX);

        let late = scheduler.schedule_interval(Duration::from_millis(5));
        assert!(scheduler.advance_by(10).is_empty());
        scheduler.cancel(late);
    }

    #[test]
    fn test_time_never_goes_backwards() {
        let mut scheduler = ManualScheduler::starting_at(500);
        scheduler.advance_to(100);
        assert_eq!(scheduler.now_ms(), 500);
    }
}

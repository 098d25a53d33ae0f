//! Task and timer records.
//!
//! Crossbar specifies no scheduler policy; these are the bookkeeping
//! records an embedding driver schedules from. An element that owns a
//! [`Task`] overrides [`run_task`](crate::element::Element::run_task) and
//! usually registers the standard task handlers via
//! [`HandlerBuilder::add_task_handlers`](crate::router::HandlerBuilder::add_task_handlers).

use std::cell::Cell;
use std::time::{Duration, Instant};

/// A schedulable unit of element work.
#[derive(Debug)]
pub struct Task {
    scheduled: Cell<bool>,
    tickets: Cell<u32>,
    home_thread: Cell<usize>,
}

impl Task {
    /// Largest permitted ticket count.
    pub const MAX_TICKETS: u32 = 1 << 15;

    /// Ticket count assigned to new tasks.
    pub const DEFAULT_TICKETS: u32 = 1 << 10;

    /// Create an unscheduled task with default tickets on thread 0.
    pub fn new() -> Self {
        Self {
            scheduled: Cell::new(false),
            tickets: Cell::new(Self::DEFAULT_TICKETS),
            home_thread: Cell::new(0),
        }
    }

    /// Whether the task is currently scheduled.
    pub fn scheduled(&self) -> bool {
        self.scheduled.get()
    }

    /// Mark the task runnable.
    pub fn reschedule(&self) {
        self.scheduled.set(true);
    }

    /// Remove the task from the run queue.
    pub fn unschedule(&self) {
        self.scheduled.set(false);
    }

    /// The task's share of scheduler bandwidth.
    pub fn tickets(&self) -> u32 {
        self.tickets.get()
    }

    /// Set the task's tickets. Values are clamped to
    /// `1..=MAX_TICKETS`.
    pub fn set_tickets(&self, tickets: u32) {
        self.tickets.set(tickets.clamp(1, Self::MAX_TICKETS));
    }

    /// The thread this task prefers to run on.
    pub fn home_thread_id(&self) -> usize {
        self.home_thread.get()
    }

    /// Pin the task to a thread.
    pub fn set_home_thread_id(&self, thread: usize) {
        self.home_thread.set(thread);
    }
}

impl Default for Task {
    fn default() -> Self {
        Self::new()
    }
}

/// A one-shot timer.
///
/// An element that owns a `Timer` overrides
/// [`run_timer`](crate::element::Element::run_timer); the driver fires the
/// hook when the expiry passes.
#[derive(Debug, Default)]
pub struct Timer {
    expiry: Cell<Option<Instant>>,
}

impl Timer {
    /// Create an unscheduled timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule the timer `delay` from now.
    pub fn schedule_after(&self, delay: Duration) {
        self.expiry.set(Some(Instant::now() + delay));
    }

    /// Cancel the timer.
    pub fn unschedule(&self) {
        self.expiry.set(None);
    }

    /// Whether the timer is pending.
    pub fn scheduled(&self) -> bool {
        self.expiry.get().is_some()
    }

    /// When the timer fires, if scheduled.
    pub fn expiry(&self) -> Option<Instant> {
        self.expiry.get()
    }
}

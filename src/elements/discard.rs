//! Discard - drop everything, on push or pull paths.

use crate::element::{Context, Element, PORTS_1_0};
use crate::error::Result;
use crate::packet::Packet;
use crate::report::ErrorHandler;
use crate::router::HandlerBuilder;
use crate::schedule::Task;

/// Drops every packet it receives.
///
/// On a push path, packets are dropped as they arrive. On a pull path,
/// the element's [`Task`] pulls from upstream and drops whatever comes
/// back. Handlers: `count` (read), `reset` (write), plus the standard
/// task handlers under `task_`.
#[derive(Debug, Default)]
pub struct Discard {
    count: u64,
    task: Task,
}

impl Discard {
    /// Create a new Discard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Packets dropped so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// The task draining a pull path.
    pub fn task(&self) -> &Task {
        &self.task
    }
}

impl Element for Discard {
    fn class_name(&self) -> &'static str {
        "Discard"
    }

    fn port_count(&self) -> &'static str {
        PORTS_1_0
    }

    fn initialize(&mut self, ctx: &Context<'_>, _errh: &mut dyn ErrorHandler) -> Result<()> {
        // Only a pull input needs driving.
        if ctx.input(0).allowed() {
            self.task.reschedule();
        }
        Ok(())
    }

    fn add_handlers(&self, handlers: &mut HandlerBuilder<'_>) {
        handlers.add_read("count", |el, _ctx| match el.downcast_ref::<Discard>() {
            Some(d) => format!("{}\n", d.count),
            None => String::new(),
        });
        handlers.add_write("reset", |_data, el, _ctx, _errh| {
            if let Some(d) = el.downcast_mut::<Discard>() {
                d.count = 0;
            }
            Ok(())
        });
        handlers.add_task_handlers("task_", |el| {
            &el.downcast_ref::<Discard>()
                .expect("task handler bound to Discard")
                .task
        });
    }

    fn push(&mut self, _ctx: &Context<'_>, _port: usize, _packet: Packet) {
        self.count += 1;
    }

    fn run_task(&mut self, ctx: &Context<'_>) -> bool {
        match ctx.input(0).pull() {
            Some(_) => {
                self.count += 1;
                true
            }
            None => false,
        }
    }
}

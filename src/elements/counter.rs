//! Counter - count packets and bytes passing through.

use crate::element::{Element, PORTS_1_1};
use crate::packet::Packet;
use crate::router::HandlerBuilder;

/// Passes packets through unchanged, counting packets and bytes.
///
/// Works on push and pull paths alike via the `simple_action` bridge.
/// Handlers: `count` and `byte_count` (read), `reset` (write).
#[derive(Debug, Default)]
pub struct Counter {
    count: u64,
    byte_count: u64,
}

impl Counter {
    /// Create a new Counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Packets seen since the last reset.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Bytes seen since the last reset.
    pub fn byte_count(&self) -> u64 {
        self.byte_count
    }

    /// Zero the counters.
    pub fn reset(&mut self) {
        self.count = 0;
        self.byte_count = 0;
    }
}

impl Element for Counter {
    fn class_name(&self) -> &'static str {
        "Counter"
    }

    fn port_count(&self) -> &'static str {
        PORTS_1_1
    }

    fn simple_action(&mut self, packet: Packet) -> Option<Packet> {
        self.count += 1;
        self.byte_count += packet.len() as u64;
        Some(packet)
    }

    fn add_handlers(&self, handlers: &mut HandlerBuilder<'_>) {
        handlers.add_read("count", |el, _ctx| {
            match el.downcast_ref::<Counter>() {
                Some(c) => format!("{}\n", c.count),
                None => String::new(),
            }
        });
        handlers.add_read("byte_count", |el, _ctx| {
            match el.downcast_ref::<Counter>() {
                Some(c) => format!("{}\n", c.byte_count),
                None => String::new(),
            }
        });
        handlers.add_write("reset", |_data, el, _ctx, _errh| {
            if let Some(c) = el.downcast_mut::<Counter>() {
                c.reset();
            }
            Ok(())
        });
    }
}

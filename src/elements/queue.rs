//! Queue - push-to-pull packet buffer.

use crate::element::{Context, Element, PUSH_TO_PULL};
use crate::error::{Error, Result};
use crate::packet::Packet;
use crate::report::ErrorHandler;
use crate::router::HandlerBuilder;
use std::collections::VecDeque;

const DEFAULT_CAPACITY: usize = 1000;

/// Buffers packets between a push path and a pull path.
///
/// Upstream pushes into the queue; downstream pulls from it. Packets
/// arriving at a full queue are dropped and counted. Configuration: an
/// optional capacity (default 1000). Live reconfiguration keeps buffered
/// packets, dropping from the front if the new capacity is smaller; a
/// hotswap replacement inherits the predecessor's packets the same way.
///
/// Handlers: `length`, `capacity`, `drops` (read).
#[derive(Debug)]
pub struct Queue {
    packets: VecDeque<Packet>,
    capacity: usize,
    drops: u64,
}

impl Queue {
    /// Create a Queue with the default capacity.
    pub fn new() -> Self {
        Self {
            packets: VecDeque::new(),
            capacity: DEFAULT_CAPACITY,
            drops: 0,
        }
    }

    /// Packets currently buffered.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Whether no packets are buffered.
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Maximum number of buffered packets.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Packets dropped because the queue was full.
    pub fn drops(&self) -> u64 {
        self.drops
    }

    fn parse_capacity(args: &[String], errh: &mut dyn ErrorHandler) -> Result<usize> {
        match args {
            [] => Ok(DEFAULT_CAPACITY),
            [arg] => match arg.parse::<usize>() {
                Ok(n) if n > 0 => Ok(n),
                _ => {
                    errh.error(&format!("expected capacity, not '{arg}'"));
                    Err(Error::ConfigureFailed)
                }
            },
            _ => {
                errh.error("expected at most one argument");
                Err(Error::ConfigureFailed)
            }
        }
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for Queue {
    fn class_name(&self) -> &'static str {
        "Queue"
    }

    fn port_count(&self) -> &'static str {
        "1/1"
    }

    fn processing(&self) -> &'static str {
        PUSH_TO_PULL
    }

    fn configure(
        &mut self,
        _ctx: &Context<'_>,
        args: &[String],
        errh: &mut dyn ErrorHandler,
    ) -> Result<()> {
        self.capacity = Self::parse_capacity(args, errh)?;
        Ok(())
    }

    fn can_live_reconfigure(&self) -> bool {
        true
    }

    fn live_reconfigure(
        &mut self,
        _ctx: &Context<'_>,
        args: &[String],
        errh: &mut dyn ErrorHandler,
    ) -> Result<()> {
        // Unlike configure, buffered packets must survive: shrink from
        // the front only once the new capacity is known to be valid.
        let capacity = Self::parse_capacity(args, errh)?;
        self.capacity = capacity;
        while self.packets.len() > capacity {
            self.packets.pop_front();
            self.drops += 1;
        }
        Ok(())
    }

    fn configuration(&self) -> Option<Vec<String>> {
        Some(vec![self.capacity.to_string()])
    }

    fn take_state(&mut self, old: &mut dyn Element, _errh: &mut dyn ErrorHandler) {
        let Some(old) = old.downcast_mut::<Queue>() else {
            return;
        };
        self.packets = std::mem::take(&mut old.packets);
        self.drops = old.drops;
        while self.packets.len() > self.capacity {
            self.packets.pop_front();
            self.drops += 1;
        }
    }

    fn add_handlers(&self, handlers: &mut HandlerBuilder<'_>) {
        handlers.add_read("length", |el, _ctx| match el.downcast_ref::<Queue>() {
            Some(q) => format!("{}\n", q.len()),
            None => String::new(),
        });
        handlers.add_read("capacity", |el, _ctx| match el.downcast_ref::<Queue>() {
            Some(q) => format!("{}\n", q.capacity),
            None => String::new(),
        });
        handlers.add_read("drops", |el, _ctx| match el.downcast_ref::<Queue>() {
            Some(q) => format!("{}\n", q.drops),
            None => String::new(),
        });
    }

    fn push(&mut self, _ctx: &Context<'_>, _port: usize, packet: Packet) {
        if self.packets.len() < self.capacity {
            self.packets.push_back(packet);
        } else {
            self.drops += 1;
        }
    }

    fn pull(&mut self, _ctx: &Context<'_>, _port: usize) -> Option<Packet> {
        self.packets.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementId;
    use crate::report::BufferedErrorHandler;
    use crate::router::Router;

    fn ctx_fixture() -> Router {
        Router::new()
    }

    #[test]
    fn test_push_pull_fifo() {
        let router = ctx_fixture();
        let ctx = Context::new(&router, ElementId(0));
        let mut q = Queue::new();
        q.push(&ctx, 0, Packet::from_static(b"a"));
        q.push(&ctx, 0, Packet::from_static(b"b"));
        assert_eq!(q.len(), 2);
        assert_eq!(q.pull(&ctx, 0), Some(Packet::from_static(b"a")));
        assert_eq!(q.pull(&ctx, 0), Some(Packet::from_static(b"b")));
        assert_eq!(q.pull(&ctx, 0), None);
    }

    #[test]
    fn test_full_queue_drops() {
        let router = ctx_fixture();
        let ctx = Context::new(&router, ElementId(0));
        let mut q = Queue::new();
        let mut errh = BufferedErrorHandler::new();
        q.configure(&ctx, &["2".to_string()], &mut errh).unwrap();
        for _ in 0..3 {
            q.push(&ctx, 0, Packet::from_static(b"p"));
        }
        assert_eq!(q.len(), 2);
        assert_eq!(q.drops(), 1);
    }

    #[test]
    fn test_live_reconfigure_keeps_packets() {
        let router = ctx_fixture();
        let ctx = Context::new(&router, ElementId(0));
        let mut q = Queue::new();
        let mut errh = BufferedErrorHandler::new();
        for _ in 0..4 {
            q.push(&ctx, 0, Packet::from_static(b"p"));
        }
        q.live_reconfigure(&ctx, &["2".to_string()], &mut errh)
            .unwrap();
        assert_eq!(q.capacity(), 2);
        assert_eq!(q.len(), 2);

        // A rejected reconfiguration leaves everything alone.
        assert!(q
            .live_reconfigure(&ctx, &["zero".to_string()], &mut errh)
            .is_err());
        assert_eq!(q.capacity(), 2);
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn test_take_state_inherits_packets() {
        let router = ctx_fixture();
        let ctx = Context::new(&router, ElementId(0));
        let mut old = Queue::new();
        for _ in 0..3 {
            old.push(&ctx, 0, Packet::from_static(b"p"));
        }
        let mut new = Queue::new();
        let mut errh = BufferedErrorHandler::new();
        new.configure(&ctx, &["2".to_string()], &mut errh).unwrap();
        let mut old_dyn: Box<dyn Element> = Box::new(old);
        new.take_state(old_dyn.as_mut(), &mut errh);
        assert_eq!(new.len(), 2);
        assert_eq!(new.drops(), 1);
    }
}

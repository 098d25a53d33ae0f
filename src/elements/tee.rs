//! Tee - replicate each packet to every output.

use crate::element::{Context, Element, PUSH};
use crate::packet::Packet;

/// Pushes a copy of each incoming packet to every output port.
///
/// One push input, one or more push outputs. The original packet goes to
/// the last output; earlier outputs receive clones.
#[derive(Debug, Default)]
pub struct Tee;

impl Tee {
    /// Create a new Tee.
    pub fn new() -> Self {
        Self
    }
}

impl Element for Tee {
    fn class_name(&self) -> &'static str {
        "Tee"
    }

    fn port_count(&self) -> &'static str {
        "1/1-"
    }

    fn processing(&self) -> &'static str {
        PUSH
    }

    fn push(&mut self, ctx: &Context<'_>, _port: usize, packet: Packet) {
        let n = ctx.noutputs();
        for port in 0..n.saturating_sub(1) {
            ctx.output(port).push(packet.clone());
        }
        if n > 0 {
            ctx.output(n - 1).push(packet);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specifiers() {
        let tee = Tee::new();
        assert_eq!(tee.class_name(), "Tee");
        assert_eq!(tee.port_count(), "1/1-");
        assert_eq!(tee.processing(), PUSH);
    }
}

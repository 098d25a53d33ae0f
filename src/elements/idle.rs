//! Idle - a discarding endpoint.

use crate::element::{Context, Element};
use crate::packet::Packet;

/// Discards every packet it receives and produces none.
///
/// Useful for capping unused push outputs or pull inputs anywhere in a
/// configuration: any number of connections is accepted on either side.
/// The flow code `"x/y"` declares that its input and output sides are
/// decoupled, so reachability analysis never looks through it.
#[derive(Debug, Default)]
pub struct Idle {
    dropped: u64,
}

impl Idle {
    /// Create a new Idle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of packets discarded.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Element for Idle {
    fn class_name(&self) -> &'static str {
        "Idle"
    }

    fn port_count(&self) -> &'static str {
        "-/-"
    }

    fn flow_code(&self) -> &'static str {
        "x/y"
    }

    fn push(&mut self, _ctx: &Context<'_>, _port: usize, _packet: Packet) {
        self.dropped += 1;
    }

    fn pull(&mut self, _ctx: &Context<'_>, _port: usize) -> Option<Packet> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::AGNOSTIC;

    #[test]
    fn test_specifiers() {
        let idle = Idle::new();
        assert_eq!(idle.class_name(), "Idle");
        assert_eq!(idle.port_count(), "-/-");
        assert_eq!(idle.processing(), AGNOSTIC);
        assert_eq!(idle.flow_code(), "x/y");
    }
}

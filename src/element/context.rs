//! Element runtime context.
//!
//! A [`Context`] is handed to every element hook. It identifies the
//! element within its router and exposes the two stylized transfer
//! formulations:
//!
//! ```rust,ignore
//! ctx.output(i).push(packet);          // hand a packet downstream
//! let p = ctx.input(i).pull();         // request a packet from upstream
//! ```
//!
//! Active ports dispatch directly to their single peer; transfers on
//! inactive or unconnected ports are silent no-ops. Both calls complete
//! synchronously: a push returns only after the entire downstream chain
//! has consumed the packet, which is the framework's latency and
//! back-pressure mechanism.

use crate::element::port::Port;
use crate::element::ElementId;
use crate::packet::Packet;
use crate::router::Router;
use crate::stats;

/// Runtime context for one element's hooks.
pub struct Context<'r> {
    router: &'r Router,
    eid: ElementId,
}

impl<'r> Context<'r> {
    pub(crate) fn new(router: &'r Router, eid: ElementId) -> Self {
        Self { router, eid }
    }

    /// The owning router.
    pub fn router(&self) -> &'r Router {
        self.router
    }

    /// This element's index in the router table.
    pub fn element_id(&self) -> ElementId {
        self.eid
    }

    /// This element's configuration-declared name.
    pub fn name(&self) -> &'r str {
        self.router.ename(self.eid)
    }

    /// Where this element was declared (e.g. `file:line`).
    pub fn landmark(&self) -> &'r str {
        self.router.elandmark(self.eid)
    }

    /// `name :: ClassName`, for diagnostics.
    pub fn declaration(&self) -> String {
        self.router.declaration(self.eid)
    }

    /// Number of input ports.
    pub fn ninputs(&self) -> usize {
        self.router.ninputs(self.eid)
    }

    /// Number of output ports.
    pub fn noutputs(&self) -> usize {
        self.router.noutputs(self.eid)
    }

    /// Handle on input port `port`.
    ///
    /// # Panics
    ///
    /// Panics if `port` is out of range.
    pub fn input(&self, port: usize) -> InputPort<'r> {
        InputPort {
            router: self.router,
            port: self.router.iport(self.eid, port),
        }
    }

    /// Handle on output port `port`.
    ///
    /// # Panics
    ///
    /// Panics if `port` is out of range.
    pub fn output(&self, port: usize) -> OutputPort<'r> {
        OutputPort {
            router: self.router,
            port: self.router.oport(self.eid, port),
        }
    }

    /// Push `packet` on output `port` if that port exists; otherwise the
    /// packet is dropped.
    pub fn checked_push(&self, port: usize, packet: Packet) {
        if port < self.noutputs() {
            self.output(port).push(packet);
        }
    }

    /// The outgoing configuration during a hotswap, if any.
    pub fn hotswap_router(&self) -> Option<&'r Router> {
        self.router.hotswap_router()
    }
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("element", &self.declaration())
            .finish()
    }
}

/// Handle on an output port.
pub struct OutputPort<'r> {
    router: &'r Router,
    port: &'r Port,
}

impl OutputPort<'_> {
    /// True iff this is an active (push) output.
    pub fn allowed(&self) -> bool {
        self.port.allowed()
    }

    /// Packets pushed through this port so far.
    pub fn npackets(&self) -> u64 {
        self.port.npackets()
    }

    /// Hand `packet` to the connected input.
    ///
    /// Invokes the peer element's `push` hook directly; on an inactive or
    /// unconnected port the packet is silently dropped.
    pub fn push(&self, packet: Packet) {
        match self.port.peer() {
            Some((peer, peer_port)) => {
                self.port.account();
                stats::record_push(packet.len());
                self.router.deliver_push(peer, peer_port, packet);
            }
            None => tracing::trace!(target: "crossbar", "push on inactive output dropped"),
        }
    }
}

/// Handle on an input port.
pub struct InputPort<'r> {
    router: &'r Router,
    port: &'r Port,
}

impl InputPort<'_> {
    /// True iff this is an active (pull) input.
    pub fn allowed(&self) -> bool {
        self.port.allowed()
    }

    /// Packets pulled through this port so far.
    pub fn npackets(&self) -> u64 {
        self.port.npackets()
    }

    /// Request a packet from the connected output.
    ///
    /// Invokes the peer element's `pull` hook directly; on an inactive or
    /// unconnected port returns `None`.
    pub fn pull(&self) -> Option<Packet> {
        let (peer, peer_port) = self.port.peer()?;
        let packet = self.router.deliver_pull(peer, peer_port)?;
        self.port.account();
        stats::record_pull(packet.len());
        Some(packet)
    }
}

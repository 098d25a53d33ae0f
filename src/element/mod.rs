//! The element abstraction.
//!
//! An [`Element`] is a node in the packet-processing graph. The trait is
//! the whole per-class contract: identity (`class_name`, `cast`), the
//! three specifier strings (`port_count`, `processing`, `flow_code`),
//! configuration and initialization hooks, packet transfer (`push`,
//! `pull`, `simple_action`), and the out-of-band surfaces (tasks, timers,
//! select callbacks, llrpc). Almost every method has a default; a minimal
//! element overrides only `class_name` and whichever transfer hook it
//! needs.
//!
//! Elements never own their wiring. The [`Router`](crate::router::Router)
//! owns the element table and port arrays, resolves the specifiers
//! against the actual wiring, and drives the lifecycle:
//!
//! ```text
//! attach → resolve port counts → configure → add_handlers →
//! initialize → (take_state) → running → cleanup
//! ```
//!
//! During any hook an element reaches its surroundings through the
//! [`Context`] handed in: `ctx.output(0).push(p)` hands a packet to the
//! downstream peer, `ctx.input(0).pull()` requests one from upstream.

mod context;
pub mod flow;
mod port;
pub mod port_count;
mod processing;

pub use context::{Context, InputPort, OutputPort};
pub use flow::Bitvector;
pub use port::Port;
pub use processing::{processing_vector, Processing};

pub(crate) use port::Ports;

use crate::error::{Error, Result};
use crate::packet::Packet;
use crate::report::ErrorHandler;
use crate::router::HandlerBuilder;
use crate::schedule::Timer;
use std::any::Any;

/// Index of an element in its router's element table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub(crate) usize);

impl ElementId {
    /// The underlying table index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Port-count specifier: no inputs, no outputs.
pub const PORTS_0_0: &str = "0";
/// Port-count specifier: no inputs, one output.
pub const PORTS_0_1: &str = "0/1";
/// Port-count specifier: one input, no outputs.
pub const PORTS_1_0: &str = "1/0";
/// Port-count specifier: one input, one output.
pub const PORTS_1_1: &str = "1";

/// Processing specifier: all ports agnostic.
pub const AGNOSTIC: &str = "a";
/// Processing specifier: all ports push.
pub const PUSH: &str = "h";
/// Processing specifier: all ports pull.
pub const PULL: &str = "l";
/// Processing specifier: push inputs, pull outputs.
pub const PUSH_TO_PULL: &str = "h/l";
/// Processing specifier: pull inputs, push outputs.
pub const PULL_TO_PUSH: &str = "l/h";

/// Flow code: packets may travel from any input to any output.
pub const COMPLETE_FLOW: &str = "x/x";

/// Configure before all other elements.
pub const CONFIGURE_PHASE_FIRST: i32 = 0;
/// Configure early; appropriate for information elements.
pub const CONFIGURE_PHASE_INFO: i32 = 20;
/// Configure while elevated privileges may still be held.
pub const CONFIGURE_PHASE_PRIVILEGED: i32 = 90;
/// The default configure phase.
pub const CONFIGURE_PHASE_DEFAULT: i32 = 100;
/// Configure after all other elements.
pub const CONFIGURE_PHASE_LAST: i32 = 2000;

/// How far an element made it through initialization before cleanup.
///
/// [`Element::cleanup`] is called exactly once per element with the
/// furthest stage reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CleanupStage {
    /// The element was never attached to a router.
    NoRouter,
    /// `configure` ran and failed.
    ConfigureFailed,
    /// `configure` succeeded but `initialize` never ran.
    Configured,
    /// `initialize` ran and failed.
    InitializeFailed,
    /// `initialize` succeeded but the router never came up.
    Initialized,
    /// The whole router was successfully initialized.
    RouterInitialized,
    /// Explicit cleanup requested by element code.
    Manual,
}

/// A node in the packet-processing graph.
///
/// See the [module documentation](self) for the lifecycle and transfer
/// model. All methods except [`class_name`](Element::class_name) have
/// defaults.
pub trait Element: Any {
    /// The element's class name.
    fn class_name(&self) -> &'static str;

    /// Whether this element provides the named class or capability.
    ///
    /// String-keyed so that elements can expose interfaces (and base
    /// classes) without runtime type introspection. The default matches
    /// only `class_name()`. For concrete-type access use
    /// `downcast_ref` on `dyn Element` instead.
    fn cast(&self, name: &str) -> bool {
        name == self.class_name()
    }

    /// The port-count specifier; see [`port_count`](crate::element::port_count).
    fn port_count(&self) -> &'static str {
        PORTS_0_0
    }

    /// The processing specifier; see [`processing_vector`].
    fn processing(&self) -> &'static str {
        AGNOSTIC
    }

    /// The flow code; see [`flow`](crate::element::flow).
    fn flow_code(&self) -> &'static str {
        COMPLETE_FLOW
    }

    /// Free-form element flags.
    fn flags(&self) -> &'static str {
        ""
    }

    /// Ordering key for `configure` and `initialize` across elements.
    ///
    /// Lower phases configure first; cleanup runs in reverse phase order.
    fn configure_phase(&self) -> i32 {
        CONFIGURE_PHASE_DEFAULT
    }

    /// Parse configuration arguments and set up element state.
    ///
    /// Called once per element in ascending `configure_phase` order.
    /// Every element's `configure` runs even if an earlier one failed, so
    /// the user sees all configuration errors at once. Report problems to
    /// `errh`; the element reference is supplied as context.
    ///
    /// The default accepts only an empty argument vector.
    fn configure(
        &mut self,
        ctx: &Context<'_>,
        args: &[String],
        errh: &mut dyn ErrorHandler,
    ) -> Result<()> {
        let _ = ctx;
        if args.is_empty() {
            Ok(())
        } else {
            errh.error("expected no arguments");
            Err(Error::ConfigureFailed)
        }
    }

    /// Register named handlers.
    ///
    /// Called after every `configure` succeeded and connections are
    /// validated, before `initialize`. The standard handlers (`class`,
    /// `name`, `config`, `ports`, `handlers`, `icounts`, `ocounts`) are
    /// registered by the router; their names are reserved.
    fn add_handlers(&self, handlers: &mut HandlerBuilder<'_>) {
        let _ = handlers;
    }

    /// Final setup; the last chance to abort installation.
    ///
    /// Runs in `configure_phase` order. Unlike `configure`, the first
    /// failure stops all remaining initializations.
    fn initialize(&mut self, ctx: &Context<'_>, errh: &mut dyn ErrorHandler) -> Result<()> {
        let _ = (ctx, errh);
        Ok(())
    }

    /// Inherit state from a predecessor during a hotswap.
    ///
    /// `old` is the element returned by
    /// [`hotswap_element`](Element::hotswap_element) in the outgoing
    /// configuration, which is stopped but not yet cleaned up.
    /// Implementations usually begin with a `downcast_mut` and silently
    /// return when the predecessor has a different class.
    fn take_state(&mut self, old: &mut dyn Element, errh: &mut dyn ErrorHandler) {
        let _ = (old, errh);
    }

    /// Locate a compatible predecessor in the hotswap router.
    ///
    /// The default returns the element with the same name, if any.
    fn hotswap_element(&self, ctx: &Context<'_>) -> Option<ElementId> {
        ctx.hotswap_router()?.find(ctx.name())
    }

    /// Release resources. Called exactly once, with the furthest
    /// lifecycle stage the element reached.
    fn cleanup(&mut self, stage: CleanupStage) {
        let _ = stage;
    }

    /// Whether writes to the `config` handler may reconfigure this
    /// element while the router runs.
    fn can_live_reconfigure(&self) -> bool {
        false
    }

    /// Re-apply configuration against a running element.
    ///
    /// Must be atomic: on error the element's state is unchanged. The
    /// default delegates to `configure`, which is sound only when that
    /// method does not disturb state on failure.
    fn live_reconfigure(
        &mut self,
        ctx: &Context<'_>,
        args: &[String],
        errh: &mut dyn ErrorHandler,
    ) -> Result<()> {
        if self.can_live_reconfigure() {
            self.configure(ctx, args, errh)
        } else {
            errh.error("cannot reconfigure live");
            Err(Error::LiveReconfigureRejected)
        }
    }

    /// The element's current configuration arguments, if derived from
    /// element state.
    ///
    /// Returning `None` (the default) means the element relies on the
    /// router's stored configuration string: reads of `config` return the
    /// stored string with its whitespace preserved, and keyword
    /// reconfiguration refuses to run (it could silently drop state a
    /// handler changed since). Elements whose handlers mutate
    /// configuration-visible state should return the arguments rebuilt
    /// from that state.
    fn configuration(&self) -> Option<Vec<String>> {
        None
    }

    /// Consume a packet arriving on push input `port`.
    ///
    /// Must account for the packet: push it on, store it, or drop it.
    /// The default bridges through [`simple_action`](Element::simple_action)
    /// and pushes any result to output 0.
    fn push(&mut self, ctx: &Context<'_>, port: usize, packet: Packet) {
        let _ = port;
        if let Some(p) = self.simple_action(packet) {
            ctx.output(0).push(p);
        }
    }

    /// Produce a packet for pull output `port`, or `None`.
    ///
    /// The default pulls from input 0 and filters through
    /// [`simple_action`](Element::simple_action).
    fn pull(&mut self, ctx: &Context<'_>, port: usize) -> Option<Packet> {
        let _ = port;
        let packet = ctx.input(0).pull()?;
        self.simple_action(packet)
    }

    /// One-in, one-out convenience for simple packet filters.
    ///
    /// Works identically on push and pull paths via the default `push`
    /// and `pull` bridges. Return `None` to drop the packet.
    fn simple_action(&mut self, packet: Packet) -> Option<Packet> {
        Some(packet)
    }

    /// Scheduler-invoked unit of work.
    ///
    /// Returns true if useful work was done. Elements that own a
    /// [`Task`](crate::schedule::Task) must override this.
    fn run_task(&mut self, ctx: &Context<'_>) -> bool {
        let _ = ctx;
        panic!("{}: run_task not overridden", self.class_name());
    }

    /// Timer expiry callback. Elements that own a
    /// [`Timer`](crate::schedule::Timer) must override this.
    fn run_timer(&mut self, ctx: &Context<'_>, timer: &Timer) {
        let _ = (ctx, timer);
        panic!("{}: run_timer not overridden", self.class_name());
    }

    /// File-descriptor readiness callback. Elements that register with
    /// [`Router::add_select`](crate::router::Router::add_select) must
    /// override this.
    fn selected(&mut self, ctx: &Context<'_>, fd: i32) {
        let _ = (ctx, fd);
        panic!("{}: selected not overridden", self.class_name());
    }

    /// Low-level RPC endpoint for out-of-band control.
    ///
    /// Implementations should handle the commands they understand and
    /// return [`Error::UnknownCommand`] otherwise, as the default does.
    fn llrpc(&mut self, command: u32, data: &mut dyn Any) -> Result<()> {
        let _ = data;
        Err(Error::UnknownCommand(command))
    }
}

impl dyn Element {
    /// Downcast a shared element reference to a concrete class.
    pub fn downcast_ref<T: Element>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }

    /// Downcast a mutable element reference to a concrete class.
    pub fn downcast_mut<T: Element>(&mut self) -> Option<&mut T> {
        (self as &mut dyn Any).downcast_mut::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Minimal;

    impl Element for Minimal {
        fn class_name(&self) -> &'static str {
            "Minimal"
        }
    }

    #[test]
    fn test_defaults() {
        let e = Minimal;
        assert_eq!(e.port_count(), PORTS_0_0);
        assert_eq!(e.processing(), AGNOSTIC);
        assert_eq!(e.flow_code(), COMPLETE_FLOW);
        assert_eq!(e.configure_phase(), CONFIGURE_PHASE_DEFAULT);
        assert!(!e.can_live_reconfigure());
        assert!(e.configuration().is_none());
    }

    #[test]
    fn test_cast_matches_class_name() {
        let e = Minimal;
        assert!(e.cast("Minimal"));
        assert!(!e.cast("Other"));
    }

    #[test]
    fn test_downcast() {
        let mut boxed: Box<dyn Element> = Box::new(Minimal);
        assert!(boxed.downcast_ref::<Minimal>().is_some());
        assert!(boxed.downcast_mut::<Minimal>().is_some());
    }

    #[test]
    fn test_default_llrpc_unknown() {
        let mut e = Minimal;
        let mut data = 0u32;
        assert!(matches!(
            e.llrpc(0x4004_0001, &mut data),
            Err(Error::UnknownCommand(0x4004_0001))
        ));
    }
}

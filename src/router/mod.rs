//! The element container.
//!
//! A [`Router`] owns a table of elements and the connections between
//! their ports, resolves every element's specifier strings against the
//! actual wiring, and drives the lifecycle:
//!
//! 1. `add_element` / `add_connection` build the table (state `New`);
//! 2. [`Router::initialize`] resolves port counts, runs every
//!    `configure` (collecting all errors), resolves and propagates
//!    processing disciplines, freezes the ports, installs connections on
//!    the active sides, registers handlers, runs `initialize` in phase
//!    order, and performs the hotswap `take_state` pass;
//! 3. transfers flow while the router is `Live`;
//! 4. cleanup runs exactly once per element, in reverse phase order,
//!    with the furthest stage each element reached.

mod handlers;

pub use handlers::{
    keyword_read, keyword_reconfigure, positional_read, positional_reconfigure, HandlerBuilder,
};

pub(crate) use handlers::HandlerMap;

use crate::config;
use crate::element::flow::{port_flow as flow_query, Bitvector};
use crate::element::port_count::PortCount;
use crate::element::{
    processing_vector, CleanupStage, Context, Element, ElementId, Port, Ports, Processing,
};
use crate::error::{Error, Result};
use crate::packet::Packet;
use crate::report::{ErrorHandler, PrefixErrorHandler};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Select on readability.
pub const SELECT_READ: u8 = 1;
/// Select on writability.
pub const SELECT_WRITE: u8 = 2;

static ELEMENTS_ALLOCATED: AtomicUsize = AtomicUsize::new(0);

/// Number of elements currently attached to routers, process-wide.
pub fn elements_allocated() -> usize {
    ELEMENTS_ALLOCATED.load(Ordering::Relaxed)
}

/// Lifecycle state of a router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum RouterState {
    /// Elements and connections are being added.
    #[default]
    New,
    /// `configure` methods are running; ports are still mutable.
    Preconfigure,
    /// Connections validated and disciplines resolved; ports frozen.
    Preinitialize,
    /// The configuration is installed and running.
    Live,
    /// The configuration was torn down or failed to come up.
    Dead,
}

/// One edge of the graph: an output port wired to an input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    /// Producing element.
    pub from: ElementId,
    /// Output port on the producing element.
    pub from_port: usize,
    /// Consuming element.
    pub to: ElementId,
    /// Input port on the consuming element.
    pub to_port: usize,
}

struct Node {
    name: String,
    landmark: String,
    config: RefCell<String>,
    element: RefCell<Box<dyn Element>>,
    // Specifier strings are constants; cached so identity and resolution
    // queries never re-borrow a running element.
    class: &'static str,
    port_count_spec: &'static str,
    processing_spec: &'static str,
    flow_code_spec: &'static str,
    phase: i32,
    inputs: Ports,
    outputs: Ports,
    in_processing: Vec<Processing>,
    out_processing: Vec<Processing>,
    calls: Cell<u64>,
    handlers: RefCell<HandlerMap>,
    configure_ran: bool,
    configured: bool,
    initialize_ran: bool,
    initialized: bool,
    cleaned: bool,
}

impl Node {
    fn new(name: String, element: Box<dyn Element>, config: String, landmark: String) -> Self {
        ELEMENTS_ALLOCATED.fetch_add(1, Ordering::Relaxed);
        let class = element.class_name();
        let port_count_spec = element.port_count();
        let processing_spec = element.processing();
        let flow_code_spec = element.flow_code();
        let phase = element.configure_phase();
        Self {
            name,
            landmark,
            config: RefCell::new(config),
            element: RefCell::new(element),
            class,
            port_count_spec,
            processing_spec,
            flow_code_spec,
            phase,
            inputs: Ports::new(),
            outputs: Ports::new(),
            in_processing: Vec::new(),
            out_processing: Vec::new(),
            calls: Cell::new(0),
            handlers: RefCell::new(HandlerMap::new()),
            configure_ran: false,
            configured: false,
            initialize_ran: false,
            initialized: false,
            cleaned: false,
        }
    }

    fn declaration(&self) -> String {
        format!("{} :: {}", self.name, self.class)
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        ELEMENTS_ALLOCATED.fetch_sub(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SelectEntry {
    fd: i32,
    eid: ElementId,
    mask: u8,
}

/// The element container and lifecycle driver.
#[derive(Default)]
pub struct Router {
    nodes: Vec<Node>,
    by_name: HashMap<String, ElementId>,
    connections: Vec<Connection>,
    state: RouterState,
    installed: bool,
    selects: RefCell<Vec<SelectEntry>>,
    hotswap: Option<Box<Router>>,
}

impl Router {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RouterState {
        self.state
    }

    /// Number of elements in the table.
    pub fn nelements(&self) -> usize {
        self.nodes.len()
    }

    /// Add an element to the table.
    ///
    /// `config` is the stored configuration string and `landmark`
    /// describes where the element was declared (e.g. `file:line`).
    /// Elements can only be added before [`initialize`](Self::initialize).
    pub fn add_element(
        &mut self,
        name: impl Into<String>,
        element: Box<dyn Element>,
        config: impl Into<String>,
        landmark: impl Into<String>,
    ) -> ElementId {
        assert_eq!(self.state, RouterState::New, "router already initialized");
        let name = name.into();
        let id = ElementId(self.nodes.len());
        self.nodes
            .push(Node::new(name.clone(), element, config.into(), landmark.into()));
        self.by_name.insert(name, id);
        id
    }

    /// Wire output `from_port` of `from` to input `to_port` of `to`.
    pub fn add_connection(
        &mut self,
        from: ElementId,
        from_port: usize,
        to: ElementId,
        to_port: usize,
    ) -> Result<()> {
        if self.state >= RouterState::Preinitialize {
            return Err(Error::PortsFrozen);
        }
        if from.0 >= self.nodes.len() || to.0 >= self.nodes.len() {
            return Err(Error::InvalidArgument("no such element".into()));
        }
        if from == to {
            return Err(Error::InvalidArgument(
                "element connected to itself".into(),
            ));
        }
        self.connections.push(Connection {
            from,
            from_port,
            to,
            to_port,
        });
        Ok(())
    }

    /// The installed connection table.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// The name an element was declared with.
    pub fn ename(&self, eid: ElementId) -> &str {
        &self.nodes[eid.0].name
    }

    /// Where an element was declared.
    pub fn elandmark(&self, eid: ElementId) -> &str {
        &self.nodes[eid.0].landmark
    }

    /// `name :: ClassName` for an element.
    pub fn declaration(&self, eid: ElementId) -> String {
        self.nodes[eid.0].declaration()
    }

    /// Look up an element by name.
    pub fn find(&self, name: &str) -> Option<ElementId> {
        self.by_name.get(name).copied()
    }

    /// Borrow an element.
    pub fn element(&self, eid: ElementId) -> std::cell::Ref<'_, Box<dyn Element>> {
        self.nodes[eid.0].element.borrow()
    }

    /// Borrow an element as a concrete class.
    pub fn element_ref<T: Element>(&self, eid: ElementId) -> Option<std::cell::Ref<'_, T>> {
        std::cell::Ref::filter_map(self.nodes[eid.0].element.borrow(), |el| {
            el.as_ref().downcast_ref::<T>()
        })
        .ok()
    }

    /// Mutably borrow an element as a concrete class.
    pub fn element_mut<T: Element>(&self, eid: ElementId) -> Option<std::cell::RefMut<'_, T>> {
        std::cell::RefMut::filter_map(self.nodes[eid.0].element.borrow_mut(), |el| {
            el.as_mut().downcast_mut::<T>()
        })
        .ok()
    }

    /// The stored configuration string for an element, verbatim.
    pub fn configuration_string(&self, eid: ElementId) -> String {
        self.nodes[eid.0].config.borrow().clone()
    }

    /// Replace the stored configuration string for an element.
    pub fn set_configuration_string(&self, eid: ElementId, config: impl Into<String>) {
        *self.nodes[eid.0].config.borrow_mut() = config.into();
    }

    /// Number of input ports on an element.
    pub fn ninputs(&self, eid: ElementId) -> usize {
        self.nodes[eid.0].inputs.len()
    }

    /// Number of output ports on an element.
    pub fn noutputs(&self, eid: ElementId) -> usize {
        self.nodes[eid.0].outputs.len()
    }

    /// An element's input port record, if in range.
    pub fn input_port(&self, eid: ElementId, port: usize) -> Option<&Port> {
        self.nodes[eid.0].inputs.get(port)
    }

    /// An element's output port record, if in range.
    pub fn output_port(&self, eid: ElementId, port: usize) -> Option<&Port> {
        self.nodes[eid.0].outputs.get(port)
    }

    /// The resolved discipline of an input port.
    pub fn input_processing(&self, eid: ElementId, port: usize) -> Option<Processing> {
        self.nodes[eid.0].in_processing.get(port).copied()
    }

    /// The resolved discipline of an output port.
    pub fn output_processing(&self, eid: ElementId, port: usize) -> Option<Processing> {
        self.nodes[eid.0].out_processing.get(port).copied()
    }

    /// Number of push/pull invocations delivered to an element.
    pub fn calls(&self, eid: ElementId) -> u64 {
        self.nodes[eid.0].calls.get()
    }

    pub(crate) fn iport(&self, eid: ElementId, port: usize) -> &Port {
        &self.nodes[eid.0].inputs[port]
    }

    pub(crate) fn oport(&self, eid: ElementId, port: usize) -> &Port {
        &self.nodes[eid.0].outputs[port]
    }

    // ------------------------------------------------------------------
    // Port resolution
    // ------------------------------------------------------------------

    /// Resize an element's port arrays.
    ///
    /// Fails once the router has frozen ports (state `Preinitialize` and
    /// beyond); on failure the arrays are unchanged.
    pub fn set_nports(&mut self, eid: ElementId, ninputs: usize, noutputs: usize) -> Result<()> {
        if self.state >= RouterState::Preinitialize {
            return Err(Error::PortsFrozen);
        }
        let node = &mut self.nodes[eid.0];
        node.inputs.resize(ninputs, Port::inactive());
        node.outputs.resize(noutputs, Port::inactive());
        Ok(())
    }

    /// Resolve an element's port-count specifier against the wired counts
    /// and install the port arrays.
    pub fn notify_nports(
        &mut self,
        eid: ElementId,
        in_want: usize,
        out_want: usize,
        errh: &mut dyn ErrorHandler,
    ) -> Result<()> {
        let spec = self.nodes[eid.0].port_count_spec;
        let pc = PortCount::parse(spec).inspect_err(|_| {
            errh.error(&format!("{}: bad port count", self.declaration(eid)));
        })?;
        let (ninputs, noutputs) = pc.resolve(in_want, out_want);
        self.set_nports(eid, ninputs, noutputs)
    }

    /// Mark each port active or inactive from its resolved discipline.
    ///
    /// An input drives transfers iff it resolved to pull; an output
    /// drives transfers iff it resolved to push.
    pub fn initialize_ports(
        &mut self,
        eid: ElementId,
        in_disciplines: &[Processing],
        out_disciplines: &[Processing],
    ) {
        let node = &mut self.nodes[eid.0];
        for (port, &d) in in_disciplines.iter().enumerate().take(node.inputs.len()) {
            node.inputs[port] = if d == Processing::Pull {
                Port::active()
            } else {
                Port::inactive()
            };
        }
        for (port, &d) in out_disciplines.iter().enumerate().take(node.outputs.len()) {
            node.outputs[port] = if d == Processing::Push {
                Port::active()
            } else {
                Port::inactive()
            };
        }
        node.in_processing = in_disciplines[..node.inputs.len()].to_vec();
        node.out_processing = out_disciplines[..node.outputs.len()].to_vec();
    }

    /// Install a peer reference on an active port.
    ///
    /// Fails with [`Error::InactivePort`] when the port does not drive
    /// transfers.
    pub fn connect_port(
        &mut self,
        isoutput: bool,
        eid: ElementId,
        port: usize,
        peer: ElementId,
        peer_port: usize,
    ) -> Result<()> {
        let node = &mut self.nodes[eid.0];
        let p = if isoutput {
            node.outputs.get_mut(port)
        } else {
            node.inputs.get_mut(port)
        };
        match p {
            Some(p) => {
                if p.connect(peer, peer_port) {
                    Ok(())
                } else {
                    Err(Error::InactivePort)
                }
            }
            None => Err(Error::InactivePort),
        }
    }

    /// Which complementary ports can exchange packets with `port`.
    ///
    /// Evaluates the element's flow code; see
    /// [`flow`](crate::element::flow).
    pub fn port_flow(
        &self,
        eid: ElementId,
        isoutput: bool,
        port: usize,
        errh: &mut dyn ErrorHandler,
    ) -> Bitvector {
        let node = &self.nodes[eid.0];
        let (nport, nother) = if isoutput {
            (node.outputs.len(), node.inputs.len())
        } else {
            (node.inputs.len(), node.outputs.len())
        };
        flow_query(node.flow_code_spec, isoutput, port, nport, nother, errh)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    fn phase_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.nodes.len()).collect();
        order.sort_by_key(|&i| self.nodes[i].phase);
        order
    }

    fn used_ports(&self, eid: ElementId) -> (usize, usize) {
        let mut in_want = 0;
        let mut out_want = 0;
        for c in &self.connections {
            if c.to == eid {
                in_want = in_want.max(c.to_port + 1);
            }
            if c.from == eid {
                out_want = out_want.max(c.from_port + 1);
            }
        }
        (in_want, out_want)
    }

    /// Resolve the configuration and bring the router on line.
    ///
    /// All diagnostics go to `errh`. Every element's `configure` runs
    /// even after a failure so the user sees every problem; the first
    /// `initialize` failure stops the walk. On any failure the router
    /// cleans up the elements (each with the stage it reached) and goes
    /// `Dead`.
    pub fn initialize(&mut self, errh: &mut dyn ErrorHandler) -> Result<()> {
        if self.state != RouterState::New {
            return Err(Error::InvalidArgument("router already initialized".into()));
        }
        self.state = RouterState::Preconfigure;

        if let Err(e) = self.resolve_ports(errh) {
            self.fail();
            return Err(e);
        }

        let order = self.phase_order();

        // Every configure runs, even after a failure.
        let mut configure_failed = false;
        for &i in &order {
            let args = config::split(&self.nodes[i].config.borrow());
            let ok = {
                let this = &*self;
                let id = ElementId(i);
                let mut prefixed =
                    PrefixErrorHandler::new(errh, format!("{}: ", this.declaration(id)));
                let mut el = this.nodes[i].element.borrow_mut();
                el.configure(&Context::new(this, id), &args, &mut prefixed)
                    .is_ok()
            };
            let node = &mut self.nodes[i];
            node.configure_ran = true;
            node.configured = ok;
            configure_failed |= !ok;
        }
        if configure_failed {
            self.fail();
            return Err(Error::ConfigureFailed);
        }

        if let Err(e) = self.resolve_processing(errh) {
            self.fail();
            return Err(e);
        }
        self.state = RouterState::Preinitialize;
        self.install_connections();

        for i in 0..self.nodes.len() {
            let node = &self.nodes[i];
            let can_reconfigure = node.element.borrow().can_live_reconfigure();
            let mut map = node.handlers.borrow_mut();
            handlers::add_default_handlers(&mut map, can_reconfigure);
            let mut builder = HandlerBuilder::new(&mut map);
            node.element.borrow().add_handlers(&mut builder);
        }

        for &i in &order {
            let ok = {
                let this = &*self;
                let id = ElementId(i);
                let mut prefixed =
                    PrefixErrorHandler::new(errh, format!("{}: ", this.declaration(id)));
                let mut el = this.nodes[i].element.borrow_mut();
                el.initialize(&Context::new(this, id), &mut prefixed).is_ok()
            };
            let node = &mut self.nodes[i];
            node.initialize_ran = true;
            node.initialized = ok;
            if !ok {
                self.fail();
                return Err(Error::InitializeFailed);
            }
        }

        if self.hotswap.is_some() {
            for &i in &order {
                let id = ElementId(i);
                let old = {
                    let this = &*self;
                    this.nodes[i]
                        .element
                        .borrow()
                        .hotswap_element(&Context::new(this, id))
                };
                if let Some(old_id) = old {
                    let this = &*self;
                    let old_router = this.hotswap.as_deref().expect("hotswap router present");
                    let mut prefixed =
                        PrefixErrorHandler::new(errh, format!("{}: ", this.declaration(id)));
                    let mut new_el = this.nodes[i].element.borrow_mut();
                    let mut old_el = old_router.nodes[old_id.0].element.borrow_mut();
                    new_el.take_state(old_el.as_mut(), &mut prefixed);
                }
            }
            // The outgoing configuration is torn down now.
            self.hotswap = None;
        }

        self.installed = true;
        self.state = RouterState::Live;
        Ok(())
    }

    fn resolve_ports(&mut self, errh: &mut dyn ErrorHandler) -> Result<()> {
        let before = errh.nerrors();
        for i in 0..self.nodes.len() {
            let id = ElementId(i);
            let (in_want, out_want) = self.used_ports(id);
            let _ = self.notify_nports(id, in_want, out_want, errh);
        }

        for c in &self.connections {
            if c.from_port >= self.nodes[c.from.0].outputs.len() {
                errh.error(&format!(
                    "'{}' has no output {}",
                    self.nodes[c.from.0].name, c.from_port
                ));
            }
            if c.to_port >= self.nodes[c.to.0].inputs.len() {
                errh.error(&format!(
                    "'{}' has no input {}",
                    self.nodes[c.to.0].name, c.to_port
                ));
            }
        }

        for (i, node) in self.nodes.iter().enumerate() {
            let id = ElementId(i);
            for port in 0..node.inputs.len() {
                if !self.connections.iter().any(|c| c.to == id && c.to_port == port) {
                    errh.error(&format!("'{}' input {} unused", node.name, port));
                }
            }
            for port in 0..node.outputs.len() {
                if !self
                    .connections
                    .iter()
                    .any(|c| c.from == id && c.from_port == port)
                {
                    errh.error(&format!("'{}' output {} unused", node.name, port));
                }
            }
        }

        if errh.nerrors() > before {
            Err(Error::InvalidSpec("bad ports or connections".into()))
        } else {
            Ok(())
        }
    }

    fn resolve_processing(&mut self, errh: &mut dyn ErrorHandler) -> Result<()> {
        let before = errh.nerrors();
        let n = self.nodes.len();
        let mut in_p: Vec<Vec<Processing>> = Vec::with_capacity(n);
        let mut out_p: Vec<Vec<Processing>> = Vec::with_capacity(n);
        for (i, node) in self.nodes.iter().enumerate() {
            let mut prefixed = PrefixErrorHandler::new(
                errh,
                format!("{}: ", self.nodes[i].declaration()),
            );
            let (iv, ov) = processing_vector(
                node.processing_spec,
                node.inputs.len(),
                node.outputs.len(),
                &mut prefixed,
            );
            in_p.push(iv);
            out_p.push(ov);
        }

        // Propagate disciplines to agnostic ports: across each connection
        // the two endpoints must agree; within an element, flow-linked
        // agnostic port pairs share their resolved discipline.
        let mut changed = true;
        while changed {
            changed = false;
            for c in &self.connections {
                if c.from_port >= out_p[c.from.0].len() || c.to_port >= in_p[c.to.0].len() {
                    continue;
                }
                let a = out_p[c.from.0][c.from_port];
                let b = in_p[c.to.0][c.to_port];
                match (a, b) {
                    (Processing::Agnostic, d) if d != Processing::Agnostic => {
                        out_p[c.from.0][c.from_port] = d;
                        changed = true;
                    }
                    (d, Processing::Agnostic) if d != Processing::Agnostic => {
                        in_p[c.to.0][c.to_port] = d;
                        changed = true;
                    }
                    (a, b) if a != b => {
                        errh.error(&format!(
                            "{} output {} connected to incompatible {} input {}",
                            discipline_name(a),
                            self.connection_endpoint(c, true),
                            discipline_name(b),
                            self.connection_endpoint(c, false),
                        ));
                        return Err(Error::ConfigureFailed);
                    }
                    _ => {}
                }
            }

            for i in 0..n {
                let id = ElementId(i);
                for port in 0..in_p[i].len() {
                    let d = in_p[i][port];
                    if d == Processing::Agnostic {
                        continue;
                    }
                    let travels = self.port_flow(id, false, port, errh);
                    for out in 0..out_p[i].len() {
                        if travels.get(out) && out_p[i][out] == Processing::Agnostic {
                            out_p[i][out] = d;
                            changed = true;
                        }
                    }
                }
                for port in 0..out_p[i].len() {
                    let d = out_p[i][port];
                    if d == Processing::Agnostic {
                        continue;
                    }
                    let travels = self.port_flow(id, true, port, errh);
                    for inp in 0..in_p[i].len() {
                        if travels.get(inp) && in_p[i][inp] == Processing::Agnostic {
                            in_p[i][inp] = d;
                            changed = true;
                        }
                    }
                }
            }
        }

        for (i, node) in self.nodes.iter().enumerate() {
            for (port, &d) in in_p[i].iter().enumerate() {
                if d == Processing::Agnostic {
                    errh.error(&format!(
                        "'{}' input {} agnostic discipline unresolved",
                        node.name, port
                    ));
                }
            }
            for (port, &d) in out_p[i].iter().enumerate() {
                if d == Processing::Agnostic {
                    errh.error(&format!(
                        "'{}' output {} agnostic discipline unresolved",
                        node.name, port
                    ));
                }
            }
        }

        // Active sides take exactly one peer.
        for (i, node) in self.nodes.iter().enumerate() {
            let id = ElementId(i);
            for (port, &d) in out_p[i].iter().enumerate() {
                if d == Processing::Push {
                    let uses = self
                        .connections
                        .iter()
                        .filter(|c| c.from == id && c.from_port == port)
                        .count();
                    if uses > 1 {
                        errh.error(&format!(
                            "'{}' push output {} connected more than once",
                            node.name, port
                        ));
                    }
                }
            }
            for (port, &d) in in_p[i].iter().enumerate() {
                if d == Processing::Pull {
                    let uses = self
                        .connections
                        .iter()
                        .filter(|c| c.to == id && c.to_port == port)
                        .count();
                    if uses > 1 {
                        errh.error(&format!(
                            "'{}' pull input {} connected more than once",
                            node.name, port
                        ));
                    }
                }
            }
        }

        if errh.nerrors() > before {
            return Err(Error::ConfigureFailed);
        }

        for i in 0..n {
            let (iv, ov) = (in_p[i].clone(), out_p[i].clone());
            self.initialize_ports(ElementId(i), &iv, &ov);
        }
        Ok(())
    }

    fn connection_endpoint(&self, c: &Connection, output: bool) -> String {
        if output {
            format!("{} [{}]", self.nodes[c.from.0].name, c.from_port)
        } else {
            format!("{} [{}]", self.nodes[c.to.0].name, c.to_port)
        }
    }

    fn install_connections(&mut self) {
        for ci in 0..self.connections.len() {
            let c = self.connections[ci];
            if self.nodes[c.from.0].outputs[c.from_port].allowed() {
                let _ = self.connect_port(true, c.from, c.from_port, c.to, c.to_port);
            }
            if self.nodes[c.to.0].inputs[c.to_port].allowed() {
                let _ = self.connect_port(false, c.to, c.to_port, c.from, c.from_port);
            }
        }
    }

    fn fail(&mut self) {
        self.run_cleanup();
        self.state = RouterState::Dead;
    }

    fn run_cleanup(&mut self) {
        let order = self.phase_order();
        for &i in order.iter().rev() {
            let stage = {
                let node = &self.nodes[i];
                if node.cleaned {
                    continue;
                }
                if !node.configure_ran {
                    CleanupStage::NoRouter
                } else if !node.configured {
                    CleanupStage::ConfigureFailed
                } else if !node.initialize_ran {
                    CleanupStage::Configured
                } else if !node.initialized {
                    CleanupStage::InitializeFailed
                } else if !self.installed {
                    CleanupStage::Initialized
                } else {
                    CleanupStage::RouterInitialized
                }
            };
            self.nodes[i].cleaned = true;
            self.nodes[i].element.borrow_mut().cleanup(stage);
        }
    }

    // ------------------------------------------------------------------
    // Transfer
    // ------------------------------------------------------------------

    /// Deliver `packet` to input `port` of element `eid`.
    ///
    /// This is the driver-side injection point; connected elements hand
    /// packets to each other through their contexts.
    pub fn push(&self, eid: ElementId, port: usize, packet: Packet) {
        self.deliver_push(eid, port, packet);
    }

    /// Request a packet from output `port` of element `eid`.
    pub fn pull(&self, eid: ElementId, port: usize) -> Option<Packet> {
        self.deliver_pull(eid, port)
    }

    /// Invoke an element's llrpc endpoint.
    pub fn llrpc(&self, eid: ElementId, command: u32, data: &mut dyn std::any::Any) -> Result<()> {
        let mut el = self.nodes[eid.0].element.borrow_mut();
        el.llrpc(command, data)
    }

    pub(crate) fn deliver_push(&self, eid: ElementId, port: usize, packet: Packet) {
        let node = &self.nodes[eid.0];
        node.calls.set(node.calls.get() + 1);
        if let Some(p) = node.inputs.get(port) {
            p.account();
        }
        let mut el = node.element.borrow_mut();
        el.push(&Context::new(self, eid), port, packet);
    }

    pub(crate) fn deliver_pull(&self, eid: ElementId, port: usize) -> Option<Packet> {
        let node = &self.nodes[eid.0];
        node.calls.set(node.calls.get() + 1);
        let packet = {
            let mut el = node.element.borrow_mut();
            el.pull(&Context::new(self, eid), port)
        };
        if packet.is_some() {
            if let Some(p) = node.outputs.get(port) {
                p.account();
            }
        }
        packet
    }

    // ------------------------------------------------------------------
    // Hotswap
    // ------------------------------------------------------------------

    /// Install the outgoing configuration for a hotswap.
    ///
    /// During [`initialize`](Self::initialize), each element may inherit
    /// state from a compatible predecessor via
    /// [`take_state`](crate::element::Element::take_state); afterwards
    /// the old router is torn down.
    pub fn set_hotswap_router(&mut self, old: Router) {
        self.hotswap = Some(Box::new(old));
    }

    /// The outgoing configuration, while a hotswap is pending.
    pub fn hotswap_router(&self) -> Option<&Router> {
        self.hotswap.as_deref()
    }

    // ------------------------------------------------------------------
    // Select
    // ------------------------------------------------------------------

    /// Register `eid`'s interest in readiness events on `fd`.
    ///
    /// Overrides any previous registration by the same element for the
    /// same descriptor and events; the element's
    /// [`selected`](crate::element::Element::selected) hook fires on
    /// readiness.
    pub fn add_select(&self, fd: i32, eid: ElementId, mask: u8) -> Result<()> {
        if mask & !(SELECT_READ | SELECT_WRITE) != 0 {
            return Err(Error::InvalidArgument("bad select mask".into()));
        }
        let mut selects = self.selects.borrow_mut();
        if let Some(entry) = selects.iter_mut().find(|e| e.fd == fd && e.eid == eid) {
            entry.mask |= mask;
        } else {
            selects.push(SelectEntry { fd, eid, mask });
        }
        Ok(())
    }

    /// Remove `eid`'s interest in `mask` events on `fd`.
    pub fn remove_select(&self, fd: i32, eid: ElementId, mask: u8) -> Result<()> {
        let mut selects = self.selects.borrow_mut();
        for entry in selects.iter_mut() {
            if entry.fd == fd && entry.eid == eid {
                entry.mask &= !mask;
            }
        }
        selects.retain(|e| e.mask != 0);
        Ok(())
    }

    /// Invoke `selected` on every element registered for `mask` events
    /// on `fd`.
    pub fn fire_selected(&self, fd: i32, mask: u8) {
        let interested: Vec<ElementId> = self
            .selects
            .borrow()
            .iter()
            .filter(|e| e.fd == fd && e.mask & mask != 0)
            .map(|e| e.eid)
            .collect();
        for eid in interested {
            let mut el = self.nodes[eid.0].element.borrow_mut();
            el.selected(&Context::new(self, eid), fd);
        }
    }

    // ------------------------------------------------------------------
    // Handler plumbing shared with handlers.rs
    // ------------------------------------------------------------------

    pub(crate) fn node_handlers(&self, eid: ElementId) -> &RefCell<HandlerMap> {
        &self.nodes[eid.0].handlers
    }

    pub(crate) fn node_element(&self, eid: ElementId) -> &RefCell<Box<dyn Element>> {
        &self.nodes[eid.0].element
    }

    /// A wiring summary for an element, one line per port.
    pub fn element_ports_string(&self, eid: ElementId) -> String {
        let node = &self.nodes[eid.0];
        let mut out = String::new();
        for port in 0..node.inputs.len() {
            let disc = node
                .in_processing
                .get(port)
                .copied()
                .unwrap_or(Processing::Agnostic);
            out.push_str(&format!("input {}: {}", port, discipline_name(disc)));
            let peers: Vec<String> = self
                .connections
                .iter()
                .filter(|c| c.to == eid && c.to_port == port)
                .map(|c| format!("{} [{}]", self.nodes[c.from.0].name, c.from_port))
                .collect();
            if !peers.is_empty() {
                out.push_str(&format!(" <- {}", peers.join(", ")));
            }
            out.push('\n');
        }
        for port in 0..node.outputs.len() {
            let disc = node
                .out_processing
                .get(port)
                .copied()
                .unwrap_or(Processing::Agnostic);
            out.push_str(&format!("output {}: {}", port, discipline_name(disc)));
            let peers: Vec<String> = self
                .connections
                .iter()
                .filter(|c| c.from == eid && c.from_port == port)
                .map(|c| format!("{} [{}]", self.nodes[c.to.0].name, c.to_port))
                .collect();
            if !peers.is_empty() {
                out.push_str(&format!(" -> {}", peers.join(", ")));
            }
            out.push('\n');
        }
        out
    }
}

fn discipline_name(p: Processing) -> &'static str {
    match p {
        Processing::Push => "push",
        Processing::Pull => "pull",
        Processing::Agnostic => "agnostic",
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        self.run_cleanup();
        self.state = RouterState::Dead;
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("elements", &self.nodes.len())
            .field("connections", &self.connections.len())
            .field("state", &self.state)
            .finish()
    }
}

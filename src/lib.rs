//! # Crossbar
//!
//! The element and port core of a modular packet-processing framework.
//!
//! A crossbar configuration is a directed multigraph of **elements** whose
//! edges carry packets. Each element exposes ordered input and output
//! **ports**; every connection joins one output port to one input port and
//! runs under a single processing discipline:
//!
//! - **push** — the producer drives the transfer (`ctx.output(i).push(p)`)
//! - **pull** — the consumer drives the transfer (`ctx.input(i).pull()`)
//! - **agnostic** — resolved from the neighborhood when the topology is
//!   finalized
//!
//! Elements describe themselves with three compact specifier strings: a
//! port-count specifier (legal arities, e.g. `"1-2/="`), a processing
//! specifier (per-port disciplines, e.g. `"a/ah"`), and a flow code
//! (input→output reachability, e.g. `"#/[^#]"`). The [`Router`] resolves
//! these against the actual wiring, installs connections, and walks each
//! element through its lifecycle: configure → add_handlers → initialize →
//! running → cleanup.
//!
//! ## Quick start
//!
//! ```rust
//! use crossbar::elements::{Counter, Discard, PacketSource, Queue};
//! use crossbar::report::BufferedErrorHandler;
//! use crossbar::{Packet, Router};
//!
//! // source -> counter -> queue -> counter -> discard
//! let mut router = Router::new();
//! let src = router.add_element("src", Box::new(PacketSource::new()), "DATA hi", "<quick>");
//! let up = router.add_element("up", Box::new(Counter::new()), "", "<quick>");
//! let q = router.add_element("q", Box::new(Queue::new()), "8", "<quick>");
//! let down = router.add_element("down", Box::new(Counter::new()), "", "<quick>");
//! let sink = router.add_element("sink", Box::new(Discard::new()), "", "<quick>");
//! for (from, to) in [(src, up), (up, q), (q, down), (down, sink)] {
//!     router.add_connection(from, 0, to, 0).unwrap();
//! }
//!
//! let mut errh = BufferedErrorHandler::new();
//! router.initialize(&mut errh).unwrap();
//!
//! // The push half of the chain runs when the source's task fires; the
//! // pull half runs when the sink's task fires.
//! router.push(up, 0, Packet::from_static(b"hello"));
//! assert_eq!(router.handler_read(q, "length").unwrap(), "1\n");
//! assert_eq!(router.pull(down, 0).unwrap().data(), b"hello");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod element;
pub mod elements;
pub mod error;
pub mod packet;
pub mod report;
pub mod router;
pub mod schedule;

mod stats;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::element::{CleanupStage, Context, Element, ElementId, Processing};
    pub use crate::error::{Error, Result};
    pub use crate::packet::Packet;
    pub use crate::report::{BufferedErrorHandler, ErrorHandler, LogErrorHandler};
    pub use crate::router::Router;
}

pub use element::{Element, ElementId};
pub use error::{Error, Result};
pub use packet::Packet;
pub use router::Router;

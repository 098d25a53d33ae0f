//! Stock elements.
//!
//! A small set of production elements covering the common roles:
//!
//! - [`PacketSource`] — task-driven packet generator
//! - [`Counter`] — agnostic passthrough that counts traffic
//! - [`Tee`] — push replication to every output
//! - [`Switch`] — route every packet to one configured output
//! - [`Queue`] — push-to-pull buffer with drop accounting
//! - [`Discard`] — drop everything, on push or pull paths
//! - [`Idle`] — discarding endpoint whose inputs and outputs are
//!   decoupled

mod counter;
mod discard;
mod idle;
mod queue;
mod source;
mod switch;
mod tee;

pub use counter::Counter;
pub use discard::Discard;
pub use idle::Idle;
pub use queue::Queue;
pub use source::PacketSource;
pub use switch::Switch;
pub use tee::Tee;

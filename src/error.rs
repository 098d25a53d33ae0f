//! Error types for Crossbar.

use thiserror::Error;

/// Result type alias using Crossbar's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Crossbar operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A port-count, processing, or flow-code specifier failed to parse.
    #[error("bad specifier: {0}")]
    InvalidSpec(String),

    /// Port counts were changed after the router froze them.
    #[error("ports are frozen")]
    PortsFrozen,

    /// An argument was out of range or otherwise unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// One or more elements failed to configure.
    #[error("configuration failed")]
    ConfigureFailed,

    /// An element failed to initialize.
    #[error("initialization failed")]
    InitializeFailed,

    /// A connection was installed on a port that does not drive transfers.
    #[error("connection on inactive port")]
    InactivePort,

    /// A `config` write was attempted on an element that does not support
    /// live reconfiguration.
    #[error("element cannot be reconfigured live")]
    LiveReconfigureRejected,

    /// An llrpc command was not recognized by the element.
    #[error("unknown llrpc command {0:#x}")]
    UnknownCommand(u32),

    /// No element with the given name or index exists.
    #[error("no element named '{0}'")]
    UnknownElement(String),

    /// No handler with the given name exists on the element.
    #[error("no handler named '{0}'")]
    UnknownHandler(String),
}

//! Error reporting sinks.
//!
//! All parse and validation failures flow through an [`ErrorHandler`]: a
//! sink with `error` and `warning` levels that counts errors so callers can
//! aggregate a whole configuration pass and report every problem, not just
//! the first. [`PrefixErrorHandler`] wraps another sink and prepends an
//! element reference (`name :: Class`) to each message.

/// A sink for configuration and validation diagnostics.
pub trait ErrorHandler {
    /// Report an error.
    fn error(&mut self, msg: &str);

    /// Report a warning.
    fn warning(&mut self, msg: &str);

    /// Number of errors reported so far.
    fn nerrors(&self) -> usize;
}

/// An error handler that forwards diagnostics to `tracing`.
#[derive(Debug, Default)]
pub struct LogErrorHandler {
    nerrors: usize,
}

impl LogErrorHandler {
    /// Create a new logging error handler.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ErrorHandler for LogErrorHandler {
    fn error(&mut self, msg: &str) {
        self.nerrors += 1;
        tracing::error!(target: "crossbar", "{msg}");
    }

    fn warning(&mut self, msg: &str) {
        tracing::warn!(target: "crossbar", "{msg}");
    }

    fn nerrors(&self) -> usize {
        self.nerrors
    }
}

/// An error handler that buffers diagnostics for later inspection.
#[derive(Debug, Default)]
pub struct BufferedErrorHandler {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl BufferedErrorHandler {
    /// Create a new buffering error handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// The errors reported so far.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// The warnings reported so far.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Whether any diagnostic at all was reported.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

impl ErrorHandler for BufferedErrorHandler {
    fn error(&mut self, msg: &str) {
        tracing::debug!(target: "crossbar", "buffered error: {msg}");
        self.errors.push(msg.to_string());
    }

    fn warning(&mut self, msg: &str) {
        self.warnings.push(msg.to_string());
    }

    fn nerrors(&self) -> usize {
        self.errors.len()
    }
}

/// An error handler that silently discards diagnostics.
///
/// Useful when probing, e.g. testing whether an argument parses as a
/// keyword without reporting a failure.
#[derive(Debug, Default)]
pub struct SilentErrorHandler {
    nerrors: usize,
}

impl SilentErrorHandler {
    /// Create a new silent error handler.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ErrorHandler for SilentErrorHandler {
    fn error(&mut self, _msg: &str) {
        self.nerrors += 1;
    }

    fn warning(&mut self, _msg: &str) {}

    fn nerrors(&self) -> usize {
        self.nerrors
    }
}

/// Wraps another handler, prefixing each message with a context string.
pub struct PrefixErrorHandler<'a> {
    inner: &'a mut dyn ErrorHandler,
    prefix: String,
}

impl<'a> PrefixErrorHandler<'a> {
    /// Wrap `inner`, prepending `prefix` to every message.
    pub fn new(inner: &'a mut dyn ErrorHandler, prefix: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }
}

impl ErrorHandler for PrefixErrorHandler<'_> {
    fn error(&mut self, msg: &str) {
        self.inner.error(&format!("{}{}", self.prefix, msg));
    }

    fn warning(&mut self, msg: &str) {
        self.inner.warning(&format!("{}{}", self.prefix, msg));
    }

    fn nerrors(&self) -> usize {
        self.inner.nerrors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_counts_errors() {
        let mut errh = BufferedErrorHandler::new();
        errh.warning("w");
        assert_eq!(errh.nerrors(), 0);
        errh.error("e1");
        errh.error("e2");
        assert_eq!(errh.nerrors(), 2);
        assert_eq!(errh.errors(), &["e1", "e2"]);
        assert_eq!(errh.warnings(), &["w"]);
    }

    #[test]
    fn test_prefix_wraps_messages() {
        let mut inner = BufferedErrorHandler::new();
        {
            let mut errh = PrefixErrorHandler::new(&mut inner, "q :: Queue: ");
            errh.error("capacity out of range");
        }
        assert_eq!(inner.errors(), &["q :: Queue: capacity out of range"]);
    }
}

//! Switch - route every packet to one configured output.

use crate::element::{Context, Element, PUSH};
use crate::error::{Error, Result};
use crate::packet::Packet;
use crate::report::ErrorHandler;
use crate::router::{positional_reconfigure, HandlerBuilder};

/// Sends every incoming packet to a configurable output port.
///
/// Configuration: a single optional output index (default 0); `-1` drops
/// every packet. Supports live reconfiguration, and exposes the index as
/// a `switch` handler (read, and write via the stock positional
/// reconfigure hook).
#[derive(Debug)]
pub struct Switch {
    output: i64,
}

impl Switch {
    /// Create a Switch routing to output 0.
    pub fn new() -> Self {
        Self { output: 0 }
    }

    /// The currently selected output, `-1` meaning drop.
    pub fn output(&self) -> i64 {
        self.output
    }
}

impl Default for Switch {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for Switch {
    fn class_name(&self) -> &'static str {
        "Switch"
    }

    fn port_count(&self) -> &'static str {
        "1/-"
    }

    fn processing(&self) -> &'static str {
        PUSH
    }

    fn configure(
        &mut self,
        _ctx: &Context<'_>,
        args: &[String],
        errh: &mut dyn ErrorHandler,
    ) -> Result<()> {
        let output = match args {
            [] => 0,
            [arg] => match arg.parse::<i64>() {
                Ok(n) if n >= -1 => n,
                _ => {
                    errh.error(&format!("expected output port, not '{arg}'"));
                    return Err(Error::ConfigureFailed);
                }
            },
            _ => {
                errh.error("expected at most one argument");
                return Err(Error::ConfigureFailed);
            }
        };
        self.output = output;
        Ok(())
    }

    fn can_live_reconfigure(&self) -> bool {
        true
    }

    fn configuration(&self) -> Option<Vec<String>> {
        Some(vec![self.output.to_string()])
    }

    fn add_handlers(&self, handlers: &mut HandlerBuilder<'_>) {
        handlers.add_read("switch", |el, _ctx| match el.downcast_ref::<Switch>() {
            Some(s) => format!("{}\n", s.output),
            None => String::new(),
        });
        handlers.add_write("switch", positional_reconfigure(0));
    }

    fn push(&mut self, ctx: &Context<'_>, _port: usize, packet: Packet) {
        if self.output >= 0 {
            ctx.checked_push(self.output as usize, packet);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::BufferedErrorHandler;

    fn configure(sw: &mut Switch, args: &[&str]) -> Result<()> {
        // Switch::configure never consults the context; a context over an
        // empty throwaway router is enough to exercise parsing.
        let router = crate::router::Router::new();
        let ctx = Context::new(&router, crate::element::ElementId(0));
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let mut errh = BufferedErrorHandler::new();
        sw.configure(&ctx, &args, &mut errh)
    }

    #[test]
    fn test_configure_parses_output() {
        let mut sw = Switch::new();
        assert!(configure(&mut sw, &["2"]).is_ok());
        assert_eq!(sw.output(), 2);
        assert!(configure(&mut sw, &["-1"]).is_ok());
        assert_eq!(sw.output(), -1);
    }

    #[test]
    fn test_configure_rejects_garbage_without_state_change() {
        let mut sw = Switch::new();
        configure(&mut sw, &["3"]).unwrap();
        assert!(configure(&mut sw, &["many"]).is_err());
        assert!(configure(&mut sw, &["-2"]).is_err());
        assert!(configure(&mut sw, &["1", "2"]).is_err());
        assert_eq!(sw.output(), 3);
    }

    #[test]
    fn test_state_derived_configuration() {
        let mut sw = Switch::new();
        configure(&mut sw, &["5"]).unwrap();
        assert_eq!(sw.configuration(), Some(vec!["5".to_string()]));
    }
}

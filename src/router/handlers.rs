//! Named handlers.
//!
//! Every element exposes a string-keyed set of read/write endpoints. The
//! router registers five read-only handlers on each element — `class`,
//! `name`, `config`, `ports`, `handlers` — plus the per-port counters
//! `icounts`/`ocounts`, and a writable `config` when the element permits
//! live reconfiguration. Elements add their own in
//! [`Element::add_handlers`](crate::element::Element::add_handlers)
//! through a [`HandlerBuilder`]; the standard names are reserved.
//!
//! The stock hooks at the bottom of this module cover the common cases:
//! reading one positional or keyword configuration argument, and
//! reconfiguring an element by replacing one.

use crate::config;
use crate::element::{Context, Element, ElementId};
use crate::error::{Error, Result};
use crate::report::ErrorHandler;
use crate::router::Router;
use crate::schedule::Task;

/// Hook invoked when a handler is read.
pub type ReadHook = Box<dyn Fn(&dyn Element, &Context<'_>) -> String>;

/// Hook invoked when a handler is written.
pub type WriteHook =
    Box<dyn Fn(&str, &mut dyn Element, &Context<'_>, &mut dyn ErrorHandler) -> Result<()>>;

struct Handler {
    name: String,
    read: Option<ReadHook>,
    write: Option<WriteHook>,
}

/// Per-element handler table, in registration order.
#[derive(Default)]
pub(crate) struct HandlerMap {
    entries: Vec<Handler>,
}

impl HandlerMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, name: &str) -> &mut Handler {
        if let Some(i) = self.entries.iter().position(|h| h.name == name) {
            &mut self.entries[i]
        } else {
            self.entries.push(Handler {
                name: name.to_string(),
                read: None,
                write: None,
            });
            self.entries.last_mut().expect("just pushed")
        }
    }

    fn add_read(&mut self, name: &str, hook: ReadHook) {
        self.entry(name).read = Some(hook);
    }

    fn add_write(&mut self, name: &str, hook: WriteHook) {
        self.entry(name).write = Some(hook);
    }

    fn get(&self, name: &str) -> Option<&Handler> {
        self.entries.iter().find(|h| h.name == name)
    }

    fn visible(&self) -> impl Iterator<Item = (&str, bool, bool)> {
        self.entries
            .iter()
            .map(|h| (h.name.as_str(), h.read.is_some(), h.write.is_some()))
    }
}

/// Handler names the core registers on every element.
const RESERVED: &[&str] = &[
    "class", "name", "config", "ports", "handlers", "icounts", "ocounts",
];

/// Registration surface handed to
/// [`Element::add_handlers`](crate::element::Element::add_handlers).
pub struct HandlerBuilder<'a> {
    map: &'a mut HandlerMap,
}

impl<'a> HandlerBuilder<'a> {
    pub(crate) fn new(map: &'a mut HandlerMap) -> Self {
        Self { map }
    }

    fn check_reserved(&self, name: &str) -> bool {
        if RESERVED.contains(&name) {
            tracing::error!(target: "crossbar", "handler '{name}' is reserved by the core");
            return false;
        }
        true
    }

    /// Register a read handler named `name`.
    ///
    /// Overrides any previous read handler with this name; a previous
    /// write handler with the same name remains in effect.
    pub fn add_read(
        &mut self,
        name: &str,
        hook: impl Fn(&dyn Element, &Context<'_>) -> String + 'static,
    ) {
        if self.check_reserved(name) {
            self.map.add_read(name, Box::new(hook));
        }
    }

    /// Register a write handler named `name`.
    ///
    /// Overrides any previous write handler with this name; a previous
    /// read handler with the same name remains in effect.
    pub fn add_write(
        &mut self,
        name: &str,
        hook: impl Fn(&str, &mut dyn Element, &Context<'_>, &mut dyn ErrorHandler) -> Result<()>
            + 'static,
    ) {
        if self.check_reserved(name) {
            self.map.add_write(name, Box::new(hook));
        }
    }

    /// Register the standard handlers for a [`Task`], each prefixed with
    /// `prefix` so an element with several tasks can expose them all:
    ///
    /// - `<prefix>scheduled` — whether the task is on the run queue;
    /// - `<prefix>tickets` — read/write scheduler share, clamped to
    ///   `1..=Task::MAX_TICKETS`;
    /// - `<prefix>home_thread` — the task's preferred thread.
    ///
    /// `accessor` maps the element to its task field, so one hook
    /// implementation serves any element layout.
    pub fn add_task_handlers<F>(&mut self, prefix: &str, accessor: F)
    where
        F: Fn(&dyn Element) -> &Task + Clone + 'static,
    {
        let acc = accessor.clone();
        self.map.add_read(
            &format!("{prefix}scheduled"),
            Box::new(move |el, _ctx| format!("{}\n", acc(el).scheduled())),
        );
        let acc = accessor.clone();
        self.map.add_read(
            &format!("{prefix}tickets"),
            Box::new(move |el, _ctx| format!("{}\n", acc(el).tickets())),
        );
        let acc = accessor.clone();
        self.map.add_write(
            &format!("{prefix}tickets"),
            Box::new(move |data, el, _ctx, errh| {
                let Ok(tickets) = data.trim().parse::<u32>() else {
                    errh.error(&format!(
                        "'tickets' takes an integer between 1 and {}",
                        Task::MAX_TICKETS
                    ));
                    return Err(Error::InvalidArgument("bad tickets".into()));
                };
                if tickets < 1 {
                    errh.warning("tickets pinned at 1");
                } else if tickets > Task::MAX_TICKETS {
                    errh.warning(&format!("tickets pinned at {}", Task::MAX_TICKETS));
                }
                acc(&*el).set_tickets(tickets);
                Ok(())
            }),
        );
        let acc = accessor;
        self.map.add_read(
            &format!("{prefix}home_thread"),
            Box::new(move |el, _ctx| format!("{}\n", acc(el).home_thread_id())),
        );
    }
}

/// Append a trailing newline unless the string is empty or already has
/// one.
fn newline_terminate(mut s: String) -> String {
    if !s.is_empty() && !s.ends_with('\n') {
        s.push('\n');
    }
    s
}

/// The element's current configuration arguments, plus whether they came
/// from the stored string rather than element state.
fn current_configuration(el: &dyn Element, ctx: &Context<'_>) -> (Vec<String>, bool) {
    match el.configuration() {
        Some(args) => (args, false),
        None => (
            config::split(&ctx.router().configuration_string(ctx.element_id())),
            true,
        ),
    }
}

pub(crate) fn add_default_handlers(map: &mut HandlerMap, allow_write_config: bool) {
    map.add_read(
        "class",
        Box::new(|el, _ctx| format!("{}\n", el.class_name())),
    );
    map.add_read("name", Box::new(|_el, ctx| format!("{}\n", ctx.name())));
    map.add_read(
        "config",
        Box::new(|el, ctx| {
            let s = match el.configuration() {
                Some(args) => config::join(&args),
                // Preserve the stored string's whitespace exactly.
                None => ctx.router().configuration_string(ctx.element_id()),
            };
            newline_terminate(s)
        }),
    );
    if allow_write_config {
        map.add_write(
            "config",
            Box::new(|data, el, ctx, errh| {
                let args = config::split(data);
                el.live_reconfigure(ctx, &args, errh)?;
                ctx.router()
                    .set_configuration_string(ctx.element_id(), data);
                Ok(())
            }),
        );
    }
    map.add_read(
        "ports",
        Box::new(|_el, ctx| ctx.router().element_ports_string(ctx.element_id())),
    );
    map.add_read(
        "handlers",
        Box::new(|_el, ctx| {
            let mut out = String::new();
            for (name, r, w) in ctx.router().handler_names(ctx.element_id()) {
                out.push_str(&name);
                out.push('\t');
                if r {
                    out.push('r');
                }
                if w {
                    out.push('w');
                }
                out.push('\n');
            }
            out
        }),
    );
    map.add_read(
        "icounts",
        Box::new(|_el, ctx| {
            let mut out = String::new();
            for port in 0..ctx.ninputs() {
                out.push_str(&format!("{}\n", ctx.input(port).npackets()));
            }
            out
        }),
    );
    map.add_read(
        "ocounts",
        Box::new(|_el, ctx| {
            let mut out = String::new();
            for port in 0..ctx.noutputs() {
                out.push_str(&format!("{}\n", ctx.output(port).npackets()));
            }
            out
        }),
    );
}

/// Stock read hook returning the `index`th positional configuration
/// argument, newline-terminated; empty if there are not enough
/// arguments.
pub fn positional_read(index: usize) -> impl Fn(&dyn Element, &Context<'_>) -> String {
    move |el, ctx| {
        let (conf, _) = current_configuration(el, ctx);
        match conf.get(index) {
            Some(arg) => newline_terminate(arg.clone()),
            None => String::new(),
        }
    }
}

/// Stock read hook returning the value bound to keyword `kw`,
/// newline-terminated; empty if the configuration has no such keyword.
pub fn keyword_read(kw: &'static str) -> impl Fn(&dyn Element, &Context<'_>) -> String {
    move |el, ctx| {
        let (conf, _) = current_configuration(el, ctx);
        for arg in conf.iter().rev() {
            if let Some(value) = config::keyword(arg, kw) {
                return newline_terminate(value.to_string());
            }
        }
        String::new()
    }
}

/// Sentinel stored configuration after a keyword reconfiguration, where
/// the true configuration lives in element state.
const DYNAMIC_CONFIG: &str = "/* dynamically reconfigured */";

/// Stock write hook that replaces the `index`th positional argument and
/// live-reconfigures the element. On success the stored configuration is
/// updated to the new joined form.
pub fn positional_reconfigure(
    index: usize,
) -> impl Fn(&str, &mut dyn Element, &Context<'_>, &mut dyn ErrorHandler) -> Result<()> {
    move |data, el, ctx, errh| {
        let (mut conf, _) = current_configuration(&*el, ctx);
        while conf.len() <= index {
            conf.push(String::new());
        }
        conf[index] = data.trim().to_string();
        let new_config = config::join(&conf);
        el.live_reconfigure(ctx, &conf, errh)?;
        ctx.router()
            .set_configuration_string(ctx.element_id(), new_config);
        Ok(())
    }
}

/// Stock write hook that appends a `kw value` argument and
/// live-reconfigures the element.
///
/// Refuses elements that rely on the stored configuration string (a
/// default [`configuration`](crate::element::Element::configuration)):
/// reconfiguring those from the stored string would silently discard
/// state changed by other handlers. On success the stored configuration
/// becomes a "dynamically reconfigured" marker, since the joined string
/// would desynchronize from element state.
pub fn keyword_reconfigure(
    kw: &'static str,
) -> impl Fn(&str, &mut dyn Element, &Context<'_>, &mut dyn ErrorHandler) -> Result<()> {
    move |data, el, ctx, errh| {
        let (mut conf, was_default) = current_configuration(&*el, ctx);
        if was_default {
            errh.error("cannot reconfigure by keyword: element has no configuration method");
            return Err(Error::InvalidArgument("default configuration".into()));
        }
        conf.push(format!("{kw} {}", data.trim()));
        el.live_reconfigure(ctx, &conf, errh)?;
        ctx.router()
            .set_configuration_string(ctx.element_id(), DYNAMIC_CONFIG);
        Ok(())
    }
}

impl Router {
    /// Read handler `name` on element `eid`.
    pub fn handler_read(&self, eid: ElementId, name: &str) -> Result<String> {
        let map = self.node_handlers(eid).borrow();
        let handler = map
            .get(name)
            .and_then(|h| h.read.as_ref())
            .ok_or_else(|| Error::UnknownHandler(name.to_string()))?;
        let el = self.node_element(eid).borrow();
        Ok(handler(el.as_ref(), &Context::new(self, eid)))
    }

    /// Write `data` to handler `name` on element `eid`.
    pub fn handler_write(
        &self,
        eid: ElementId,
        name: &str,
        data: &str,
        errh: &mut dyn ErrorHandler,
    ) -> Result<()> {
        let map = self.node_handlers(eid).borrow();
        let handler = map
            .get(name)
            .and_then(|h| h.write.as_ref())
            .ok_or_else(|| Error::UnknownHandler(name.to_string()))?;
        let mut el = self.node_element(eid).borrow_mut();
        handler(data, el.as_mut(), &Context::new(self, eid), errh)
    }

    /// The handlers registered on an element: `(name, readable,
    /// writable)` in registration order.
    pub fn handler_names(&self, eid: ElementId) -> Vec<(String, bool, bool)> {
        self.node_handlers(eid)
            .borrow()
            .visible()
            .map(|(n, r, w)| (n.to_string(), r, w))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_map_read_keeps_write() {
        let mut map = HandlerMap::new();
        map.add_read("x", Box::new(|_, _| "1\n".into()));
        map.add_write("x", Box::new(|_, _, _, _| Ok(())));
        map.add_read("x", Box::new(|_, _| "2\n".into()));
        let h = map.get("x").unwrap();
        assert!(h.read.is_some());
        assert!(h.write.is_some());
        assert_eq!(map.entries.len(), 1);
    }

    #[test]
    fn test_newline_terminate() {
        assert_eq!(newline_terminate(String::new()), "");
        assert_eq!(newline_terminate("a".into()), "a\n");
        assert_eq!(newline_terminate("a\n".into()), "a\n");
    }
}

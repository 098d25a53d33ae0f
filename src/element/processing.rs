//! Processing specifier grammar.
//!
//! An element declares per-port disciplines as `"<in-codes>/<out-codes>"`
//! (a single section is duplicated if no `/` appears). Each code is one
//! character: `h`/`H` push, `l`/`L` pull, `a`/`A` agnostic. The last code
//! in a section covers all remaining ports; extra codes are ignored.

use crate::report::ErrorHandler;

/// The discipline of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Processing {
    /// The producer drives the transfer.
    Push,
    /// The consumer drives the transfer.
    Pull,
    /// Discipline resolved from the neighborhood at topology finalization.
    #[default]
    Agnostic,
}

enum Code {
    Value(Processing),
    SectionEnd,
    Invalid,
}

fn next_code(bytes: &[u8], pos: &mut usize, errh: &mut dyn ErrorHandler) -> Code {
    match bytes.get(*pos) {
        Some(b'h') | Some(b'H') => {
            *pos += 1;
            Code::Value(Processing::Push)
        }
        Some(b'l') | Some(b'L') => {
            *pos += 1;
            Code::Value(Processing::Pull)
        }
        Some(b'a') | Some(b'A') => {
            *pos += 1;
            Code::Value(Processing::Agnostic)
        }
        Some(b'/') | None => Code::SectionEnd,
        Some(&c) => {
            errh.error(&format!("bad processing code '{}'", c as char));
            *pos += 1;
            Code::Invalid
        }
    }
}

fn fill_section(
    bytes: &[u8],
    pos: &mut usize,
    nports: usize,
    errh: &mut dyn ErrorHandler,
) -> Vec<Processing> {
    let mut out = Vec::with_capacity(nports);
    let mut val = Processing::Agnostic;
    let mut live = true;
    for _ in 0..nports {
        if live {
            match next_code(bytes, pos, errh) {
                Code::Value(v) => val = v,
                Code::SectionEnd => live = false,
                Code::Invalid => live = false,
            }
        }
        out.push(val);
    }
    out
}

/// Compute per-port disciplines from a processing specifier.
///
/// Returns one discipline per input and output port. Malformed codes are
/// reported to `errh`; ports past a bad or missing code keep the last
/// good value (agnostic if none was seen).
pub fn processing_vector(
    spec: &str,
    ninputs: usize,
    noutputs: usize,
    errh: &mut dyn ErrorHandler,
) -> (Vec<Processing>, Vec<Processing>) {
    let bytes = spec.as_bytes();
    let mut pos = 0;
    let in_v = fill_section(bytes, &mut pos, ninputs, errh);

    // Skip to the output section, or rewind if the specifier has none.
    while pos < bytes.len() && bytes[pos] != b'/' {
        pos += 1;
    }
    if pos < bytes.len() {
        pos += 1;
    } else {
        pos = 0;
    }

    let out_v = fill_section(bytes, &mut pos, noutputs, errh);
    (in_v, out_v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::BufferedErrorHandler;
    use Processing::{Agnostic, Pull, Push};

    fn vectors(spec: &str, ni: usize, no: usize) -> (Vec<Processing>, Vec<Processing>) {
        let mut errh = BufferedErrorHandler::new();
        let v = processing_vector(spec, ni, no, &mut errh);
        assert_eq!(errh.nerrors(), 0, "unexpected errors for {spec:?}");
        v
    }

    #[test]
    fn test_replication() {
        let (in_v, out_v) = vectors("a/ah", 4, 4);
        assert_eq!(in_v, vec![Agnostic; 4]);
        assert_eq!(out_v, vec![Agnostic, Push, Push, Push]);
    }

    #[test]
    fn test_single_section_duplicated() {
        let (in_v, out_v) = vectors("h", 2, 3);
        assert_eq!(in_v, vec![Push, Push]);
        assert_eq!(out_v, vec![Push, Push, Push]);
    }

    #[test]
    fn test_mixed_codes() {
        let (in_v, out_v) = vectors("hl/hlh", 3, 4);
        assert_eq!(in_v, vec![Push, Pull, Pull]);
        assert_eq!(out_v, vec![Push, Pull, Push, Push]);
    }

    #[test]
    fn test_uppercase_and_extras() {
        let (in_v, out_v) = vectors("HLA/L", 2, 1);
        assert_eq!(in_v, vec![Push, Pull]);
        assert_eq!(out_v, vec![Pull]);
    }

    #[test]
    fn test_bad_code_reported_keeps_last() {
        let mut errh = BufferedErrorHandler::new();
        let (in_v, _) = processing_vector("hx/l", 3, 1, &mut errh);
        assert_eq!(errh.nerrors(), 1);
        assert_eq!(in_v, vec![Push, Push, Push]);
    }

    #[test]
    fn test_empty_sections_default_agnostic() {
        let (in_v, out_v) = vectors("a", 0, 2);
        assert!(in_v.is_empty());
        assert_eq!(out_v, vec![Agnostic, Agnostic]);
    }
}

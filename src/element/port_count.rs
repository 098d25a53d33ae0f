//! Port-count specifier grammar.
//!
//! An element declares its legal arities as `"<in-range>/<out-range>"`; if
//! no `/` appears the same range applies to both sides. A range is `N`
//! (exactly), `N-M` (inclusive), `-M` (up to), `N-` (at least), or `-`
//! (any); the output side may instead be `=`, meaning "equal to the
//! resolved input count".
//!
//! Resolution clamps the wired port counts into the declared ranges; it is
//! the router's job to reject wirings the clamped counts cannot serve.

use crate::error::{Error, Result};
use winnow::ascii::digit1;
use winnow::combinator::{eof, opt};
use winnow::error::ContextError;
use winnow::Parser;

type WResult<T> = std::result::Result<T, ContextError>;

/// One side of a port-count specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    lo: u32,
    hi: u32,
}

impl PortRange {
    /// Clamp a wired count into this range.
    fn clamp(&self, want: usize) -> usize {
        if want < self.lo as usize {
            self.lo as usize
        } else if want > self.hi as usize {
            self.hi as usize
        } else {
            want
        }
    }

    /// Whether `count` lies within this range.
    pub fn contains(&self, count: usize) -> bool {
        (self.lo as usize..=self.hi as usize).contains(&count)
    }
}

/// The output side of a specifier: a range, or "same as inputs".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputRange {
    Range(PortRange),
    EqualsInput,
}

/// A parsed port-count specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortCount {
    input: PortRange,
    output: OutputRange,
}

impl PortCount {
    /// Parse a port-count specifier string.
    pub fn parse(spec: &str) -> Result<Self> {
        port_count
            .parse(spec)
            .map_err(|_| Error::InvalidSpec(format!("bad port count '{spec}'")))
    }

    /// Resolve the wired counts against the declared ranges.
    ///
    /// `in_want` and `out_want` are the numbers of ports the wiring uses
    /// (highest used index plus one). Each is clamped into its declared
    /// range; an `=` output side copies the resolved input count.
    pub fn resolve(&self, in_want: usize, out_want: usize) -> (usize, usize) {
        let ninputs = self.input.clamp(in_want);
        let noutputs = match self.output {
            OutputRange::EqualsInput => ninputs,
            OutputRange::Range(r) => r.clamp(out_want),
        };
        (ninputs, noutputs)
    }

    /// The declared input range.
    pub fn input_range(&self) -> PortRange {
        self.input
    }

    /// The declared output range, if the output side is not `=`.
    pub fn output_range(&self) -> Option<PortRange> {
        match self.output {
            OutputRange::Range(r) => Some(r),
            OutputRange::EqualsInput => None,
        }
    }
}

fn number(input: &mut &str) -> WResult<u32> {
    digit1.try_map(str::parse::<u32>).parse_next(input)
}

fn range(input: &mut &str) -> WResult<PortRange> {
    let lo = opt(number).parse_next(input)?;
    let dash = opt('-').parse_next(input)?;
    let hi = opt(number).parse_next(input)?;
    match (lo, dash, hi) {
        (Some(n), None, _) => Ok(PortRange { lo: n, hi: n }),
        (Some(n), Some(_), Some(m)) => Ok(PortRange { lo: n, hi: m }),
        (Some(n), Some(_), None) => Ok(PortRange { lo: n, hi: u32::MAX }),
        (None, Some(_), Some(m)) => Ok(PortRange { lo: 0, hi: m }),
        (None, Some(_), None) => Ok(PortRange { lo: 0, hi: u32::MAX }),
        (None, None, _) => Err(ContextError::new()),
    }
}

fn output_range(input: &mut &str) -> WResult<OutputRange> {
    if opt('=').parse_next(input)?.is_some() {
        Ok(OutputRange::EqualsInput)
    } else {
        range.parse_next(input).map(OutputRange::Range)
    }
}

fn port_count(input: &mut &str) -> WResult<PortCount> {
    let in_range = range.parse_next(input)?;
    let output = if opt('/').parse_next(input)?.is_some() {
        output_range.parse_next(input)?
    } else {
        OutputRange::Range(in_range)
    };
    eof.parse_next(input)?;
    Ok(PortCount {
        input: in_range,
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(spec: &str, in_want: usize, out_want: usize) -> (usize, usize) {
        PortCount::parse(spec).unwrap().resolve(in_want, out_want)
    }

    #[test]
    fn test_exact_counts() {
        assert_eq!(resolve("1/1", 1, 1), (1, 1));
        assert_eq!(resolve("1/1", 0, 5), (1, 1));
        assert_eq!(resolve("3", 0, 0), (3, 3));
    }

    #[test]
    fn test_ranges() {
        assert_eq!(resolve("1-2/0", 1, 0), (1, 0));
        assert_eq!(resolve("1-2/0", 5, 3), (2, 0));
        assert_eq!(resolve("1/-6", 1, 9), (1, 6));
        assert_eq!(resolve("2-/-", 0, 7), (2, 7));
        assert_eq!(resolve("-/-", 4, 0), (4, 0));
    }

    #[test]
    fn test_equal_output() {
        // Wiring uses inputs 0..3 and one output: inputs clamp to 2,
        // outputs copy the resolved input count.
        assert_eq!(resolve("1-2/=", 3, 1), (2, 2));
        assert_eq!(resolve("1-/=", 4, 0), (4, 4));
    }

    #[test]
    fn test_contains() {
        let pc = PortCount::parse("1-2/=").unwrap();
        assert!(pc.input_range().contains(2));
        assert!(!pc.input_range().contains(0));
        assert!(pc.output_range().is_none());
    }

    #[test]
    fn test_malformed() {
        for spec in ["", "/1", "1/", "x", "1-2-3", "1/=2", "1 / 1", "=/1"] {
            assert!(PortCount::parse(spec).is_err(), "{spec:?} should not parse");
        }
    }
}

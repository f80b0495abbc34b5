use std::fmt;

use crate::MAX_NODES;

/// Wire sentinel for [`Distance::INFINITY`]; outside `[0, MAX_NODES)` by construction.
pub const INFINITY_TOKEN: u8 = 255;

/// A hop count, or unreachable. Never compare this to a raw integer: use the
/// accessors below so the sentinel can never leak into arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Distance(Option<u8>);

impl Distance {
    pub const INFINITY: Distance = Distance(None);
    pub const ZERO: Distance = Distance(Some(0));

    pub fn finite(hops: u8) -> Self {
        Distance(Some(hops))
    }

    pub fn is_infinity(self) -> bool {
        self.0.is_none()
    }

    pub fn hops(self) -> Option<u8> {
        self.0
    }

    /// `self + 1`, clamped to `INFINITY` once it would reach `MAX_NODES` —
    /// the loop-prevention horizon `node.py` enforces by rejecting any
    /// advertised distance that would grow a route past `MAX_NODES` hops.
    pub fn successor(self) -> Distance {
        match self.0 {
            None => Distance::INFINITY,
            Some(h) if (h as usize) + 1 >= MAX_NODES => Distance::INFINITY,
            Some(h) => Distance::finite(h + 1),
        }
    }

    /// True iff `self` is strictly shorter than `other`, treating `INFINITY`
    /// as longer than any finite distance.
    pub fn shorter_than(self, other: Distance) -> bool {
        match (self.0, other.0) {
            (Some(_), None) => true,
            (None, _) => false,
            (Some(a), Some(b)) => a < b,
        }
    }

    pub fn to_wire(self) -> u8 {
        self.0.unwrap_or(INFINITY_TOKEN)
    }

    pub fn from_wire(token: u8) -> Distance {
        if token == INFINITY_TOKEN {
            Distance::INFINITY
        } else {
            Distance::finite(token)
        }
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

use std::fmt;

/// Comparison operator of an ordered leaf filter, selected by the sign of its literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    Less,
    Greater,
}

impl Comparison {
    /// Split a leading `+` (greater) or `-` (less) off a literal.
    pub fn split_sign(literal: &str) -> (Self, &str) {
        if let Some(rest) = literal.strip_prefix('+') {
            (Comparison::Greater, rest)
        } else if let Some(rest) = literal.strip_prefix('-') {
            (Comparison::Less, rest)
        } else {
            (Comparison::Equal, literal)
        }
    }

    /// Swap less and greater; time deltas count backwards from now.
    pub fn inverted(self) -> Self {
        match self {
            Comparison::Equal => Comparison::Equal,
            Comparison::Less => Comparison::Greater,
            Comparison::Greater => Comparison::Less,
        }
    }

    pub fn compare(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparison::Equal => lhs == rhs,
            Comparison::Less => lhs < rhs,
            Comparison::Greater => lhs > rhs,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Comparison::Equal => "equal",
            Comparison::Less => "less",
            Comparison::Greater => "greater",
        };
        write!(f, "{name}")
    }
}

// vim: tw=80
//! How many times an expectation may, and must, be called.

use std::{
    fmt,
    ops::{Range, RangeFrom, RangeInclusive}
};

use crate::error::RegistrationError;

/// Where an expectation stands relative to its [`Cardinality`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExpectationState {
    /// Called fewer times than the lower bound
    Unsatisfied,
    /// Lower bound met, and more calls are still allowed
    Satisfied,
    /// Called exactly as many times as the (finite) upper bound allows
    Exhausted,
}

/// Inclusive bounds on an expectation's call count.  An upper bound of `None`
/// is unbounded.
///
/// The invariant `lower <= upper` is enforced at construction.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Cardinality {
    lower: usize,
    upper: Option<usize>,
}

impl Cardinality {
    pub const fn exactly(n: usize) -> Self {
        Cardinality{lower: n, upper: Some(n)}
    }

    pub const fn once() -> Self {
        Self::exactly(1)
    }

    /// Forbid the expectation from ever being called
    pub const fn never() -> Self {
        Self::exactly(0)
    }

    pub const fn at_least(n: usize) -> Self {
        Cardinality{lower: n, upper: None}
    }

    pub const fn at_least_once() -> Self {
        Self::at_least(1)
    }

    pub const fn at_most(n: usize) -> Self {
        Cardinality{lower: 0, upper: Some(n)}
    }

    pub const fn at_most_once() -> Self {
        Self::at_most(1)
    }

    pub const fn any_number_of_times() -> Self {
        Cardinality{lower: 0, upper: None}
    }

    /// Any call count from `lower` to `upper`, inclusive.
    pub fn between(lower: usize, upper: usize)
        -> Result<Self, RegistrationError>
    {
        if lower > upper {
            Err(RegistrationError::InvalidCardinality{lower, upper})
        } else {
            Ok(Cardinality{lower, upper: Some(upper)})
        }
    }

    pub fn lower(&self) -> usize {
        self.lower
    }

    pub fn upper(&self) -> Option<usize> {
        self.upper
    }

    /// Would an expectation called `count` times satisfy these bounds?
    pub fn contains(&self, count: usize) -> bool {
        count >= self.lower && self.upper.map_or(true, |u| count <= u)
    }

    pub fn state(&self, count: usize) -> ExpectationState {
        if count < self.lower {
            ExpectationState::Unsatisfied
        } else if self.upper.map_or(false, |u| count >= u) {
            ExpectationState::Exhausted
        } else {
            ExpectationState::Satisfied
        }
    }
}

/// By default, allow any number of calls
impl Default for Cardinality {
    fn default() -> Self {
        Self::any_number_of_times()
    }
}

impl From<usize> for Cardinality {
    fn from(n: usize) -> Self {
        Self::exactly(n)
    }
}

impl From<RangeFrom<usize>> for Cardinality {
    fn from(range: RangeFrom<usize>) -> Self {
        Self::at_least(range.start)
    }
}

impl TryFrom<RangeInclusive<usize>> for Cardinality {
    type Error = RegistrationError;

    fn try_from(range: RangeInclusive<usize>) -> Result<Self, Self::Error> {
        Self::between(*range.start(), *range.end())
    }
}

/// A half-open range, like `2..5`.  Empty ranges are rejected.
impl TryFrom<Range<usize>> for Cardinality {
    type Error = RegistrationError;

    fn try_from(range: Range<usize>) -> Result<Self, Self::Error> {
        if range.is_empty() {
            return Err(RegistrationError::EmptyRange {
                start: range.start,
                end: range.end
            });
        }
        Self::between(range.start, range.end - 1)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.lower, self.upper) {
            (l, Some(u)) if l == u => write!(f, "exactly {}", l),
            (0, None) => f.write_str("any number of"),
            (l, None) => write!(f, "at least {}", l),
            (0, Some(u)) => write!(f, "at most {}", u),
            (l, Some(u)) => write!(f, "between {} and {}", l, u),
        }
    }
}

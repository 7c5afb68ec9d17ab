// vim: tw=80
//! Everything that can go wrong while programming, driving, or checking a
//! [`MockContext`](crate::MockContext).
//!
//! Dispatch-time errors are fatal for the running test.  Teardown-time and
//! verification-time errors are collected and reported together.

use std::fmt;

use thiserror::Error;

use crate::cardinality::Cardinality;

/// Why a call could not be matched against any live expectation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnexpectedReason {
    /// Nothing registered for the signature accepts the arguments.
    NoMatch,
    /// An expectation accepts the arguments, but it isn't the current head of
    /// its sequence.
    OutOfOrder,
    /// Every expectation that accepts the arguments was already called its
    /// maximum number of times.
    Exhausted,
}

impl fmt::Display for UnexpectedReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UnexpectedReason::NoMatch => f.write_str("no matching expectation"),
            UnexpectedReason::OutOfOrder => f.write_str("out of order"),
            UnexpectedReason::Exhausted =>
                f.write_str("matching expectation already exhausted"),
        }
    }
}

fn list_candidates(candidates: &[String]) -> String {
    if candidates.is_empty() {
        "; no expectations are currently eligible".to_owned()
    } else {
        let mut s = String::from("; eligible expectations:");
        for c in candidates {
            s.push_str("\n  - ");
            s.push_str(&c.replace('\n', "\n    "));
        }
        s
    }
}

/// A call arrived that the engine cannot answer.
///
/// An out-of-order call is reported as this same error, with
/// [`UnexpectedReason::OutOfOrder`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unexpected call {call}: {reason}{}", list_candidates(.candidates))]
pub struct UnexpectedCallError {
    /// The attempted call, rendered as `Interface::method(args)`
    pub call: String,
    pub reason: UnexpectedReason,
    /// Descriptions of the expectations that were eligible when the call
    /// arrived, with an explanation of each argument that didn't match.
    pub candidates: Vec<String>,
}

impl UnexpectedCallError {
    pub fn is_out_of_order(&self) -> bool {
        self.reason == UnexpectedReason::OutOfOrder
    }
}

/// Fatal errors returned by [`MockContext::dispatch`](crate::MockContext::dispatch).
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum DispatchError {
    #[error(transparent)]
    Unexpected(#[from] UnexpectedCallError),

    #[error("unstubbed call {call}: the return type has no default value")]
    NoDefault { call: String },

    #[error("{call}: a one-shot response was already consumed")]
    ResponseExhausted { call: String },

    #[error("{call}: single-threaded response invoked from another thread")]
    WrongThread { call: String },

    #[error("{call}: mock context was aborted by an earlier failure: {cause}")]
    Aborted { call: String, cause: String },
}

impl DispatchError {
    /// Is this an [`UnexpectedCallError`] caused by call ordering?
    pub fn is_out_of_order(&self) -> bool {
        matches!(self, DispatchError::Unexpected(e) if e.is_out_of_order())
    }

    /// The rendered call that triggered this error
    pub fn call(&self) -> &str {
        match self {
            DispatchError::Unexpected(e) => &e.call,
            DispatchError::NoDefault { call }
            | DispatchError::ResponseExhausted { call }
            | DispatchError::WrongThread { call }
            | DispatchError::Aborted { call, .. } => call,
        }
    }
}

/// An expectation that was called fewer times than its lower bound by the time
/// the test ended.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("expected {expected} call(s) to {signature} matching {matcher}, but observed {observed}")]
pub struct UnsatisfiedExpectationError {
    pub signature: String,
    pub matcher: String,
    pub expected: Cardinality,
    pub observed: usize,
}

/// An explicit verification whose observed call count fell outside the
/// requested range.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("expected {expected} call(s) to {signature} matching {matcher}, but observed {observed}")]
pub struct VerificationFailure {
    pub signature: String,
    pub matcher: String,
    pub expected: Cardinality,
    pub observed: usize,
}

/// Misuse of the registration or introspection API.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum RegistrationError {
    #[error("cardinality lower bound {lower} exceeds upper bound {upper}")]
    InvalidCardinality { lower: usize, upper: usize },

    #[error("call-count range {start}..{end} is empty")]
    EmptyRange { start: usize, end: usize },

    #[error("handle belongs to a different mock context")]
    ForeignHandle,
}

/// One entry of the list returned by
/// [`MockContext::end_test_and_verify`](crate::MockContext::end_test_and_verify).
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Violation {
    #[error(transparent)]
    Fatal(DispatchError),

    #[error(transparent)]
    Unsatisfied(UnsatisfiedExpectationError),

    #[error(transparent)]
    Verification(VerificationFailure),
}

#[cfg(test)]
mod t {
    use super::*;

    #[test]
    fn unsatisfied_diagnostic() {
        let e = UnsatisfiedExpectationError {
            signature: "Thermometer::connect".to_owned(),
            matcher: "()".to_owned(),
            expected: Cardinality::exactly(2),
            observed: 1,
        };
        assert_eq!(e.to_string(),
            "expected exactly 2 call(s) to Thermometer::connect matching (), \
             but observed 1");
    }

    #[test]
    fn unexpected_without_candidates() {
        let e = UnexpectedCallError {
            call: "Thermometer::disconnect()".to_owned(),
            reason: UnexpectedReason::NoMatch,
            candidates: Vec::new(),
        };
        assert_eq!(e.to_string(),
            "unexpected call Thermometer::disconnect(): no matching \
             expectation; no expectations are currently eligible");
    }

    #[test]
    fn unexpected_indents_candidate_details() {
        let e = UnexpectedCallError {
            call: "Foo::foo(5)".to_owned(),
            reason: UnexpectedReason::OutOfOrder,
            candidates: vec!["Foo::bar()\nwhy".to_owned()],
        };
        assert!(e.is_out_of_order());
        assert_eq!(e.to_string(),
            "unexpected call Foo::foo(5): out of order; eligible \
             expectations:\n  - Foo::bar()\n    why");
    }
}

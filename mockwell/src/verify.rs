// vim: tw=80
//! Post-hoc queries over recorded calls.
//!
//! Verification never consumes or mutates expectations.  It only counts the
//! history records that match a signature and a [`CallMatcher`].

use std::ops::Range;

use tracing::warn;

use crate::{
    cardinality::Cardinality,
    context::MockContext,
    error::VerificationFailure,
    history::History,
    matcher::CallMatcher,
    signature::Signature
};

/// Count the calls in `history` made to `sig` with arguments accepted by
/// `matcher`.  Calls that were rejected or answered with a default value
/// count too.
pub fn count_matching<A, O>(history: &History, sig: &Signature<A, O>,
                            matcher: &CallMatcher<A>) -> usize
    where A: 'static
{
    history.iter()
        .filter(|r| r.signature() == sig.info())
        .filter_map(|r| r.arguments::<A>())
        .filter(|args| matcher.matches(args))
        .count()
}

/// A pending verification, created by
/// [`MockContext::verify`](crate::MockContext::verify).
///
/// Each checking method evaluates immediately against the history as it is at
/// that moment.  Failures are returned and also logged with the context, so
/// that [`end_test_and_verify`](crate::MockContext::end_test_and_verify)
/// reports every one of them.
///
/// # Examples
/// ```
/// # use mockwell::*;
/// let ctx = MockContext::lenient();
/// let sig = Signature::<(u32,), bool>::new("Door", "open");
/// ctx.dispatch(&sig, (5,)).unwrap();
///
/// let v = ctx.verify(&sig, params!(5u32));
/// assert_eq!(Ok(1), v.called());
/// assert!(v.times(2).is_err());
/// assert_eq!(1, ctx.end_test_and_verify().len());
/// ```
#[must_use = "verifications do nothing until checked"]
pub struct Verification<'ctx, A, O> {
    ctx: &'ctx MockContext,
    signature: Signature<A, O>,
    matcher: CallMatcher<A>,
}

impl<'ctx, A: 'static, O: 'static> Verification<'ctx, A, O> {
    pub(crate) fn new(ctx: &'ctx MockContext, signature: Signature<A, O>,
                      matcher: CallMatcher<A>) -> Self
    {
        Verification{ctx, signature, matcher}
    }

    /// How many recorded calls match, right now
    pub fn count(&self) -> usize {
        let engine = self.ctx.lock();
        count_matching(&engine.history, &self.signature, &self.matcher)
    }

    /// Require at least one matching call.  The default verification.
    pub fn called(&self) -> Result<usize, VerificationFailure> {
        self.within(Cardinality::at_least_once())
    }

    pub fn times(&self, n: usize) -> Result<usize, VerificationFailure> {
        self.within(Cardinality::exactly(n))
    }

    pub fn never(&self) -> Result<usize, VerificationFailure> {
        self.within(Cardinality::never())
    }

    pub fn at_least(&self, n: usize) -> Result<usize, VerificationFailure> {
        self.within(Cardinality::at_least(n))
    }

    pub fn at_most(&self, n: usize) -> Result<usize, VerificationFailure> {
        self.within(Cardinality::at_most(n))
    }

    /// Require a matching call count within the half-open `range`.
    ///
    /// # Panics
    ///
    /// If `range` is empty.
    pub fn times_range(&self, range: Range<usize>)
        -> Result<usize, VerificationFailure>
    {
        match Cardinality::try_from(range) {
            Ok(expected) => self.within(expected),
            Err(e) => panic!("{}", e)
        }
    }

    /// Require a matching call count within `expected`.  On success, returns
    /// the observed count.
    pub fn within(&self, expected: Cardinality)
        -> Result<usize, VerificationFailure>
    {
        let mut engine = self.ctx.lock();
        let observed = count_matching(&engine.history, &self.signature,
                                      &self.matcher);
        if expected.contains(observed) {
            return Ok(observed);
        }
        let failure = VerificationFailure {
            signature: self.signature.to_string(),
            matcher: self.matcher.to_string(),
            expected,
            observed,
        };
        warn!(context = %self.ctx.label(), error = %failure,
              "verification failed");
        engine.failures.push(failure.clone());
        Err(failure)
    }
}

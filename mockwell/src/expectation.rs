// vim: tw=80
//! Programmed rules and the handles test code uses to refer to them.

use std::fmt;

use downcast::*;

use crate::{
    cardinality::{Cardinality, ExpectationState},
    context::ContextId,
    matcher::CallMatcher,
    response::{ProduceError, Response},
    signature::MethodSignature
};

/// Position of an expectation in its context's registration order
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ExpectationId(pub(crate) usize);

impl ExpectationId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ExpectationId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Refers to an expectation registered with
/// [`MockContext::register_expectation`](crate::MockContext::register_expectation).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ExpectationHandle {
    pub(crate) context: ContextId,
    pub(crate) id: ExpectationId,
}

impl ExpectationHandle {
    pub fn id(&self) -> ExpectationId {
        self.id
    }
}

/// Refers to a stub registered with
/// [`MockContext::register_stub`](crate::MockContext::register_stub).
///
/// Stubs never carry a teardown obligation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct StubHandle(pub(crate) ExpectationHandle);

impl StubHandle {
    pub fn id(&self) -> ExpectationId {
        self.0.id
    }
}

impl From<StubHandle> for ExpectationHandle {
    fn from(stub: StubHandle) -> Self {
        stub.0
    }
}

/// Type-erased storage for the typed half of an expectation
pub(crate) trait AnyExpectation : Any + Send {}
downcast!(dyn AnyExpectation);

/// The matcher and response, which depend on the signature's types
pub(crate) struct Typed<A, O> {
    pub(crate) matcher: CallMatcher<A>,
    pub(crate) response: Response<A, O>,
}

impl<A: 'static, O: 'static> AnyExpectation for Typed<A, O> {}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Kind {
    Mock,
    Stub,
}

/// One programmed rule, owned by the context's expectation arena.
pub(crate) struct Stored {
    pub(crate) signature: MethodSignature,
    pub(crate) cardinality: Cardinality,
    pub(crate) kind: Kind,
    /// How many calls have matched this expectation so far
    pub(crate) consumed: usize,
    /// Set by a checkpoint.  Retired expectations never match again.
    pub(crate) retired: bool,
    matcher_description: String,
    typed: Box<dyn AnyExpectation>,
}

impl Stored {
    pub(crate) fn new<A: 'static, O: 'static>(
        signature: MethodSignature,
        matcher: CallMatcher<A>,
        response: Response<A, O>,
        cardinality: Cardinality,
        kind: Kind) -> Self
    {
        Stored {
            signature,
            cardinality,
            kind,
            consumed: 0,
            retired: false,
            matcher_description: matcher.to_string(),
            typed: Box::new(Typed{matcher, response}),
        }
    }

    pub(crate) fn state(&self) -> ExpectationState {
        self.cardinality.state(self.consumed)
    }

    /// May this expectation never match again?
    pub(crate) fn is_spent(&self) -> bool {
        self.retired || self.state() == ExpectationState::Exhausted
    }

    pub(crate) fn matcher_description(&self) -> &str {
        &self.matcher_description
    }

    /// Does this expectation's matcher accept `args`?  Always false if the
    /// argument types differ.
    pub(crate) fn matches<A: 'static, O: 'static>(&self, args: &A) -> bool {
        self.typed::<A, O>().map_or(false, |t| t.matcher.matches(args))
    }

    pub(crate) fn explain<A: 'static, O: 'static>(&self, args: &A)
        -> Vec<String>
    {
        self.typed::<A, O>().map_or_else(Vec::new, |t| t.matcher.explain(args))
    }

    /// Count one call and produce its response.
    pub(crate) fn consume<A: 'static, O: 'static>(&mut self, args: &A)
        -> Option<Result<O, ProduceError>>
    {
        self.consumed += 1;
        self.typed_mut::<A, O>().map(|t| t.response.produce(args))
    }

    fn typed<A: 'static, O: 'static>(&self) -> Option<&Typed<A, O>> {
        self.typed.downcast_ref().ok()
    }

    fn typed_mut<A: 'static, O: 'static>(&mut self)
        -> Option<&mut Typed<A, O>>
    {
        self.typed.downcast_mut().ok()
    }
}

impl fmt::Display for Stored {
    /// Like `Thermometer::connect() [exactly 1, observed 0]`
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sep = if self.matcher_description.starts_with('(') {
            ""
        } else {
            " "
        };
        write!(f, "{}{}{} [{}, observed {}]", self.signature, sep,
               self.matcher_description, self.cardinality, self.consumed)
    }
}

#[cfg(test)]
mod t {
    use super::*;
    use crate::{matcher::ArgMatcher, signature::Signature};

    fn stored(card: Cardinality) -> Stored {
        let sig = Signature::<(u32,), u32>::new("Foo", "foo");
        Stored::new(sig.info().clone(),
                    CallMatcher::from((ArgMatcher::eq(5u32),)),
                    Response::returning(|(x,): &(u32,)| x + 1),
                    card,
                    Kind::Mock)
    }

    #[test]
    fn consume_counts_and_responds() {
        let mut s = stored(Cardinality::exactly(2));
        assert!(s.matches::<(u32,), u32>(&(5,)));
        assert!(!s.matches::<(u32,), u32>(&(6,)));
        assert_eq!(Some(Ok(6)), s.consume::<(u32,), u32>(&(5,)));
        assert_eq!(ExpectationState::Unsatisfied, s.state());
        s.consume::<(u32,), u32>(&(5,));
        assert!(s.is_spent());
    }

    #[test]
    fn wrong_types_never_match() {
        let s = stored(Cardinality::default());
        assert!(!s.matches::<(u64,), u32>(&(5,)));
        assert!(!s.matches::<(u32,), i32>(&(5,)));
    }

    #[test]
    fn display() {
        let s = stored(Cardinality::exactly(1));
        assert_eq!("Foo::foo(5) [exactly 1, observed 0]", s.to_string());
    }

    #[test]
    fn display_wildcard() {
        let sig = Signature::<(u32,), u32>::new("Foo", "foo");
        let s = Stored::new(sig.info().clone(), CallMatcher::<(u32,)>::any(),
                            Response::constant(0), Cardinality::at_least(2),
                            Kind::Stub);
        assert_eq!("Foo::foo <anything> [at least 2, observed 0]",
                   s.to_string());
    }
}

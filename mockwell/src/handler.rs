// vim: tw=80
//! Per-signature dispatch.
//!
//! The [`Engine`] owns everything a context mutates while a test runs: the
//! expectation arena, the ordering tree, one [`CallHandler`] per signature, and
//! the call history.  The owning context guards it with a single mutex, so
//! each dispatch is one atomic critical section.

use std::{collections::HashMap, fmt::Debug};

use tracing::{trace, warn};

use crate::{
    cardinality::Cardinality,
    context::Mode,
    error::{
        DispatchError,
        UnexpectedCallError,
        UnexpectedReason,
        UnsatisfiedExpectationError,
        VerificationFailure
    },
    expectation::{ExpectationId, Kind, Stored},
    group::{GroupId, GroupKind, GroupTree},
    history::{render_arguments, CallOutcome, History},
    matcher::CallMatcher,
    response::{ProduceError, Response},
    signature::{MethodSignature, Signature}
};

/// Result of looking for an expectation that can answer a call
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Selection {
    Matched(ExpectationId),
    /// The call matches only expectations that aren't eligible yet
    OutOfOrder,
    /// The call matches only expectations that can never match again
    Exhausted,
    NoMatch,
}

/// The expectations registered for one signature, in registration order.
#[derive(Debug, Default)]
pub(crate) struct CallHandler {
    expectations: Vec<ExpectationId>,
}

impl CallHandler {
    /// Every current expectation is checked in FIFO order and the first
    /// eligible one with matching arguments wins.
    fn select<A: 'static, O: 'static>(&self, args: &A,
                                      eligible: &[ExpectationId],
                                      store: &[Stored]) -> Selection
    {
        let mut fallback = Selection::NoMatch;
        for &id in self.expectations.iter() {
            let e = &store[id.0];
            if e.retired || !e.matches::<A, O>(args) {
                continue;
            }
            if eligible.binary_search(&id).is_ok() {
                return Selection::Matched(id);
            }
            if e.is_spent() {
                if fallback == Selection::NoMatch {
                    fallback = Selection::Exhausted;
                }
            } else {
                fallback = Selection::OutOfOrder;
            }
        }
        fallback
    }

    fn retire(&mut self) {
        self.expectations.clear();
    }
}

pub(crate) struct Engine {
    expectations: Vec<Stored>,
    groups: GroupTree,
    handlers: HashMap<MethodSignature, CallHandler>,
    pub(crate) history: History,
    /// The first fatal dispatch error, if any
    aborted: Option<DispatchError>,
    /// Failures from explicit verifications, in the order they happened
    pub(crate) failures: Vec<VerificationFailure>,
}

impl Engine {
    pub(crate) fn new() -> Self {
        Engine {
            expectations: Vec::new(),
            groups: GroupTree::new(),
            handlers: HashMap::new(),
            history: History::new(),
            aborted: None,
            failures: Vec::new(),
        }
    }

    pub(crate) fn add_group(&mut self, parent: GroupId, kind: GroupKind)
        -> GroupId
    {
        self.groups.add_group(parent, kind)
    }

    pub(crate) fn group_kind(&self, id: GroupId) -> GroupKind {
        self.groups.kind(id)
    }

    pub(crate) fn advance(&mut self, id: GroupId) -> bool {
        let store = &self.expectations;
        self.groups.advance(id, &|e| store[e.0].is_spent())
    }

    pub(crate) fn register<A: 'static, O: 'static>(
        &mut self,
        signature: &Signature<A, O>,
        matcher: CallMatcher<A>,
        response: Response<A, O>,
        cardinality: Cardinality,
        group: GroupId,
        kind: Kind) -> ExpectationId
    {
        let id = ExpectationId(self.expectations.len());
        let info = signature.info().clone();
        self.expectations.push(Stored::new(info.clone(), matcher, response,
                                           cardinality, kind));
        self.groups.add_expectation(group, id);
        self.handlers.entry(info).or_default().expectations.push(id);
        id
    }

    pub(crate) fn expectation(&self, id: ExpectationId) -> &Stored {
        &self.expectations[id.0]
    }

    pub(crate) fn aborted(&self) -> Option<&DispatchError> {
        self.aborted.as_ref()
    }

    /// Answer one call.
    ///
    /// Always appends exactly one record to the history, whatever the outcome.
    pub(crate) fn dispatch<A, O>(&mut self, mode: Mode, sig: &Signature<A, O>,
                                 args: A) -> Result<O, DispatchError>
        where A: Debug + Send + 'static, O: 'static
    {
        let rendered = render_arguments(&args);
        let call = format!("{}{}", sig, rendered);

        if let Some(cause) = &self.aborted {
            let e = DispatchError::Aborted {
                call,
                cause: cause.to_string()
            };
            self.history.append(sig.info().clone(), args, rendered,
                                CallOutcome::Rejected);
            return Err(e);
        }

        let store = &self.expectations;
        let eligible = self.groups.eligible(&|e| store[e.0].is_spent());
        let selection = match self.handlers.get(sig.info()) {
            Some(h) => h.select::<A, O>(&args, &eligible, &self.expectations),
            None => Selection::NoMatch
        };

        let reason = match selection {
            Selection::Matched(id) => {
                // Record first, so the call is logged even if the producer
                // panics.
                let seq = self.history.append(sig.info().clone(), args,
                    rendered, CallOutcome::Matched(id));
                trace!(signature = %sig, seq, expectation = %id,
                       "matched call");
                let produced = self.history.latest_arguments::<A>()
                    .and_then(|args|
                        self.expectations[id.0].consume::<A, O>(args));
                return match produced {
                    Some(Ok(o)) => Ok(o),
                    Some(Err(ProduceError::Expired)) =>
                        Err(self.abort(DispatchError::ResponseExhausted{call})),
                    Some(Err(ProduceError::WrongThread)) =>
                        Err(self.abort(DispatchError::WrongThread{call})),
                    None => unreachable!("signature identity includes types"),
                };
            },
            Selection::OutOfOrder => UnexpectedReason::OutOfOrder,
            Selection::Exhausted => UnexpectedReason::Exhausted,
            Selection::NoMatch => UnexpectedReason::NoMatch,
        };

        if mode == Mode::Lenient && reason != UnexpectedReason::OutOfOrder {
            let default = sig.default_value();
            let outcome = if default.is_some() {
                CallOutcome::Defaulted
            } else {
                CallOutcome::Rejected
            };
            let seq = self.history.append(sig.info().clone(), args, rendered,
                                          outcome);
            trace!(signature = %sig, seq, "returned default for unstubbed call");
            return default.ok_or_else(||
                self.abort(DispatchError::NoDefault{call}));
        }

        let candidates = eligible.iter()
            .map(|&id| {
                let e = &self.expectations[id.0];
                let mut desc = e.to_string();
                if e.signature == *sig.info() {
                    for why in e.explain::<A, O>(&args) {
                        desc.push('\n');
                        desc.push_str(&why);
                    }
                }
                desc
            }).collect();
        self.history.append(sig.info().clone(), args, rendered,
                            CallOutcome::Rejected);
        let e = UnexpectedCallError{call, reason, candidates};
        Err(self.abort(e.into()))
    }

    /// Remember the first fatal error, so later calls and teardown report it.
    fn abort(&mut self, e: DispatchError) -> DispatchError {
        warn!(error = %e, "fatal dispatch error");
        if self.aborted.is_none() {
            self.aborted = Some(e.clone());
        }
        e
    }

    /// Every live mock expectation that hasn't met its lower bound, in
    /// registration order.
    pub(crate) fn unsatisfied(&self) -> Vec<UnsatisfiedExpectationError> {
        self.expectations.iter()
            .filter(|e| !e.retired && e.kind == Kind::Mock)
            .filter(|e| e.consumed < e.cardinality.lower())
            .map(|e| UnsatisfiedExpectationError {
                signature: e.signature.to_string(),
                matcher: e.matcher_description().to_owned(),
                expected: e.cardinality,
                observed: e.consumed,
            }).collect()
    }

    /// Stop every current expectation from matching again.  Returns how many
    /// were retired.
    pub(crate) fn retire_all(&mut self) -> usize {
        let mut n = 0;
        for e in self.expectations.iter_mut().filter(|e| !e.retired) {
            e.retired = true;
            n += 1;
        }
        for h in self.handlers.values_mut() {
            h.retire();
        }
        n
    }
}

#[cfg(test)]
mod t {
    use super::*;
    use crate::matcher::ArgMatcher;

    fn sig() -> Signature<(u32,), u32> {
        Signature::new("Foo", "foo")
    }

    fn register(engine: &mut Engine, x: u32, card: Cardinality,
                group: GroupId) -> ExpectationId
    {
        engine.register(&sig(),
                        CallMatcher::from((ArgMatcher::eq(x),)),
                        Response::constant(x * 10),
                        card,
                        group,
                        Kind::Mock)
    }

    #[test]
    fn first_registered_wins() {
        let mut engine = Engine::new();
        engine.register(&sig(), CallMatcher::any(), Response::constant(1),
                        Cardinality::default(), GroupId::ROOT, Kind::Mock);
        engine.register(&sig(), CallMatcher::any(), Response::constant(2),
                        Cardinality::default(), GroupId::ROOT, Kind::Mock);
        assert_eq!(Ok(1), engine.dispatch(Mode::Strict, &sig(), (0,)));
    }

    #[test]
    fn exhausted_expectation_falls_through_to_the_next() {
        let mut engine = Engine::new();
        engine.register(&sig(), CallMatcher::any(), Response::constant(1),
                        Cardinality::once(), GroupId::ROOT, Kind::Mock);
        engine.register(&sig(), CallMatcher::any(), Response::constant(2),
                        Cardinality::default(), GroupId::ROOT, Kind::Mock);
        assert_eq!(Ok(1), engine.dispatch(Mode::Strict, &sig(), (0,)));
        assert_eq!(Ok(2), engine.dispatch(Mode::Strict, &sig(), (0,)));
        assert_eq!(Ok(2), engine.dispatch(Mode::Strict, &sig(), (0,)));
    }

    #[test]
    fn every_dispatch_is_recorded() {
        let mut engine = Engine::new();
        register(&mut engine, 1, Cardinality::once(), GroupId::ROOT);
        assert!(engine.dispatch(Mode::Strict, &sig(), (1,)).is_ok());
        assert!(engine.dispatch(Mode::Strict, &sig(), (1,)).is_err());
        assert!(engine.dispatch(Mode::Strict, &sig(), (1,)).is_err());
        let outcomes: Vec<_> = engine.history.iter()
            .map(|r| r.outcome())
            .collect();
        assert_eq!(vec![CallOutcome::Matched(ExpectationId(0)),
                        CallOutcome::Rejected,
                        CallOutcome::Rejected], outcomes);
    }

    #[test]
    fn exhausted_reason() {
        let mut engine = Engine::new();
        register(&mut engine, 1, Cardinality::once(), GroupId::ROOT);
        engine.dispatch(Mode::Strict, &sig(), (1,)).unwrap();
        match engine.dispatch(Mode::Strict, &sig(), (1,)) {
            Err(DispatchError::Unexpected(e)) =>
                assert_eq!(UnexpectedReason::Exhausted, e.reason),
            other => panic!("Unexpected result {:?}", other)
        }
    }

    #[test]
    fn out_of_order_reason_names_the_head() {
        let mut engine = Engine::new();
        let seq = engine.add_group(GroupId::ROOT, GroupKind::Sequential);
        register(&mut engine, 1, Cardinality::once(), seq);
        register(&mut engine, 2, Cardinality::once(), seq);
        let e = engine.dispatch(Mode::Strict, &sig(), (2,)).unwrap_err();
        assert!(e.is_out_of_order());
        match e {
            DispatchError::Unexpected(e) => {
                assert_eq!("Foo::foo(2)", e.call);
                assert_eq!(1, e.candidates.len());
                assert!(e.candidates[0]
                        .starts_with("Foo::foo(1) [exactly 1, observed 0]\n"),
                        "{}", e.candidates[0]);
            },
            other => panic!("Unexpected error {:?}", other)
        }
    }

    #[test]
    fn abort_rejects_later_calls() {
        let mut engine = Engine::new();
        register(&mut engine, 1, Cardinality::default(), GroupId::ROOT);
        assert!(engine.dispatch(Mode::Strict, &sig(), (2,)).is_err());
        let e = engine.dispatch(Mode::Strict, &sig(), (1,)).unwrap_err();
        assert!(matches!(e, DispatchError::Aborted{..}), "{:?}", e);
        assert_eq!(2, engine.history.len());
        assert!(engine.aborted().is_some());
    }

    #[test]
    fn unsatisfied_ignores_stubs_and_retired() {
        let mut engine = Engine::new();
        register(&mut engine, 1, Cardinality::once(), GroupId::ROOT);
        engine.register(&sig(), CallMatcher::any(), Response::constant(0),
                        Cardinality::at_least_once(), GroupId::ROOT,
                        Kind::Stub);
        assert_eq!(1, engine.unsatisfied().len());
        assert_eq!(2, engine.retire_all());
        assert!(engine.unsatisfied().is_empty());
        assert_eq!(0, engine.retire_all());
    }
}

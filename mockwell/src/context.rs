// vim: tw=80
//! The per-test owner of all expectations and recorded calls.

use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
        MutexGuard,
        PoisonError
    }
};

use tracing::debug;

use crate::{
    cardinality::{Cardinality, ExpectationState},
    error::{DispatchError, RegistrationError, Violation},
    expectation::{ExpectationHandle, Kind, StubHandle},
    group::{GroupHandle, GroupId, GroupKind},
    handler::Engine,
    history::{CallSummary, History},
    matcher::CallMatcher,
    response::Response,
    signature::Signature,
    verify::Verification
};

static NEXT_CONTEXT: AtomicUsize = AtomicUsize::new(0);

/// Distinguishes the handles of one context from those of another
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) struct ContextId(usize);

/// How a context treats calls that no expectation answers.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Mode {
    /// Expectations first: unmatched calls are fatal, and unmet lower bounds
    /// are reported at teardown.
    #[default]
    Strict,
    /// Record, then verify: unmatched calls return a default value, and only
    /// explicit verifications can fail the test.
    Lenient,
}

/// Configures a new [`MockContext`].
///
/// # Examples
/// ```
/// # use mockwell::*;
/// let ctx = MockContext::builder()
///     .mode(Mode::Lenient)
///     .name("reads_temperature")
///     .build();
/// assert_eq!(Mode::Lenient, ctx.mode());
/// ```
#[derive(Clone, Debug, Default)]
pub struct ContextBuilder {
    mode: Mode,
    name: Option<String>,
}

impl ContextBuilder {
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Label the context, usually with the test's name.  The label appears in
    /// log events.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn build(self) -> MockContext {
        let id = ContextId(NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed));
        let label = self.name.unwrap_or_else(|| format!("context-{}", id.0));
        debug!(context = %label, mode = ?self.mode, "begin test");
        MockContext {
            id,
            mode: self.mode,
            label,
            engine: Mutex::new(Engine::new())
        }
    }
}

/// Owns one test case's expectations, ordering groups, and call history.
///
/// A context is `Send + Sync`, so the code under test may call mocked
/// operations from several threads at once.  Each
/// [`dispatch`](#method.dispatch) is atomic, and "order" for sequences means
/// the order in which calls acquire the context's lock.
///
/// # Examples
/// ```
/// # use mockwell::*;
/// let ctx = MockContext::begin_test();
/// let connect = Signature::<(), bool>::new("Thermometer", "connect");
/// let read = Signature::<(String,), f64>::new("Thermometer", "temperature");
///
/// let seq = ctx.sequence();
/// ctx.register_expectation(&connect, CallMatcher::any(),
///     Response::constant(true), Cardinality::once(), &seq).unwrap();
/// ctx.register_expectation(&read, params!("NY".to_owned()),
///     Response::constant(22.5), Cardinality::once(), &seq).unwrap();
///
/// assert_eq!(Ok(true), ctx.dispatch(&connect, ()));
/// assert_eq!(Ok(22.5), ctx.dispatch(&read, ("NY".to_owned(),)));
/// assert!(ctx.end_test_and_verify().is_empty());
/// ```
pub struct MockContext {
    id: ContextId,
    mode: Mode,
    label: String,
    engine: Mutex<Engine>,
}

impl MockContext {
    /// Create a strict context with default settings
    pub fn begin_test() -> Self {
        Self::builder().build()
    }

    /// Create a lenient context with default settings
    pub fn lenient() -> Self {
        Self::builder().mode(Mode::Lenient).build()
    }

    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    // A panicking response producer poisons the lock, but the engine's state
    // stays consistent, so ignore the poison.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Engine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_group(&self, group: &GroupHandle) -> Result<(), RegistrationError>
    {
        if group.context == self.id {
            Ok(())
        } else {
            Err(RegistrationError::ForeignHandle)
        }
    }

    fn check_expectation(&self, h: &ExpectationHandle)
        -> Result<(), RegistrationError>
    {
        if h.context == self.id {
            Ok(())
        } else {
            Err(RegistrationError::ForeignHandle)
        }
    }

    /// The unordered group at the top of this context's ordering tree
    pub fn root(&self) -> GroupHandle {
        GroupHandle::new(self.id, GroupId::ROOT, GroupKind::Unordered)
    }

    /// Create a new sequential group directly beneath the root
    pub fn sequence(&self) -> GroupHandle {
        self.new_group(GroupId::ROOT, GroupKind::Sequential)
    }

    /// Create a new unordered group directly beneath the root
    pub fn unordered(&self) -> GroupHandle {
        self.new_group(GroupId::ROOT, GroupKind::Unordered)
    }

    /// Create a sequential group as the next child of `parent`
    pub fn sequence_in(&self, parent: &GroupHandle)
        -> Result<GroupHandle, RegistrationError>
    {
        self.check_group(parent)?;
        Ok(self.new_group(parent.id, GroupKind::Sequential))
    }

    /// Create an unordered group as the next child of `parent`
    pub fn unordered_in(&self, parent: &GroupHandle)
        -> Result<GroupHandle, RegistrationError>
    {
        self.check_group(parent)?;
        Ok(self.new_group(parent.id, GroupKind::Unordered))
    }

    fn new_group(&self, parent: GroupId, kind: GroupKind) -> GroupHandle {
        let id = self.lock().add_group(parent, kind);
        debug!(context = %self.label, group = id.0, ?kind, "new group");
        GroupHandle::new(self.id, id, kind)
    }

    /// Mark the end of a sequential group's current head.
    ///
    /// The head stops being eligible even if it could still be called again,
    /// and the next child becomes the head.  This is the only way past a head
    /// whose upper bound is unbounded.  Returns `Ok(false)` if `group` isn't
    /// sequential or has no head left.
    pub fn advance(&self, group: &GroupHandle)
        -> Result<bool, RegistrationError>
    {
        self.check_group(group)?;
        let mut engine = self.lock();
        debug_assert_eq!(group.kind(), engine.group_kind(group.id));
        let advanced = engine.advance(group.id);
        debug!(context = %self.label, group = group.id.0, advanced,
               "advance group");
        Ok(advanced)
    }

    /// Program a mock expectation into `group`.
    ///
    /// In strict mode, an expectation called fewer than `cardinality.lower()`
    /// times is reported by [`end_test_and_verify`](#method.end_test_and_verify).
    pub fn register_expectation<A, O>(&self, sig: &Signature<A, O>,
                                      matcher: CallMatcher<A>,
                                      response: Response<A, O>,
                                      cardinality: Cardinality,
                                      group: &GroupHandle)
        -> Result<ExpectationHandle, RegistrationError>
        where A: 'static, O: 'static
    {
        self.check_group(group)?;
        let description = matcher.to_string();
        let id = self.lock().register(sig, matcher, response, cardinality,
                                      group.id, Kind::Mock);
        debug!(context = %self.label, signature = %sig, expectation = %id,
               matcher = %description, %cardinality, "register expectation");
        Ok(ExpectationHandle{context: self.id, id})
    }

    /// Shorthand for registering a mock expectation in the root group
    pub fn expect<A, O>(&self, sig: &Signature<A, O>, matcher: CallMatcher<A>,
                        response: Response<A, O>, cardinality: Cardinality)
        -> ExpectationHandle
        where A: 'static, O: 'static
    {
        let description = matcher.to_string();
        let id = self.lock().register(sig, matcher, response, cardinality,
                                      GroupId::ROOT, Kind::Mock);
        debug!(context = %self.label, signature = %sig, expectation = %id,
               matcher = %description, %cardinality, "register expectation");
        ExpectationHandle{context: self.id, id}
    }

    /// Program a canned response with no call-count obligation.
    pub fn register_stub<A, O>(&self, sig: &Signature<A, O>,
                               matcher: CallMatcher<A>,
                               response: Response<A, O>) -> StubHandle
        where A: 'static, O: 'static
    {
        let description = matcher.to_string();
        let id = self.lock().register(sig, matcher, response,
                                      Cardinality::any_number_of_times(),
                                      GroupId::ROOT, Kind::Stub);
        debug!(context = %self.label, signature = %sig, expectation = %id,
               matcher = %description, "register stub");
        StubHandle(ExpectationHandle{context: self.id, id})
    }

    /// Answer a call to the mocked operation `sig`.
    ///
    /// This is what a forwarding implementation calls from each of its
    /// methods.  Errors are fatal: the context is aborted and every later
    /// dispatch fails too.
    pub fn dispatch<A, O>(&self, sig: &Signature<A, O>, args: A)
        -> Result<O, DispatchError>
        where A: Debug + Send + 'static, O: 'static
    {
        self.lock().dispatch(self.mode, sig, args)
    }

    /// Begin a post-hoc query of recorded calls to `sig` accepted by
    /// `matcher`.
    pub fn verify<A, O>(&self, sig: &Signature<A, O>, matcher: CallMatcher<A>)
        -> Verification<'_, A, O>
        where A: 'static, O: 'static
    {
        Verification::new(self, sig.clone(), matcher)
    }

    /// How many calls the expectation or stub has answered
    pub fn call_count(&self, handle: impl Into<ExpectationHandle>)
        -> Result<usize, RegistrationError>
    {
        let handle = handle.into();
        self.check_expectation(&handle)?;
        Ok(self.lock().expectation(handle.id).consumed)
    }

    pub fn state(&self, handle: impl Into<ExpectationHandle>)
        -> Result<ExpectationState, RegistrationError>
    {
        let handle = handle.into();
        self.check_expectation(&handle)?;
        Ok(self.lock().expectation(handle.id).state())
    }

    /// Snapshot of every call dispatched so far, in order
    pub fn history(&self) -> Vec<CallSummary> {
        self.lock().history.iter().map(|r| r.summary()).collect()
    }

    /// Run `f` with the full call history, including each call's typed
    /// arguments.  The context is locked meanwhile, so `f` must not call back
    /// into it.
    pub fn with_history<R>(&self, f: impl FnOnce(&History) -> R) -> R {
        f(&self.lock().history)
    }

    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }

    /// Verify all current expectations and discard them, so the test can
    /// program a new phase.  Recorded calls are kept.
    ///
    /// Like teardown, only strict contexts report unmet lower bounds.
    pub fn checkpoint(&self) -> Vec<Violation> {
        let mut engine = self.lock();
        let violations: Vec<Violation> = match self.mode {
            Mode::Strict => engine.unsatisfied().into_iter()
                .map(Violation::Unsatisfied)
                .collect(),
            Mode::Lenient => Vec::new()
        };
        let retired = engine.retire_all();
        debug!(context = %self.label, retired, violations = violations.len(),
               "checkpoint");
        violations
    }

    /// Collect everything that should fail the test.
    ///
    /// That is the first fatal dispatch error, if any; then, in strict mode,
    /// one entry per expectation that was called fewer times than its lower
    /// bound; then every failed explicit verification.  An empty list means
    /// the test passed.
    pub fn end_test_and_verify(&self) -> Vec<Violation> {
        let engine = self.lock();
        let mut violations = Vec::new();
        if let Some(e) = engine.aborted() {
            violations.push(Violation::Fatal(e.clone()));
        }
        if self.mode == Mode::Strict {
            violations.extend(engine.unsatisfied()
                .into_iter()
                .map(Violation::Unsatisfied));
        }
        violations.extend(engine.failures.iter()
            .cloned()
            .map(Violation::Verification));
        debug!(context = %self.label, violations = violations.len(),
               calls = engine.history.len(), "end test");
        violations
    }

    /// Panic with one line per violation, unless there are none.
    pub fn assert_satisfied(&self) {
        let violations = self.end_test_and_verify();
        if !violations.is_empty() {
            let lines = violations.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n");
            panic!("{}: {} violation(s)\n{}", self.label, violations.len(),
                   lines);
        }
    }
}

impl Default for MockContext {
    fn default() -> Self {
        Self::begin_test()
    }
}

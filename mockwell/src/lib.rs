// vim: tw=80
//! An expectation-matching and verification engine for test doubles.
//!
//! Mockwell is the runtime half of a mock object library.  A forwarding
//! implementation of some interface turns each method call into a
//! [`Signature`] plus an argument tuple and hands both to
//! [`MockContext::dispatch`].  The context finds a programmed expectation that
//! accepts the call, returns that expectation's response, and records the
//! call.  When the test is over,
//! [`MockContext::end_test_and_verify`] reports every obligation that wasn't
//! met.
//!
//! # Modes
//!
//! A [`MockContext`] runs in one of two [`Mode`]s:
//!
//! * **Strict** (expectations first).  Every call must be answered by a live
//!   expectation.  Anything else is a fatal [`UnexpectedCallError`].  At
//!   teardown, each expectation called fewer times than its
//!   [`Cardinality`]'s lower bound is reported.
//! * **Lenient** (record, then verify).  Unanswered calls return a default
//!   value (`false`, `0`, `""`, `None`, an empty collection) and are still
//!   recorded.  The test then checks the history explicitly with
//!   [`MockContext::verify`].
//!
//! # Matching
//!
//! Every expectation has a [`CallMatcher`], normally built from one
//! [`ArgMatcher`] per argument with [`params!`].  An `ArgMatcher` is a literal
//! value, a wildcard, or any [`Predicate`].  When several live expectations
//! accept a call, the one registered first wins.
//!
//! ```
//! # use mockwell::*;
//! let ctx = MockContext::begin_test();
//! let sig = Signature::<(u32, String), u32>::new("Store", "put");
//! ctx.expect(&sig,
//!            params!(ArgMatcher::function(|x: &u32| *x > 10),
//!                    ArgMatcher::any()),
//!            Response::returning(|(x, _)| x * 2),
//!            Cardinality::at_least_once());
//! assert_eq!(Ok(30), ctx.dispatch(&sig, (15, "key".to_owned())));
//! assert!(ctx.dispatch(&sig, (5, "key".to_owned())).is_err());
//! ```
//!
//! # Ordering
//!
//! Expectations live in a tree of ordering groups.  By default they go into
//! the context's unordered root.  A [`sequence`](MockContext::sequence)
//! exposes only its current head; calling a later member first is an
//! out-of-order error.  Groups nest, so an unordered block may sit inside a
//! sequence and vice versa.
//!
//! ```
//! # use mockwell::*;
//! let ctx = MockContext::begin_test();
//! let open = Signature::<(), ()>::new("File", "open");
//! let close = Signature::<(), ()>::new("File", "close");
//! let seq = ctx.sequence();
//! for sig in [&open, &close] {
//!     ctx.register_expectation(sig, CallMatcher::any(),
//!         Response::constant(()), Cardinality::once(), &seq).unwrap();
//! }
//! let e = ctx.dispatch(&close, ()).unwrap_err();
//! assert!(e.is_out_of_order());
//! ```
//!
//! A sequence's head advances once it is exhausted.  A head with no upper
//! bound never exhausts; use [`MockContext::advance`] to move past it.
//!
//! # Threads
//!
//! A context is `Send + Sync`.  Code under test may call it from many threads
//! at once.  Each dispatch is atomic, and the call history is totally ordered
//! by sequence number.  Don't share one context between concurrently running
//! tests.
//!
//! # Logging
//!
//! The engine emits [`tracing`](https://docs.rs/tracing) events: registration
//! and teardown at `DEBUG`, each match at `TRACE`, and fatal errors and failed
//! verifications at `WARN`.  It never installs a subscriber.

mod cardinality;
mod context;
mod error;
mod expectation;
mod group;
mod handler;
pub mod history;
mod matcher;
mod response;
mod signature;
mod verify;

pub use crate::cardinality::{Cardinality, ExpectationState};
pub use crate::context::{ContextBuilder, Mode, MockContext};
pub use crate::error::{
    DispatchError,
    RegistrationError,
    UnexpectedCallError,
    UnexpectedReason,
    UnsatisfiedExpectationError,
    VerificationFailure,
    Violation
};
pub use crate::expectation::{ExpectationHandle, ExpectationId, StubHandle};
pub use crate::group::{GroupHandle, GroupKind};
pub use crate::history::{CallOutcome, CallSummary};
pub use crate::matcher::{ArgKind, ArgMatcher, CallMatcher};
pub use crate::response::Response;
pub use crate::signature::{MethodSignature, Signature};
pub use crate::verify::{count_matching, Verification};
pub use predicates::prelude::{Predicate, predicate};

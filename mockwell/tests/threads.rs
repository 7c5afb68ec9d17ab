// vim: tw=80
//! A context may be shared by code under test running on several threads
#![deny(warnings)]

use std::{sync::Arc, thread};

use mockwell::*;
use pretty_assertions::assert_eq;

static_assertions::assert_impl_all!(MockContext: Send, Sync);
static_assertions::assert_impl_all!(Signature<(String,), u32>: Send, Sync);

#[test]
fn concurrent_dispatch() {
    let ctx = MockContext::begin_test();
    let sig = Signature::<(usize,), usize>::new("Counter", "echo");
    let h = ctx.expect(&sig, CallMatcher::any(),
                       Response::returning(|(x,)| *x),
                       Cardinality::exactly(400));

    thread::scope(|s| {
        for t in 0..4 {
            let ctx = &ctx;
            let sig = &sig;
            s.spawn(move || {
                for i in 0..100 {
                    let x = t * 100 + i;
                    assert_eq!(Ok(x), ctx.dispatch(sig, (x,)));
                }
            });
        }
    });

    assert_eq!(Ok(400), ctx.call_count(h));
    let sequence: Vec<u64> = ctx.history().iter().map(|c| c.sequence).collect();
    assert_eq!((0..400).collect::<Vec<u64>>(), sequence);
    ctx.assert_satisfied();
}

/// A bounded expectation is never consumed past its limit, however the calls
/// race.
#[test]
fn racing_for_the_last_call() {
    let ctx = Arc::new(MockContext::lenient());
    let sig = Signature::<(), u32>::new("Pool", "take");
    ctx.expect(&sig, CallMatcher::any(), Response::constant(1),
               Cardinality::exactly(10));

    let workers: Vec<_> = (0..8).map(|_| {
        let ctx = ctx.clone();
        let sig = sig.clone();
        thread::spawn(move || {
            (0..5).map(|_| ctx.dispatch(&sig, ()).unwrap()).sum::<u32>()
        })
    }).collect();
    let total: u32 = workers.into_iter()
        .map(|w| w.join().unwrap())
        .sum();

    assert_eq!(10, total);
    assert_eq!(40, ctx.history_len());
}

/// A fatal error on a worker thread is reported when the test ends, even if
/// the worker swallowed it.
#[test]
fn worker_failure_reaches_teardown() {
    let ctx = MockContext::begin_test();
    let sig = Signature::<(u8,), ()>::new("Queue", "push");
    ctx.expect(&sig, params!(1u8), Response::constant(()),
               Cardinality::once());

    thread::scope(|s| {
        s.spawn(|| {
            let _ = ctx.dispatch(&sig, (2,));
        });
    });
    ctx.dispatch(&sig, (1,)).unwrap_err();

    let violations = ctx.end_test_and_verify();
    match &violations[..] {
        [Violation::Fatal(DispatchError::Unexpected(e)), Violation::Unsatisfied(_)]
            => assert_eq!("Queue::push(2)", e.call),
        other => panic!("Unexpected violations {:?}", other)
    }
}

/// A response that panics on one thread doesn't break the context
#[test]
fn worker_panic() {
    let ctx = MockContext::begin_test();
    let sig = Signature::<(u32,), u32>::new("Queue", "pop");
    ctx.expect(&sig, CallMatcher::any(),
               Response::returning(|(x,)| {
                   assert!(*x > 0, "producer failed");
                   *x
               }),
               Cardinality::any_number_of_times());

    let joined = thread::scope(|s| {
        s.spawn(|| ctx.dispatch(&sig, (0,))).join()
    });
    assert!(joined.is_err());
    assert_eq!(Ok(5), ctx.dispatch(&sig, (5,)));
    assert_eq!(2, ctx.history_len());
}

#[test]
fn returning_st_on_its_own_thread() {
    let ctx = MockContext::begin_test();
    let sig = Signature::<(), u32>::new("Counter", "next");
    let cell = std::rc::Rc::new(std::cell::Cell::new(0));
    let counter = cell.clone();
    ctx.expect(&sig, CallMatcher::any(),
               Response::returning_st(move |_| {
                   counter.set(counter.get() + 1);
                   counter.get()
               }),
               Cardinality::exactly(2));
    assert_eq!(Ok(1), ctx.dispatch(&sig, ()));
    assert_eq!(Ok(2), ctx.dispatch(&sig, ()));
    assert_eq!(2, cell.get());
}

#[test]
fn returning_st_from_another_thread() {
    let ctx = MockContext::begin_test();
    let sig = Signature::<(), u32>::new("Counter", "next");
    let cell = std::rc::Rc::new(std::cell::Cell::new(0));
    ctx.expect(&sig, CallMatcher::any(),
               Response::returning_st(move |_| cell.get()),
               Cardinality::any_number_of_times());

    let r = thread::scope(|s| {
        s.spawn(|| ctx.dispatch(&sig, ())).join().unwrap()
    });
    match r {
        Err(DispatchError::WrongThread{call}) =>
            assert_eq!("Counter::next()", call),
        other => panic!("Unexpected result {:?}", other)
    }
}

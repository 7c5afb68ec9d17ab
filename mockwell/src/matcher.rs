// vim: tw=80
//! Predicates over a call's arguments.
//!
//! An [`ArgMatcher`] checks a single argument.  A [`CallMatcher`] checks the
//! whole argument tuple, either by combining one `ArgMatcher` per position or
//! with a single function.  Because the tuple type is part of the
//! `CallMatcher`'s type, supplying the wrong number of `ArgMatcher`s is a
//! compile error.

use std::fmt::{self, Debug};

use predicates::prelude::*;
use predicates_tree::CaseTreeExt;

/// Which flavor of [`ArgMatcher`] this is
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArgKind {
    /// Compares the argument against a fixed value
    Literal,
    /// Accepts any value
    Wildcard,
    /// Evaluates a user-supplied predicate
    Predicate,
}

/// Check a single argument of a call.
///
/// # Examples
/// ```
/// # use mockwell::*;
/// let m = ArgMatcher::eq(5u32);
/// assert!(m.matches(&5));
/// assert!(!m.matches(&6));
///
/// let m = ArgMatcher::predicate(predicate::in_iter(vec![1, 2, 3]));
/// assert!(m.matches(&2));
/// ```
pub struct ArgMatcher<T> {
    kind: ArgKind,
    description: String,
    pred: Box<dyn Predicate<T> + Send>,
}

impl<T: 'static> ArgMatcher<T> {
    /// Match arguments equal to `value`
    pub fn eq(value: T) -> Self
        where T: Debug + PartialEq + Send
    {
        let description = format!("{:?}", value);
        ArgMatcher {
            kind: ArgKind::Literal,
            description,
            pred: Box::new(predicate::eq(value))
        }
    }

    /// Match any argument at all
    pub fn any() -> Self {
        ArgMatcher {
            kind: ArgKind::Wildcard,
            description: "_".to_owned(),
            pred: Box::new(predicate::always())
        }
    }

    /// Match arguments for which `f` returns true
    pub fn function<F>(f: F) -> Self
        where F: Fn(&T) -> bool + Send + 'static, T: Send
    {
        Self::predicate(predicate::function(f))
    }

    /// Match arguments accepted by an arbitrary
    /// [`Predicate`](crate::Predicate).
    pub fn predicate<P>(p: P) -> Self
        where P: Predicate<T> + Send + 'static
    {
        ArgMatcher {
            kind: ArgKind::Predicate,
            description: p.to_string(),
            pred: Box::new(p)
        }
    }
}

impl<T> ArgMatcher<T> {
    pub fn kind(&self) -> ArgKind {
        self.kind
    }

    pub fn matches(&self, arg: &T) -> bool {
        self.pred.eval(arg)
    }

    /// Explain why `arg` doesn't match, or `None` if it does
    pub fn explain(&self, arg: &T) -> Option<String> {
        self.pred.find_case(false, arg)
            .map(|case| case.tree().to_string())
    }
}

/// Plain values match by equality
impl<T> From<T> for ArgMatcher<T>
    where T: Debug + PartialEq + Send + 'static
{
    fn from(value: T) -> Self {
        ArgMatcher::eq(value)
    }
}

impl<T> fmt::Display for ArgMatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl<T> Debug for ArgMatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ArgMatcher")
            .field("kind", &self.kind)
            .field("description", &self.description)
            .finish()
    }
}

/// Per-position matching over an argument tuple
trait ArgsMatcher<A>: Send {
    fn matches(&self, args: &A) -> bool;

    fn explain(&self, args: &A) -> Vec<String>;

    fn describe(&self) -> String;
}

macro_rules! tuple_matcher {
    ($( $t:ident $idx:tt ),*) => {
        impl<$($t: 'static),*> ArgsMatcher<($($t,)*)>
            for ($(ArgMatcher<$t>,)*)
        {
            #[allow(unused_variables)]
            fn matches(&self, args: &($($t,)*)) -> bool {
                true $(&& self.$idx.matches(&args.$idx))*
            }

            #[allow(unused_variables, unused_mut)]
            fn explain(&self, args: &($($t,)*)) -> Vec<String> {
                let mut out = Vec::new();
                $(
                    if let Some(why) = self.$idx.explain(&args.$idx) {
                        out.push(format!("argument {}: {}", $idx, why));
                    }
                )*
                out
            }

            fn describe(&self) -> String {
                let parts: Vec<String> = vec![$(self.$idx.to_string()),*];
                format!("({})", parts.join(", "))
            }
        }

        impl<$($t: 'static),*> From<($(ArgMatcher<$t>,)*)>
            for CallMatcher<($($t,)*)>
        {
            fn from(matchers: ($(ArgMatcher<$t>,)*)) -> Self {
                CallMatcher::from_args(matchers)
            }
        }
    }
}

tuple_matcher!{}
tuple_matcher!{T0 0}
tuple_matcher!{T0 0, T1 1}
tuple_matcher!{T0 0, T1 1, T2 2}
tuple_matcher!{T0 0, T1 1, T2 2, T3 3}
tuple_matcher!{T0 0, T1 1, T2 2, T3 3, T4 4}
tuple_matcher!{T0 0, T1 1, T2 2, T3 3, T4 4, T5 5}
tuple_matcher!{T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6}
tuple_matcher!{T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7}

enum Inner<A> {
    Any,
    Args(Box<dyn ArgsMatcher<A>>),
    Func(Box<dyn Fn(&A) -> bool + Send>),
}

/// Check every argument of a call.  All positions must match.
///
/// Build one from a tuple of [`ArgMatcher`]s, with the [`params!`](crate::params)
/// macro, or with [`CallMatcher::function`].
pub struct CallMatcher<A> {
    description: String,
    inner: Inner<A>,
}

impl<A> CallMatcher<A> {
    /// Match every call
    pub fn any() -> Self {
        CallMatcher{description: "<anything>".to_owned(), inner: Inner::Any}
    }

    /// Match calls whose whole argument tuple satisfies `f`
    pub fn function<F>(f: F) -> Self
        where F: Fn(&A) -> bool + Send + 'static
    {
        CallMatcher {
            description: "<function>".to_owned(),
            inner: Inner::Func(Box::new(f))
        }
    }

    fn from_args<M>(m: M) -> Self
        where M: ArgsMatcher<A> + 'static
    {
        CallMatcher{description: m.describe(), inner: Inner::Args(Box::new(m))}
    }

    pub fn matches(&self, args: &A) -> bool {
        match &self.inner {
            Inner::Any => true,
            Inner::Args(m) => m.matches(args),
            Inner::Func(f) => f(args),
        }
    }

    /// One line per argument position that rejects `args`.
    pub fn explain(&self, args: &A) -> Vec<String> {
        match &self.inner {
            Inner::Any => Vec::new(),
            Inner::Args(m) => m.explain(args),
            Inner::Func(f) if f(args) => Vec::new(),
            Inner::Func(_) =>
                vec!["argument tuple rejected by matching function".to_owned()],
        }
    }
}

impl<A> Default for CallMatcher<A> {
    fn default() -> Self {
        CallMatcher::any()
    }
}

impl<A> fmt::Display for CallMatcher<A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl<A> Debug for CallMatcher<A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("CallMatcher").field(&self.description).finish()
    }
}

/// Build a [`CallMatcher`] from one matcher per argument.
///
/// Each position accepts either an [`ArgMatcher`] or a plain value, which will
/// be matched by equality.
///
/// # Examples
/// ```
/// # use mockwell::*;
/// let m: CallMatcher<(u32, String)> =
///     params!(42u32, ArgMatcher::function(|s: &String| s.len() > 2));
/// assert!(m.matches(&(42, "abc".to_owned())));
/// assert!(!m.matches(&(42, "ab".to_owned())));
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::CallMatcher::<()>::from(())
    };
    ($($m:expr),+ $(,)?) => {
        $crate::CallMatcher::from(( $( $crate::ArgMatcher::from($m), )+ ))
    };
}

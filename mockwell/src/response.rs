// vim: tw=80
//! What an expectation returns when it matches.

use std::fmt;

use fragile::Fragile;

/// Return functions for expectations
enum Rfunc<A, O> {
    Mut(Box<dyn FnMut(&A) -> O + Send>),
    // `None` once a `once` response has already returned
    Once(Option<Box<dyn FnOnce(&A) -> O + Send>>),
    // Usable only on the thread that registered it
    St(Fragile<Box<dyn FnMut(&A) -> O>>),
}

/// Why a [`Response`] couldn't produce a value
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ProduceError {
    Expired,
    WrongThread,
}

/// Produces the return value of a matched call.
///
/// The call's arguments are passed to the producer by reference; they are
/// retained afterwards in the context's call history.
pub struct Response<A, O>(Rfunc<A, O>);

impl<A: 'static, O: 'static> Response<A, O> {
    /// Return a clone of `value` every time
    pub fn constant(value: O) -> Self
        where O: Clone + Send
    {
        Self::returning(move |_| value.clone())
    }

    /// Return `O::default()` every time
    pub fn default_value() -> Self
        where O: Default
    {
        Self::returning(|_| O::default())
    }

    /// Compute the return value from the call's arguments.
    pub fn returning<F>(f: F) -> Self
        where F: FnMut(&A) -> O + Send + 'static
    {
        Response(Rfunc::Mut(Box::new(f)))
    }

    /// Supply an `FnOnce` closure that will provide the return value.  This is
    /// useful for return types that aren't `Clone`.  Using the response a
    /// second time is a fatal dispatch error.
    pub fn once<F>(f: F) -> Self
        where F: FnOnce(&A) -> O + Send + 'static
    {
        Response(Rfunc::Once(Some(Box::new(f))))
    }

    /// Single-threaded version of [`returning`](#method.returning).  Can be
    /// used when the closure isn't `Send`.
    ///
    /// Calls arriving from any thread other than the one that created the
    /// response are fatal dispatch errors.  The owning
    /// [`MockContext`](crate::MockContext) must be dropped on that thread
    /// too.
    pub fn returning_st<F>(f: F) -> Self
        where F: FnMut(&A) -> O + 'static
    {
        let f: Box<dyn FnMut(&A) -> O> = Box::new(f);
        Response(Rfunc::St(Fragile::new(f)))
    }
}

impl<A, O> Response<A, O> {
    pub(crate) fn produce(&mut self, args: &A) -> Result<O, ProduceError> {
        match &mut self.0 {
            Rfunc::Mut(f) => Ok(f(args)),
            Rfunc::Once(slot) => match slot.take() {
                Some(f) => Ok(f(args)),
                None => Err(ProduceError::Expired)
            },
            Rfunc::St(fragile) => match fragile.try_get_mut() {
                Ok(f) => Ok(f(args)),
                Err(_) => Err(ProduceError::WrongThread)
            },
        }
    }
}

impl<A, O> fmt::Debug for Response<A, O> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match &self.0 {
            Rfunc::Mut(_) => "returning",
            Rfunc::Once(Some(_)) => "once",
            Rfunc::Once(None) => "once (expired)",
            Rfunc::St(_) => "returning_st",
        };
        f.debug_tuple("Response").field(&kind).finish()
    }
}

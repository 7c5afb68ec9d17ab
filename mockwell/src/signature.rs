// vim: tw=80
//! Identities of mockable operations

use std::{
    any::{self, TypeId},
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData
};

/// Untyped identity of one mockable operation.
///
/// Two signatures are equal when they name the same operation of the same
/// interface with the same argument and return types.  Overloads that differ
/// only in their parameter types are therefore distinct.
#[derive(Clone, Debug)]
pub struct MethodSignature {
    interface: &'static str,
    method: &'static str,
    params: &'static str,
    output: &'static str,
    types: TypeId,
}

impl MethodSignature {
    pub fn interface(&self) -> &'static str {
        self.interface
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    /// Name of the argument tuple type, like `(alloc::string::String,)`
    pub fn params(&self) -> &'static str {
        self.params
    }

    /// Name of the return type
    pub fn output(&self) -> &'static str {
        self.output
    }
}

impl PartialEq for MethodSignature {
    fn eq(&self, other: &Self) -> bool {
        self.types == other.types
            && self.method == other.method
            && self.interface == other.interface
    }
}

impl Eq for MethodSignature {}

impl Hash for MethodSignature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.interface.hash(state);
        self.method.hash(state);
        self.types.hash(state);
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}::{}", self.interface, self.method)
    }
}

/// Typed handle to a [`MethodSignature`].
///
/// `A` is the tuple of the operation's arguments and `O` its return type.  A
/// forwarding implementation usually builds one of these per operation and
/// hands it to [`MockContext::dispatch`](crate::MockContext::dispatch) along
/// with the arguments.
///
/// # Examples
/// ```
/// # use mockwell::*;
/// let sig = Signature::<(String,), f64>::new("Thermometer", "temperature");
/// assert_eq!("Thermometer::temperature", sig.to_string());
/// ```
pub struct Signature<A, O> {
    info: MethodSignature,
    default: Option<fn() -> O>,
    _args: PhantomData<fn(A)>,
}

impl<A: 'static, O: 'static> Signature<A, O> {
    /// Create a signature whose lenient-mode default response is
    /// `O::default()`.
    pub fn new(interface: &'static str, method: &'static str) -> Self
        where O: Default
    {
        let mut sig = Self::without_default(interface, method);
        sig.default = Some(O::default);
        sig
    }

    /// Create a signature for a return type that has no sensible default.
    ///
    /// Unmatched calls in lenient mode will fail with
    /// [`DispatchError::NoDefault`](crate::DispatchError::NoDefault).
    pub fn without_default(interface: &'static str, method: &'static str)
        -> Self
    {
        let info = MethodSignature {
            interface,
            method,
            params: any::type_name::<A>(),
            output: any::type_name::<O>(),
            types: TypeId::of::<(A, O)>(),
        };
        Signature{info, default: None, _args: PhantomData}
    }
}

impl<A, O> Signature<A, O> {
    pub fn info(&self) -> &MethodSignature {
        &self.info
    }

    pub(crate) fn default_value(&self) -> Option<O> {
        self.default.map(|f| f())
    }
}

impl<A, O> Clone for Signature<A, O> {
    fn clone(&self) -> Self {
        Signature {
            info: self.info.clone(),
            default: self.default,
            _args: PhantomData
        }
    }
}

impl<A, O> fmt::Debug for Signature<A, O> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Signature")
            .field("info", &self.info)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

impl<A, O> fmt::Display for Signature<A, O> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.info.fmt(f)
    }
}

// vim: tw=80
//! The append-only log of every dispatched call.

use std::{any::Any, fmt::Debug};

use crate::{expectation::ExpectationId, signature::MethodSignature};

/// How the engine answered a call
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CallOutcome {
    /// Answered by the given expectation or stub
    Matched(ExpectationId),
    /// Nothing matched; a lenient context returned a default value
    Defaulted,
    /// Nothing could answer; the call failed with a fatal dispatch error
    Rejected,
}

/// One dispatched call.  Never mutated after it is appended.
pub struct CallRecord {
    signature: MethodSignature,
    arguments: Box<dyn Any + Send>,
    rendered: String,
    sequence: u64,
    outcome: CallOutcome,
}

impl CallRecord {
    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    /// The call's arguments, if they are of type `A`
    pub fn arguments<A: 'static>(&self) -> Option<&A> {
        self.arguments.downcast_ref()
    }

    /// The call's arguments, rendered with `Debug`
    pub fn rendered_arguments(&self) -> &str {
        &self.rendered
    }

    /// Position of this call in the total order of the context's calls
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn outcome(&self) -> CallOutcome {
        self.outcome
    }

    pub fn summary(&self) -> CallSummary {
        CallSummary {
            signature: self.signature.clone(),
            arguments: self.rendered.clone(),
            sequence: self.sequence,
            outcome: self.outcome,
        }
    }
}

/// An owned snapshot of a [`CallRecord`], minus the typed arguments
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CallSummary {
    pub signature: MethodSignature,
    pub arguments: String,
    pub sequence: u64,
    pub outcome: CallOutcome,
}

/// Render an argument tuple like `("NY", 5)`, without the trailing comma that
/// `Debug` gives one-element tuples.
pub(crate) fn render_arguments<A: Debug>(args: &A) -> String {
    let mut s = format!("{:?}", args);
    if s.ends_with(",)") {
        s.truncate(s.len() - 2);
        s.push(')');
    }
    s
}

/// Every call dispatched through one context, in the order they acquired the
/// dispatch lock.
#[derive(Default)]
pub struct History {
    records: Vec<CallRecord>,
    next_sequence: u64,
}

impl History {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a record and return its sequence number
    pub(crate) fn append<A>(&mut self, signature: MethodSignature, args: A,
                            rendered: String, outcome: CallOutcome) -> u64
        where A: Send + 'static
    {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.records.push(CallRecord {
            signature,
            arguments: Box::new(args),
            rendered,
            sequence,
            outcome
        });
        sequence
    }

    /// Arguments of the most recently appended call
    pub(crate) fn latest_arguments<A: 'static>(&self) -> Option<&A> {
        self.records.last().and_then(CallRecord::arguments)
    }

    pub fn records(&self) -> &[CallRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &CallRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

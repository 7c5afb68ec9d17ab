// vim: tw=80
//! Ordering constraints between expectations.
//!
//! Groups form a tree rooted at each context's unordered root group.  A
//! `Sequential` group exposes only its current head child; the head advances
//! once it is exhausted, or when the test calls
//! [`MockContext::advance`](crate::MockContext::advance).  An `Unordered`
//! group exposes every child that isn't exhausted.  Groups nest freely.
//!
//! A group with nothing left to match that may still receive expectations is
//! idle.  Sequences look through idle children without moving past them, so
//! expectations registered into an idle group later still take their place in
//! the sequence.

use crate::{context::ContextId, expectation::ExpectationId};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) struct GroupId(pub(crate) usize);

impl GroupId {
    pub(crate) const ROOT: GroupId = GroupId(0);
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum GroupKind {
    /// Children must be matched in registration order
    Sequential,
    /// Children may be matched in any order
    Unordered,
}

/// Refers to an ordering group of one [`MockContext`](crate::MockContext).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct GroupHandle {
    pub(crate) context: ContextId,
    pub(crate) id: GroupId,
    kind: GroupKind,
}

impl GroupHandle {
    pub(crate) fn new(context: ContextId, id: GroupId, kind: GroupKind)
        -> Self
    {
        GroupHandle{context, id, kind}
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Child {
    Expectation(ExpectationId),
    Group(GroupId),
}

/// Whether a child can match now, may match later, or never will again
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Status {
    Live,
    /// Nothing beneath it can match yet, but it may still gain expectations
    Idle,
    Spent,
}

#[derive(Debug)]
struct Node {
    kind: GroupKind,
    children: Vec<Child>,
    /// Index of the head child.  Only meaningful for sequential groups.
    /// Never moves backwards.
    cursor: usize,
}

/// Arena holding every group of one context
#[derive(Debug)]
pub(crate) struct GroupTree {
    nodes: Vec<Node>,
}

impl GroupTree {
    pub(crate) fn new() -> Self {
        let root = Node {
            kind: GroupKind::Unordered,
            children: Vec::new(),
            cursor: 0
        };
        GroupTree{nodes: vec![root]}
    }

    pub(crate) fn kind(&self, id: GroupId) -> GroupKind {
        self.nodes[id.0].kind
    }

    /// Create a new, empty, group as the last child of `parent`
    pub(crate) fn add_group(&mut self, parent: GroupId, kind: GroupKind)
        -> GroupId
    {
        let id = GroupId(self.nodes.len());
        self.nodes.push(Node{kind, children: Vec::new(), cursor: 0});
        self.nodes[parent.0].children.push(Child::Group(id));
        id
    }

    pub(crate) fn add_expectation(&mut self, parent: GroupId,
                                  e: ExpectationId)
    {
        self.nodes[parent.0].children.push(Child::Expectation(e));
    }

    /// Irreversibly move a sequential group's cursor past its current head,
    /// whether or not that head is exhausted.  Returns false if there was
    /// nothing left to advance past.
    pub(crate) fn advance(&mut self, id: GroupId,
                          spent: &dyn Fn(ExpectationId) -> bool) -> bool
    {
        if self.nodes[id.0].kind != GroupKind::Sequential {
            return false;
        }
        match self.settle(id, spent) {
            Some(head) => {
                self.nodes[id.0].cursor = head + 1;
                true
            },
            None => false
        }
    }

    /// Every expectation that may currently match, in registration order.
    ///
    /// `spent` reports whether an expectation can never match again.
    pub(crate) fn eligible(&mut self, spent: &dyn Fn(ExpectationId) -> bool)
        -> Vec<ExpectationId>
    {
        let mut out = Vec::new();
        self.collect(GroupId::ROOT, spent, &mut out);
        out.sort_unstable();
        out
    }

    fn collect(&mut self, id: GroupId, spent: &dyn Fn(ExpectationId) -> bool,
               out: &mut Vec<ExpectationId>)
    {
        match self.nodes[id.0].kind {
            GroupKind::Sequential => {
                if let Some(head) = self.settle(id, spent) {
                    let child = self.nodes[id.0].children[head];
                    self.collect_child(child, spent, out);
                }
            },
            GroupKind::Unordered => {
                for i in 0..self.nodes[id.0].children.len() {
                    let child = self.nodes[id.0].children[i];
                    if self.status(child, spent) == Status::Live {
                        self.collect_child(child, spent, out);
                    }
                }
            }
        }
    }

    fn collect_child(&mut self, child: Child,
                     spent: &dyn Fn(ExpectationId) -> bool,
                     out: &mut Vec<ExpectationId>)
    {
        match child {
            Child::Expectation(e) => out.push(e),
            Child::Group(g) => self.collect(g, spent, out)
        }
    }

    /// Move a sequential group's cursor past its spent children and return
    /// the index of its head, if it has one.
    ///
    /// Idle children are looked through.  The cursor passes them only once a
    /// later sibling is spent.
    fn settle(&mut self, id: GroupId, spent: &dyn Fn(ExpectationId) -> bool)
        -> Option<usize>
    {
        let mut i = self.nodes[id.0].cursor;
        while let Some(&child) = self.nodes[id.0].children.get(i) {
            match self.status(child, spent) {
                Status::Live => return Some(i),
                Status::Spent => self.nodes[id.0].cursor = i + 1,
                Status::Idle => ()
            }
            i += 1;
        }
        None
    }

    fn status(&mut self, child: Child, spent: &dyn Fn(ExpectationId) -> bool)
        -> Status
    {
        match child {
            Child::Expectation(e) if spent(e) => Status::Spent,
            Child::Expectation(_) => Status::Live,
            Child::Group(g) => self.group_status(g, spent)
        }
    }

    fn group_status(&mut self, id: GroupId,
                    spent: &dyn Fn(ExpectationId) -> bool) -> Status
    {
        if self.nodes[id.0].children.is_empty() {
            return Status::Idle;
        }
        match self.nodes[id.0].kind {
            GroupKind::Sequential => {
                if self.settle(id, spent).is_some() {
                    return Status::Live;
                }
                let node = &self.nodes[id.0];
                if node.cursor < node.children.len() {
                    Status::Idle
                } else {
                    Status::Spent
                }
            },
            GroupKind::Unordered => {
                let mut status = Status::Spent;
                for i in 0..self.nodes[id.0].children.len() {
                    let child = self.nodes[id.0].children[i];
                    match self.status(child, spent) {
                        Status::Live => return Status::Live,
                        Status::Idle => status = Status::Idle,
                        Status::Spent => ()
                    }
                }
                status
            }
        }
    }
}

#[cfg(test)]
mod t {
    use super::*;
    use std::collections::HashSet;

    fn ids(v: &[usize]) -> Vec<ExpectationId> {
        v.iter().map(|&i| ExpectationId(i)).collect()
    }

    #[test]
    fn root_is_unordered() {
        let mut tree = GroupTree::new();
        tree.add_expectation(GroupId::ROOT, ExpectationId(0));
        tree.add_expectation(GroupId::ROOT, ExpectationId(1));
        assert_eq!(GroupKind::Unordered, tree.kind(GroupId::ROOT));
        assert_eq!(ids(&[0, 1]), tree.eligible(&|_| false));
        assert_eq!(ids(&[1]), tree.eligible(&|e| e.0 == 0));
    }

    #[test]
    fn sequence_exposes_only_its_head() {
        let mut tree = GroupTree::new();
        let seq = tree.add_group(GroupId::ROOT, GroupKind::Sequential);
        for i in 0..3 {
            tree.add_expectation(seq, ExpectationId(i));
        }
        assert_eq!(ids(&[0]), tree.eligible(&|_| false));
        assert_eq!(ids(&[1]), tree.eligible(&|e| e.0 == 0));
        assert_eq!(ids(&[]), tree.eligible(&|_| true));
    }

    #[test]
    fn cursor_never_moves_backwards() {
        let mut tree = GroupTree::new();
        let seq = tree.add_group(GroupId::ROOT, GroupKind::Sequential);
        tree.add_expectation(seq, ExpectationId(0));
        tree.add_expectation(seq, ExpectationId(1));
        assert_eq!(ids(&[1]), tree.eligible(&|e| e.0 == 0));
        // Even if the first expectation were somehow live again
        assert_eq!(ids(&[1]), tree.eligible(&|_| false));
    }

    #[test]
    fn explicit_advance() {
        let mut tree = GroupTree::new();
        let seq = tree.add_group(GroupId::ROOT, GroupKind::Sequential);
        tree.add_expectation(seq, ExpectationId(0));
        tree.add_expectation(seq, ExpectationId(1));
        assert!(tree.advance(seq, &|_| false));
        assert_eq!(ids(&[1]), tree.eligible(&|_| false));
        assert!(tree.advance(seq, &|_| false));
        assert!(!tree.advance(seq, &|_| false));
        assert!(!tree.advance(GroupId::ROOT, &|_| false));
    }

    #[test]
    fn nested_unordered_inside_sequence() {
        let mut tree = GroupTree::new();
        let seq = tree.add_group(GroupId::ROOT, GroupKind::Sequential);
        tree.add_expectation(seq, ExpectationId(0));
        let inner = tree.add_group(seq, GroupKind::Unordered);
        tree.add_expectation(inner, ExpectationId(1));
        tree.add_expectation(inner, ExpectationId(2));
        tree.add_expectation(seq, ExpectationId(3));

        let mut spent = HashSet::new();
        assert_eq!(ids(&[0]), tree.eligible(&|e| spent.contains(&e.0)));
        spent.insert(0);
        assert_eq!(ids(&[1, 2]), tree.eligible(&|e| spent.contains(&e.0)));
        spent.insert(2);
        assert_eq!(ids(&[1]), tree.eligible(&|e| spent.contains(&e.0)));
        spent.insert(1);
        assert_eq!(ids(&[3]), tree.eligible(&|e| spent.contains(&e.0)));
    }

    #[test]
    fn empty_group_is_skipped() {
        let mut tree = GroupTree::new();
        let seq = tree.add_group(GroupId::ROOT, GroupKind::Sequential);
        tree.add_group(seq, GroupKind::Sequential);
        tree.add_expectation(seq, ExpectationId(0));
        assert_eq!(ids(&[0]), tree.eligible(&|_| false));
    }

    #[test]
    fn empty_group_keeps_its_place() {
        let mut tree = GroupTree::new();
        let seq = tree.add_group(GroupId::ROOT, GroupKind::Sequential);
        tree.add_expectation(seq, ExpectationId(0));
        let inner = tree.add_group(seq, GroupKind::Unordered);
        assert_eq!(ids(&[]), tree.eligible(&|e| e.0 == 0));
        tree.add_expectation(inner, ExpectationId(1));
        tree.add_expectation(seq, ExpectationId(2));
        assert_eq!(ids(&[1]), tree.eligible(&|e| e.0 == 0));
        assert_eq!(ids(&[2]), tree.eligible(&|e| e.0 < 2));
    }

    #[test]
    fn passed_once_a_later_sibling_is_spent() {
        let mut tree = GroupTree::new();
        let seq = tree.add_group(GroupId::ROOT, GroupKind::Sequential);
        let inner = tree.add_group(seq, GroupKind::Sequential);
        tree.add_expectation(seq, ExpectationId(0));
        assert_eq!(ids(&[]), tree.eligible(&|_| true));
        tree.add_expectation(inner, ExpectationId(1));
        assert_eq!(ids(&[]), tree.eligible(&|e| e.0 == 0));
    }

    #[test]
    fn advance_looks_through_idle_children() {
        let mut tree = GroupTree::new();
        let seq = tree.add_group(GroupId::ROOT, GroupKind::Sequential);
        tree.add_group(seq, GroupKind::Unordered);
        tree.add_expectation(seq, ExpectationId(0));
        tree.add_expectation(seq, ExpectationId(1));
        assert!(tree.advance(seq, &|_| false));
        assert_eq!(ids(&[1]), tree.eligible(&|_| false));
    }
}

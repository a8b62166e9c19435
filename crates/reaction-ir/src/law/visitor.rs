// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Visitor protocol over kinetic laws.
//!
//! A visitor is called once per node and may stop the traversal by returning `Err`; the
//! first error is handed back to the caller unchanged. Closures of the right shape are
//! visitors.

use crate::law::KineticLaw;

pub trait LawVisitor<E> {
    fn visit(&mut self, law: &KineticLaw) -> Result<(), E>;
}

impl<E, F> LawVisitor<E> for F
where
    F: FnMut(&KineticLaw) -> Result<(), E>,
{
    fn visit(&mut self, law: &KineticLaw) -> Result<(), E> {
        self(law)
    }
}

/// A visitor allowed to rewrite the node it is handed. Children are always visited
/// before their parent, so a rewrite never disturbs nodes still to be visited.
pub trait LawVisitorMut<E> {
    fn visit_mut(&mut self, law: &mut KineticLaw) -> Result<(), E>;
}

impl<E, F> LawVisitorMut<E> for F
where
    F: FnMut(&mut KineticLaw) -> Result<(), E>,
{
    fn visit_mut(&mut self, law: &mut KineticLaw) -> Result<(), E> {
        self(law)
    }
}

impl KineticLaw {
    /// Pre-order traversal: parent first, then children left to right.
    pub fn accept<E>(&self, visitor: &mut impl LawVisitor<E>) -> Result<(), E> {
        visitor.visit(self)?;
        for child in self.children() {
            child.accept(visitor)?;
        }
        Ok(())
    }

    /// Post-order traversal: children left to right, then the parent.
    pub fn accept_post_order<E>(&self, visitor: &mut impl LawVisitor<E>) -> Result<(), E> {
        for child in self.children() {
            child.accept_post_order(visitor)?;
        }
        visitor.visit(self)
    }

    /// Post-order traversal with mutable access.
    pub fn accept_mut<E>(&mut self, visitor: &mut impl LawVisitorMut<E>) -> Result<(), E> {
        for child in self.children_mut() {
            child.accept_mut(visitor)?;
        }
        visitor.visit_mut(self)
    }
}

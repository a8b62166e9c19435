// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Species, reaction and edge definitions.

use crate::data::ids::{CompartmentId, EdgeId, ReactionId, SpeciesId};
use crate::law::KineticLaw;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role a species plays in a reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    Reactant,
    Modifier,
    Product,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 3] = [EdgeKind::Reactant, EdgeKind::Modifier, EdgeKind::Product];
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Reactant => write!(f, "reactant"),
            EdgeKind::Modifier => write!(f, "modifier"),
            EdgeKind::Product => write!(f, "product"),
        }
    }
}

/// A stoichiometric connection between a species and a reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub species: SpeciesId,
    pub reaction: ReactionId,
    pub stoichiometry: u32,
    pub kind: EdgeKind,
}

/// Tri-color mark used by graph traversals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mark {
    #[default]
    White,
    Gray,
    Black,
}

/// The three edge lists every node owns, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeLists {
    reactants: Vec<EdgeId>,
    modifiers: Vec<EdgeId>,
    products: Vec<EdgeId>,
}

impl EdgeLists {
    pub fn list(&self, kind: EdgeKind) -> &[EdgeId] {
        match kind {
            EdgeKind::Reactant => &self.reactants,
            EdgeKind::Modifier => &self.modifiers,
            EdgeKind::Product => &self.products,
        }
    }

    fn list_mut(&mut self, kind: EdgeKind) -> &mut Vec<EdgeId> {
        match kind {
            EdgeKind::Reactant => &mut self.reactants,
            EdgeKind::Modifier => &mut self.modifiers,
            EdgeKind::Product => &mut self.products,
        }
    }

    pub(crate) fn push(&mut self, kind: EdgeKind, edge: EdgeId) {
        self.list_mut(kind).push(edge)
    }

    /// Removes `edge` from the list of the given kind. Returns whether it was present.
    pub(crate) fn remove(&mut self, kind: EdgeKind, edge: EdgeId) -> bool {
        let list = self.list_mut(kind);
        match list.iter().position(|e| *e == edge) {
            Some(pos) => {
                list.remove(pos);
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.reactants.clear();
        self.modifiers.clear();
        self.products.clear();
    }

    /// All edges, reactants first, then modifiers, then products.
    pub fn all(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.reactants
            .iter()
            .chain(self.modifiers.iter())
            .chain(self.products.iter())
            .copied()
    }

    pub fn len(&self) -> usize {
        self.reactants.len() + self.modifiers.len() + self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The part shared by species and reactions: identity, edges and traversal mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrNode<Id> {
    id: Id,
    name: String,
    edges: EdgeLists,
    mark: Mark,
}

impl<Id: Copy> IrNode<Id> {
    pub(crate) fn new(id: Id, name: String) -> Self {
        Self {
            id,
            name,
            edges: EdgeLists::default(),
            mark: Mark::White,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn edges(&self) -> &EdgeLists {
        &self.edges
    }

    pub(crate) fn edges_mut(&mut self) -> &mut EdgeLists {
        &mut self.edges
    }

    pub fn mark(&self) -> Mark {
        self.mark
    }

    pub fn set_mark(&mut self, mark: Mark) {
        self.mark = mark
    }
}

/// How the initial quantity of a species was specified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InitialQuantity {
    Amount(f64),
    Concentration(f64),
}

impl InitialQuantity {
    pub fn value(&self) -> f64 {
        match self {
            InitialQuantity::Amount(v) | InitialQuantity::Concentration(v) => *v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    node: IrNode<SpeciesId>,
    initial: InitialQuantity,
    compartment: Option<CompartmentId>,
    keep: bool,
    /// Current amount, consulted only by numeric evaluation.
    amount: f64,
}

impl Species {
    pub(crate) fn new(
        id: SpeciesId,
        name: String,
        initial: InitialQuantity,
        compartment: Option<CompartmentId>,
        amount: f64,
    ) -> Self {
        Self {
            node: IrNode::new(id, name),
            initial,
            compartment,
            keep: false,
            amount,
        }
    }

    pub fn id(&self) -> SpeciesId {
        self.node.id()
    }

    pub fn name(&self) -> &str {
        self.node.name()
    }

    pub fn node(&self) -> &IrNode<SpeciesId> {
        &self.node
    }

    pub(crate) fn node_mut(&mut self) -> &mut IrNode<SpeciesId> {
        &mut self.node
    }

    pub fn edges(&self) -> &EdgeLists {
        self.node.edges()
    }

    pub fn initial(&self) -> InitialQuantity {
        self.initial
    }

    pub(crate) fn set_initial(&mut self, initial: InitialQuantity) {
        self.initial = initial
    }

    pub fn compartment(&self) -> Option<CompartmentId> {
        self.compartment
    }

    pub fn is_kept(&self) -> bool {
        self.keep
    }

    pub fn set_keep(&mut self, keep: bool) {
        self.keep = keep
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn set_amount(&mut self, amount: f64) {
        self.amount = amount
    }

    pub fn mark(&self) -> Mark {
        self.node.mark()
    }

    pub fn set_mark(&mut self, mark: Mark) {
        self.node.set_mark(mark)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    node: IrNode<ReactionId>,
    reversible: bool,
    fast: bool,
    law: KineticLaw,
    /// Propensity cache and the time it was last refreshed; owned by the simulator.
    rate: f64,
    rate_update_time: f64,
}

impl Reaction {
    pub(crate) fn new(
        id: ReactionId,
        name: String,
        law: KineticLaw,
        reversible: bool,
        fast: bool,
    ) -> Self {
        Self {
            node: IrNode::new(id, name),
            reversible,
            fast,
            law,
            rate: 0.0,
            rate_update_time: 0.0,
        }
    }

    pub fn id(&self) -> ReactionId {
        self.node.id()
    }

    pub fn name(&self) -> &str {
        self.node.name()
    }

    pub fn node(&self) -> &IrNode<ReactionId> {
        &self.node
    }

    pub(crate) fn node_mut(&mut self) -> &mut IrNode<ReactionId> {
        &mut self.node
    }

    pub fn edges(&self) -> &EdgeLists {
        self.node.edges()
    }

    pub fn is_reversible(&self) -> bool {
        self.reversible
    }

    pub fn set_reversible(&mut self, reversible: bool) {
        self.reversible = reversible
    }

    pub fn is_fast(&self) -> bool {
        self.fast
    }

    pub fn set_fast(&mut self, fast: bool) {
        self.fast = fast
    }

    pub fn law(&self) -> &KineticLaw {
        &self.law
    }

    pub fn law_mut(&mut self) -> &mut KineticLaw {
        &mut self.law
    }

    /// Installs a new kinetic law and hands back the displaced one.
    pub fn set_law(&mut self, law: KineticLaw) -> KineticLaw {
        std::mem::replace(&mut self.law, law)
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn rate_update_time(&self) -> f64 {
        self.rate_update_time
    }

    pub fn set_rate(&mut self, rate: f64, time: f64) {
        self.rate = rate;
        self.rate_update_time = time;
    }

    pub fn mark(&self) -> Mark {
        self.node.mark()
    }

    pub fn set_mark(&mut self, mark: Mark) {
        self.node.set_mark(mark)
    }
}

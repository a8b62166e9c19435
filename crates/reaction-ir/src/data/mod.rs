// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! The reaction graph.
//!
//! Species and reactions live in id-keyed maps owned by [`Ir`]; edges are stored once in
//! their own map and referenced by id from the matching list on both endpoints. All
//! mutations go through [`Ir`] so the two-sided edge bookkeeping cannot drift.

pub mod ids;
pub mod nodes;
pub mod symbols;
mod display;

pub use display::IrDisplay;

use crate::data::ids::{CompartmentId, EdgeId, ReactionId, SpeciesId, SymbolId};
use crate::data::nodes::{Edge, EdgeKind, InitialQuantity, Mark, Reaction, Species};
use crate::data::symbols::{Compartment, Symbol, SymbolTable};
use crate::error::{IrError, IrResult};
use crate::law::KineticLaw;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ir {
    species: BTreeMap<SpeciesId, Species>,
    reactions: BTreeMap<ReactionId, Reaction>,
    edges: BTreeMap<EdgeId, Edge>,
    symbols: SymbolTable,
    compartments: BTreeMap<CompartmentId, Compartment>,
    next_id: u32,
}

/// A cursor over one edge list of one node.
///
/// The cursor borrows the graph, so the list it walks cannot be mutated while the
/// traversal is active. Use [`Ir::edge_snapshot`] when the caller needs to mutate after
/// scanning.
pub struct EdgeCursor<'a> {
    edges: &'a BTreeMap<EdgeId, Edge>,
    ids: std::slice::Iter<'a, EdgeId>,
}

impl<'a> Iterator for EdgeCursor<'a> {
    type Item = &'a Edge;

    fn next(&mut self) -> Option<Self::Item> {
        for id in self.ids.by_ref() {
            if let Some(edge) = self.edges.get(id) {
                return Some(edge);
            }
        }
        None
    }
}

impl Ir {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // ------------------------------------------------------------------------
    // Construction

    pub fn add_compartment(&mut self, name: &str, size: f64) -> CompartmentId {
        let id = CompartmentId(self.fresh_id());
        self.compartments.insert(
            id,
            Compartment {
                id,
                name: name.to_string(),
                size,
            },
        );
        id
    }

    pub fn add_species(&mut self, name: &str, initial: InitialQuantity) -> SpeciesId {
        let id = SpeciesId(self.fresh_id());
        let amount = initial.value();
        self.species
            .insert(id, Species::new(id, name.to_string(), initial, None, amount));
        id
    }

    /// Adds a species living in a compartment. A concentration is converted to an amount
    /// through the compartment size to initialise the runtime amount.
    pub fn add_species_in(
        &mut self,
        name: &str,
        initial: InitialQuantity,
        compartment: CompartmentId,
    ) -> IrResult<SpeciesId> {
        let size = self.compartment(compartment)?.size;
        let amount = match initial {
            InitialQuantity::Amount(a) => a,
            InitialQuantity::Concentration(c) => c * size,
        };
        let id = SpeciesId(self.fresh_id());
        self.species.insert(
            id,
            Species::new(id, name.to_string(), initial, Some(compartment), amount),
        );
        Ok(id)
    }

    pub fn add_reaction(
        &mut self,
        name: &str,
        law: KineticLaw,
        reversible: bool,
        fast: bool,
    ) -> ReactionId {
        let id = ReactionId(self.fresh_id());
        self.reactions
            .insert(id, Reaction::new(id, name.to_string(), law, reversible, fast));
        id
    }

    pub fn add_symbol(&mut self, name: &str, value: f64, constant: bool) -> IrResult<SymbolId> {
        if self.symbols.contains_name(name) {
            return Err(IrError::wrong_data(format!(
                "symbol `{}` is already defined",
                name
            )));
        }
        let id = SymbolId(self.fresh_id());
        self.symbols.insert(Symbol {
            id,
            name: name.to_string(),
            value,
            constant,
        })?;
        Ok(id)
    }

    /// Returns `prefix` if no symbol carries that name yet, otherwise the first free
    /// `prefix_N`.
    pub fn fresh_symbol_name(&self, prefix: &str) -> String {
        if !self.symbols.contains_name(prefix) {
            return prefix.to_string();
        }
        (1..)
            .map(|n| format!("{}_{}", prefix, n))
            .find(|name| !self.symbols.contains_name(name))
            .unwrap_or_else(|| prefix.to_string())
    }

    /// Returns `prefix` if no species carries that name yet, otherwise the first free
    /// `prefix_N`.
    pub fn fresh_species_name(&self, prefix: &str) -> String {
        if self.find_species_by_name(prefix).is_none() {
            return prefix.to_string();
        }
        (1..)
            .map(|n| format!("{}_{}", prefix, n))
            .find(|name| self.find_species_by_name(name).is_none())
            .unwrap_or_else(|| prefix.to_string())
    }

    pub fn add_reactant(
        &mut self,
        reaction: ReactionId,
        species: SpeciesId,
        stoichiometry: u32,
    ) -> IrResult<EdgeId> {
        self.add_edge(EdgeKind::Reactant, reaction, species, stoichiometry)
    }

    pub fn add_modifier(&mut self, reaction: ReactionId, species: SpeciesId) -> IrResult<EdgeId> {
        self.add_edge(EdgeKind::Modifier, reaction, species, 1)
    }

    pub fn add_product(
        &mut self,
        reaction: ReactionId,
        species: SpeciesId,
        stoichiometry: u32,
    ) -> IrResult<EdgeId> {
        self.add_edge(EdgeKind::Product, reaction, species, stoichiometry)
    }

    /// Connects `species` to `reaction`. The edge is appended to the matching list of
    /// both endpoints.
    pub fn add_edge(
        &mut self,
        kind: EdgeKind,
        reaction: ReactionId,
        species: SpeciesId,
        stoichiometry: u32,
    ) -> IrResult<EdgeId> {
        if stoichiometry == 0 {
            return Err(IrError::wrong_data(format!(
                "stoichiometry of {} edge between {} and {} must be positive",
                kind, species, reaction
            )));
        }
        if !self.species.contains_key(&species) {
            return Err(IrError::MissingSpecies(species));
        }
        if !self.reactions.contains_key(&reaction) {
            return Err(IrError::MissingReaction(reaction));
        }
        let id = EdgeId(self.fresh_id());
        self.edges.insert(
            id,
            Edge {
                id,
                species,
                reaction,
                stoichiometry,
                kind,
            },
        );
        if let Some(s) = self.species.get_mut(&species) {
            s.node_mut().edges_mut().push(kind, id);
        }
        if let Some(r) = self.reactions.get_mut(&reaction) {
            r.node_mut().edges_mut().push(kind, id);
        }
        Ok(id)
    }

    // ------------------------------------------------------------------------
    // Removal

    /// Removes a species and every edge incident to it, on both endpoints.
    pub fn remove_species(&mut self, id: SpeciesId) -> IrResult<Species> {
        let mut species = self.species.remove(&id).ok_or(IrError::MissingSpecies(id))?;
        for edge_id in species.edges().all().collect::<Vec<_>>() {
            if let Some(edge) = self.edges.remove(&edge_id) {
                if let Some(reaction) = self.reactions.get_mut(&edge.reaction) {
                    reaction.node_mut().edges_mut().remove(edge.kind, edge_id);
                }
            }
        }
        species.node_mut().edges_mut().clear();
        debug!("removed species `{}` ({})", species.name(), id);
        Ok(species)
    }

    /// Removes a reaction and every edge incident to it, on both endpoints.
    pub fn remove_reaction(&mut self, id: ReactionId) -> IrResult<Reaction> {
        let mut reaction = self
            .reactions
            .remove(&id)
            .ok_or(IrError::MissingReaction(id))?;
        for edge_id in reaction.edges().all().collect::<Vec<_>>() {
            if let Some(edge) = self.edges.remove(&edge_id) {
                if let Some(species) = self.species.get_mut(&edge.species) {
                    species.node_mut().edges_mut().remove(edge.kind, edge_id);
                }
            }
        }
        reaction.node_mut().edges_mut().clear();
        debug!("removed reaction `{}` ({})", reaction.name(), id);
        Ok(reaction)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> IrResult<Edge> {
        let edge = self.edges.remove(&id).ok_or(IrError::MissingEdge(id))?;
        if let Some(species) = self.species.get_mut(&edge.species) {
            species.node_mut().edges_mut().remove(edge.kind, id);
        }
        if let Some(reaction) = self.reactions.get_mut(&edge.reaction) {
            reaction.node_mut().edges_mut().remove(edge.kind, id);
        }
        Ok(edge)
    }

    /// Removes the first edge of `kind` joining `reaction` and `species`.
    pub fn remove_edge_of_kind(
        &mut self,
        reaction: ReactionId,
        species: SpeciesId,
        kind: EdgeKind,
    ) -> IrResult<Edge> {
        let edge_id = self
            .edges_of_reaction(reaction, kind)
            .find(|e| e.species == species)
            .map(|e| e.id)
            .ok_or_else(|| {
                IrError::wrong_data(format!(
                    "no {} edge between {} and {}",
                    kind, species, reaction
                ))
            })?;
        self.remove_edge(edge_id)
    }

    pub fn remove_symbol(&mut self, id: SymbolId) -> IrResult<Symbol> {
        self.symbols.remove(id).ok_or(IrError::MissingSymbol(id))
    }

    /// Copies a reaction under a fresh id: the kinetic law is deep-cloned, species
    /// identities are kept and every edge is duplicated.
    pub fn clone_reaction(&mut self, id: ReactionId, name: &str) -> IrResult<ReactionId> {
        let source = self.reaction(id)?;
        let law = source.law().clone();
        let reversible = source.is_reversible();
        let fast = source.is_fast();
        let edges = self.edge_snapshot(id);
        let clone = self.add_reaction(name, law, reversible, fast);
        for edge in edges {
            self.add_edge(edge.kind, clone, edge.species, edge.stoichiometry)?;
        }
        Ok(clone)
    }

    // ------------------------------------------------------------------------
    // Access

    pub fn species(&self) -> impl Iterator<Item = &Species> {
        self.species.values()
    }

    pub fn reactions(&self) -> impl Iterator<Item = &Reaction> {
        self.reactions.values()
    }

    pub fn species_ids(&self) -> Vec<SpeciesId> {
        self.species.keys().copied().collect()
    }

    pub fn reaction_ids(&self) -> Vec<ReactionId> {
        self.reactions.keys().copied().collect()
    }

    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    pub fn reaction_count(&self) -> usize {
        self.reactions.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn has_species(&self, id: SpeciesId) -> bool {
        self.species.contains_key(&id)
    }

    pub fn has_reaction(&self, id: ReactionId) -> bool {
        self.reactions.contains_key(&id)
    }

    pub fn get_species(&self, id: SpeciesId) -> Option<&Species> {
        self.species.get(&id)
    }

    pub fn get_species_mut(&mut self, id: SpeciesId) -> Option<&mut Species> {
        self.species.get_mut(&id)
    }

    pub fn get_reaction(&self, id: ReactionId) -> Option<&Reaction> {
        self.reactions.get(&id)
    }

    pub fn get_reaction_mut(&mut self, id: ReactionId) -> Option<&mut Reaction> {
        self.reactions.get_mut(&id)
    }

    /// Like [`Ir::get_species`], but a missing species is an error.
    pub fn species_node(&self, id: SpeciesId) -> IrResult<&Species> {
        self.species.get(&id).ok_or(IrError::MissingSpecies(id))
    }

    pub fn species_node_mut(&mut self, id: SpeciesId) -> IrResult<&mut Species> {
        self.species.get_mut(&id).ok_or(IrError::MissingSpecies(id))
    }

    /// Like [`Ir::get_reaction`], but a missing reaction is an error.
    pub fn reaction(&self, id: ReactionId) -> IrResult<&Reaction> {
        self.reactions.get(&id).ok_or(IrError::MissingReaction(id))
    }

    pub fn reaction_mut(&mut self, id: ReactionId) -> IrResult<&mut Reaction> {
        self.reactions
            .get_mut(&id)
            .ok_or(IrError::MissingReaction(id))
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn find_species_by_name(&self, name: &str) -> Option<SpeciesId> {
        self.species
            .values()
            .find(|s| s.name() == name)
            .map(|s| s.id())
    }

    pub fn find_reaction_by_name(&self, name: &str) -> Option<ReactionId> {
        self.reactions
            .values()
            .find(|r| r.name() == name)
            .map(|r| r.id())
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn symbol(&self, id: SymbolId) -> IrResult<&Symbol> {
        self.symbols.get(id).ok_or(IrError::MissingSymbol(id))
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> IrResult<&mut Symbol> {
        self.symbols.get_mut(id).ok_or(IrError::MissingSymbol(id))
    }

    pub fn find_symbol_by_name(&self, name: &str) -> Option<SymbolId> {
        self.symbols.find_by_name(name)
    }

    pub fn compartments(&self) -> impl Iterator<Item = &Compartment> {
        self.compartments.values()
    }

    pub fn compartment(&self, id: CompartmentId) -> IrResult<&Compartment> {
        self.compartments
            .get(&id)
            .ok_or(IrError::MissingCompartment(id))
    }

    // ------------------------------------------------------------------------
    // Edge traversal

    /// Walks the edges of `kind` attached to a reaction. Missing reactions yield nothing.
    pub fn edges_of_reaction(&self, reaction: ReactionId, kind: EdgeKind) -> EdgeCursor<'_> {
        let ids: &[EdgeId] = self
            .reactions
            .get(&reaction)
            .map(|r| r.edges().list(kind))
            .unwrap_or(&[]);
        EdgeCursor {
            edges: &self.edges,
            ids: ids.iter(),
        }
    }

    /// Walks the edges of `kind` attached to a species. Missing species yield nothing.
    pub fn species_edges(&self, species: SpeciesId, kind: EdgeKind) -> EdgeCursor<'_> {
        let ids: &[EdgeId] = self
            .species
            .get(&species)
            .map(|s| s.edges().list(kind))
            .unwrap_or(&[]);
        EdgeCursor {
            edges: &self.edges,
            ids: ids.iter(),
        }
    }

    pub fn reactant_edges(&self, reaction: ReactionId) -> EdgeCursor<'_> {
        self.edges_of_reaction(reaction, EdgeKind::Reactant)
    }

    pub fn modifier_edges(&self, reaction: ReactionId) -> EdgeCursor<'_> {
        self.edges_of_reaction(reaction, EdgeKind::Modifier)
    }

    pub fn product_edges(&self, reaction: ReactionId) -> EdgeCursor<'_> {
        self.edges_of_reaction(reaction, EdgeKind::Product)
    }

    /// Owned copy of every edge of a reaction (reactants, modifiers, products).
    pub fn edge_snapshot(&self, reaction: ReactionId) -> Vec<Edge> {
        EdgeKind::ALL
            .iter()
            .flat_map(|kind| self.edges_of_reaction(reaction, *kind).copied())
            .collect()
    }

    /// Owned copy of every edge of a species (reactants, modifiers, products).
    pub fn species_edge_snapshot(&self, species: SpeciesId) -> Vec<Edge> {
        EdgeKind::ALL
            .iter()
            .flat_map(|kind| self.species_edges(species, *kind).copied())
            .collect()
    }

    /// Species attached to a reaction with the given role, with stoichiometry.
    pub fn reaction_species(&self, reaction: ReactionId, kind: EdgeKind) -> Vec<(SpeciesId, u32)> {
        self.edges_of_reaction(reaction, kind)
            .map(|e| (e.species, e.stoichiometry))
            .collect()
    }

    /// Every reaction the species takes part in, in any role.
    pub fn reactions_of_species(&self, species: SpeciesId) -> BTreeSet<ReactionId> {
        self.species_edge_snapshot(species)
            .into_iter()
            .map(|e| e.reaction)
            .collect()
    }

    /// Reactions whose kinetic law mentions the species, whether or not it is connected
    /// by an edge.
    pub fn reactions_referencing(&self, species: SpeciesId) -> Vec<ReactionId> {
        self.reactions
            .values()
            .filter(|r| r.law().contains_species(species))
            .map(|r| r.id())
            .collect()
    }

    pub fn has_edge(&self, reaction: ReactionId, species: SpeciesId, kind: EdgeKind) -> bool {
        self.edges_of_reaction(reaction, kind)
            .any(|e| e.species == species)
    }

    // ------------------------------------------------------------------------
    // Quantities

    /// Initial quantity of a species expressed as an amount.
    pub fn initial_amount(&self, id: SpeciesId) -> IrResult<f64> {
        let species = self.species_node(id)?;
        Ok(match species.initial() {
            InitialQuantity::Amount(a) => a,
            InitialQuantity::Concentration(c) => c * self.compartment_size(species.compartment())?,
        })
    }

    fn compartment_size(&self, compartment: Option<CompartmentId>) -> IrResult<f64> {
        match compartment {
            Some(c) => Ok(self.compartment(c)?.size),
            None => Ok(1.0),
        }
    }

    /// Sets the initial amount, keeping the quantity kind the species was declared with.
    /// The runtime amount follows.
    pub fn set_initial_amount(&mut self, id: SpeciesId, amount: f64) -> IrResult<()> {
        let species = self.species_node(id)?;
        let initial = match species.initial() {
            InitialQuantity::Amount(_) => InitialQuantity::Amount(amount),
            InitialQuantity::Concentration(_) => {
                let size = self.compartment_size(species.compartment())?;
                InitialQuantity::Concentration(amount / size)
            }
        };
        let species = self.species_node_mut(id)?;
        species.set_initial(initial);
        species.set_amount(amount);
        Ok(())
    }

    pub fn species_amount(&self, id: SpeciesId) -> IrResult<f64> {
        Ok(self.species_node(id)?.amount())
    }

    pub fn set_species_amount(&mut self, id: SpeciesId, amount: f64) -> IrResult<()> {
        self.species_node_mut(id)?.set_amount(amount);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Marks

    pub fn reset_marks(&mut self) {
        for species in self.species.values_mut() {
            species.set_mark(Mark::White);
        }
        for reaction in self.reactions.values_mut() {
            reaction.set_mark(Mark::White);
        }
    }

    // ------------------------------------------------------------------------
    // Invariants

    /// Verifies that every edge is listed exactly once on each endpoint, in the list of
    /// its kind, and that no node lists an edge that does not point back to it.
    pub fn check_integrity(&self) -> IrResult<()> {
        for edge in self.edges.values() {
            let species = self.species_node(edge.species)?;
            let reaction = self.reaction(edge.reaction)?;
            for kind in EdgeKind::ALL {
                let on_species = species.edges().list(kind).iter().filter(|e| **e == edge.id).count();
                let on_reaction = reaction.edges().list(kind).iter().filter(|e| **e == edge.id).count();
                let expected = usize::from(kind == edge.kind);
                if on_species != expected || on_reaction != expected {
                    return Err(IrError::wrong_data(format!(
                        "edge {} is listed {}/{} times as {} on {}/{}",
                        edge.id, on_species, on_reaction, kind, edge.species, edge.reaction
                    )));
                }
            }
        }
        for species in self.species.values() {
            for edge_id in species.edges().all() {
                let edge = self.edges.get(&edge_id).ok_or(IrError::MissingEdge(edge_id))?;
                if edge.species != species.id() {
                    return Err(IrError::wrong_data(format!(
                        "{} lists foreign edge {}",
                        species.id(),
                        edge_id
                    )));
                }
            }
        }
        for reaction in self.reactions.values() {
            for edge_id in reaction.edges().all() {
                let edge = self.edges.get(&edge_id).ok_or(IrError::MissingEdge(edge_id))?;
                if edge.reaction != reaction.id() {
                    return Err(IrError::wrong_data(format!(
                        "{} lists foreign edge {}",
                        reaction.id(),
                        edge_id
                    )));
                }
            }
        }
        Ok(())
    }

    /// The contract the IR must satisfy when handed to a simulator or back end: the
    /// graph is consistent, every initial quantity is a finite number and every kinetic
    /// law only refers to live species, symbols and compartments.
    pub fn validate_for_handoff(&self) -> IrResult<()> {
        self.check_integrity()?;
        for species in self.species.values() {
            if !species.initial().value().is_finite() {
                return Err(IrError::wrong_data(format!(
                    "species `{}` has no defined initial quantity",
                    species.name()
                )));
            }
        }
        for reaction in self.reactions.values() {
            for node in reaction.law().iter() {
                match node {
                    KineticLaw::Species(id) => {
                        self.species_node(*id)?;
                    }
                    KineticLaw::Symbol(id) => {
                        self.symbol(*id)?;
                    }
                    KineticLaw::Compartment(id) => {
                        self.compartment(*id)?;
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Renders the species/reaction bipartite graph in Graphviz dot format.
    pub fn to_dot(&self) -> String {
        display::generate_dot(self)
    }
}

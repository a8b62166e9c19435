// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Textual and Graphviz dumps of the reaction graph.

use crate::data::nodes::{EdgeKind, InitialQuantity};
use crate::data::Ir;
use crate::data::ids::ReactionId;
use itertools::Itertools;
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::BTreeMap;
use std::fmt;

/// Human-readable listing of compartments, symbols, species and reactions.
pub struct IrDisplay<'a> {
    pub ir: &'a Ir,
}

impl Ir {
    pub fn display(&self) -> IrDisplay<'_> {
        IrDisplay { ir: self }
    }

    fn side(&self, reaction: ReactionId, kind: EdgeKind) -> String {
        let side = self
            .edges_of_reaction(reaction, kind)
            .map(|e| {
                let name = self
                    .get_species(e.species)
                    .map(|s| s.name().to_string())
                    .unwrap_or_else(|| e.species.to_string());
                if e.stoichiometry == 1 {
                    name
                } else {
                    format!("{} {}", e.stoichiometry, name)
                }
            })
            .join(" + ");
        if side.is_empty() {
            "0".to_string()
        } else {
            side
        }
    }
}

impl fmt::Display for IrDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ir = self.ir;
        for compartment in ir.compartments() {
            writeln!(f, "compartment {} = {}", compartment.name, compartment.size)?;
        }
        for symbol in ir.symbols().iter() {
            let qualifier = if symbol.constant { " (constant)" } else { "" };
            writeln!(f, "symbol {} = {}{}", symbol.name, symbol.value, qualifier)?;
        }
        for species in ir.species() {
            let (value, unit) = match species.initial() {
                InitialQuantity::Amount(v) => (v, "amount"),
                InitialQuantity::Concentration(v) => (v, "concentration"),
            };
            let kept = if species.is_kept() { " [keep]" } else { "" };
            writeln!(f, "species {} = {} ({}){}", species.name(), value, unit, kept)?;
        }
        for reaction in ir.reactions() {
            let arrow = if reaction.is_reversible() { "<->" } else { "->" };
            let mut flags = Vec::new();
            if reaction.is_fast() {
                flags.push("fast");
            }
            write!(
                f,
                "reaction {}: {} {} {}",
                reaction.name(),
                ir.side(reaction.id(), EdgeKind::Reactant),
                arrow,
                ir.side(reaction.id(), EdgeKind::Product)
            )?;
            if !reaction.edges().list(EdgeKind::Modifier).is_empty() {
                write!(f, "; modifiers: {}", ir.side(reaction.id(), EdgeKind::Modifier))?;
            }
            if !flags.is_empty() {
                write!(f, " [{}]", flags.join(", "))?;
            }
            writeln!(f, "; law: {}", reaction.law().display(ir))?;
        }
        Ok(())
    }
}

/// Builds the species/reaction bipartite graph and renders it. Reactant and modifier
/// edges point into the reaction, product edges out of it.
pub(crate) fn generate_dot(ir: &Ir) -> String {
    let mut graph = DiGraph::<String, String>::new();
    let mut species_nodes: BTreeMap<_, NodeIndex> = BTreeMap::new();
    for species in ir.species() {
        species_nodes.insert(species.id(), graph.add_node(species.name().to_string()));
    }
    for reaction in ir.reactions() {
        let r = graph.add_node(format!("[{}]", reaction.name()));
        for kind in EdgeKind::ALL {
            for edge in ir.edges_of_reaction(reaction.id(), kind) {
                let Some(s) = species_nodes.get(&edge.species).copied() else {
                    continue;
                };
                let label = match kind {
                    EdgeKind::Modifier => "modifier".to_string(),
                    _ => edge.stoichiometry.to_string(),
                };
                match kind {
                    EdgeKind::Product => graph.add_edge(r, s, label),
                    _ => graph.add_edge(s, r, label),
                };
            }
        }
    }
    format!("{}", Dot::new(&graph))
}

// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Discretises a species into ordinal levels.
//!
//! A species `S` that is the sole unit reactant of its consumers and the sole unit
//! product of its producers is replaced by logical species `S__1 .. S__N`, one per
//! critical level `c_1 < .. < c_N` found in the laws that mention `S`. `S__j` is 1 when
//! `S` has reached `c_j`, 0 otherwise.
//!
//! Each producer is cloned once per level. Clone `j` raises `S__j`, fires only when the
//! levels below `j` are set and the others are not, evaluates its law at `c_{j-1}` and
//! is slowed by the width of the step `c_j - c_{j-1}` (`c_0 = 0`). Consumer clone `j`
//! lowers `S__j`, fires only when levels up to `j` are set and the others are not, and
//! evaluates its law at `c_j`. Every other law sees `sum_j (c_j - c_{j-1}) S__j`.

use crate::abstraction_pipeline::AbstractionMethod;
use crate::critical_concentration::find_critical_levels;
use crate::law_queries::{ensure_modifier, reactions_touching};
use crate::nary_order_decider::NaryOrderDecider;
use crate::options::ReductionOptions;
use anyhow::Context;
use log::{debug, info};
use reaction_ir::{EdgeKind, InitialQuantity, Ir, KineticLaw, ReactionId, SpeciesId};
use std::mem;

pub struct NaryOrderUnaryTransformer();

#[derive(Debug, Clone, PartialEq)]
pub struct NaryCandidate {
    pub species: SpeciesId,
    pub producers: Vec<ReactionId>,
    pub consumers: Vec<ReactionId>,
    pub levels: Vec<f64>,
}

/// Splits the reactions moving `species` into producers and consumers. Fails if any of
/// them moves other species on the same side, uses a stoichiometry other than one, is
/// reversible, or both produces and consumes the species.
fn classify(ir: &Ir, species: SpeciesId) -> Option<(Vec<ReactionId>, Vec<ReactionId>)> {
    let unit_reaction = |reaction: ReactionId, kind: EdgeKind| {
        let moved = ir.reaction_species(reaction, kind);
        moved.as_slice() == [(species, 1)]
            && ir
                .get_reaction(reaction)
                .map_or(false, |r| !r.is_reversible())
    };
    let mut consumers = Vec::new();
    for edge in ir.species_edges(species, EdgeKind::Reactant) {
        if !unit_reaction(edge.reaction, EdgeKind::Reactant) {
            return None;
        }
        consumers.push(edge.reaction);
    }
    let mut producers = Vec::new();
    for edge in ir.species_edges(species, EdgeKind::Product) {
        if !unit_reaction(edge.reaction, EdgeKind::Product) || consumers.contains(&edge.reaction)
        {
            return None;
        }
        producers.push(edge.reaction);
    }
    if producers.is_empty() && consumers.is_empty() {
        return None;
    }
    Some((producers, consumers))
}

/// `S__k`
fn level_set(logical: SpeciesId) -> KineticLaw {
    KineticLaw::species(logical)
}

/// `1 - S__k`
fn level_unset(logical: SpeciesId) -> KineticLaw {
    KineticLaw::sub(KineticLaw::int(1), KineticLaw::species(logical))
}

impl NaryOrderUnaryTransformer {
    pub fn new() -> Box<Self> {
        Box::new(Self())
    }

    pub fn find_candidate(
        ir: &Ir,
        species: SpeciesId,
        options: &ReductionOptions,
    ) -> Option<NaryCandidate> {
        if ir.get_species(species)?.is_kept() {
            return None;
        }
        let (producers, consumers) = classify(ir, species)?;
        let raw: Vec<f64> = ir
            .reactions_referencing(species)
            .into_iter()
            .filter_map(|r| ir.get_reaction(r))
            .flat_map(|r| find_critical_levels(ir, r.law(), species))
            .collect();
        let levels = NaryOrderDecider::from_options(options).decide(&raw);
        if levels.is_empty() {
            debug!("no critical level for {}", species);
            return None;
        }
        Some(NaryCandidate {
            species,
            producers,
            consumers,
            levels,
        })
    }

    /// Clones `reaction` for level `level` (1-based), evaluating its law at `value`,
    /// gating it and slowing it down by `step`.
    fn level_clone(
        ir: &mut Ir,
        reaction: ReactionId,
        species: SpeciesId,
        level: usize,
        value: f64,
        step: f64,
        gates: Vec<KineticLaw>,
    ) -> anyhow::Result<ReactionId> {
        let name = format!("{}__{}", ir.reaction(reaction)?.name(), level);
        let clone = ir.clone_reaction(reaction, &name)?;
        let r = ir.reaction_mut(clone)?;
        let mut law = mem::take(r.law_mut());
        law.replace_species_with_law(species, &KineticLaw::real(value));
        r.set_law(KineticLaw::div(
            KineticLaw::product(gates.into_iter().chain(std::iter::once(law))),
            KineticLaw::real(step),
        ));
        Ok(clone)
    }

    pub fn transform(ir: &mut Ir, candidate: &NaryCandidate) -> anyhow::Result<()> {
        let NaryCandidate {
            species,
            producers,
            consumers,
            levels,
        } = candidate;
        let species = *species;
        let name = ir.species_node(species)?.name().to_string();
        let initial = ir.initial_amount(species)?;
        // Taken before cloning: the clones inherit the edges to `species`.
        let others: Vec<ReactionId> = reactions_touching(ir, species)
            .into_iter()
            .filter(|r| !producers.contains(r) && !consumers.contains(r))
            .collect();

        let mut logical = Vec::new();
        for (j, level) in levels.iter().enumerate() {
            let level_name = ir.fresh_species_name(&format!("{}__{}", name, j + 1));
            let reached = if initial >= *level { 1.0 } else { 0.0 };
            logical.push(ir.add_species(&level_name, InitialQuantity::Amount(reached)));
        }
        let mut previous = 0.0;
        let steps: Vec<f64> = levels
            .iter()
            .map(|c| {
                let step = c - previous;
                previous = *c;
                step
            })
            .collect();

        for producer in producers {
            for j in 0..levels.len() {
                let gates = (0..levels.len())
                    .map(|k| {
                        if k < j {
                            level_set(logical[k])
                        } else {
                            level_unset(logical[k])
                        }
                    })
                    .collect();
                let value = if j == 0 { 0.0 } else { levels[j - 1] };
                let clone =
                    Self::level_clone(ir, *producer, species, j + 1, value, steps[j], gates)?;
                ir.add_product(clone, logical[j], 1)?;
                for (k, gate) in logical.iter().enumerate() {
                    if k != j {
                        ensure_modifier(ir, clone, *gate)?;
                    }
                }
            }
        }
        for consumer in consumers {
            for j in 0..levels.len() {
                let gates = (0..levels.len())
                    .map(|k| {
                        if k <= j {
                            level_set(logical[k])
                        } else {
                            level_unset(logical[k])
                        }
                    })
                    .collect();
                let clone =
                    Self::level_clone(ir, *consumer, species, j + 1, levels[j], steps[j], gates)?;
                ir.add_reactant(clone, logical[j], 1)?;
                for (k, gate) in logical.iter().enumerate() {
                    if k != j {
                        ensure_modifier(ir, clone, *gate)?;
                    }
                }
            }
        }

        let amount = KineticLaw::sum(
            steps
                .iter()
                .zip(&logical)
                .map(|(step, s)| KineticLaw::mul(KineticLaw::real(*step), KineticLaw::species(*s))),
        );
        for reaction in others {
            let was_modifier = ir.has_edge(reaction, species, EdgeKind::Modifier);
            ir.reaction_mut(reaction)?
                .law_mut()
                .replace_species_with_law(species, &amount);
            if was_modifier {
                for s in &logical {
                    ensure_modifier(ir, reaction, *s)?;
                }
            }
        }

        for reaction in producers.iter().chain(consumers) {
            ir.remove_reaction(*reaction)?;
        }
        // Drops the edges the clones inherited from the originals.
        ir.remove_species(species)?;
        Ok(())
    }
}

impl AbstractionMethod for NaryOrderUnaryTransformer {
    fn id(&self) -> &'static str {
        "nary-order-unary-transformer"
    }

    fn apply(&self, ir: &mut Ir, options: &ReductionOptions) -> anyhow::Result<bool> {
        let mut changed = false;
        for species in ir.species_ids() {
            let Some(candidate) = Self::find_candidate(ir, species, options) else {
                continue;
            };
            let name = ir.species_node(species)?.name().to_string();
            info!(
                "splitting `{}` into {} levels {:?}",
                name,
                candidate.levels.len(),
                candidate.levels
            );
            Self::transform(ir, &candidate)
                .with_context(|| format!("while splitting `{}` into levels", name))?;
            changed = true;
        }
        Ok(changed)
    }

    fn run_once(&self) -> bool {
        true
    }
}

// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Folds the sequestration of a repressor by an inducer, `n I + Rep <-> B`, into the
//! reactions the repressor regulates: there the repressor is replaced by its free
//! fraction `Rep / (1 + K I^n)` with `K = kf / kr`.

use crate::abstraction_pipeline::AbstractionMethod;
use crate::law_queries::{create_rate_constant_ratio_law, ensure_modifier, only_used_by, sole_species};
use crate::options::ReductionOptions;
use anyhow::Context;
use log::{debug, info};
use reaction_ir::{EdgeKind, Ir, KineticLaw, ReactionId, SpeciesId};

pub struct InducerStructureTransformer();

#[derive(Debug, Clone, PartialEq)]
pub struct Induction {
    pub reaction: ReactionId,
    pub inducer: SpeciesId,
    pub repressor: SpeciesId,
    pub bound: SpeciesId,
    pub inducer_stoichiometry: u32,
    /// Reactions other than the induction that use the repressor as a modifier.
    pub regulated: Vec<ReactionId>,
    pub equilibrium: KineticLaw,
}

impl InducerStructureTransformer {
    pub fn new() -> Box<Self> {
        Box::new(Self())
    }

    fn regulated_by(ir: &Ir, repressor: SpeciesId, induction: ReactionId) -> Vec<ReactionId> {
        ir.species_edges(repressor, EdgeKind::Modifier)
            .map(|e| e.reaction)
            .filter(|r| *r != induction)
            .collect()
    }

    pub fn find_induction(ir: &Ir, reaction: ReactionId) -> Option<Induction> {
        let r = ir.get_reaction(reaction)?;
        if !r.is_reversible() || ir.modifier_edges(reaction).next().is_some() {
            return None;
        }
        let reactants = ir.reaction_species(reaction, EdgeKind::Reactant);
        let [first, second] = reactants.as_slice() else {
            return None;
        };
        let (bound, 1) = sole_species(ir, reaction, EdgeKind::Product)? else {
            return None;
        };
        if first.0 == second.0 || bound == first.0 || bound == second.0 {
            return None;
        }
        let as_repressor = |(repressor, n): (SpeciesId, u32)| {
            let regulated = Self::regulated_by(ir, repressor, reaction);
            (n == 1 && !regulated.is_empty()).then_some((repressor, regulated))
        };
        let ((repressor, regulated), (inducer, inducer_stoichiometry)) =
            match (as_repressor(*first), as_repressor(*second)) {
                (Some(rep), None) => (rep, *second),
                (None, Some(rep)) => (rep, *first),
                _ => return None,
            };
        if ir.get_species(bound)?.is_kept() || !only_used_by(ir, bound, &[reaction]) {
            debug!("bound inducer {} is used outside {}", bound, reaction);
            return None;
        }
        let equilibrium = create_rate_constant_ratio_law(ir, reaction)?;
        Some(Induction {
            reaction,
            inducer,
            repressor,
            bound,
            inducer_stoichiometry,
            regulated,
            equilibrium,
        })
    }

    /// `Rep` stands for the total repressor afterwards. Every law that reads `Rep`,
    /// including those of reactions producing or consuming it, sees the free fraction.
    pub fn transform(ir: &mut Ir, induction: &Induction) -> anyhow::Result<()> {
        let free_repressor = KineticLaw::div(
            KineticLaw::species(induction.repressor),
            KineticLaw::add(
                KineticLaw::int(1),
                KineticLaw::mul(
                    induction.equilibrium.clone(),
                    KineticLaw::power_of(
                        KineticLaw::species(induction.inducer),
                        induction.inducer_stoichiometry,
                    ),
                ),
            ),
        );
        for reaction in ir.reactions_referencing(induction.repressor) {
            if reaction == induction.reaction {
                continue;
            }
            ir.reaction_mut(reaction)?
                .law_mut()
                .replace_species_with_law(induction.repressor, &free_repressor);
            ensure_modifier(ir, reaction, induction.inducer)?;
        }
        let total = ir.initial_amount(induction.repressor)? + ir.initial_amount(induction.bound)?;
        ir.set_initial_amount(induction.repressor, total)?;
        ir.remove_reaction(induction.reaction)?;
        ir.remove_species(induction.bound)?;
        Ok(())
    }
}

impl AbstractionMethod for InducerStructureTransformer {
    fn id(&self) -> &'static str {
        "inducer-structure-transformer"
    }

    fn apply(&self, ir: &mut Ir, _options: &ReductionOptions) -> anyhow::Result<bool> {
        let mut changed = false;
        for reaction in ir.reaction_ids() {
            let Some(induction) = Self::find_induction(ir, reaction) else {
                continue;
            };
            let name = ir.reaction(reaction)?.name().to_string();
            info!(
                "folding induction `{}` into {} regulated reaction(s)",
                name,
                induction.regulated.len()
            );
            Self::transform(ir, &induction)
                .with_context(|| format!("while folding induction `{}`", name))?;
            changed = true;
        }
        Ok(changed)
    }
}

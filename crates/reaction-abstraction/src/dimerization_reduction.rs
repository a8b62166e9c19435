// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Eliminates fast reversible dimerizations `2M <-> D`.
//!
//! After the rewrite `M` denotes the total monomer `Mt = M + 2D`. Laws elsewhere in the
//! network see the quasi-steady-state free monomer and dimer instead:
//!
//! ```text
//! Mf = (sqrt(1 + 8 K Mt) - 1) / (4 K)
//! D  = K Mf^2
//! ```
//!
//! with `K = kf / kr` the equilibrium constant of the dimerization.

use crate::abstraction_pipeline::AbstractionMethod;
use crate::law_queries::create_rate_constant_ratio_law;
use crate::options::ReductionOptions;
use anyhow::Context;
use log::{debug, info};
use reaction_ir::{EdgeKind, Ir, IrResult, KineticLaw, ReactionId, SpeciesId};
use std::collections::BTreeMap;

pub struct DimerizationReduction();

/// A dimerization that passed all checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimerization {
    pub reaction: ReactionId,
    pub monomer: SpeciesId,
    pub dimer: SpeciesId,
    /// `kf / kr`
    pub equilibrium: KineticLaw,
}

impl DimerizationReduction {
    pub fn new() -> Box<Self> {
        Box::new(Self())
    }

    pub fn find_dimerization(ir: &Ir, reaction: ReactionId) -> Option<Dimerization> {
        let r = ir.get_reaction(reaction)?;
        if !r.is_reversible() || ir.modifier_edges(reaction).next().is_some() {
            return None;
        }
        let (monomer, dimer) = match (
            ir.reaction_species(reaction, EdgeKind::Reactant).as_slice(),
            ir.reaction_species(reaction, EdgeKind::Product).as_slice(),
        ) {
            ([(m, 2)], [(d, 1)]) if m != d => (*m, *d),
            _ => return None,
        };
        if ir.get_species(dimer)?.is_kept() {
            debug!("dimer `{}` is kept", ir.get_species(dimer)?.name());
            return None;
        }
        let equilibrium = create_rate_constant_ratio_law(ir, reaction)?;
        Some(Dimerization {
            reaction,
            monomer,
            dimer,
            equilibrium,
        })
    }

    /// `(sqrt(1 + 8 K Mt) - 1) / (4 K)` with `Mt` the monomer leaf.
    fn free_monomer_law(monomer: SpeciesId, equilibrium: &KineticLaw) -> KineticLaw {
        let root = KineticLaw::call(
            "sqrt",
            vec![KineticLaw::add(
                KineticLaw::int(1),
                KineticLaw::product(vec![
                    KineticLaw::int(8),
                    equilibrium.clone(),
                    KineticLaw::species(monomer),
                ]),
            )],
        );
        KineticLaw::div(
            KineticLaw::sub(root, KineticLaw::int(1)),
            KineticLaw::mul(KineticLaw::int(4), equilibrium.clone()),
        )
    }

    /// Moves every edge of `dimer` to `monomer`, doubling the stoichiometry. An edge of
    /// the same kind that already joins the reaction to `monomer` absorbs it.
    fn rewire_dimer_edges(ir: &mut Ir, dimer: SpeciesId, monomer: SpeciesId) -> IrResult<()> {
        for edge in ir.species_edge_snapshot(dimer) {
            ir.remove_edge(edge.id)?;
            if edge.kind == EdgeKind::Modifier {
                if !ir.has_edge(edge.reaction, monomer, EdgeKind::Modifier) {
                    ir.add_modifier(edge.reaction, monomer)?;
                }
                continue;
            }
            let mut stoichiometry = 2 * edge.stoichiometry;
            let existing = ir
                .edges_of_reaction(edge.reaction, edge.kind)
                .find(|e| e.species == monomer)
                .copied();
            if let Some(existing) = existing {
                ir.remove_edge(existing.id)?;
                stoichiometry += existing.stoichiometry;
            }
            ir.add_edge(edge.kind, edge.reaction, monomer, stoichiometry)?;
        }
        Ok(())
    }

    pub fn transform(ir: &mut Ir, candidate: &Dimerization) -> anyhow::Result<()> {
        let Dimerization {
            reaction,
            monomer,
            dimer,
            equilibrium,
        } = candidate;
        let total = ir.initial_amount(*monomer)? + 2.0 * ir.initial_amount(*dimer)?;
        ir.set_initial_amount(*monomer, total)?;
        ir.remove_reaction(*reaction)?;
        Self::rewire_dimer_edges(ir, *dimer, *monomer)?;

        let free_monomer = Self::free_monomer_law(*monomer, equilibrium);
        let free_dimer = KineticLaw::mul(
            equilibrium.clone(),
            KineticLaw::pow(free_monomer.clone(), KineticLaw::int(2)),
        );
        let substitution = BTreeMap::from([(*monomer, free_monomer), (*dimer, free_dimer)]);
        for id in ir.reaction_ids() {
            ir.reaction_mut(id)?.law_mut().substitute_species(&substitution);
        }
        ir.remove_species(*dimer)?;
        Ok(())
    }
}

impl AbstractionMethod for DimerizationReduction {
    fn id(&self) -> &'static str {
        "dimerization-reduction"
    }

    fn apply(&self, ir: &mut Ir, _options: &ReductionOptions) -> anyhow::Result<bool> {
        let mut changed = false;
        for reaction in ir.reaction_ids() {
            let Some(candidate) = Self::find_dimerization(ir, reaction) else {
                continue;
            };
            let name = ir.reaction(reaction)?.name().to_string();
            info!("reducing dimerization `{}`", name);
            Self::transform(ir, &candidate)
                .with_context(|| format!("while reducing dimerization `{}`", name))?;
            changed = true;
        }
        Ok(changed)
    }
}

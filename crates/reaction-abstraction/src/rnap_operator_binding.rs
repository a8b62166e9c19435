// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use crate::abstraction_pipeline::AbstractionMethod;
use crate::options::ReductionOptions;
use crate::site_binding::{eliminate_operator_site, find_operator_site, OperatorSite};
use anyhow::Context;
use log::{debug, info};
use reaction_ir::{EdgeKind, Ir, SpeciesId};
use std::collections::BTreeSet;

/// Eliminates operator sites bound by an abundant RNA polymerase. The polymerase itself
/// stays in the network; only the sites it binds are replaced by their occupancy.
pub struct RnapOperatorBindingRemover();

impl RnapOperatorBindingRemover {
    pub fn new() -> Box<Self> {
        Box::new(Self())
    }

    /// Species bound to `rnap` in some reversible reaction.
    fn bound_sites(ir: &Ir, rnap: SpeciesId) -> BTreeSet<SpeciesId> {
        ir.species_edges(rnap, EdgeKind::Reactant)
            .map(|e| e.reaction)
            .filter(|r| ir.get_reaction(*r).map_or(false, |r| r.is_reversible()))
            .flat_map(|r| ir.reaction_species(r, EdgeKind::Reactant))
            .map(|(s, _)| s)
            .filter(|s| *s != rnap)
            .collect()
    }

    /// Every site bound by `rnap` that can be eliminated, if `rnap` is abundant enough.
    pub fn find_candidate(
        ir: &Ir,
        rnap: SpeciesId,
        options: &ReductionOptions,
    ) -> Option<Vec<OperatorSite>> {
        let amount = ir.species_amount(rnap).ok()?;
        if amount < options.rnap_min_concentration_threshold {
            return None;
        }
        let sites: Vec<OperatorSite> = Self::bound_sites(ir, rnap)
            .into_iter()
            .filter_map(|o| {
                find_operator_site(ir, o, options.operator_max_concentration_threshold)
            })
            .filter(|site| site.is_bound_by(rnap))
            .collect();
        if sites.is_empty() {
            debug!("no removable site is bound by {}", rnap);
            return None;
        }
        Some(sites)
    }
}

impl AbstractionMethod for RnapOperatorBindingRemover {
    fn id(&self) -> &'static str {
        "rnap-operator-binding-remover"
    }

    fn apply(&self, ir: &mut Ir, options: &ReductionOptions) -> anyhow::Result<bool> {
        let mut changed = false;
        for rnap in ir.species_ids() {
            if !ir.has_species(rnap) {
                continue;
            }
            let Some(sites) = Self::find_candidate(ir, rnap, options) else {
                continue;
            };
            let rnap_name = ir.species_node(rnap)?.name().to_string();
            for site in sites {
                // An earlier elimination may have invalidated this site.
                let Some(site) = find_operator_site(
                    ir,
                    site.operator,
                    options.operator_max_concentration_threshold,
                ) else {
                    continue;
                };
                let name = ir.species_node(site.operator)?.name().to_string();
                info!("removing site `{}` bound by RNAP `{}`", name, rnap_name);
                eliminate_operator_site(ir, &site).with_context(|| {
                    format!("while removing site `{}` bound by `{}`", name, rnap_name)
                })?;
                changed = true;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reaction_ir::{InitialQuantity, KineticLaw, ReactionId};

    /// `Pro + RNAP <-> S`, transcription `0 -> mRNA` modified by `S`.
    fn promoter(rnap_amount: f64) -> (Ir, SpeciesId, SpeciesId, ReactionId) {
        let mut ir = Ir::new();
        let rnap = ir.add_species("RNAP", InitialQuantity::Amount(rnap_amount));
        let promoter = ir.add_species("Pro", InitialQuantity::Amount(1.0));
        let open = ir.add_species("S", InitialQuantity::Amount(0.0));
        let mrna = ir.add_species("mRNA", InitialQuantity::Amount(0.0));
        let kf = ir.add_symbol("kf", 1.0, true).unwrap();
        let kr = ir.add_symbol("kr", 100.0, true).unwrap();
        let ktx = ir.add_symbol("ktx", 0.5, true).unwrap();
        let binding = ir.add_reaction(
            "recruit",
            KineticLaw::sub(
                KineticLaw::product(vec![
                    KineticLaw::symbol(kf),
                    KineticLaw::species(promoter),
                    KineticLaw::species(rnap),
                ]),
                KineticLaw::mul(KineticLaw::symbol(kr), KineticLaw::species(open)),
            ),
            true,
            false,
        );
        ir.add_reactant(binding, promoter, 1).unwrap();
        ir.add_reactant(binding, rnap, 1).unwrap();
        ir.add_product(binding, open, 1).unwrap();
        let transcribe = ir.add_reaction(
            "transcribe",
            KineticLaw::mul(KineticLaw::symbol(ktx), KineticLaw::species(open)),
            false,
            false,
        );
        ir.add_modifier(transcribe, open).unwrap();
        ir.add_product(transcribe, mrna, 1).unwrap();
        (ir, rnap, promoter, transcribe)
    }

    #[test]
    fn test_removes_site_bound_by_abundant_rnap() {
        let (mut ir, rnap, promoter, transcribe) = promoter(200.0);
        assert!(RnapOperatorBindingRemover::new()
            .apply(&mut ir, &ReductionOptions::default())
            .unwrap());
        assert!(ir.has_species(rnap));
        assert!(!ir.has_species(promoter));
        assert!(ir.find_species_by_name("S").is_none());
        assert!(ir.has_edge(transcribe, rnap, EdgeKind::Modifier));
        let law = ir.reaction(transcribe).unwrap().law().clone();
        insta::assert_snapshot!(
            law.display(&ir),
            @"ktx * (Pro_total * (kf / kr * RNAP) / (1 + kf / kr * RNAP))"
        );
    }

    #[test]
    fn test_scarce_rnap_is_not_a_candidate() {
        let (ir, rnap, _, _) = promoter(10.0);
        assert_eq!(
            RnapOperatorBindingRemover::find_candidate(&ir, rnap, &ReductionOptions::default()),
            None
        );
    }
}

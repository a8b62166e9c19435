// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Fractional-occupancy elimination of low-copy binding sites, shared by the operator
//! and RNAP methods.
//!
//! A site `O` bound reversibly into complexes `C_i = O + X_i` is replaced by the
//! equilibrium occupancy of a conserved total `O_t`:
//!
//! ```text
//! O   = O_t / (1 + sum_j K_j X_j)
//! C_i = O_t K_i X_i / (1 + sum_j K_j X_j)
//! ```
//!
//! where `K_i X_i` is the mass-action ratio of binding `i` without the site itself.

use crate::law_queries::{
    create_mass_action_ratio_law, create_total_concentration_law, ensure_modifier,
    reaction_signature, reactions_touching, ReactionSignature,
};
use anyhow::Context;
use log::{debug, info};
use reaction_ir::{EdgeKind, Ir, KineticLaw, ReactionId, SpeciesId};
use std::collections::{BTreeMap, BTreeSet};

/// One reversible binding `O + X <-> C`.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteBinding {
    pub reaction: ReactionId,
    pub complex: SpeciesId,
    pub partners: Vec<(SpeciesId, u32)>,
    /// `kf / kr * X`
    pub ratio: KineticLaw,
}

/// A site whose every use is either one of its bindings or a modifier-like use.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorSite {
    pub operator: SpeciesId,
    pub bindings: Vec<SiteBinding>,
    /// Reactions that use the site or one of its complexes without changing it.
    pub consumers: BTreeSet<ReactionId>,
    pub total: f64,
}

impl OperatorSite {
    pub fn is_bound_by(&self, species: SpeciesId) -> bool {
        self.bindings
            .iter()
            .any(|b| b.partners.iter().any(|(s, _)| *s == species))
    }

    fn partners(&self) -> BTreeSet<SpeciesId> {
        self.bindings
            .iter()
            .flat_map(|b| b.partners.iter().map(|(s, _)| *s))
            .collect()
    }
}

fn find_site_binding(ir: &Ir, operator: SpeciesId, reaction: ReactionId) -> Option<SiteBinding> {
    let r = ir.get_reaction(reaction)?;
    if !r.is_reversible() || ir.modifier_edges(reaction).next().is_some() {
        return None;
    }
    let reactants = ir.reaction_species(reaction, EdgeKind::Reactant);
    if reactants.iter().filter(|(s, _)| *s == operator).count() != 1
        || !reactants.contains(&(operator, 1))
    {
        return None;
    }
    let partners: Vec<(SpeciesId, u32)> = reactants
        .into_iter()
        .filter(|(s, _)| *s != operator)
        .collect();
    let products = ir.reaction_species(reaction, EdgeKind::Product);
    let [(complex, 1)] = products.as_slice() else {
        return None;
    };
    let complex = *complex;
    if partners.is_empty()
        || complex == operator
        || partners.iter().any(|(s, _)| *s == complex)
        || ir.get_species(complex)?.is_kept()
    {
        return None;
    }
    let ratio = create_mass_action_ratio_law(ir, reaction, operator)?;
    Some(SiteBinding {
        reaction,
        complex,
        partners,
        ratio,
    })
}

/// Whether `species` is left unchanged by `reaction`: it only appears as a modifier,
/// in the law, or as a reactant and a product with equal stoichiometry.
fn leaves_unchanged(ir: &Ir, reaction: ReactionId, species: SpeciesId) -> bool {
    let count = |kind: EdgeKind| -> u32 {
        ir.edges_of_reaction(reaction, kind)
            .filter(|e| e.species == species)
            .map(|e| e.stoichiometry)
            .sum()
    };
    count(EdgeKind::Reactant) == count(EdgeKind::Product)
}

/// Checks every condition for eliminating `operator`: it is not kept, it has at least
/// one binding, every other use of it or of its complexes is modifier-like, and its
/// total amount is at most `max_total`.
pub fn find_operator_site(ir: &Ir, operator: SpeciesId, max_total: f64) -> Option<OperatorSite> {
    if ir.get_species(operator)?.is_kept() {
        return None;
    }
    let mut bindings = Vec::new();
    let mut consumers = BTreeSet::new();
    for reaction in reactions_touching(ir, operator) {
        if let Some(binding) = find_site_binding(ir, operator, reaction) {
            bindings.push(binding);
        } else if leaves_unchanged(ir, reaction, operator) {
            consumers.insert(reaction);
        } else {
            return None;
        }
    }
    if bindings.is_empty() {
        return None;
    }
    let complexes: BTreeSet<SpeciesId> = bindings.iter().map(|b| b.complex).collect();
    if complexes.len() != bindings.len() {
        return None;
    }
    for binding in &bindings {
        if binding
            .partners
            .iter()
            .any(|(s, _)| complexes.contains(s))
        {
            return None;
        }
        for reaction in reactions_touching(ir, binding.complex) {
            if reaction == binding.reaction {
                continue;
            }
            if !leaves_unchanged(ir, reaction, binding.complex)
                || bindings.iter().any(|b| b.reaction == reaction)
            {
                debug!(
                    "complex {} is changed by {}, keeping site {}",
                    binding.complex, reaction, operator
                );
                return None;
            }
            consumers.insert(reaction);
        }
    }
    let mut total = ir.initial_amount(operator).ok()?;
    for complex in &complexes {
        total += ir.initial_amount(*complex).ok()?;
    }
    if total > max_total {
        debug!(
            "site {} has total {} above the threshold {}",
            operator, total, max_total
        );
        return None;
    }
    Some(OperatorSite {
        operator,
        bindings,
        consumers,
        total,
    })
}

/// Replaces the site and its complexes by their occupancy expressions, removes the
/// bindings and merges consumers that now move the same molecules.
pub fn eliminate_operator_site(ir: &mut Ir, site: &OperatorSite) -> anyhow::Result<()> {
    let name = ir.species_node(site.operator)?.name().to_string();
    let mut pooled = vec![site.operator];
    pooled.extend(site.bindings.iter().map(|b| b.complex));
    let total = create_total_concentration_law(ir, &format!("{}_total", name), &pooled)
        .with_context(|| format!("creating the total amount of site `{}`", name))?;
    let denominator = KineticLaw::sum(
        std::iter::once(KineticLaw::int(1)).chain(site.bindings.iter().map(|b| b.ratio.clone())),
    );
    let mut substitution = BTreeMap::new();
    substitution.insert(
        site.operator,
        KineticLaw::div(total.clone(), denominator.clone()),
    );
    for binding in &site.bindings {
        substitution.insert(
            binding.complex,
            KineticLaw::div(
                KineticLaw::mul(total.clone(), binding.ratio.clone()),
                denominator.clone(),
            ),
        );
    }

    for binding in &site.bindings {
        ir.remove_reaction(binding.reaction)?;
    }
    let partners = site.partners();
    for consumer in &site.consumers {
        for partner in &partners {
            let moved = ir.has_edge(*consumer, *partner, EdgeKind::Reactant)
                || ir.has_edge(*consumer, *partner, EdgeKind::Product);
            if !moved {
                ensure_modifier(ir, *consumer, *partner)?;
            }
        }
    }
    for reaction in ir.reaction_ids() {
        ir.reaction_mut(reaction)?
            .law_mut()
            .substitute_species(&substitution);
    }
    for species in pooled {
        ir.remove_species(species)?;
    }
    let consumers: Vec<ReactionId> = site.consumers.iter().copied().collect();
    let merged = merge_equivalent_reactions(ir, &consumers)?;
    info!(
        "eliminated site `{}` with {} binding(s), merged {} consumer(s)",
        name,
        site.bindings.len(),
        merged
    );
    Ok(())
}

/// Merges reactions with equal reactant and product multisets, reversibility and time
/// scale: the first of each group keeps the sum of the laws and the union of the
/// modifiers. Returns the number of removed reactions.
pub fn merge_equivalent_reactions(ir: &mut Ir, reactions: &[ReactionId]) -> anyhow::Result<usize> {
    let mut groups: BTreeMap<ReactionSignature, Vec<ReactionId>> = BTreeMap::new();
    for reaction in reactions {
        if ir.has_reaction(*reaction) {
            groups
                .entry(reaction_signature(ir, *reaction)?)
                .or_default()
                .push(*reaction);
        }
    }
    let mut removed = 0;
    for group in groups.into_values() {
        let Some((keep, rest)) = group.split_first() else {
            continue;
        };
        for other in rest {
            let modifiers = ir.reaction_species(*other, EdgeKind::Modifier);
            let law = ir.remove_reaction(*other)?.law().clone();
            let kept = ir.reaction_mut(*keep)?;
            let combined = KineticLaw::add(kept.law().clone(), law);
            kept.set_law(combined);
            for (species, _) in modifiers {
                ensure_modifier(ir, *keep, species)?;
            }
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reaction_ir::InitialQuantity;

    struct Promoter {
        ir: Ir,
        operator: SpeciesId,
        factor: SpeciesId,
        complex: SpeciesId,
        protein: SpeciesId,
        binding: ReactionId,
        basal: ReactionId,
        activated: ReactionId,
    }

    /// `O + TF <-> C`, basal expression `0 -> P` modified by `O`, activated expression
    /// `0 -> P` modified by `C`.
    fn promoter(operator_amount: f64) -> Promoter {
        let mut ir = Ir::new();
        let operator = ir.add_species("O", InitialQuantity::Amount(operator_amount));
        let factor = ir.add_species("TF", InitialQuantity::Amount(50.0));
        let complex = ir.add_species("C", InitialQuantity::Amount(0.0));
        let protein = ir.add_species("P", InitialQuantity::Amount(0.0));
        let kf = ir.add_symbol("kf", 1.0, true).unwrap();
        let kr = ir.add_symbol("kr", 10.0, true).unwrap();
        let kb = ir.add_symbol("kb", 0.01, true).unwrap();
        let ka = ir.add_symbol("ka", 1.0, true).unwrap();
        let binding = ir.add_reaction(
            "bind",
            KineticLaw::sub(
                KineticLaw::product(vec![
                    KineticLaw::symbol(kf),
                    KineticLaw::species(operator),
                    KineticLaw::species(factor),
                ]),
                KineticLaw::mul(KineticLaw::symbol(kr), KineticLaw::species(complex)),
            ),
            true,
            false,
        );
        ir.add_reactant(binding, operator, 1).unwrap();
        ir.add_reactant(binding, factor, 1).unwrap();
        ir.add_product(binding, complex, 1).unwrap();
        let basal = ir.add_reaction(
            "basal",
            KineticLaw::mul(KineticLaw::symbol(kb), KineticLaw::species(operator)),
            false,
            false,
        );
        ir.add_modifier(basal, operator).unwrap();
        ir.add_product(basal, protein, 1).unwrap();
        let activated = ir.add_reaction(
            "activated",
            KineticLaw::mul(KineticLaw::symbol(ka), KineticLaw::species(complex)),
            false,
            false,
        );
        ir.add_modifier(activated, complex).unwrap();
        ir.add_product(activated, protein, 1).unwrap();
        Promoter {
            ir,
            operator,
            factor,
            complex,
            protein,
            binding,
            basal,
            activated,
        }
    }

    #[test]
    fn test_find_site() {
        let p = promoter(1.0);
        let site = find_operator_site(&p.ir, p.operator, 2.0).unwrap();
        assert_eq!(site.bindings.len(), 1);
        assert_eq!(site.bindings[0].complex, p.complex);
        assert_eq!(site.bindings[0].partners, vec![(p.factor, 1)]);
        assert_eq!(
            site.consumers,
            BTreeSet::from([p.basal, p.activated])
        );
        assert!(site.is_bound_by(p.factor));
        assert_eq!(site.total, 1.0);
    }

    #[test]
    fn test_site_above_threshold() {
        let p = promoter(5.0);
        assert_eq!(find_operator_site(&p.ir, p.operator, 2.0), None);
    }

    #[test]
    fn test_consumed_complex_blocks_site() {
        let mut p = promoter(1.0);
        let decay = p.ir.add_reaction("decay", KineticLaw::species(p.complex), false, false);
        p.ir.add_reactant(decay, p.complex, 1).unwrap();
        assert_eq!(find_operator_site(&p.ir, p.operator, 2.0), None);
    }

    #[test]
    fn test_eliminate_and_merge() {
        let mut p = promoter(1.0);
        let site = find_operator_site(&p.ir, p.operator, 2.0).unwrap();
        eliminate_operator_site(&mut p.ir, &site).unwrap();
        assert!(!p.ir.has_species(p.operator));
        assert!(!p.ir.has_species(p.complex));
        assert!(!p.ir.has_reaction(p.binding));
        assert_eq!(p.ir.reaction_count(), 1);
        let survivor = p.ir.reaction_ids()[0];
        assert_eq!(survivor, p.basal);
        assert_eq!(
            p.ir.reaction_species(survivor, EdgeKind::Product),
            vec![(p.protein, 1)]
        );
        assert_eq!(
            p.ir.reaction_species(survivor, EdgeKind::Modifier),
            vec![(p.factor, 1)]
        );
        let law = p.ir.reaction(survivor).unwrap().law().clone();
        insta::assert_snapshot!(
            law.display(&p.ir),
            @"kb * (O_total / (1 + kf / kr * TF)) + ka * (O_total * (kf / kr * TF) / (1 + kf / kr * TF))"
        );
        p.ir.validate_for_handoff().unwrap();
    }

    #[test]
    fn test_merge_keeps_distinct_signatures() {
        let mut ir = Ir::new();
        let a = ir.add_species("A", InitialQuantity::Amount(0.0));
        let b = ir.add_species("B", InitialQuantity::Amount(0.0));
        let r1 = ir.add_reaction("r1", KineticLaw::real(1.0), false, false);
        ir.add_product(r1, a, 1).unwrap();
        let r2 = ir.add_reaction("r2", KineticLaw::real(2.0), false, false);
        ir.add_product(r2, b, 1).unwrap();
        let r3 = ir.add_reaction("r3", KineticLaw::real(3.0), false, false);
        ir.add_product(r3, a, 1).unwrap();
        ir.add_modifier(r3, b).unwrap();
        assert_eq!(merge_equivalent_reactions(&mut ir, &[r1, r2, r3]).unwrap(), 1);
        assert!(!ir.has_reaction(r3));
        assert_eq!(
            ir.reaction(r1).unwrap().law(),
            &KineticLaw::add(KineticLaw::real(1.0), KineticLaw::real(3.0))
        );
        assert!(ir.has_edge(r1, b, EdgeKind::Modifier));
    }

    #[test]
    fn test_merge_keeps_fast_and_slow_apart() {
        let mut ir = Ir::new();
        let a = ir.add_species("A", InitialQuantity::Amount(0.0));
        let slow = ir.add_reaction("slow", KineticLaw::real(1.0), false, false);
        ir.add_product(slow, a, 1).unwrap();
        let fast = ir.add_reaction("fast", KineticLaw::real(2.0), false, true);
        ir.add_product(fast, a, 1).unwrap();
        assert_eq!(merge_equivalent_reactions(&mut ir, &[slow, fast]).unwrap(), 0);
        assert_eq!(ir.reaction(slow).unwrap().law(), &KineticLaw::real(1.0));
        assert!(ir.reaction(fast).unwrap().is_fast());
    }
}

// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Enzymatic reductions of the binding pair
//!
//! ```text
//! E + S <-> C      kf * E * S - kr * C
//! C -> E + P       kcat * C
//! ```
//!
//! into a single irreversible reaction `S -> P` with `E` as a modifier. Three variants
//! exist: the single-substrate rapid equilibrium, the competitive multi-substrate rapid
//! equilibrium and the pseudo-steady-state (total enzyme) approximation.

use crate::abstraction_pipeline::AbstractionMethod;
use crate::law_evaluator::KineticLawEvaluater;
use crate::law_queries::{
    ensure_modifier, find_rate_constant, match_mass_action, only_used_by, reactions_touching,
    sole_species, MassAction, RateDirection,
};
use crate::options::ReductionOptions;
use anyhow::Context;
use log::{debug, info};
use reaction_ir::{EdgeKind, Ir, KineticLaw, ReactionId, SpeciesId};
use std::collections::BTreeSet;

/// A binding reaction together with the catalytic release of its complex.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingPair {
    pub binding: ReactionId,
    pub release: ReactionId,
    pub enzyme: SpeciesId,
    pub substrate: SpeciesId,
    pub complex: SpeciesId,
    pub kf: KineticLaw,
    pub kr: KineticLaw,
    pub kcat: KineticLaw,
}

impl BindingPair {
    /// `kr / kf`
    pub fn dissociation_constant(&self) -> KineticLaw {
        KineticLaw::div(self.kr.clone(), self.kf.clone())
    }

    /// `(kr + kcat) / kf`
    pub fn michaelis_constant(&self) -> KineticLaw {
        KineticLaw::div(
            KineticLaw::add(self.kr.clone(), self.kcat.clone()),
            self.kf.clone(),
        )
    }

    /// Numeric value of `kr / kcat`, the rapid-equilibrium criterion.
    fn equilibrium_ratio(&self, ir: &Ir) -> Option<f64> {
        let ratio = KineticLaw::div(self.kr.clone(), self.kcat.clone());
        KineticLawEvaluater::new(ir).evaluate_finite(&ratio).ok()
    }

    fn reactions(&self) -> [ReactionId; 2] {
        [self.binding, self.release]
    }
}

/// Matches a binding pair starting from its binding reaction.
///
/// The binding must be a reversible mass-action reaction of two distinct species into a
/// single complex, without modifiers. The complex must not be kept and must be consumed
/// by exactly one irreversible reaction `kcat * C`, which gives back exactly one of the
/// two bound species: that one is the enzyme.
pub fn find_binding_pair(ir: &Ir, binding: ReactionId) -> Option<BindingPair> {
    let r = ir.get_reaction(binding)?;
    if !r.is_reversible() || ir.modifier_edges(binding).next().is_some() {
        return None;
    }
    let reactants = ir.reaction_species(binding, EdgeKind::Reactant);
    let [(a, 1), (b, 1)] = reactants.as_slice() else {
        return None;
    };
    let Some((complex, 1)) = sole_species(ir, binding, EdgeKind::Product) else {
        return None;
    };
    if a == b || complex == *a || complex == *b || ir.get_species(complex)?.is_kept() {
        return None;
    }
    let MassAction {
        forward: kf,
        backward: Some(kr),
    } = match_mass_action(ir, binding)?
    else {
        return None;
    };

    let consumers: Vec<ReactionId> = ir
        .species_edges(complex, EdgeKind::Reactant)
        .map(|e| e.reaction)
        .filter(|r| *r != binding)
        .collect();
    let [release] = consumers.as_slice() else {
        return None;
    };
    let release = *release;
    if !only_used_by(ir, complex, &[binding, release]) {
        return None;
    }
    let r = ir.get_reaction(release)?;
    if r.is_reversible()
        || ir.modifier_edges(release).next().is_some()
        || sole_species(ir, release, EdgeKind::Reactant) != Some((complex, 1))
    {
        return None;
    }
    let returned = |s: SpeciesId| {
        ir.product_edges(release)
            .any(|e| e.species == s && e.stoichiometry == 1)
    };
    let (enzyme, substrate) = match (returned(*a), returned(*b)) {
        (true, false) => (*a, *b),
        (false, true) => (*b, *a),
        _ => return None,
    };
    let kcat = find_rate_constant(ir, release, RateDirection::Forward)?;
    Some(BindingPair {
        binding,
        release,
        enzyme,
        substrate,
        complex,
        kf,
        kr,
        kcat,
    })
}

/// Turns the release reaction of `pair` into `S -> P` with modifier `E` and the given
/// law, then removes the binding reaction and the complex. Returns the initial amount of
/// the removed complex.
fn collapse_pair(
    ir: &mut Ir,
    pair: &BindingPair,
    law: KineticLaw,
    extra_modifiers: &[SpeciesId],
) -> anyhow::Result<f64> {
    let complex_amount = ir.initial_amount(pair.complex)?;
    ir.remove_edge_of_kind(pair.release, pair.complex, EdgeKind::Reactant)?;
    ir.remove_edge_of_kind(pair.release, pair.enzyme, EdgeKind::Product)?;
    ir.add_reactant(pair.release, pair.substrate, 1)?;
    ensure_modifier(ir, pair.release, pair.enzyme)?;
    for species in extra_modifiers {
        if *species != pair.substrate {
            ensure_modifier(ir, pair.release, *species)?;
        }
    }
    ir.reaction_mut(pair.release)?.set_law(law);
    ir.remove_reaction(pair.binding)?;
    ir.remove_species(pair.complex)?;
    Ok(complex_amount)
}

/// `kcat * E * S / (K + S)`
fn saturation_law(pair: &BindingPair, constant: KineticLaw) -> KineticLaw {
    KineticLaw::div(
        KineticLaw::product(vec![
            pair.kcat.clone(),
            KineticLaw::species(pair.enzyme),
            KineticLaw::species(pair.substrate),
        ]),
        KineticLaw::add(constant, KineticLaw::species(pair.substrate)),
    )
}

/// Adds the complex amounts to the enzyme, which now stands for the total enzyme.
fn absorb_complexes(ir: &mut Ir, enzyme: SpeciesId, complex_amount: f64) -> anyhow::Result<()> {
    let total = ir.initial_amount(enzyme)? + complex_amount;
    ir.set_initial_amount(enzyme, total)?;
    Ok(())
}

fn reaction_name(ir: &Ir, reaction: ReactionId) -> String {
    ir.get_reaction(reaction)
        .map(|r| r.name().to_string())
        .unwrap_or_else(|| reaction.to_string())
}

// ----------------------------------------------------------------------------
// Single-substrate rapid equilibrium

pub struct EnzymeKineticRapidEquilibrium1();

impl EnzymeKineticRapidEquilibrium1 {
    pub fn new() -> Box<Self> {
        Box::new(Self())
    }

    pub fn find_candidate(
        ir: &Ir,
        binding: ReactionId,
        options: &ReductionOptions,
    ) -> Option<BindingPair> {
        let pair = find_binding_pair(ir, binding)?;
        if !only_used_by(ir, pair.enzyme, &pair.reactions()) {
            return None;
        }
        let ratio = pair.equilibrium_ratio(ir)?;
        if ratio < options.rapid_equilibrium_condition_1 {
            debug!(
                "`{}`: kr / kcat = {} is below {}",
                reaction_name(ir, binding),
                ratio,
                options.rapid_equilibrium_condition_1
            );
            return None;
        }
        Some(pair)
    }

    pub fn transform(ir: &mut Ir, pair: &BindingPair) -> anyhow::Result<()> {
        let law = saturation_law(pair, pair.dissociation_constant());
        let complex_amount = collapse_pair(ir, pair, law, &[])?;
        absorb_complexes(ir, pair.enzyme, complex_amount)
    }
}

impl AbstractionMethod for EnzymeKineticRapidEquilibrium1 {
    fn id(&self) -> &'static str {
        "enzyme-kinetic-rapid-equilibrium-1"
    }

    fn apply(&self, ir: &mut Ir, options: &ReductionOptions) -> anyhow::Result<bool> {
        let mut changed = false;
        for binding in ir.reaction_ids() {
            let Some(pair) = Self::find_candidate(ir, binding, options) else {
                continue;
            };
            let name = reaction_name(ir, binding);
            info!("rapid equilibrium on binding `{}`", name);
            Self::transform(ir, &pair)
                .with_context(|| format!("while collapsing binding `{}`", name))?;
            changed = true;
        }
        Ok(changed)
    }
}

// ----------------------------------------------------------------------------
// Competitive multi-substrate rapid equilibrium

pub struct EnzymeKineticRapidEquilibrium2();

impl EnzymeKineticRapidEquilibrium2 {
    pub fn new() -> Box<Self> {
        Box::new(Self())
    }

    /// Every binding pair of `enzyme`, if there are at least two, all of them pass the
    /// ratio check and together they cover every reaction the enzyme takes part in.
    pub fn find_candidate(
        ir: &Ir,
        enzyme: SpeciesId,
        options: &ReductionOptions,
    ) -> Option<Vec<BindingPair>> {
        let bindings: BTreeSet<ReactionId> = ir
            .species_edges(enzyme, EdgeKind::Reactant)
            .map(|e| e.reaction)
            .collect();
        let pairs: Vec<BindingPair> = bindings
            .into_iter()
            .filter_map(|r| find_binding_pair(ir, r))
            .filter(|p| p.enzyme == enzyme)
            .collect();
        if pairs.len() < 2 {
            return None;
        }
        let covered: Vec<ReactionId> = pairs.iter().flat_map(|p| p.reactions()).collect();
        if !only_used_by(ir, enzyme, &covered) {
            debug!(
                "enzyme {} takes part in {} reactions outside its binding pairs",
                enzyme,
                reactions_touching(ir, enzyme)
                    .iter()
                    .filter(|r| !covered.contains(r))
                    .count()
            );
            return None;
        }
        let substrates: BTreeSet<SpeciesId> = pairs.iter().map(|p| p.substrate).collect();
        if substrates.len() != pairs.len() {
            return None;
        }
        for pair in &pairs {
            if pair.equilibrium_ratio(ir)? < options.rapid_equilibrium_condition_2 {
                return None;
            }
        }
        Some(pairs)
    }

    pub fn transform(ir: &mut Ir, pairs: &[BindingPair]) -> anyhow::Result<()> {
        let Some(enzyme) = pairs.first().map(|p| p.enzyme) else {
            return Ok(());
        };
        // 1 + sum_j S_j / Kd_j
        let occupancy = |p: &BindingPair| {
            KineticLaw::div(KineticLaw::species(p.substrate), p.dissociation_constant())
        };
        let denominator =
            KineticLaw::sum(std::iter::once(KineticLaw::int(1)).chain(pairs.iter().map(occupancy)));
        let substrates: Vec<SpeciesId> = pairs.iter().map(|p| p.substrate).collect();
        let mut complex_amount = 0.0;
        for pair in pairs {
            let law = KineticLaw::div(
                KineticLaw::product(vec![
                    pair.kcat.clone(),
                    KineticLaw::species(enzyme),
                    occupancy(pair),
                ]),
                denominator.clone(),
            );
            complex_amount += collapse_pair(ir, pair, law, &substrates)
                .with_context(|| format!("while collapsing binding of {}", pair.substrate))?;
        }
        absorb_complexes(ir, enzyme, complex_amount)
    }
}

impl AbstractionMethod for EnzymeKineticRapidEquilibrium2 {
    fn id(&self) -> &'static str {
        "enzyme-kinetic-rapid-equilibrium-2"
    }

    fn apply(&self, ir: &mut Ir, options: &ReductionOptions) -> anyhow::Result<bool> {
        let mut changed = false;
        for enzyme in ir.species_ids() {
            if !ir.has_species(enzyme) {
                continue;
            }
            let Some(pairs) = Self::find_candidate(ir, enzyme, options) else {
                continue;
            };
            let name = ir.species_node(enzyme)?.name().to_string();
            info!(
                "competitive rapid equilibrium on enzyme `{}` with {} substrates",
                name,
                pairs.len()
            );
            Self::transform(ir, &pairs)
                .with_context(|| format!("while reducing enzyme `{}`", name))?;
            changed = true;
        }
        Ok(changed)
    }
}

// ----------------------------------------------------------------------------
// Pseudo-steady-state (total enzyme) approximation

pub struct EnzymeKineticPpta();

impl EnzymeKineticPpta {
    pub fn new() -> Box<Self> {
        Box::new(Self())
    }

    /// Requires `(S0 + Km) / E0 >= ppta.condition.1` where `E0` counts both free and
    /// bound enzyme.
    pub fn find_candidate(
        ir: &Ir,
        binding: ReactionId,
        options: &ReductionOptions,
    ) -> Option<BindingPair> {
        let pair = find_binding_pair(ir, binding)?;
        if !only_used_by(ir, pair.enzyme, &pair.reactions()) {
            return None;
        }
        let km = KineticLawEvaluater::new(ir)
            .evaluate_finite(&pair.michaelis_constant())
            .ok()?;
        let s0 = ir.initial_amount(pair.substrate).ok()?;
        let e0 = ir.initial_amount(pair.enzyme).ok()? + ir.initial_amount(pair.complex).ok()?;
        if e0 <= 0.0 {
            return None;
        }
        let ratio = (s0 + km) / e0;
        if ratio < options.ppta_condition_1 {
            debug!(
                "`{}`: (S0 + Km) / E0 = {} is below {}",
                reaction_name(ir, binding),
                ratio,
                options.ppta_condition_1
            );
            return None;
        }
        Some(pair)
    }

    pub fn transform(ir: &mut Ir, pair: &BindingPair) -> anyhow::Result<()> {
        let law = saturation_law(pair, pair.michaelis_constant());
        let complex_amount = collapse_pair(ir, pair, law, &[])?;
        absorb_complexes(ir, pair.enzyme, complex_amount)
    }
}

impl AbstractionMethod for EnzymeKineticPpta {
    fn id(&self) -> &'static str {
        "enzyme-kinetic-ppta"
    }

    fn apply(&self, ir: &mut Ir, options: &ReductionOptions) -> anyhow::Result<bool> {
        let mut changed = false;
        for binding in ir.reaction_ids() {
            let Some(pair) = Self::find_candidate(ir, binding, options) else {
                continue;
            };
            let name = reaction_name(ir, binding);
            info!("total enzyme approximation on binding `{}`", name);
            Self::transform(ir, &pair)
                .with_context(|| format!("while collapsing binding `{}`", name))?;
            changed = true;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reaction_ir::InitialQuantity;

    struct Pair {
        binding: ReactionId,
        release: ReactionId,
        s: SpeciesId,
        c: SpeciesId,
        p: SpeciesId,
    }

    /// Adds `E + S <-> C`, `C -> E + P` with mass-action laws to `ir`.
    fn add_pair(ir: &mut Ir, e: SpeciesId, suffix: &str, rates: (f64, f64, f64), s0: f64) -> Pair {
        let s = ir.add_species(&format!("S{}", suffix), InitialQuantity::Amount(s0));
        let c = ir.add_species(&format!("C{}", suffix), InitialQuantity::Amount(1.0));
        let p = ir.add_species(&format!("P{}", suffix), InitialQuantity::Amount(0.0));
        let kf = ir.add_symbol(&format!("kf{}", suffix), rates.0, true).unwrap();
        let kr = ir.add_symbol(&format!("kr{}", suffix), rates.1, true).unwrap();
        let kcat = ir.add_symbol(&format!("kcat{}", suffix), rates.2, true).unwrap();
        let law = KineticLaw::sub(
            KineticLaw::product(vec![
                KineticLaw::symbol(kf),
                KineticLaw::species(e),
                KineticLaw::species(s),
            ]),
            KineticLaw::mul(KineticLaw::symbol(kr), KineticLaw::species(c)),
        );
        let binding = ir.add_reaction(&format!("bind{}", suffix), law, true, false);
        ir.add_reactant(binding, e, 1).unwrap();
        ir.add_reactant(binding, s, 1).unwrap();
        ir.add_product(binding, c, 1).unwrap();
        let release = ir.add_reaction(
            &format!("release{}", suffix),
            KineticLaw::mul(KineticLaw::symbol(kcat), KineticLaw::species(c)),
            false,
            false,
        );
        ir.add_reactant(release, c, 1).unwrap();
        ir.add_product(release, e, 1).unwrap();
        ir.add_product(release, p, 1).unwrap();
        Pair {
            binding,
            release,
            s,
            c,
            p,
        }
    }

    fn single(rates: (f64, f64, f64), s0: f64) -> (Ir, SpeciesId, Pair) {
        let mut ir = Ir::new();
        let e = ir.add_species("E", InitialQuantity::Amount(1.0));
        let pair = add_pair(&mut ir, e, "", rates, s0);
        (ir, e, pair)
    }

    #[test]
    fn test_binding_pair_roles() {
        let (ir, e, p) = single((1.0, 1000.0, 1.0), 10.0);
        let pair = find_binding_pair(&ir, p.binding).unwrap();
        assert_eq!(pair.enzyme, e);
        assert_eq!(pair.substrate, p.s);
        assert_eq!(pair.complex, p.c);
        assert_eq!(pair.release, p.release);
        assert_eq!(find_binding_pair(&ir, p.release), None);
    }

    #[test]
    fn test_rapid_equilibrium_1() {
        let (mut ir, e, p) = single((1.0, 1000.0, 1.0), 10.0);
        let changed = EnzymeKineticRapidEquilibrium1::new()
            .apply(&mut ir, &ReductionOptions::default())
            .unwrap();
        assert!(changed);
        assert!(!ir.has_species(p.c));
        assert!(!ir.has_reaction(p.binding));
        assert_eq!(ir.reaction_species(p.release, EdgeKind::Reactant), vec![(p.s, 1)]);
        assert_eq!(ir.reaction_species(p.release, EdgeKind::Product), vec![(p.p, 1)]);
        assert_eq!(ir.reaction_species(p.release, EdgeKind::Modifier), vec![(e, 1)]);
        assert_eq!(ir.initial_amount(e).unwrap(), 2.0);
        let law = ir.reaction(p.release).unwrap().law().clone();
        insta::assert_snapshot!(law.display(&ir), @"kcat * E * S / (kr / kf + S)");
        ir.validate_for_handoff().unwrap();
    }

    #[test]
    fn test_rapid_equilibrium_1_below_threshold() {
        let (mut ir, _, p) = single((1.0, 1.0, 1.0), 10.0);
        assert!(!EnzymeKineticRapidEquilibrium1::new()
            .apply(&mut ir, &ReductionOptions::default())
            .unwrap());
        assert!(ir.has_species(p.c));
    }

    #[test]
    fn test_rapid_equilibrium_1_needs_exclusive_enzyme() {
        let (mut ir, e, p) = single((1.0, 1000.0, 1.0), 10.0);
        let degrade = ir.add_reaction("degrade", KineticLaw::species(e), false, false);
        ir.add_reactant(degrade, e, 1).unwrap();
        assert_eq!(
            EnzymeKineticRapidEquilibrium1::find_candidate(
                &ir,
                p.binding,
                &ReductionOptions::default()
            ),
            None
        );
    }

    #[test]
    fn test_rapid_equilibrium_2() {
        let mut ir = Ir::new();
        let e = ir.add_species("E", InitialQuantity::Amount(1.0));
        let p1 = add_pair(&mut ir, e, "1", (1.0, 200.0, 1.0), 10.0);
        let p2 = add_pair(&mut ir, e, "2", (1.0, 400.0, 2.0), 20.0);
        let changed = EnzymeKineticRapidEquilibrium2::new()
            .apply(&mut ir, &ReductionOptions::default())
            .unwrap();
        assert!(changed);
        assert_eq!(ir.species_count(), 5);
        assert_eq!(ir.reaction_count(), 2);
        assert_eq!(ir.initial_amount(e).unwrap(), 3.0);
        assert!(ir.has_edge(p1.release, p2.s, EdgeKind::Modifier));
        assert!(ir.has_edge(p2.release, p1.s, EdgeKind::Modifier));
        assert!(ir.has_edge(p1.release, e, EdgeKind::Modifier));
        // kcat1 * E * (S1 / Kd1) / (1 + S1 / Kd1 + S2 / Kd2) = 1 * 3 * 0.05 / 1.1
        let law = ir.reaction(p1.release).unwrap().law().clone();
        ir.set_species_amount(e, 3.0).unwrap();
        let rate = KineticLawEvaluater::new(&ir).evaluate(&law).unwrap();
        assert!((rate - 0.15 / 1.1).abs() < 1e-12);
        ir.validate_for_handoff().unwrap();
    }

    #[test]
    fn test_rapid_equilibrium_2_needs_two_pairs() {
        let (ir, e, _) = single((1.0, 1000.0, 1.0), 10.0);
        assert_eq!(
            EnzymeKineticRapidEquilibrium2::find_candidate(&ir, e, &ReductionOptions::default()),
            None
        );
    }

    #[test]
    fn test_rapid_equilibrium_2_below_threshold() {
        let mut ir = Ir::new();
        let e = ir.add_species("E", InitialQuantity::Amount(1.0));
        add_pair(&mut ir, e, "1", (1.0, 200.0, 1.0), 10.0);
        // kr / kcat = 50 for the second substrate
        add_pair(&mut ir, e, "2", (1.0, 50.0, 1.0), 20.0);
        assert_eq!(
            EnzymeKineticRapidEquilibrium2::find_candidate(&ir, e, &ReductionOptions::default()),
            None
        );
        let before = ir.display().to_string();
        assert!(!EnzymeKineticRapidEquilibrium2::new()
            .apply(&mut ir, &ReductionOptions::default())
            .unwrap());
        assert_eq!(ir.display().to_string(), before);
    }

    #[test]
    fn test_rapid_equilibrium_2_needs_exclusive_enzyme() {
        let mut ir = Ir::new();
        let e = ir.add_species("E", InitialQuantity::Amount(1.0));
        add_pair(&mut ir, e, "1", (1.0, 200.0, 1.0), 10.0);
        add_pair(&mut ir, e, "2", (1.0, 400.0, 2.0), 20.0);
        let degrade = ir.add_reaction("degrade", KineticLaw::species(e), false, false);
        ir.add_reactant(degrade, e, 1).unwrap();
        assert_eq!(
            EnzymeKineticRapidEquilibrium2::find_candidate(&ir, e, &ReductionOptions::default()),
            None
        );
        assert!(!EnzymeKineticRapidEquilibrium2::new()
            .apply(&mut ir, &ReductionOptions::default())
            .unwrap());
        assert_eq!(ir.reaction_count(), 5);
    }

    #[test]
    fn test_ppta() {
        // Km = (1 + 1) / 1 = 2, E0 = 2, (S0 + Km) / E0 = 301
        let (mut ir, e, p) = single((1.0, 1.0, 1.0), 600.0);
        assert!(EnzymeKineticPpta::new()
            .apply(&mut ir, &ReductionOptions::default())
            .unwrap());
        assert!(!ir.has_species(p.c));
        let law = ir.reaction(p.release).unwrap().law().clone();
        insta::assert_snapshot!(law.display(&ir), @"kcat * E * S / ((kr + kcat) / kf + S)");
        assert_eq!(ir.initial_amount(e).unwrap(), 2.0);
    }

    #[test]
    fn test_ppta_below_threshold() {
        let (ir, _, p) = single((1.0, 1.0, 1.0), 10.0);
        assert_eq!(
            EnzymeKineticPpta::find_candidate(&ir, p.binding, &ReductionOptions::default()),
            None
        );
    }
}

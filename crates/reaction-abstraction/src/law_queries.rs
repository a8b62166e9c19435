// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Pattern matchers and builders over mass-action kinetic laws, plus the graph queries
//! the abstraction methods share.
//!
//! Matchers return `Option`: `None` means the law or the reaction does not have the
//! expected shape, which is not an error. Builders that add entities to the IR return
//! `Result` because a failure after a successful match must stop the pipeline.

use reaction_ir::{
    BinaryOpKind, EdgeKind, Ir, IrResult, KineticLaw, ReactionId, SpeciesId, UnaryOpKind,
};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDirection {
    Forward,
    Backward,
}

/// One additive term of a law, with its sign.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Term<'a> {
    pub negative: bool,
    pub law: &'a KineticLaw,
}

/// One multiplicative factor of a law. Division contributes negative exponents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Factor<'a> {
    pub base: &'a KineticLaw,
    pub exponent: f64,
}

/// Splits a law into additive terms through `+`, `-` and negation.
pub fn decompose_terms(law: &KineticLaw) -> Vec<Term<'_>> {
    fn collect<'a>(law: &'a KineticLaw, negative: bool, terms: &mut Vec<Term<'a>>) {
        match law {
            KineticLaw::BinaryOp {
                op: BinaryOpKind::Add,
                left,
                right,
            } => {
                collect(left, negative, terms);
                collect(right, negative, terms);
            }
            KineticLaw::BinaryOp {
                op: BinaryOpKind::Sub,
                left,
                right,
            } => {
                collect(left, negative, terms);
                collect(right, !negative, terms);
            }
            KineticLaw::UnaryOp {
                op: UnaryOpKind::Neg,
                child,
            } => collect(child, !negative, terms),
            _ => terms.push(Term { negative, law }),
        }
    }
    let mut terms = Vec::new();
    collect(law, false, &mut terms);
    terms
}

/// The exponent of a power node when it is a numeric constant.
pub fn constant_exponent(law: &KineticLaw) -> Option<(&KineticLaw, f64)> {
    match law {
        KineticLaw::BinaryOp {
            op: BinaryOpKind::Pow,
            left,
            right,
        } => right.constant_value().map(|n| (left.as_ref(), n)),
        KineticLaw::FuncCall { name, args } if name == "pow" && args.len() == 2 => {
            args[1].constant_value().map(|n| (&args[0], n))
        }
        _ => None,
    }
}

/// Splits a law into multiplicative factors through `*`, `/` and constant powers.
pub fn decompose_factors(law: &KineticLaw) -> Vec<Factor<'_>> {
    fn collect<'a>(law: &'a KineticLaw, exponent: f64, factors: &mut Vec<Factor<'a>>) {
        if let Some((base, n)) = constant_exponent(law) {
            return collect(base, exponent * n, factors);
        }
        match law {
            KineticLaw::BinaryOp {
                op: BinaryOpKind::Mul,
                left,
                right,
            } => {
                collect(left, exponent, factors);
                collect(right, exponent, factors);
            }
            KineticLaw::BinaryOp {
                op: BinaryOpKind::Div,
                left,
                right,
            } => {
                collect(left, exponent, factors);
                collect(right, -exponent, factors);
            }
            _ => factors.push(Factor {
                base: law,
                exponent,
            }),
        }
    }
    let mut factors = Vec::new();
    collect(law, 1.0, &mut factors);
    factors
}

/// Rebuilds a law from factors that do not mention any species: the numerator is the
/// product of positive powers, the denominator that of negative ones.
fn rebuild_constant(factors: &[Factor<'_>]) -> KineticLaw {
    let power = |f: &Factor<'_>| {
        let n = f.exponent.abs();
        if n == 1.0 {
            f.base.clone()
        } else {
            KineticLaw::pow(f.base.clone(), KineticLaw::real(n))
        }
    };
    let numerator = KineticLaw::product(factors.iter().filter(|f| f.exponent > 0.0).map(power));
    let denominator: Vec<_> = factors.iter().filter(|f| f.exponent < 0.0).map(power).collect();
    if denominator.is_empty() {
        numerator
    } else {
        KineticLaw::div(numerator, KineticLaw::product(denominator))
    }
}

/// Matches `k * Π(species^s)` against the given species multiset and returns `k`.
fn match_mass_action_term(term: &KineticLaw, species: &[(SpeciesId, u32)]) -> Option<KineticLaw> {
    let factors = decompose_factors(term);
    let mut expected: BTreeMap<SpeciesId, f64> = BTreeMap::new();
    for (s, n) in species {
        *expected.entry(*s).or_default() += f64::from(*n);
    }
    let mut found: BTreeMap<SpeciesId, f64> = BTreeMap::new();
    let mut constant = Vec::new();
    for factor in factors {
        match factor.base.as_species() {
            Some(s) => *found.entry(s).or_default() += factor.exponent,
            None if factor.base.referenced_species().is_empty() => constant.push(factor),
            None => return None,
        }
    }
    found.retain(|_, n| *n != 0.0);
    if found != expected {
        return None;
    }
    Some(rebuild_constant(&constant))
}

/// Rate constants of a reaction whose law follows mass action: `kf * Π(reactants)` for
/// irreversible reactions, `kf * Π(reactants) - kr * Π(products)` for reversible ones.
#[derive(Debug, Clone, PartialEq)]
pub struct MassAction {
    pub forward: KineticLaw,
    pub backward: Option<KineticLaw>,
}

pub fn match_mass_action(ir: &Ir, reaction: ReactionId) -> Option<MassAction> {
    let r = ir.get_reaction(reaction)?;
    let reactants = ir.reaction_species(reaction, EdgeKind::Reactant);
    let products = ir.reaction_species(reaction, EdgeKind::Product);
    let terms = decompose_terms(r.law());
    if r.is_reversible() {
        let [first, second] = terms.as_slice() else {
            return None;
        };
        let (forward, backward) = match (first.negative, second.negative) {
            (false, true) => (first, second),
            (true, false) => (second, first),
            _ => return None,
        };
        Some(MassAction {
            forward: match_mass_action_term(forward.law, &reactants)?,
            backward: Some(match_mass_action_term(backward.law, &products)?),
        })
    } else {
        let [term] = terms.as_slice() else {
            return None;
        };
        if term.negative {
            return None;
        }
        Some(MassAction {
            forward: match_mass_action_term(term.law, &reactants)?,
            backward: None,
        })
    }
}

pub fn find_rate_constant(
    ir: &Ir,
    reaction: ReactionId,
    direction: RateDirection,
) -> Option<KineticLaw> {
    let mass_action = match_mass_action(ir, reaction)?;
    match direction {
        RateDirection::Forward => Some(mass_action.forward),
        RateDirection::Backward => mass_action.backward,
    }
}

/// `kf / kr` of a reversible mass-action reaction.
pub fn create_rate_constant_ratio_law(ir: &Ir, reaction: ReactionId) -> Option<KineticLaw> {
    let MassAction { forward, backward } = match_mass_action(ir, reaction)?;
    Some(KineticLaw::div(forward, backward?))
}

/// `kr / kf` of a reversible mass-action reaction.
pub fn create_dissociation_constant_ratio_law(
    ir: &Ir,
    reaction: ReactionId,
) -> Option<KineticLaw> {
    let MassAction { forward, backward } = match_mass_action(ir, reaction)?;
    Some(KineticLaw::div(backward?, forward))
}

/// `(kf / kr) * Π(reactants^s)` over every reactant except `excluded`.
pub fn create_mass_action_ratio_law(
    ir: &Ir,
    reaction: ReactionId,
    excluded: SpeciesId,
) -> Option<KineticLaw> {
    let ratio = create_rate_constant_ratio_law(ir, reaction)?;
    let partners = ir
        .reaction_species(reaction, EdgeKind::Reactant)
        .into_iter()
        .filter(|(s, _)| *s != excluded)
        .map(|(s, n)| KineticLaw::power_of(KineticLaw::species(s), n));
    Some(KineticLaw::product(std::iter::once(ratio).chain(partners)))
}

/// Adds a constant symbol holding the summed initial amount of `species` and returns a
/// reference to it.
pub fn create_total_concentration_law(
    ir: &mut Ir,
    name: &str,
    species: &[SpeciesId],
) -> IrResult<KineticLaw> {
    let mut total = 0.0;
    for s in species {
        total += ir.initial_amount(*s)?;
    }
    create_concentration_law(ir, name, total)
}

/// Adds a constant symbol with the given value and returns a reference to it.
pub fn create_concentration_law(ir: &mut Ir, name: &str, value: f64) -> IrResult<KineticLaw> {
    let name = ir.fresh_symbol_name(name);
    let id = ir.add_symbol(&name, value, true)?;
    Ok(KineticLaw::symbol(id))
}

// ----------------------------------------------------------------------------
// Graph queries

/// Every reaction connected to the species by an edge or mentioning it in its law.
pub fn reactions_touching(ir: &Ir, species: SpeciesId) -> BTreeSet<ReactionId> {
    let mut result = ir.reactions_of_species(species);
    result.extend(ir.reactions_referencing(species));
    result
}

/// Whether the species takes part in no reaction outside `allowed`.
pub fn only_used_by(ir: &Ir, species: SpeciesId, allowed: &[ReactionId]) -> bool {
    reactions_touching(ir, species)
        .iter()
        .all(|r| allowed.contains(r))
}

/// The single species attached with `kind`, if there is exactly one edge of that kind.
pub fn sole_species(ir: &Ir, reaction: ReactionId, kind: EdgeKind) -> Option<(SpeciesId, u32)> {
    match ir.reaction_species(reaction, kind).as_slice() {
        [single] => Some(*single),
        _ => None,
    }
}

/// Adds a modifier edge unless the species already is a modifier of the reaction.
pub fn ensure_modifier(ir: &mut Ir, reaction: ReactionId, species: SpeciesId) -> IrResult<()> {
    if !ir.has_edge(reaction, species, EdgeKind::Modifier) {
        ir.add_modifier(reaction, species)?;
    }
    Ok(())
}

/// Sorted reactant and product multisets plus the reversible and fast flags. Two
/// reactions with equal signatures move the same molecules on the same time scale.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReactionSignature {
    pub reactants: Vec<(SpeciesId, u32)>,
    pub products: Vec<(SpeciesId, u32)>,
    pub reversible: bool,
    pub fast: bool,
}

pub fn reaction_signature(ir: &Ir, reaction: ReactionId) -> IrResult<ReactionSignature> {
    let r = ir.reaction(reaction)?;
    let (reversible, fast) = (r.is_reversible(), r.is_fast());
    let mut reactants = ir.reaction_species(reaction, EdgeKind::Reactant);
    let mut products = ir.reaction_species(reaction, EdgeKind::Product);
    reactants.sort();
    products.sort();
    Ok(ReactionSignature {
        reactants,
        products,
        reversible,
        fast,
    })
}

// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Discovery of the concentrations at which a law changes regime with respect to one
//! species.
//!
//! Two shapes are recognised:
//! - a divisor `a + b * S^n`, where `S` starts to dominate at `(a / b)^(1/n)`;
//! - a numerator `k1 * S - k2`, which changes sign at `k2 / k1`.
//!
//! Parts that do not mention `S` are evaluated numerically; anything that cannot be
//! evaluated contributes no level.

use crate::law_evaluator::KineticLawEvaluater;
use crate::law_queries::{decompose_factors, decompose_terms, Term};
use log::debug;
use reaction_ir::{BinaryOpKind, Ir, KineticLaw, SpeciesId};

/// `coefficient * S^exponent` with the coefficient already evaluated.
struct Monomial {
    coefficient: f64,
    exponent: f64,
}

/// Splits a term into a numeric coefficient and a power of `species`. A term that does
/// not mention `species` has exponent 0.
fn monomial(evaluator: &KineticLawEvaluater<'_>, term: &Term<'_>, species: SpeciesId) -> Option<Monomial> {
    let mut coefficient = if term.negative { -1.0 } else { 1.0 };
    let mut exponent = 0.0;
    for factor in decompose_factors(term.law) {
        if factor.base.as_species() == Some(species) {
            exponent += factor.exponent;
        } else if factor.base.contains_species(species) {
            return None;
        } else {
            let value = evaluator.evaluate_finite(factor.base).ok()?;
            coefficient *= value.powf(factor.exponent);
        }
    }
    Some(Monomial {
        coefficient,
        exponent,
    })
}

fn divisor_level(evaluator: &KineticLawEvaluater<'_>, divisor: &KineticLaw, species: SpeciesId) -> Option<f64> {
    let mut constant = 0.0;
    let mut dependent = None;
    for term in decompose_terms(divisor) {
        let m = monomial(evaluator, &term, species)?;
        if m.exponent == 0.0 {
            constant += m.coefficient;
        } else if dependent.is_none() {
            dependent = Some(m);
        } else {
            return None;
        }
    }
    let Monomial {
        coefficient,
        exponent,
    } = dependent?;
    if constant > 0.0 && coefficient > 0.0 && exponent > 0.0 {
        Some((constant / coefficient).powf(1.0 / exponent))
    } else {
        None
    }
}

fn sign_flip_level(evaluator: &KineticLawEvaluater<'_>, numerator: &KineticLaw, species: SpeciesId) -> Option<f64> {
    let mut constant = 0.0;
    let mut slope = 0.0;
    let mut has_constant = false;
    for term in decompose_terms(numerator) {
        let m = monomial(evaluator, &term, species)?;
        if m.exponent == 0.0 {
            constant += m.coefficient;
            has_constant = true;
        } else if m.exponent == 1.0 {
            slope += m.coefficient;
        } else {
            return None;
        }
    }
    if !has_constant || slope == 0.0 {
        return None;
    }
    let level = -constant / slope;
    (level > 0.0).then_some(level)
}

/// Every critical level of `species` found in `law`, unsorted and possibly repeated.
pub fn find_critical_levels(ir: &Ir, law: &KineticLaw, species: SpeciesId) -> Vec<f64> {
    let evaluator = KineticLawEvaluater::new(ir);
    let mut levels = Vec::new();
    for node in law.iter() {
        if let KineticLaw::BinaryOp {
            op: BinaryOpKind::Div,
            right,
            ..
        } = node
        {
            if right.contains_species(species) {
                if let Some(level) = divisor_level(&evaluator, right, species) {
                    levels.push(level);
                }
            }
        }
    }
    let numerator = match law {
        KineticLaw::BinaryOp {
            op: BinaryOpKind::Div,
            left,
            ..
        } => left.as_ref(),
        _ => law,
    };
    if let Some(level) = sign_flip_level(&evaluator, numerator, species) {
        levels.push(level);
    }
    debug!("critical levels of {} in `{}`: {:?}", species, law, levels);
    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use reaction_ir::InitialQuantity;

    #[test]
    fn test_hill_divisor() {
        let mut ir = Ir::new();
        let s = ir.add_species("S", InitialQuantity::Amount(0.0));
        let k = ir.add_symbol("K", 4.0, true).unwrap();
        // v * S^2 / (K + S^2)
        let law = KineticLaw::div(
            KineticLaw::mul(
                KineticLaw::real(3.0),
                KineticLaw::pow(KineticLaw::species(s), KineticLaw::int(2)),
            ),
            KineticLaw::add(
                KineticLaw::symbol(k),
                KineticLaw::pow(KineticLaw::species(s), KineticLaw::int(2)),
            ),
        );
        assert_eq!(find_critical_levels(&ir, &law, s), vec![2.0]);
    }

    #[test]
    fn test_scaled_divisor_term() {
        let mut ir = Ir::new();
        let s = ir.add_species("S", InitialQuantity::Amount(0.0));
        // 1 / (10 + 2 * S)
        let law = KineticLaw::div(
            KineticLaw::real(1.0),
            KineticLaw::add(
                KineticLaw::real(10.0),
                KineticLaw::mul(KineticLaw::real(2.0), KineticLaw::species(s)),
            ),
        );
        assert_eq!(find_critical_levels(&ir, &law, s), vec![5.0]);
    }

    #[test]
    fn test_numerator_sign_flip() {
        let mut ir = Ir::new();
        let s = ir.add_species("S", InitialQuantity::Amount(0.0));
        // 2 * S - 6
        let law = KineticLaw::sub(
            KineticLaw::mul(KineticLaw::real(2.0), KineticLaw::species(s)),
            KineticLaw::real(6.0),
        );
        assert_eq!(find_critical_levels(&ir, &law, s), vec![3.0]);
    }

    #[test]
    fn test_no_levels_for_plain_mass_action() {
        let mut ir = Ir::new();
        let s = ir.add_species("S", InitialQuantity::Amount(0.0));
        let law = KineticLaw::mul(KineticLaw::real(2.0), KineticLaw::species(s));
        assert!(find_critical_levels(&ir, &law, s).is_empty());
        // Unevaluable coefficient.
        let law = KineticLaw::div(
            KineticLaw::real(1.0),
            KineticLaw::add(
                KineticLaw::call("uniform", vec![KineticLaw::real(0.0), KineticLaw::real(1.0)]),
                KineticLaw::species(s),
            ),
        );
        assert!(find_critical_levels(&ir, &law, s).is_empty());
    }
}

// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Constant folding for kinetic laws.
//!
//! The pass evaluates every subtree whose leaves are all numeric constants:
//! - unary and binary operators
//! - deterministic math function calls
//! - piecewise expressions with constant conditions
//!
//! Calls to stochastic distributions are never folded, neither is anything above them.
//! Constant symbols are replaced by their value only when symbol folding is enabled.

use crate::abstraction_pipeline::AbstractionMethod;
use crate::options::ReductionOptions;
use log::debug;
use reaction_ir::law::arith::{apply_binary, apply_function, apply_unary, select_piecewise};
use reaction_ir::law::is_distribution_function;
use reaction_ir::{BinaryOpKind, Ir, KineticLaw, SymbolId};
use std::collections::BTreeMap;
use std::mem;

/// Values of the symbols that may be inlined while folding.
pub type SymbolValues = BTreeMap<SymbolId, f64>;

pub struct KineticLawConstantsSimplifier();

impl KineticLawConstantsSimplifier {
    pub fn new() -> Box<Self> {
        Box::new(Self())
    }
}

impl AbstractionMethod for KineticLawConstantsSimplifier {
    fn id(&self) -> &'static str {
        "kinetic-law-constants-simplifier"
    }

    fn apply(&self, ir: &mut Ir, options: &ReductionOptions) -> anyhow::Result<bool> {
        let symbols: SymbolValues = if options.fold_constant_symbols {
            ir.symbols()
                .iter()
                .filter(|s| s.constant && s.value.is_finite())
                .map(|s| (s.id, s.value))
                .collect()
        } else {
            SymbolValues::new()
        };
        let mut changed = false;
        for id in ir.reaction_ids() {
            let reaction = ir.reaction_mut(id)?;
            let law = mem::take(reaction.law_mut());
            let folded = fold_constants(law.clone(), &symbols);
            if folded != law {
                debug!("folded law of `{}`: {} => {}", reaction.name(), law, folded);
                changed = true;
            }
            reaction.set_law(folded);
        }
        Ok(changed)
    }

    fn run_once(&self) -> bool {
        true
    }
}

/// Folds a law bottom-up, so inner expressions are folded first.
pub fn fold_constants(law: KineticLaw, symbols: &SymbolValues) -> KineticLaw {
    law.map(&mut |n| fold_node(n, symbols))
}

fn fold_node(node: KineticLaw, symbols: &SymbolValues) -> KineticLaw {
    match node {
        KineticLaw::Symbol(id) => match symbols.get(&id) {
            Some(value) => KineticLaw::Real(*value),
            None => node,
        },
        KineticLaw::UnaryOp { op, child } => match child.constant_value() {
            Some(v) => folded(apply_unary(op, v)).unwrap_or(KineticLaw::UnaryOp { op, child }),
            None => KineticLaw::UnaryOp { op, child },
        },
        KineticLaw::BinaryOp { op, left, right } => {
            if let (KineticLaw::Int(a), KineticLaw::Int(b)) = (&*left, &*right) {
                if let Some(v) = fold_int(op, *a, *b) {
                    return KineticLaw::Int(v);
                }
            }
            match (left.constant_value(), right.constant_value()) {
                (Some(a), Some(b)) => folded(apply_binary(op, a, b))
                    .unwrap_or(KineticLaw::BinaryOp { op, left, right }),
                _ => KineticLaw::BinaryOp { op, left, right },
            }
        }
        KineticLaw::FuncCall { name, args } => {
            if is_distribution_function(&name) {
                return KineticLaw::FuncCall { name, args };
            }
            let values: Option<Vec<f64>> = args.iter().map(|a| a.constant_value()).collect();
            values
                .and_then(|values| apply_function(&name, &values))
                .and_then(folded)
                .unwrap_or(KineticLaw::FuncCall { name, args })
        }
        KineticLaw::Piecewise(children) => {
            let values: Option<Vec<f64>> = children.iter().map(|c| c.constant_value()).collect();
            values
                .and_then(|values| select_piecewise(&values))
                .and_then(folded)
                .unwrap_or(KineticLaw::Piecewise(children))
        }
        other => other,
    }
}

/// Integer arithmetic stays integral as long as it does not overflow.
fn fold_int(op: BinaryOpKind, a: i64, b: i64) -> Option<i64> {
    match op {
        BinaryOpKind::Add => a.checked_add(b),
        BinaryOpKind::Sub => a.checked_sub(b),
        BinaryOpKind::Mul => a.checked_mul(b),
        _ => None,
    }
}

/// Non-finite results stay unfolded so that the failure shows up at simulation time
/// with the original expression.
fn folded(value: f64) -> Option<KineticLaw> {
    value.is_finite().then_some(KineticLaw::Real(value))
}

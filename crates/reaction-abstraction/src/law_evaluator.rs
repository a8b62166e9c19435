// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Numeric evaluation of kinetic laws against the current state of an [`Ir`].

use reaction_ir::law::arith::{apply_binary, apply_function, apply_unary, select_piecewise};
use reaction_ir::{Ir, IrError, IrResult, KineticLaw, SpeciesId};
use std::collections::BTreeMap;

/// Evaluates laws using species runtime amounts, symbol values and compartment sizes.
/// Individual species values can be overridden, which is how threshold checks evaluate a
/// law at a hypothetical concentration.
pub struct KineticLawEvaluater<'a> {
    ir: &'a Ir,
    overrides: BTreeMap<SpeciesId, f64>,
}

impl<'a> KineticLawEvaluater<'a> {
    pub fn new(ir: &'a Ir) -> Self {
        Self {
            ir,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_species_value(mut self, species: SpeciesId, value: f64) -> Self {
        self.overrides.insert(species, value);
        self
    }

    fn species_value(&self, id: SpeciesId) -> IrResult<f64> {
        match self.overrides.get(&id) {
            Some(v) => Ok(*v),
            None => self.ir.species_amount(id),
        }
    }

    /// Post-order stack evaluation: every node pops its children's values and pushes its
    /// own.
    pub fn evaluate(&self, law: &KineticLaw) -> IrResult<f64> {
        let mut stack: Vec<f64> = Vec::new();
        law.accept_post_order(&mut |node: &KineticLaw| -> IrResult<()> {
            let value = match node {
                KineticLaw::Int(v) => *v as f64,
                KineticLaw::Real(v) => *v,
                KineticLaw::Species(id) => self.species_value(*id)?,
                KineticLaw::Symbol(id) => self.ir.symbol(*id)?.value,
                KineticLaw::Compartment(id) => self.ir.compartment(*id)?.size,
                KineticLaw::UnaryOp { op, .. } => apply_unary(*op, pop(&mut stack)?),
                KineticLaw::BinaryOp { op, .. } => {
                    let rhs = pop(&mut stack)?;
                    let lhs = pop(&mut stack)?;
                    apply_binary(*op, lhs, rhs)
                }
                KineticLaw::FuncCall { name, args } => {
                    let values = pop_n(&mut stack, args.len())?;
                    apply_function(name, &values).ok_or_else(|| {
                        IrError::NotEvaluable(format!("function `{}` has no numeric value", name))
                    })?
                }
                KineticLaw::Piecewise(children) => {
                    let values = pop_n(&mut stack, children.len())?;
                    select_piecewise(&values).ok_or_else(|| {
                        IrError::NotEvaluable("no piecewise condition holds".to_string())
                    })?
                }
            };
            stack.push(value);
            Ok(())
        })?;
        pop(&mut stack)
    }

    /// Like [`KineticLawEvaluater::evaluate`], but a non-finite result is also an error.
    pub fn evaluate_finite(&self, law: &KineticLaw) -> IrResult<f64> {
        let value = self.evaluate(law)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(IrError::NotEvaluable(format!("{} evaluates to {}", law, value)))
        }
    }
}

fn pop(stack: &mut Vec<f64>) -> IrResult<f64> {
    stack
        .pop()
        .ok_or_else(|| IrError::NotEvaluable("malformed expression".to_string()))
}

fn pop_n(stack: &mut Vec<f64>, n: usize) -> IrResult<Vec<f64>> {
    if stack.len() < n {
        return Err(IrError::NotEvaluable("malformed expression".to_string()));
    }
    Ok(stack.split_off(stack.len() - n))
}

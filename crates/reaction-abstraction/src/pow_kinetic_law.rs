// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Distributes constant exponents over products and quotients, so that
//! `(a * b) ^ n` becomes `a ^ n * b ^ n` and `(a / b) ^ n` becomes `a ^ n / b ^ n`.
//! Both the `^` operator and `pow(x, n)` calls are rewritten. A base containing a sum
//! or a difference is left alone.

use crate::abstraction_pipeline::AbstractionMethod;
use crate::options::ReductionOptions;
use log::debug;
use reaction_ir::{BinaryOpKind, Ir, KineticLaw};
use std::mem;

pub struct PowKineticLawTransformer();

impl PowKineticLawTransformer {
    pub fn new() -> Box<Self> {
        Box::new(Self())
    }
}

impl AbstractionMethod for PowKineticLawTransformer {
    fn id(&self) -> &'static str {
        "pow-kinetic-law-transformer"
    }

    fn apply(&self, ir: &mut Ir, _options: &ReductionOptions) -> anyhow::Result<bool> {
        let mut changed = false;
        for id in ir.reaction_ids() {
            let reaction = ir.reaction_mut(id)?;
            let law = mem::take(reaction.law_mut());
            let distributed = distribute_powers(law.clone());
            if distributed != law {
                debug!("distributed powers in `{}`", reaction.name());
                changed = true;
            }
            reaction.set_law(distributed);
        }
        Ok(changed)
    }

    fn run_once(&self) -> bool {
        true
    }
}

/// Which syntax a power was written in.
#[derive(Clone, Copy)]
enum PowForm {
    Operator,
    Call,
}

impl PowForm {
    fn build(self, base: KineticLaw, exponent: KineticLaw) -> KineticLaw {
        match self {
            PowForm::Operator => KineticLaw::pow(base, exponent),
            PowForm::Call => KineticLaw::call("pow", vec![base, exponent]),
        }
    }
}

pub fn distribute_powers(law: KineticLaw) -> KineticLaw {
    law.map(&mut distribute_node)
}

fn distribute_node(node: KineticLaw) -> KineticLaw {
    let (form, base, exponent) = match node {
        KineticLaw::BinaryOp {
            op: BinaryOpKind::Pow,
            left,
            right,
        } if right.is_constant_value() => (PowForm::Operator, *left, *right),
        KineticLaw::FuncCall { name, mut args }
            if name == "pow" && args.len() == 2 && args[1].is_constant_value() =>
        {
            let exponent = args.pop().unwrap_or_default();
            let base = args.pop().unwrap_or_default();
            (PowForm::Call, base, exponent)
        }
        other => return other,
    };
    if !is_distributable(&base) || has_additive_term(&base) {
        return form.build(base, exponent);
    }
    distribute(form, base, &exponent)
}

fn is_distributable(base: &KineticLaw) -> bool {
    base.is_binary_op(BinaryOpKind::Mul) || base.is_binary_op(BinaryOpKind::Div)
}

fn has_additive_term(base: &KineticLaw) -> bool {
    base.any(|n| n.is_binary_op(BinaryOpKind::Add) || n.is_binary_op(BinaryOpKind::Sub))
}

fn distribute(form: PowForm, base: KineticLaw, exponent: &KineticLaw) -> KineticLaw {
    match base {
        KineticLaw::BinaryOp { op, left, right }
            if op == BinaryOpKind::Mul || op == BinaryOpKind::Div =>
        {
            KineticLaw::binary(
                op,
                distribute(form, *left, exponent),
                distribute(form, *right, exponent),
            )
        }
        other => form.build(other, exponent.clone()),
    }
}

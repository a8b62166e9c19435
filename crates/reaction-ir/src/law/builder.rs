// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Checked constructors for kinetic laws.
//!
//! Every `create_*` function validates its operands and reports malformed input as
//! [`IrError::WrongData`]; references to graph entities are checked against the [`Ir`]
//! they will live in.

use crate::data::ids::{CompartmentId, SpeciesId, SymbolId};
use crate::data::Ir;
use crate::error::{IrError, IrResult};
use crate::law::{function_arity, piecewise_conditions, BinaryOpKind, KineticLaw, UnaryOpKind};

impl KineticLaw {
    pub fn create_op(op: BinaryOpKind, left: KineticLaw, right: KineticLaw) -> IrResult<Self> {
        let (l, r) = (left.is_boolean_valued(), right.is_boolean_valued());
        if op.is_logical() {
            if !l || !r {
                return Err(IrError::wrong_data(format!(
                    "operands of `{}` must be boolean-valued",
                    op
                )));
            }
        } else if l || r {
            return Err(IrError::wrong_data(format!(
                "operands of `{}` must be numeric",
                op
            )));
        }
        Ok(KineticLaw::binary(op, left, right))
    }

    pub fn create_unary_op(op: UnaryOpKind, child: KineticLaw) -> IrResult<Self> {
        let boolean = child.is_boolean_valued();
        match op {
            UnaryOpKind::Neg if boolean => Err(IrError::wrong_data(
                "operand of negation must be numeric",
            )),
            UnaryOpKind::Not if !boolean => Err(IrError::wrong_data(
                "operand of `!` must be boolean-valued",
            )),
            _ => Ok(KineticLaw::UnaryOp {
                op,
                child: Box::new(child),
            }),
        }
    }

    pub fn create_real(value: f64) -> IrResult<Self> {
        if value.is_nan() {
            return Err(IrError::wrong_data("real constant is NaN"));
        }
        Ok(KineticLaw::Real(value))
    }

    pub fn create_int(value: i64) -> IrResult<Self> {
        Ok(KineticLaw::Int(value))
    }

    pub fn create_species(ir: &Ir, id: SpeciesId) -> IrResult<Self> {
        if !ir.has_species(id) {
            return Err(IrError::wrong_data(format!(
                "law references unknown species {}",
                id
            )));
        }
        Ok(KineticLaw::Species(id))
    }

    pub fn create_symbol(ir: &Ir, id: SymbolId) -> IrResult<Self> {
        ir.symbol(id)
            .map_err(|_| IrError::wrong_data(format!("law references unknown symbol {}", id)))?;
        Ok(KineticLaw::Symbol(id))
    }

    pub fn create_compartment(ir: &Ir, id: CompartmentId) -> IrResult<Self> {
        ir.compartment(id).map_err(|_| {
            IrError::wrong_data(format!("law references unknown compartment {}", id))
        })?;
        Ok(KineticLaw::Compartment(id))
    }

    /// Builds a function call. Functions with a known arity are checked; other names are
    /// accepted as user functions.
    pub fn create_func_call(name: &str, args: Vec<KineticLaw>) -> IrResult<Self> {
        if name.is_empty() {
            return Err(IrError::wrong_data("function name is empty"));
        }
        if let Some(arity) = function_arity(name) {
            if args.len() != arity {
                return Err(IrError::wrong_data(format!(
                    "`{}` takes {} argument(s), got {}",
                    name,
                    arity,
                    args.len()
                )));
            }
        }
        if args.iter().any(KineticLaw::is_boolean_valued) {
            return Err(IrError::wrong_data(format!(
                "arguments of `{}` must be numeric",
                name
            )));
        }
        Ok(KineticLaw::FuncCall {
            name: name.to_string(),
            args,
        })
    }

    /// Builds a piecewise expression from `[value_1, cond_1, ..., otherwise?]`.
    pub fn create_piecewise(children: Vec<KineticLaw>) -> IrResult<Self> {
        if children.is_empty() {
            return Err(IrError::wrong_data("piecewise needs at least one child"));
        }
        if let Some(pos) = piecewise_conditions(&children)
            .iter()
            .position(|c| !c.is_boolean_valued())
        {
            return Err(IrError::wrong_data(format!(
                "piecewise condition #{} is not boolean-valued",
                pos + 1
            )));
        }
        Ok(KineticLaw::Piecewise(children))
    }
}

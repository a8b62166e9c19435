// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Infix rendering of kinetic laws with minimal parentheses.

use crate::data::Ir;
use crate::law::{BinaryOpKind, KineticLaw};
use std::fmt;

/// Renders a law, resolving species, symbol and compartment names through `ir` when one
/// is given and falling back to ids (`s3`, `p1`, `c0`) otherwise.
pub struct LawDisplay<'a> {
    pub law: &'a KineticLaw,
    pub ir: Option<&'a Ir>,
}

const ATOM: u8 = 8;
const PREFIX: u8 = 6;

fn binary_precedence(op: BinaryOpKind) -> u8 {
    match op {
        BinaryOpKind::Or => 1,
        BinaryOpKind::And => 2,
        BinaryOpKind::Eq
        | BinaryOpKind::Neq
        | BinaryOpKind::Lt
        | BinaryOpKind::Le
        | BinaryOpKind::Gt
        | BinaryOpKind::Ge => 3,
        BinaryOpKind::Add | BinaryOpKind::Sub => 4,
        BinaryOpKind::Mul | BinaryOpKind::Div => 5,
        BinaryOpKind::Pow => 7,
    }
}

fn precedence(law: &KineticLaw) -> u8 {
    match law {
        KineticLaw::BinaryOp { op, .. } => binary_precedence(*op),
        KineticLaw::UnaryOp { .. } => PREFIX,
        KineticLaw::Int(v) if *v < 0 => PREFIX,
        KineticLaw::Real(v) if v.is_sign_negative() => PREFIX,
        _ => ATOM,
    }
}

impl KineticLaw {
    pub fn display<'a>(&'a self, ir: &'a Ir) -> LawDisplay<'a> {
        LawDisplay { law: self, ir: Some(ir) }
    }
}

impl<'a> LawDisplay<'a> {
    fn nested(&self, law: &'a KineticLaw) -> LawDisplay<'a> {
        LawDisplay { law, ir: self.ir }
    }

    fn write_operand(&self, f: &mut fmt::Formatter<'_>, law: &'a KineticLaw, parens: bool) -> fmt::Result {
        if parens {
            write!(f, "({})", self.nested(law))
        } else {
            write!(f, "{}", self.nested(law))
        }
    }

    fn write_list(&self, f: &mut fmt::Formatter<'_>, items: &'a [KineticLaw]) -> fmt::Result {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", self.nested(item))?;
        }
        Ok(())
    }
}

impl fmt::Display for LawDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.law {
            KineticLaw::Int(v) => write!(f, "{}", v),
            KineticLaw::Real(v) => write!(f, "{}", v),
            KineticLaw::Species(id) => match self.ir.and_then(|ir| ir.get_species(*id)) {
                Some(species) => f.write_str(species.name()),
                None => write!(f, "{}", id),
            },
            KineticLaw::Symbol(id) => match self.ir.and_then(|ir| ir.symbol(*id).ok()) {
                Some(symbol) => f.write_str(&symbol.name),
                None => write!(f, "{}", id),
            },
            KineticLaw::Compartment(id) => match self.ir.and_then(|ir| ir.compartment(*id).ok()) {
                Some(compartment) => f.write_str(&compartment.name),
                None => write!(f, "{}", id),
            },
            KineticLaw::UnaryOp { op, child } => {
                write!(f, "{}", op)?;
                self.write_operand(f, child, precedence(child) <= PREFIX)
            }
            KineticLaw::BinaryOp { op, left, right } => {
                let own = binary_precedence(*op);
                let (lp, rp) = (precedence(left), precedence(right));
                // `^` groups to the right, everything else to the left.
                let (left_parens, right_parens) = if *op == BinaryOpKind::Pow {
                    (lp <= own, rp < own)
                } else {
                    (lp < own, rp <= own)
                };
                self.write_operand(f, left, left_parens)?;
                write!(f, " {} ", op)?;
                self.write_operand(f, right, right_parens)
            }
            KineticLaw::FuncCall { name, args } => {
                write!(f, "{}(", name)?;
                self.write_list(f, args)?;
                f.write_str(")")
            }
            KineticLaw::Piecewise(children) => {
                f.write_str("piecewise(")?;
                self.write_list(f, children)?;
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for KineticLaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        LawDisplay { law: self, ir: None }.fmt(f)
    }
}

// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Numeric semantics of law operators and functions, shared by evaluation and constant
//! folding. Truth values are `1.0` and `0.0`.

use crate::law::{BinaryOpKind, UnaryOpKind};

fn truth(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

pub fn is_true(value: f64) -> bool {
    value != 0.0
}

pub fn apply_unary(op: UnaryOpKind, value: f64) -> f64 {
    match op {
        UnaryOpKind::Neg => -value,
        UnaryOpKind::Not => truth(!is_true(value)),
    }
}

pub fn apply_binary(op: BinaryOpKind, lhs: f64, rhs: f64) -> f64 {
    match op {
        BinaryOpKind::Add => lhs + rhs,
        BinaryOpKind::Sub => lhs - rhs,
        BinaryOpKind::Mul => lhs * rhs,
        BinaryOpKind::Div => lhs / rhs,
        BinaryOpKind::Pow => lhs.powf(rhs),
        BinaryOpKind::And => truth(is_true(lhs) && is_true(rhs)),
        BinaryOpKind::Or => truth(is_true(lhs) || is_true(rhs)),
        BinaryOpKind::Eq => truth(lhs == rhs),
        BinaryOpKind::Neq => truth(lhs != rhs),
        BinaryOpKind::Lt => truth(lhs < rhs),
        BinaryOpKind::Le => truth(lhs <= rhs),
        BinaryOpKind::Gt => truth(lhs > rhs),
        BinaryOpKind::Ge => truth(lhs >= rhs),
    }
}

/// Evaluates a deterministic math function. Returns `None` for unknown names, for
/// distribution functions and for a wrong argument count.
pub fn apply_function(name: &str, args: &[f64]) -> Option<f64> {
    let value = match (name, args) {
        ("abs", [x]) => x.abs(),
        ("ceil" | "ceiling", [x]) => x.ceil(),
        ("floor", [x]) => x.floor(),
        ("cos", [x]) => x.cos(),
        ("sin", [x]) => x.sin(),
        ("tan", [x]) => x.tan(),
        ("exp", [x]) => x.exp(),
        ("ln" | "log", [x]) => x.ln(),
        ("log10", [x]) => x.log10(),
        ("sqrt", [x]) => x.sqrt(),
        ("pow", [x, y]) => x.powf(*y),
        ("root", [n, x]) => x.powf(1.0 / n),
        _ => return None,
    };
    Some(value)
}

/// Piecewise selection over already evaluated children. `None` when no condition holds
/// and there is no otherwise value.
pub fn select_piecewise(values: &[f64]) -> Option<f64> {
    for chunk in values.chunks(2) {
        match chunk {
            [value, condition] if is_true(*condition) => return Some(*value),
            [_, _] => {}
            [otherwise] => return Some(*otherwise),
            _ => return None,
        }
    }
    None
}

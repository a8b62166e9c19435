// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Kinetic-law expression trees.
//!
//! A [`KineticLaw`] is an owned tree: every child is boxed or stored in a `Vec`, so a
//! subtree has exactly one parent and cloning is always deep. Rewrites either consume the
//! tree ([`KineticLaw::map`]) or mutate it in place through `&mut` access
//! ([`KineticLaw::replace_species_with_law`], [`visitor::LawVisitorMut`]).

pub mod arith;
pub mod builder;
pub mod display;
pub mod visitor;

use crate::data::ids::{CompartmentId, SpeciesId, SymbolId};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::{fmt, mem};

/// Visit the direct children of a law node.
/// Pass `as_law_ref` for immutable access, `as_law_mut` for mutable access.
macro_rules! traverse_law {
    ($target:expr, $deref:ident, |$value:ident| $action:expr) => {
        match $target {
            KineticLaw::Int(_)
            | KineticLaw::Real(_)
            | KineticLaw::Species(_)
            | KineticLaw::Compartment(_)
            | KineticLaw::Symbol(_) => {}
            KineticLaw::UnaryOp { child, .. } => {
                let $value = child.$deref();
                $action;
            }
            KineticLaw::BinaryOp { left, right, .. } => {
                let $value = left.$deref();
                $action;
                let $value = right.$deref();
                $action;
            }
            KineticLaw::FuncCall { args, .. } => {
                for $value in args {
                    $action;
                }
            }
            KineticLaw::Piecewise(children) => {
                for $value in children {
                    $action;
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOpKind {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOpKind {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    // Logical
    And,
    Or,
    // Relational
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOpKind {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOpKind::Add
                | BinaryOpKind::Sub
                | BinaryOpKind::Mul
                | BinaryOpKind::Div
                | BinaryOpKind::Pow
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOpKind::And | BinaryOpKind::Or)
    }

    pub fn is_relational(self) -> bool {
        !self.is_arithmetic() && !self.is_logical()
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOpKind::Add => "+",
            BinaryOpKind::Sub => "-",
            BinaryOpKind::Mul => "*",
            BinaryOpKind::Div => "/",
            BinaryOpKind::Pow => "^",
            BinaryOpKind::And => "&&",
            BinaryOpKind::Or => "||",
            BinaryOpKind::Eq => "==",
            BinaryOpKind::Neq => "!=",
            BinaryOpKind::Lt => "<",
            BinaryOpKind::Le => "<=",
            BinaryOpKind::Gt => ">",
            BinaryOpKind::Ge => ">=",
        }
    }
}

impl fmt::Display for BinaryOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for UnaryOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOpKind::Neg => f.write_str("-"),
            UnaryOpKind::Not => f.write_str("!"),
        }
    }
}

/// Math functions with a fixed arity. Calls to these are checked when built.
pub static KNOWN_FUNCTIONS: Lazy<BTreeMap<&'static str, usize>> = Lazy::new(|| {
    [
        ("abs", 1),
        ("ceil", 1),
        ("ceiling", 1),
        ("cos", 1),
        ("exp", 1),
        ("floor", 1),
        ("ln", 1),
        ("log", 1),
        ("log10", 1),
        ("sin", 1),
        ("sqrt", 1),
        ("tan", 1),
        ("pow", 2),
        ("root", 2),
    ]
    .into_iter()
    .collect()
});

/// Functions that draw from a probability distribution. A call to any of them makes the
/// enclosing expression non-constant.
pub static DISTRIBUTION_FUNCTIONS: Lazy<BTreeMap<&'static str, usize>> = Lazy::new(|| {
    [
        ("uniform", 2),
        ("normal", 2),
        ("binomial", 2),
        ("exponential", 1),
        ("gamma", 2),
        ("poisson", 1),
        ("lognormal", 2),
        ("chisq", 1),
        ("laplace", 1),
        ("cauchy", 1),
        ("rayleigh", 1),
        ("bernoulli", 1),
    ]
    .into_iter()
    .collect()
});

pub fn is_distribution_function(name: &str) -> bool {
    DISTRIBUTION_FUNCTIONS.contains_key(name)
}

/// Expected argument count of a function with fixed arity, if any.
pub fn function_arity(name: &str) -> Option<usize> {
    KNOWN_FUNCTIONS
        .get(name)
        .or_else(|| DISTRIBUTION_FUNCTIONS.get(name))
        .copied()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KineticLaw {
    Int(i64),
    Real(f64),
    Species(SpeciesId),
    Compartment(CompartmentId),
    /// Reference to a global parameter.
    Symbol(SymbolId),
    UnaryOp {
        op: UnaryOpKind,
        child: Box<KineticLaw>,
    },
    BinaryOp {
        op: BinaryOpKind,
        left: Box<KineticLaw>,
        right: Box<KineticLaw>,
    },
    FuncCall {
        name: String,
        args: Vec<KineticLaw>,
    },
    /// `[value_1, cond_1, value_2, cond_2, ..., otherwise?]`
    Piecewise(Vec<KineticLaw>),
}

impl Default for KineticLaw {
    fn default() -> Self {
        KineticLaw::Int(0)
    }
}

impl KineticLaw {
    // ------------------------------------------------------------------------
    // Constructors. Operands are taken as given; see `builder` for the checked
    // versions.

    pub fn int(value: i64) -> Self {
        KineticLaw::Int(value)
    }

    pub fn real(value: f64) -> Self {
        KineticLaw::Real(value)
    }

    pub fn species(id: SpeciesId) -> Self {
        KineticLaw::Species(id)
    }

    pub fn symbol(id: SymbolId) -> Self {
        KineticLaw::Symbol(id)
    }

    pub fn compartment(id: CompartmentId) -> Self {
        KineticLaw::Compartment(id)
    }

    pub fn binary(op: BinaryOpKind, left: KineticLaw, right: KineticLaw) -> Self {
        KineticLaw::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn add(left: KineticLaw, right: KineticLaw) -> Self {
        Self::binary(BinaryOpKind::Add, left, right)
    }

    pub fn sub(left: KineticLaw, right: KineticLaw) -> Self {
        Self::binary(BinaryOpKind::Sub, left, right)
    }

    pub fn mul(left: KineticLaw, right: KineticLaw) -> Self {
        Self::binary(BinaryOpKind::Mul, left, right)
    }

    pub fn div(left: KineticLaw, right: KineticLaw) -> Self {
        Self::binary(BinaryOpKind::Div, left, right)
    }

    pub fn pow(base: KineticLaw, exponent: KineticLaw) -> Self {
        Self::binary(BinaryOpKind::Pow, base, exponent)
    }

    pub fn neg(child: KineticLaw) -> Self {
        KineticLaw::UnaryOp {
            op: UnaryOpKind::Neg,
            child: Box::new(child),
        }
    }

    pub fn call(name: &str, args: Vec<KineticLaw>) -> Self {
        KineticLaw::FuncCall {
            name: name.to_string(),
            args,
        }
    }

    /// Left-nested product of `factors`; an empty product is `1`.
    pub fn product(factors: impl IntoIterator<Item = KineticLaw>) -> Self {
        factors
            .into_iter()
            .reduce(KineticLaw::mul)
            .unwrap_or(KineticLaw::Real(1.0))
    }

    /// Left-nested sum of `terms`; an empty sum is `0`.
    pub fn sum(terms: impl IntoIterator<Item = KineticLaw>) -> Self {
        terms
            .into_iter()
            .reduce(KineticLaw::add)
            .unwrap_or(KineticLaw::Real(0.0))
    }

    /// `base` when `exponent == 1`, `base ^ exponent` otherwise.
    pub fn power_of(base: KineticLaw, exponent: u32) -> Self {
        if exponent == 1 {
            base
        } else {
            Self::pow(base, KineticLaw::Int(i64::from(exponent)))
        }
    }

    // ------------------------------------------------------------------------
    // Traversal

    /// References to all nodes (including itself), pre-order.
    pub fn iter<'a>(&'a self) -> impl Iterator<Item = &'a KineticLaw> + 'a {
        fn collect_nodes<'a>(node: &'a KineticLaw, result: &mut Vec<&'a KineticLaw>) {
            result.push(node);
            traverse_law!(node, as_law_ref, |child| collect_nodes(child, result));
        }
        let mut result = Vec::new();
        collect_nodes(self, &mut result);
        result.into_iter()
    }

    /// Direct children of this node.
    pub fn children<'a>(&'a self) -> impl Iterator<Item = &'a KineticLaw> + 'a {
        let mut result = Vec::new();
        traverse_law!(self, as_law_ref, |child| result.push(child));
        result.into_iter()
    }

    pub(crate) fn children_mut(&mut self) -> Vec<&mut KineticLaw> {
        let mut result = Vec::new();
        traverse_law!(self, as_law_mut, |child| result.push(child));
        result
    }

    /// Transform this law recursively (bottom-up: children first, then parent)
    pub fn map<F: FnMut(KineticLaw) -> KineticLaw>(mut self, f: &mut F) -> KineticLaw {
        traverse_law!(&mut self, as_law_mut, |value| {
            let child = mem::take(value);
            *value = child.map(f);
        });
        f(self)
    }

    pub fn fold<T, F>(&self, init: T, mut f: F) -> T
    where
        F: FnMut(T, &KineticLaw) -> T,
    {
        self.iter().fold(init, |acc, node| f(acc, node))
    }

    pub fn any(&self, mut predicate: impl FnMut(&KineticLaw) -> bool) -> bool {
        self.iter().any(|node| predicate(node))
    }

    pub fn extract<T, F>(&self, extractor: F) -> Vec<T>
    where
        F: Fn(&KineticLaw) -> Option<T>,
    {
        self.iter().filter_map(extractor).collect()
    }

    // ------------------------------------------------------------------------
    // Predicates

    pub fn is_op(&self) -> bool {
        matches!(self, KineticLaw::UnaryOp { .. } | KineticLaw::BinaryOp { .. })
    }

    pub fn op_kind(&self) -> Option<BinaryOpKind> {
        match self {
            KineticLaw::BinaryOp { op, .. } => Some(*op),
            _ => None,
        }
    }

    pub fn is_binary_op(&self, kind: BinaryOpKind) -> bool {
        self.op_kind() == Some(kind)
    }

    pub fn is_constant_value(&self) -> bool {
        matches!(self, KineticLaw::Int(_) | KineticLaw::Real(_))
    }

    pub fn constant_value(&self) -> Option<f64> {
        match self {
            KineticLaw::Int(v) => Some(*v as f64),
            KineticLaw::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_species(&self) -> bool {
        matches!(self, KineticLaw::Species(_))
    }

    pub fn as_species(&self) -> Option<SpeciesId> {
        match self {
            KineticLaw::Species(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, KineticLaw::Symbol(_))
    }

    /// Whether the node produces a truth value rather than a number.
    pub fn is_boolean_valued(&self) -> bool {
        match self {
            KineticLaw::UnaryOp { op, .. } => *op == UnaryOpKind::Not,
            KineticLaw::BinaryOp { op, .. } => !op.is_arithmetic(),
            KineticLaw::Piecewise(children) => {
                let values = piecewise_values(children);
                !values.is_empty() && values.iter().all(|v| v.is_boolean_valued())
            }
            _ => false,
        }
    }

    pub fn contains_species(&self, id: SpeciesId) -> bool {
        self.any(|node| matches!(node, KineticLaw::Species(s) if *s == id))
    }

    pub fn referenced_species(&self) -> BTreeSet<SpeciesId> {
        self.iter().filter_map(|node| node.as_species()).collect()
    }

    pub fn referenced_symbols(&self) -> BTreeSet<SymbolId> {
        self.iter()
            .filter_map(|node| match node {
                KineticLaw::Symbol(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Whether any call to a distribution function occurs in this law.
    pub fn contains_distribution(&self) -> bool {
        self.any(|node| matches!(node, KineticLaw::FuncCall { name, .. } if is_distribution_function(name)))
    }

    // ------------------------------------------------------------------------
    // In-place rewrites

    /// Replaces every `Species(target)` leaf by a fresh clone of `replacement`. Inserted
    /// clones are not visited again, so a replacement mentioning `target` does not
    /// recurse. Returns the number of replaced leaves.
    pub fn replace_species_with_law(&mut self, target: SpeciesId, replacement: &KineticLaw) -> usize {
        if let KineticLaw::Species(id) = self {
            if *id == target {
                *self = replacement.clone();
                return 1;
            }
            return 0;
        }
        let mut count = 0;
        traverse_law!(self, as_law_mut, |child| {
            count += child.replace_species_with_law(target, replacement)
        });
        count
    }

    /// Replaces all species in `substitution` simultaneously: a replacement that mentions
    /// another substituted species keeps that mention as is.
    pub fn substitute_species(&mut self, substitution: &BTreeMap<SpeciesId, KineticLaw>) -> usize {
        if let KineticLaw::Species(id) = self {
            return match substitution.get(id) {
                Some(replacement) => {
                    *self = replacement.clone();
                    1
                }
                None => 0,
            };
        }
        let mut count = 0;
        traverse_law!(self, as_law_mut, |child| {
            count += child.substitute_species(substitution)
        });
        count
    }

    pub fn set_real_value(&mut self, value: f64) {
        *self = KineticLaw::Real(value);
    }

    pub fn set_op(&mut self, op: BinaryOpKind, left: KineticLaw, right: KineticLaw) {
        *self = KineticLaw::binary(op, left, right);
    }
}

/// The value positions of piecewise children: every even index, plus a trailing
/// otherwise value.
pub fn piecewise_values(children: &[KineticLaw]) -> Vec<&KineticLaw> {
    children.iter().step_by(2).collect()
}

/// The condition positions of piecewise children.
pub fn piecewise_conditions(children: &[KineticLaw]) -> Vec<&KineticLaw> {
    let pairs = children.len() / 2;
    (0..pairs).map(|i| &children[2 * i + 1]).collect()
}

trait AsLawRef<'a> {
    fn as_law_ref(&'a self) -> &'a KineticLaw;
}

impl<'a> AsLawRef<'a> for Box<KineticLaw> {
    fn as_law_ref(&'a self) -> &'a KineticLaw {
        self.as_ref()
    }
}

impl<'a> AsLawRef<'a> for KineticLaw {
    fn as_law_ref(&'a self) -> &'a KineticLaw {
        self
    }
}

trait AsLawMut<'a> {
    fn as_law_mut(&'a mut self) -> &'a mut KineticLaw;
}

impl<'a> AsLawMut<'a> for Box<KineticLaw> {
    fn as_law_mut(&'a mut self) -> &'a mut KineticLaw {
        self.as_mut()
    }
}

impl<'a> AsLawMut<'a> for KineticLaw {
    fn as_law_mut(&'a mut self) -> &'a mut KineticLaw {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(i: u32) -> KineticLaw {
        KineticLaw::species(SpeciesId(i))
    }

    fn p(i: u32) -> KineticLaw {
        KineticLaw::symbol(SymbolId(i))
    }

    #[test]
    fn test_clone_is_deep() {
        let original = KineticLaw::mul(p(0), KineticLaw::pow(s(1), KineticLaw::int(2)));
        let mut copy = original.clone();
        assert_eq!(copy, original);
        copy.replace_species_with_law(SpeciesId(1), &KineticLaw::real(3.0));
        assert_ne!(copy, original);
        assert!(original.contains_species(SpeciesId(1)));
    }

    #[test]
    fn test_replace_leaves_no_target() {
        let mut law = KineticLaw::sub(
            KineticLaw::mul(p(0), KineticLaw::mul(s(1), s(1))),
            KineticLaw::mul(p(2), s(3)),
        );
        let replacement = KineticLaw::add(s(1), KineticLaw::real(1.0));
        let count = law.replace_species_with_law(SpeciesId(1), &replacement);
        assert_eq!(count, 2);
        // The inserted clones mention the target but are not expanded again.
        assert_eq!(
            law.iter()
                .filter(|n| n.as_species() == Some(SpeciesId(1)))
                .count(),
            2
        );
        let mut law = KineticLaw::mul(s(1), s(3));
        law.replace_species_with_law(SpeciesId(1), &KineticLaw::real(2.0));
        assert!(!law.contains_species(SpeciesId(1)));
    }

    #[test]
    fn test_substitute_is_simultaneous() {
        let mut law = KineticLaw::add(s(0), s(1));
        let substitution: BTreeMap<_, _> = [(SpeciesId(0), s(1)), (SpeciesId(1), s(0))]
            .into_iter()
            .collect();
        assert_eq!(law.substitute_species(&substitution), 2);
        assert_eq!(law, KineticLaw::add(s(1), s(0)));
    }

    #[test]
    fn test_iter_is_preorder() {
        let law = KineticLaw::add(s(0), KineticLaw::neg(s(1)));
        let kinds: Vec<_> = law.iter().map(|n| n.as_species()).collect();
        assert_eq!(kinds, vec![None, Some(SpeciesId(0)), None, Some(SpeciesId(1))]);
        assert_eq!(law.children().count(), 2);
    }

    #[test]
    fn test_map_bottom_up() {
        let law = KineticLaw::add(KineticLaw::int(1), KineticLaw::mul(KineticLaw::int(2), KineticLaw::int(3)));
        let mut visited = Vec::new();
        let mapped = law.map(&mut |n| {
            visited.push(n.is_op());
            match n {
                KineticLaw::Int(v) => KineticLaw::Int(v * 10),
                other => other,
            }
        });
        assert_eq!(visited, vec![false, false, false, true, true]);
        assert_eq!(
            mapped,
            KineticLaw::add(KineticLaw::int(10), KineticLaw::mul(KineticLaw::int(20), KineticLaw::int(30)))
        );
    }

    #[test]
    fn test_boolean_valued() {
        let cmp = KineticLaw::binary(BinaryOpKind::Lt, s(0), KineticLaw::real(1.0));
        assert!(cmp.is_boolean_valued());
        assert!(!KineticLaw::add(s(0), s(1)).is_boolean_valued());
        let piecewise = KineticLaw::Piecewise(vec![KineticLaw::real(1.0), cmp, KineticLaw::real(0.0)]);
        assert!(!piecewise.is_boolean_valued());
    }

    #[test]
    fn test_product_and_sum_of_empty() {
        assert_eq!(KineticLaw::product(vec![]), KineticLaw::Real(1.0));
        assert_eq!(KineticLaw::sum(vec![]), KineticLaw::Real(0.0));
        assert_eq!(KineticLaw::product(vec![s(0)]), s(0));
        assert_eq!(KineticLaw::power_of(s(0), 1), s(0));
    }

    #[test]
    fn test_distribution_detection() {
        let law = KineticLaw::mul(p(0), KineticLaw::call("normal", vec![KineticLaw::real(0.0), KineticLaw::real(1.0)]));
        assert!(law.contains_distribution());
        assert!(!KineticLaw::call("exp", vec![s(0)]).contains_distribution());
        assert_eq!(function_arity("root"), Some(2));
        assert_eq!(function_arity("my_function"), None);
    }
}

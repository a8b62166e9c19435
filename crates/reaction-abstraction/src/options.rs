// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Reduction options and the property store they are read from.

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

pub const RAPID_EQUILIBRIUM_CONDITION_1: &str = "reduction.rapid.equilibrium.condition.1";
pub const RAPID_EQUILIBRIUM_CONDITION_2: &str = "reduction.rapid.equilibrium.condition.2";
pub const PPTA_CONDITION_1: &str = "reduction.ppta.condition.1";
pub const OPERATOR_MAX_CONCENTRATION_THRESHOLD: &str =
    "reduction.operator.max.concentration.threshold";
pub const RNAP_MIN_CONCENTRATION_THRESHOLD: &str = "reduction.rnap.min.concentration.threshold";
pub const NARY_ORDER_MAX_LEVELS: &str = "reduction.nary.order.max.levels";
pub const NARY_ORDER_TOLERANCE: &str = "reduction.nary.order.tolerance";
pub const PIPELINE_MAX_ITERATIONS: &str = "reduction.pipeline.max.iterations";
pub const CONSTANTS_FOLD_SYMBOLS: &str = "reduction.constants.fold.symbols";

/// String key/value configuration injected by the host application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyStore {
    properties: BTreeMap<String, String>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl ToString) {
        self.properties.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    fn parse_or<T: FromStr + std::fmt::Display + Copy>(&self, key: &str, default: T) -> T {
        match self.get(key) {
            None => default,
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(
                    "property `{}` has unparsable value `{}`, using default {}",
                    key, raw, default
                );
                default
            }),
        }
    }

    /// Reads a float, falling back to `default` when the key is absent or unparsable.
    pub fn get_float(&self, key: &str, default: f64) -> f64 {
        self.parse_or(key, default)
    }

    /// Reads an unsigned integer, falling back to `default` when the key is absent or
    /// unparsable.
    pub fn get_uint(&self, key: &str, default: u64) -> u64 {
        self.parse_or(key, default)
    }
}

impl<K: ToString, V: ToString> FromIterator<(K, V)> for PropertyStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            properties: iter
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Thresholds and limits consulted by the abstraction methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReductionOptions {
    /// Minimum `kr / kcat` for the single-substrate rapid-equilibrium approximation.
    pub rapid_equilibrium_condition_1: f64,
    /// Minimum `kr / kcat` for every pair of the competitive rapid-equilibrium
    /// approximation.
    pub rapid_equilibrium_condition_2: f64,
    /// Minimum `(S0 + Km) / E0` for the total-enzyme quasi-steady-state approximation.
    pub ppta_condition_1: f64,
    /// Maximum total amount of an operator site that may be abstracted away.
    pub operator_max_concentration_threshold: f64,
    /// Minimum amount of an RNAP species for its operators to be abstracted away.
    pub rnap_min_concentration_threshold: f64,
    /// Maximum number of logical levels a species is split into.
    pub nary_order_max_levels: usize,
    /// Relative distance below which two critical levels are merged.
    pub nary_order_tolerance: f64,
    /// Bound on the rounds of a fixed-point pipeline run.
    pub pipeline_max_iterations: usize,
    /// Whether constant symbols are folded into numbers.
    pub fold_constant_symbols: bool,
}

impl Default for ReductionOptions {
    fn default() -> Self {
        Self {
            rapid_equilibrium_condition_1: 100.0,
            rapid_equilibrium_condition_2: 100.0,
            ppta_condition_1: 100.0,
            operator_max_concentration_threshold: 2.0,
            rnap_min_concentration_threshold: 100.0,
            nary_order_max_levels: 4,
            nary_order_tolerance: 0.1,
            pipeline_max_iterations: 16,
            fold_constant_symbols: false,
        }
    }
}

impl ReductionOptions {
    pub fn from_properties(properties: &PropertyStore) -> Self {
        let defaults = Self::default();
        Self {
            rapid_equilibrium_condition_1: properties.get_float(
                RAPID_EQUILIBRIUM_CONDITION_1,
                defaults.rapid_equilibrium_condition_1,
            ),
            rapid_equilibrium_condition_2: properties.get_float(
                RAPID_EQUILIBRIUM_CONDITION_2,
                defaults.rapid_equilibrium_condition_2,
            ),
            ppta_condition_1: properties.get_float(PPTA_CONDITION_1, defaults.ppta_condition_1),
            operator_max_concentration_threshold: properties.get_float(
                OPERATOR_MAX_CONCENTRATION_THRESHOLD,
                defaults.operator_max_concentration_threshold,
            ),
            rnap_min_concentration_threshold: properties.get_float(
                RNAP_MIN_CONCENTRATION_THRESHOLD,
                defaults.rnap_min_concentration_threshold,
            ),
            nary_order_max_levels: properties
                .get_uint(NARY_ORDER_MAX_LEVELS, defaults.nary_order_max_levels as u64)
                as usize,
            nary_order_tolerance: properties
                .get_float(NARY_ORDER_TOLERANCE, defaults.nary_order_tolerance),
            pipeline_max_iterations: properties.get_uint(
                PIPELINE_MAX_ITERATIONS,
                defaults.pipeline_max_iterations as u64,
            ) as usize,
            fold_constant_symbols: properties.get_uint(CONSTANTS_FOLD_SYMBOLS, 0) != 0,
        }
    }
}

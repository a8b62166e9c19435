// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Turns raw critical levels into the ordered, deduplicated level set used to split a
//! species.

use crate::options::ReductionOptions;
use itertools::Itertools;

#[derive(Debug, Clone, Copy)]
pub struct NaryOrderDecider {
    max_levels: usize,
    tolerance: f64,
}

impl NaryOrderDecider {
    pub fn new(max_levels: usize, tolerance: f64) -> Self {
        Self {
            max_levels,
            tolerance,
        }
    }

    pub fn from_options(options: &ReductionOptions) -> Self {
        Self::new(options.nary_order_max_levels, options.nary_order_tolerance)
    }

    /// Drops non-finite and non-positive values, sorts the rest and merges runs of equal
    /// values or values whose relative distance to the run's first value is below the
    /// tolerance (each run is replaced by its mean). At most `max_levels` of the lowest
    /// levels are kept.
    pub fn decide(&self, candidates: &[f64]) -> Vec<f64> {
        let sorted = candidates
            .iter()
            .copied()
            .filter(|v| v.is_finite() && *v > 0.0)
            .sorted_by(f64::total_cmp);
        let mut groups: Vec<Vec<f64>> = Vec::new();
        for value in sorted {
            let joins_last = groups.last().map_or(false, |group| {
                value == group[0] || (value - group[0]) / value < self.tolerance
            });
            if !joins_last {
                groups.push(Vec::new());
            }
            if let Some(group) = groups.last_mut() {
                group.push(value);
            }
        }
        groups
            .into_iter()
            .map(|g| g.iter().sum::<f64>() / g.len() as f64)
            .take(self.max_levels)
            .collect()
    }
}

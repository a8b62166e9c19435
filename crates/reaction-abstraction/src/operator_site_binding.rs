// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use crate::abstraction_pipeline::AbstractionMethod;
use crate::options::ReductionOptions;
use crate::site_binding::{eliminate_operator_site, find_operator_site};
use anyhow::Context;
use log::info;
use reaction_ir::{EdgeKind, Ir};

/// Removes low-copy operator sites and their complexes, replacing them by their
/// equilibrium occupancy.
pub struct OperatorSiteBindingRemover();

impl OperatorSiteBindingRemover {
    pub fn new() -> Box<Self> {
        Box::new(Self())
    }
}

impl AbstractionMethod for OperatorSiteBindingRemover {
    fn id(&self) -> &'static str {
        "operator-site-binding-remover"
    }

    fn apply(&self, ir: &mut Ir, options: &ReductionOptions) -> anyhow::Result<bool> {
        let mut changed = false;
        for operator in ir.species_ids() {
            if ir.species_edges(operator, EdgeKind::Reactant).next().is_none() {
                continue;
            }
            let Some(site) =
                find_operator_site(ir, operator, options.operator_max_concentration_threshold)
            else {
                continue;
            };
            let name = ir.species_node(operator)?.name().to_string();
            info!("removing operator site `{}`", name);
            eliminate_operator_site(ir, &site)
                .with_context(|| format!("while removing operator site `{}`", name))?;
            changed = true;
        }
        Ok(changed)
    }
}

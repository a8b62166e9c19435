// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use crate::{
    abstraction_pipeline::{AbstractionMethod, AbstractionPipeline},
    constants_simplifier::KineticLawConstantsSimplifier,
    dimerization_reduction::DimerizationReduction,
    enzyme_kinetics::{EnzymeKineticPpta, EnzymeKineticRapidEquilibrium1, EnzymeKineticRapidEquilibrium2},
    inducer_structure::InducerStructureTransformer,
    irrelevant_species_remover::IrrelevantSpeciesRemover,
    nary_order_unary::NaryOrderUnaryTransformer,
    operator_site_binding::OperatorSiteBindingRemover,
    options::ReductionOptions,
    pow_kinetic_law::PowKineticLawTransformer,
    rnap_operator_binding::RnapOperatorBindingRemover,
};
use anyhow::bail;
use once_cell::sync::Lazy;

/// Every method known to the factory, in default pipeline order.
fn all_methods() -> Vec<Box<dyn AbstractionMethod>> {
    vec![
        KineticLawConstantsSimplifier::new(),
        PowKineticLawTransformer::new(),
        IrrelevantSpeciesRemover::new(),
        DimerizationReduction::new(),
        OperatorSiteBindingRemover::new(),
        RnapOperatorBindingRemover::new(),
        InducerStructureTransformer::new(),
        EnzymeKineticRapidEquilibrium2::new(),
        EnzymeKineticRapidEquilibrium1::new(),
        EnzymeKineticPpta::new(),
        NaryOrderUnaryTransformer::new(),
    ]
}

pub static ALL_METHOD_IDS: Lazy<Vec<&'static str>> =
    Lazy::new(|| all_methods().iter().map(|m| m.id()).collect());

pub fn method_by_id(id: &str) -> Option<Box<dyn AbstractionMethod>> {
    all_methods().into_iter().find(|m| m.id() == id)
}

/// Builds a pipeline running the named methods in the given order.
pub fn pipeline_from_ids<S: AsRef<str>>(ids: &[S]) -> anyhow::Result<AbstractionPipeline> {
    let mut res = AbstractionPipeline::default();
    for id in ids {
        let Some(method) = method_by_id(id.as_ref()) else {
            bail!(
                "unknown abstraction method `{}` (known: {})",
                id.as_ref(),
                ALL_METHOD_IDS.join(", ")
            );
        };
        res.add_method(method);
    }
    Ok(res)
}

pub fn default_pipeline_with_options(options: &ReductionOptions) -> AbstractionPipeline {
    // NOTE: simplifications first so that pattern matchers see canonical laws.
    let mut methods: Vec<Box<dyn AbstractionMethod>> = vec![
        KineticLawConstantsSimplifier::new(),
        PowKineticLawTransformer::new(),
        IrrelevantSpeciesRemover::new(),
        // structural reductions
        DimerizationReduction::new(),
        OperatorSiteBindingRemover::new(),
        RnapOperatorBindingRemover::new(),
        InducerStructureTransformer::new(),
        // enzyme kinetics; the competitive form claims shared enzymes first
        EnzymeKineticRapidEquilibrium2::new(),
        EnzymeKineticRapidEquilibrium1::new(),
        EnzymeKineticPpta::new(),
    ];

    // discretisation should be the last one in the pipeline
    if options.nary_order_max_levels > 0 {
        methods.push(NaryOrderUnaryTransformer::new());
    }

    let mut res = AbstractionPipeline::default();
    for m in methods {
        res.add_method(m);
    }
    res
}

pub fn default_pipeline() -> AbstractionPipeline {
    default_pipeline_with_options(&ReductionOptions::default())
}

// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Abstraction methods for reaction networks.
//!
//! Each method recognises a local pattern in the [`reaction_ir::Ir`] (a dimerization, an
//! enzyme binding pair, an operator site, ...) and replaces it by a smaller network with
//! an approximate kinetic law. An [`AbstractionPipeline`] applies a sequence of methods
//! once or until none of them changes the IR.

pub mod abstraction_pipeline;
pub mod critical_concentration;
pub mod law_evaluator;
pub mod law_queries;
pub mod nary_order_decider;
pub mod options;
pub mod pipeline_factory;

// methods
pub mod constants_simplifier;
pub mod dimerization_reduction;
pub mod enzyme_kinetics;
pub mod inducer_structure;
pub mod irrelevant_species_remover;
pub mod nary_order_unary;
pub mod operator_site_binding;
pub mod pow_kinetic_law;
pub mod rnap_operator_binding;
pub mod site_binding;

pub use abstraction_pipeline::{AbstractionMethod, AbstractionPipeline};
pub use options::{PropertyStore, ReductionOptions};
pub use pipeline_factory::{default_pipeline, default_pipeline_with_options, method_by_id, pipeline_from_ids};

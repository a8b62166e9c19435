// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use crate::data::ids::{CompartmentId, EdgeId, ReactionId, SpeciesId, SymbolId};
use thiserror::Error;

/// Errors raised by IR construction, mutation and expression builders.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IrError {
    /// Input that is well-typed but semantically invalid (e.g. zero stoichiometry, a
    /// boolean operand for an arithmetic operator, a duplicate symbol name).
    #[error("wrong data: {0}")]
    WrongData(String),

    #[error("species {0} does not exist")]
    MissingSpecies(SpeciesId),

    #[error("reaction {0} does not exist")]
    MissingReaction(ReactionId),

    #[error("edge {0} does not exist")]
    MissingEdge(EdgeId),

    #[error("symbol {0} does not exist")]
    MissingSymbol(SymbolId),

    #[error("compartment {0} does not exist")]
    MissingCompartment(CompartmentId),

    /// A kinetic law could not be reduced to a number.
    #[error("expression is not evaluable: {0}")]
    NotEvaluable(String),
}

pub type IrResult<T> = Result<T, IrError>;

impl IrError {
    pub fn wrong_data(msg: impl Into<String>) -> Self {
        IrError::WrongData(msg.into())
    }
}

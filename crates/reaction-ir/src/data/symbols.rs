// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Global parameters and compartments referenced from kinetic laws.

use crate::data::ids::{CompartmentId, SymbolId};
use crate::error::{IrError, IrResult};
use bimap::btree::BiBTreeMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named global parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub value: f64,
    /// Whether the value is fixed for the whole simulation.
    pub constant: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compartment {
    pub id: CompartmentId,
    pub name: String,
    pub size: f64,
}

/// Symbol storage with a bidirectional id/name index. Names are unique.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolTable {
    symbols: BTreeMap<SymbolId, Symbol>,
    names: BiBTreeMap<SymbolId, String>,
}

impl SymbolTable {
    pub(crate) fn insert(&mut self, symbol: Symbol) -> IrResult<()> {
        if self.names.contains_right(&symbol.name) {
            return Err(IrError::wrong_data(format!(
                "symbol `{}` is already defined",
                symbol.name
            )));
        }
        self.names.insert(symbol.id, symbol.name.clone());
        self.symbols.insert(symbol.id, symbol);
        Ok(())
    }

    pub(crate) fn remove(&mut self, id: SymbolId) -> Option<Symbol> {
        self.names.remove_by_left(&id);
        self.symbols.remove(&id)
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(&id)
    }

    pub fn get_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        self.symbols.get_mut(&id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<SymbolId> {
        self.names.get_by_right(name).copied()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains_right(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

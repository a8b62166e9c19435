// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Reaction-network intermediate representation.
//!
//! The crate holds the two foundational data structures every abstraction method works on:
//!
//! - the IR graph ([`Ir`]): species and reaction nodes connected by stoichiometric edges,
//!   plus the global symbol and compartment tables;
//! - the kinetic-law expression tree ([`KineticLaw`]) attached to every reaction, together
//!   with its traversal, visitor and builder APIs.
//!
//! It does NOT read or write model files; a front end populates the [`Ir`] and a back end
//! consumes it after the reduction pipeline is done.

mod error;
pub mod data;
pub mod law;

pub use error::{IrError, IrResult};

// Graph structures (from data/mod.rs)
pub use data::{EdgeCursor, Ir, IrDisplay};

// Node and edge definitions (from data/nodes.rs)
pub use data::nodes::{
    Edge, EdgeKind, EdgeLists, InitialQuantity, IrNode, Mark, Reaction, Species,
};

// Global tables (from data/symbols.rs)
pub use data::symbols::{Compartment, Symbol, SymbolTable};

// Id types (from data/ids.rs)
pub use data::ids::{CompartmentId, EdgeId, ReactionId, SpeciesId, SymbolId};

// Expression tree (from law/mod.rs)
pub use law::{BinaryOpKind, KineticLaw, UnaryOpKind};

// Visitor protocol (from law/visitor.rs)
pub use law::visitor::{LawVisitor, LawVisitorMut};

// Rendering (from law/display.rs)
pub use law::display::LawDisplay;

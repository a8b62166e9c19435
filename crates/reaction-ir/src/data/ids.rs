// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Stable identifiers for IR entities.
//!
//! Ids are allocated monotonically by the owning [`crate::Ir`] and never reused, so a
//! removed node's id can never alias a node created later.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identifies a species node.
    SpeciesId,
    "s"
);
define_id!(
    /// Identifies a reaction node.
    ReactionId,
    "r"
);
define_id!(
    /// Identifies a stoichiometric edge.
    EdgeId,
    "e"
);
define_id!(
    /// Identifies a global parameter.
    SymbolId,
    "p"
);
define_id!(
    /// Identifies a compartment.
    CompartmentId,
    "c"
);

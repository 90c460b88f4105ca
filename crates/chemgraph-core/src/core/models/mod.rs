//! # Core Models Module
//!
//! Plain data types describing the pieces of a chemical structure graph. None of these types
//! maintain cross-element invariants on their own; they are stored in, and mutated through, the
//! [`Space`](crate::space::Space) arena.
//!
//! ## Key Components
//!
//! - [`ids`] - The [`ElementId`](ids::ElementId) arena handle
//! - [`element`] - The common element record (identity, back-references, info map, kind)
//! - [`node`] - Atoms, pseudoatoms and coordinates of graph vertices
//! - [`connector`] - Bond-like edges with order and type
//! - [`ctab`] - The ordered node/connector/anchor lists of a fragment
//! - [`fragment`] - Nodes that are sub-graphs, holding a table or a formula
//! - [`formula`] - Molecular formulas and isotope aggregation
//! - [`group`] - Registry-level selections with reference properties
//! - [`references`] - Static descriptors of reference-typed properties

pub mod connector;
pub mod ctab;
pub mod element;
pub mod formula;
pub mod fragment;
pub mod group;
pub mod ids;
pub mod node;
pub mod references;

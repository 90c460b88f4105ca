//! # Core Module
//!
//! Stateless building blocks of the structure graph: element records, connection tables,
//! fragments, molecular formulas, the reference relation list and addressing helpers.
//!
//! ## Architecture
//!
//! - **Structural Representation** ([`models`]) - Elements, nodes, connectors, fragments and formulas
//! - **Reference Tracking** ([`relations`]) - The `source.property -> destination` relation list
//! - **Utilities** ([`utils`]) - Index-stack addressing tokens and coordinate helpers
//!
//! Nothing in this module enforces invariants spanning several elements. That is the job of
//! the stateful [`space`](crate::space) layer, which owns every element and performs all
//! mutations.

pub mod models;
pub mod relations;
pub mod utils;

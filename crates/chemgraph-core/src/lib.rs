//! # chemgraph
//!
//! A mutable, in-memory graph model for chemical structures: atoms and nested fragments linked by
//! connectors, kept consistent under arbitrary structural edits.
//!
//! ## Architectural Philosophy
//!
//! Every element carries two independent back-references. The **containment axis** (parent and
//! child) nests sub-structures such as substituent groups inside fragments. The **registry axis**
//! (owner and owned) gives elements identity, lookup by id, and cross-reference tracking across
//! a whole document. The library is split into two layers along that line:
//!
//! - **[`core`]: The Foundation.** Stateless data models (elements, nodes, connectors, connection
//!   tables, fragments, formulas), the reference relation list, and addressing helpers.
//!
//! - **[`space`]: The Logic Core.** The stateful arena that owns every element. All mutations go
//!   through a [`Space`](space::Space), which keeps parent pointers, the registry, the symmetric
//!   node/connector incidence lists and reference relations in agreement, and reports changes to
//!   observers.
//!
//! The library emits [`tracing`] events but never installs a subscriber.

pub mod core;
pub mod space;

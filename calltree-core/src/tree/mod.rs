//! Tree construction strategies.
//!
//! - [`document`]: breadth-first decomposition of an already nested
//!   `{__data__, __children__}` document.
//! - [`call_graph`]: one rooted call tree per unit of a call graph, with
//!   nodes shared through a [`UnitArena`](crate::unit::UnitArena).

pub mod call_graph;
pub mod document;

pub use call_graph::{AdmissionPolicy, CallForest, CallTreeBuilder};
pub use document::{decompose, BfsDecomposition};

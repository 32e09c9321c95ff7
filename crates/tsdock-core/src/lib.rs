//! # tsdock Core Library
//!
//! Combinatorial generation and pruning of transition-state candidate
//! geometries for bimolecular and trimolecular reactions.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Molecule`,
//!   `MoleculeRegistry`, reactive atoms and their lobes) and the geometry
//!   kernel (rigid transforms, superposition, RMSD).
//!
//! - **[`engine`]: The Search Machinery.** Pairing enumeration, anchor
//!   alignment, rotational scanning, the pruning filters and the boundary
//!   to external refinement backends.
//!
//! - **[`workflows`]: The Public API.** Complete procedures built from the
//!   engine: [`workflows::embed::run`] produces a pruned pose population and
//!   [`workflows::refine::run`] refines and re-prunes it.

pub mod core;
pub mod engine;
pub mod workflows;

#[cfg(test)]
pub(crate) mod test_fixtures;

//! # Core Module
//!
//! Stateless building blocks shared by the embedding engine.
//!
//! - **Molecular Representation** ([`models`]) - Elements, bond graphs, reactive
//!   atoms, conformer ensembles and the molecule registry.
//! - **Geometry Kernel** ([`utils::geometry`]) - Rigid transforms, axis rotations,
//!   Kabsch superposition and RMSD.
//!
//! Nothing in this layer knows about pairings, poses or pruning; those live in
//! [`crate::engine`].

pub mod models;
pub mod utils;

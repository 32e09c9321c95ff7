//! # Core Models Module
//!
//! Data structures describing the reactants of an embedding run.
//!
//! ## Overview
//!
//! A [`molecule::Molecule`] couples fixed elements and connectivity with an
//! ensemble of conformers and the list of atoms that form new bonds in the
//! transition state. Reactive atoms are classified by their local bonding
//! geometry ([`reactive::ReactiveKind`]) and expose per-conformer approach
//! directions through [`reactive::LocalFrame`]. Molecules are collected in a
//! [`registry::MoleculeRegistry`], whose insertion order fixes both the
//! reference molecule and the atom numbering of every generated pose.
//!
//! ## Key Components
//!
//! - [`element`] - Supported elements and their covalent radii
//! - [`atom`] - Per-conformer atom views
//! - [`topology`] - Bond graphs, declared or inferred from distances
//! - [`reactive`] - Reactive-atom classification and lobe directions
//! - [`molecule`] - Molecules and conformers
//! - [`builder`] - Validated molecule construction
//! - [`registry`] - Ordered, immutable set of reactants
//!
//! ## Usage
//!
//! ```ignore
//! use tsdock::core::models::builder::MoleculeBuilder;
//! use tsdock::core::models::element::Element;
//!
//! let molecule = MoleculeBuilder::new("water")
//!     .elements(vec![Element::O, Element::H, Element::H])
//!     .conformer(positions)
//!     .reactive_atom(0)
//!     .build()?;
//! ```

pub mod atom;
pub mod builder;
pub mod element;
pub mod error;
pub mod ids;
pub mod molecule;
pub mod reactive;
pub mod registry;
pub mod topology;

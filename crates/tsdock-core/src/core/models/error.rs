use super::element::ParseElementError;
use crate::core::utils::geometry::GeometryError;
use thiserror::Error;

/// Errors raised while constructing or validating molecular input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("Molecule '{0}' has no atoms")]
    NoAtoms(String),

    #[error("Molecule '{0}' has an empty conformer ensemble")]
    EmptyEnsemble(String),

    #[error(
        "Conformer {conformer} of molecule '{molecule}' has {found} atoms, expected {expected}"
    )]
    AtomCountMismatch {
        molecule: String,
        conformer: usize,
        expected: usize,
        found: usize,
    },

    #[error("Atom index {index} is out of range for a molecule with {atom_count} atoms")]
    AtomIndexOutOfRange { index: usize, atom_count: usize },

    #[error("Atom {0} cannot be bonded to itself")]
    SelfBond(usize),

    #[error(
        "Conformer {conformer} of molecule '{molecule}' does not share the topology of the first conformer"
    )]
    TopologyMismatch { molecule: String, conformer: usize },

    #[error("Reactive atom {index} of molecule '{molecule}' is declared more than once")]
    DuplicateReactiveAtom { molecule: String, index: usize },

    #[error("Reactive atom {index} has {neighbors} bonded neighbors; expected one to three")]
    UnsupportedCoordination { index: usize, neighbors: usize },

    #[error("Reactive atom {index} has {neighbors} neighbors, incompatible with a {kind} center")]
    KindMismatch {
        index: usize,
        kind: String,
        neighbors: usize,
    },

    #[error(
        "Cannot resolve a {kind} frame for reactive atom {index} in conformer {conformer}: {source}"
    )]
    UnresolvableFrame {
        index: usize,
        conformer: usize,
        kind: String,
        #[source]
        source: GeometryError,
    },

    #[error("Molecule '{molecule}' has no conformer {conformer} (ensemble size {count})")]
    ConformerOutOfRange {
        molecule: String,
        conformer: usize,
        count: usize,
    },

    #[error("Atom {0} is not a reactive atom")]
    NotReactive(usize),

    #[error(transparent)]
    Element(#[from] ParseElementError),

    #[error("Molecule name '{0}' is already registered")]
    DuplicateName(String),
}

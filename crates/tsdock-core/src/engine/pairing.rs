use super::config::PinnedDistance;
use crate::core::models::element::Element;
use crate::core::models::registry::MoleculeRegistry;
use itertools::Itertools;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Scale applied to the sum of covalent radii to obtain a default forming distance.
pub const DEFAULT_DISTANCE_FACTOR: f64 = 1.45;

pub fn default_distance(a: Element, b: Element) -> f64 {
    DEFAULT_DISTANCE_FACTOR * (a.covalent_radius() + b.covalent_radius())
}

/// An atom addressed by molecule position in the registry and atom index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AtomRef {
    pub molecule: usize,
    pub atom: usize,
}

impl AtomRef {
    pub fn new(molecule: usize, atom: usize) -> Self {
        Self { molecule, atom }
    }
}

impl fmt::Display for AtomRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.molecule, self.atom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EmbedKind {
    /// Two molecules joined by a single forming bond.
    Open,
    /// Forming bonds that close a ring through every molecule.
    Cyclical,
}

/// One forming bond of a pairing and its target length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReactingPair {
    pub donor: AtomRef,
    pub acceptor: AtomRef,
    pub distance: f64,
}

impl ReactingPair {
    pub fn joins(&self, a: AtomRef, b: AtomRef) -> bool {
        (self.donor == a && self.acceptor == b) || (self.donor == b && self.acceptor == a)
    }
}

/// A run of consecutive ring atoms that belong to the same molecule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingSegment {
    pub molecule: usize,
    pub atoms: Vec<AtomRef>,
}

/// An assignment of reactive atoms to forming bonds.
///
/// Open pairings hold one pair and an empty ring. Cyclical pairings list the
/// ring atoms in cyclic order starting with the reference molecule; every
/// pair joins two ring neighbors from different molecules.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pairing {
    pub kind: EmbedKind,
    pub pairs: Vec<ReactingPair>,
    pub ring: Vec<AtomRef>,
}

impl Pairing {
    pub fn is_forming(&self, a: AtomRef, b: AtomRef) -> bool {
        self.pairs.iter().any(|pair| pair.joins(a, b))
    }

    pub fn pair_between(&self, a: AtomRef, b: AtomRef) -> Option<&ReactingPair> {
        self.pairs.iter().find(|pair| pair.joins(a, b))
    }

    /// Ring atoms grouped by molecule, in ring order.
    pub fn segments(&self) -> Vec<RingSegment> {
        let mut segments: Vec<RingSegment> = Vec::new();
        for &atom in &self.ring {
            match segments.last_mut() {
                Some(segment) if segment.molecule == atom.molecule => segment.atoms.push(atom),
                _ => segments.push(RingSegment {
                    molecule: atom.molecule,
                    atoms: vec![atom],
                }),
            }
        }
        segments
    }

    pub fn label(&self) -> String {
        self.pairs
            .iter()
            .map(|pair| format!("{}-{}", pair.donor, pair.acceptor))
            .join(" ")
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PairingError {
    #[error("Embedding requires two or three molecules, found {0}")]
    MoleculeCount(usize),

    #[error("Molecule '{0}' has no reactive atoms")]
    NoReactiveAtoms(String),

    #[error("Molecule '{molecule}' declares {count} reactive atoms; at most two are supported")]
    TooManyReactiveAtoms { molecule: String, count: usize },

    #[error("No pairing forms every pinned bond between reactive atoms")]
    NoCompatiblePairing,
}

/// Enumerates every pairing compatible with the reactive atoms of `registry`.
///
/// Two molecules with one reactive atom each give a single open pairing.
/// Every other layout closes a ring: the reference molecule's atoms come
/// first in declaration order, followed by each ordering of the remaining
/// molecules and each orientation of their two-atom segments. Rings that
/// form the same set of bonds are reported once. Pins between reactive atoms
/// of different molecules restrict the result to pairings forming that bond
/// and override its target distance.
pub fn enumerate_pairings(
    registry: &MoleculeRegistry,
    pins: &[PinnedDistance],
) -> Result<Vec<Pairing>, PairingError> {
    let count = registry.len();
    if !(2..=3).contains(&count) {
        return Err(PairingError::MoleculeCount(count));
    }

    let mut reactive: Vec<Vec<AtomRef>> = Vec::with_capacity(count);
    for (position, molecule) in registry.iter().enumerate() {
        let atoms: Vec<AtomRef> = molecule
            .reactive_atoms()
            .iter()
            .map(|r| AtomRef::new(position, r.index))
            .collect();
        match atoms.len() {
            0 => return Err(PairingError::NoReactiveAtoms(molecule.name().to_string())),
            1 | 2 => reactive.push(atoms),
            n => {
                return Err(PairingError::TooManyReactiveAtoms {
                    molecule: molecule.name().to_string(),
                    count: n,
                });
            }
        }
    }

    let distance_for = |a: AtomRef, b: AtomRef| -> f64 {
        pins.iter()
            .find(|pin| pin.joins(a, b))
            .map(|pin| pin.distance)
            .unwrap_or_else(|| default_distance(element_of(registry, a), element_of(registry, b)))
    };

    let mut pairings = Vec::new();
    if count == 2 && reactive[0].len() == 1 && reactive[1].len() == 1 {
        let (donor, acceptor) = (reactive[0][0], reactive[1][0]);
        pairings.push(Pairing {
            kind: EmbedKind::Open,
            pairs: vec![ReactingPair {
                donor,
                acceptor,
                distance: distance_for(donor, acceptor),
            }],
            ring: Vec::new(),
        });
    } else {
        let mut seen: HashSet<Vec<(AtomRef, AtomRef)>> = HashSet::new();
        for order in (1..count).permutations(count - 1) {
            let orientations = order
                .iter()
                .map(|&m| {
                    let forward = reactive[m].clone();
                    let mut options = vec![forward.clone()];
                    if forward.len() == 2 {
                        options.push(forward.into_iter().rev().collect());
                    }
                    options
                })
                .multi_cartesian_product();

            for oriented in orientations {
                let ring: Vec<AtomRef> = reactive[0]
                    .iter()
                    .copied()
                    .chain(oriented.into_iter().flatten())
                    .collect();
                let pairs: Vec<ReactingPair> = (0..ring.len())
                    .filter_map(|k| {
                        let (a, b) = (ring[k], ring[(k + 1) % ring.len()]);
                        (a.molecule != b.molecule).then(|| ReactingPair {
                            donor: a,
                            acceptor: b,
                            distance: distance_for(a, b),
                        })
                    })
                    .collect();
                let key: Vec<(AtomRef, AtomRef)> = pairs
                    .iter()
                    .map(|p| (p.donor.min(p.acceptor), p.donor.max(p.acceptor)))
                    .sorted()
                    .collect();
                if seen.insert(key) {
                    pairings.push(Pairing {
                        kind: EmbedKind::Cyclical,
                        pairs,
                        ring,
                    });
                }
            }
        }
    }

    let reactive_set: HashSet<AtomRef> = reactive.iter().flatten().copied().collect();
    let required: Vec<&PinnedDistance> = pins
        .iter()
        .filter(|pin| reactive_set.contains(&pin.first) && reactive_set.contains(&pin.second))
        .collect();
    if !required.is_empty() {
        pairings.retain(|pairing| {
            required
                .iter()
                .all(|pin| pairing.is_forming(pin.first, pin.second))
        });
        if pairings.is_empty() {
            return Err(PairingError::NoCompatiblePairing);
        }
    }

    Ok(pairings)
}

fn element_of(registry: &MoleculeRegistry, atom: AtomRef) -> Element {
    registry
        .by_position(atom.molecule)
        .and_then(|m| m.elements().get(atom.atom).copied())
        .unwrap_or(Element::C)
}

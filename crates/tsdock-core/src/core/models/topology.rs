use super::element::Element;
use super::error::ModelError;
use nalgebra::Point3;
use serde::Serialize;
use std::collections::BTreeSet;

/// Scale applied to the sum of covalent radii when inferring bonds from distances.
pub const BOND_TOLERANCE_FACTOR: f64 = 1.2;

/// Largest distance at which two atoms of the given elements are considered bonded.
pub fn bond_threshold(a: Element, b: Element) -> f64 {
    (a.covalent_radius() + b.covalent_radius()) * BOND_TOLERANCE_FACTOR
}

/// An undirected bond stored with `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Bond {
    pub a: usize,
    pub b: usize,
}

impl Bond {
    pub fn new(i: usize, j: usize) -> Self {
        if i <= j {
            Self { a: i, b: j }
        } else {
            Self { a: j, b: i }
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.a == index || self.b == index
    }

    pub fn other(&self, index: usize) -> Option<usize> {
        if self.a == index {
            Some(self.b)
        } else if self.b == index {
            Some(self.a)
        } else {
            None
        }
    }

    pub fn offset(&self, by: usize) -> Self {
        Self {
            a: self.a + by,
            b: self.b + by,
        }
    }
}

/// Connectivity of a single molecule, indexed by atom position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BondGraph {
    atom_count: usize,
    bonds: BTreeSet<Bond>,
    adjacency: Vec<Vec<usize>>,
}

impl BondGraph {
    pub fn new(atom_count: usize) -> Self {
        Self {
            atom_count,
            bonds: BTreeSet::new(),
            adjacency: vec![Vec::new(); atom_count],
        }
    }

    pub fn from_bonds(
        atom_count: usize,
        bonds: impl IntoIterator<Item = (usize, usize)>,
    ) -> Result<Self, ModelError> {
        let mut graph = Self::new(atom_count);
        for (i, j) in bonds {
            for index in [i, j] {
                if index >= atom_count {
                    return Err(ModelError::AtomIndexOutOfRange { index, atom_count });
                }
            }
            if i == j {
                return Err(ModelError::SelfBond(i));
            }
            graph.add_bond(i, j);
        }
        Ok(graph)
    }

    /// Builds the graph implied by interatomic distances.
    ///
    /// Two atoms are bonded when their separation is below [`bond_threshold`].
    /// `elements` and `positions` must have the same length; extra entries in the
    /// longer slice are ignored.
    pub fn infer(elements: &[Element], positions: &[Point3<f64>]) -> Self {
        let count = elements.len().min(positions.len());
        let mut graph = Self::new(count);
        for i in 0..count {
            for j in (i + 1)..count {
                let threshold = bond_threshold(elements[i], elements[j]);
                if (positions[i] - positions[j]).norm_squared() < threshold * threshold {
                    graph.add_bond(i, j);
                }
            }
        }
        graph
    }

    /// Adds a bond, returning `false` if it was already present.
    pub fn add_bond(&mut self, i: usize, j: usize) -> bool {
        let bond = Bond::new(i, j);
        if !self.bonds.insert(bond) {
            return false;
        }
        self.adjacency[bond.a].push(bond.b);
        self.adjacency[bond.b].push(bond.a);
        true
    }

    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.bonds.contains(&Bond::new(i, j))
    }

    /// Neighbors of `index` in insertion order; empty for out-of-range indices.
    pub fn neighbors(&self, index: usize) -> &[usize] {
        self.adjacency.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn bonds(&self) -> impl Iterator<Item = &Bond> {
        self.bonds.iter()
    }

    pub fn atom_count(&self) -> usize {
        self.atom_count
    }

    pub fn len(&self) -> usize {
        self.bonds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bonds.is_empty()
    }

    /// Bonds present in `other` but absent from `self`.
    pub fn bonds_missing_from<'a>(&'a self, other: &'a BondGraph) -> impl Iterator<Item = &'a Bond> {
        other.bonds.iter().filter(move |bond| !self.bonds.contains(*bond))
    }
}

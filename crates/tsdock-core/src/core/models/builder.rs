use super::element::Element;
use super::error::ModelError;
use super::molecule::{Conformer, Molecule};
use super::reactive::{LocalFrame, ReactiveAtom, ReactiveKind};
use super::topology::BondGraph;
use nalgebra::Point3;
use std::collections::HashSet;
use tracing::debug;

/// Assembles and validates a [`Molecule`].
///
/// Connectivity is taken from explicitly declared bonds when present and
/// inferred from the first conformer otherwise. Reactive atoms without a
/// forced kind are classified from the first conformer's geometry.
#[derive(Debug, Clone)]
pub struct MoleculeBuilder {
    name: String,
    elements: Vec<Element>,
    conformers: Vec<Vec<Point3<f64>>>,
    bonds: Option<Vec<(usize, usize)>>,
    reactive: Vec<(usize, Option<ReactiveKind>)>,
    verify_topology: bool,
}

impl MoleculeBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            elements: Vec::new(),
            conformers: Vec::new(),
            bonds: None,
            reactive: Vec::new(),
            verify_topology: true,
        }
    }

    pub fn elements(mut self, elements: Vec<Element>) -> Self {
        self.elements = elements;
        self
    }

    pub fn conformer(mut self, positions: Vec<Point3<f64>>) -> Self {
        self.conformers.push(positions);
        self
    }

    pub fn bond(mut self, i: usize, j: usize) -> Self {
        self.bonds.get_or_insert_with(Vec::new).push((i, j));
        self
    }

    pub fn bonds(mut self, bonds: impl IntoIterator<Item = (usize, usize)>) -> Self {
        self.bonds.get_or_insert_with(Vec::new).extend(bonds);
        self
    }

    pub fn reactive_atom(mut self, index: usize) -> Self {
        self.reactive.push((index, None));
        self
    }

    pub fn reactive_atom_with_kind(mut self, index: usize, kind: ReactiveKind) -> Self {
        self.reactive.push((index, Some(kind)));
        self
    }

    /// When enabled (the default), every conformer must infer the same bond
    /// graph as the first one.
    pub fn verify_topology(mut self, verify: bool) -> Self {
        self.verify_topology = verify;
        self
    }

    pub fn build(self) -> Result<Molecule, ModelError> {
        let atom_count = self.elements.len();
        if atom_count == 0 {
            return Err(ModelError::NoAtoms(self.name));
        }
        if self.conformers.is_empty() {
            return Err(ModelError::EmptyEnsemble(self.name));
        }
        for (conformer, positions) in self.conformers.iter().enumerate() {
            if positions.len() != atom_count {
                return Err(ModelError::AtomCountMismatch {
                    molecule: self.name,
                    conformer,
                    expected: atom_count,
                    found: positions.len(),
                });
            }
        }

        let topology = match &self.bonds {
            Some(bonds) => BondGraph::from_bonds(atom_count, bonds.iter().copied())?,
            None => BondGraph::infer(&self.elements, &self.conformers[0]),
        };

        if self.verify_topology && self.conformers.len() > 1 {
            let reference = BondGraph::infer(&self.elements, &self.conformers[0]);
            for (conformer, positions) in self.conformers.iter().enumerate().skip(1) {
                if BondGraph::infer(&self.elements, positions) != reference {
                    return Err(ModelError::TopologyMismatch {
                        molecule: self.name,
                        conformer,
                    });
                }
            }
        }

        let mut seen = HashSet::new();
        let mut reactive_atoms = Vec::with_capacity(self.reactive.len());
        for &(index, forced) in &self.reactive {
            if index >= atom_count {
                return Err(ModelError::AtomIndexOutOfRange { index, atom_count });
            }
            if !seen.insert(index) {
                return Err(ModelError::DuplicateReactiveAtom {
                    molecule: self.name,
                    index,
                });
            }
            let kind = match forced {
                Some(kind) => kind,
                None => {
                    let first = &self.conformers[0];
                    let neighbors = neighbor_positions(&topology, first, index);
                    ReactiveKind::classify(index, &first[index], &neighbors)?
                }
            };
            for (conformer, positions) in self.conformers.iter().enumerate() {
                let neighbors = neighbor_positions(&topology, positions, index);
                LocalFrame::resolve(index, conformer, kind, &positions[index], &neighbors)?;
            }
            debug!(molecule = %self.name, atom = index, kind = %kind, "Resolved reactive atom.");
            reactive_atoms.push(ReactiveAtom { index, kind });
        }

        Ok(Molecule {
            name: self.name,
            elements: self.elements,
            topology,
            reactive_atoms,
            conformers: self.conformers.into_iter().map(Conformer::new).collect(),
        })
    }
}

fn neighbor_positions(
    topology: &BondGraph,
    positions: &[Point3<f64>],
    index: usize,
) -> Vec<Point3<f64>> {
    topology
        .neighbors(index)
        .iter()
        .map(|&n| positions[n])
        .collect()
}

use super::atom::Atom;
use super::element::Element;
use super::error::ModelError;
use super::reactive::{LINEAR_REFERENCE_OFFSET, LocalFrame, ReactiveAtom, ReactiveKind};
use super::topology::BondGraph;
use crate::core::utils::geometry;
use nalgebra::Point3;

/// One set of Cartesian coordinates for every atom of a molecule, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct Conformer {
    positions: Vec<Point3<f64>>,
}

impl Conformer {
    pub fn new(positions: Vec<Point3<f64>>) -> Self {
        Self { positions }
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn position(&self, index: usize) -> Option<&Point3<f64>> {
        self.positions.get(index)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn centroid(&self) -> Option<Point3<f64>> {
        geometry::centroid(&self.positions)
    }
}

/// A reactant: fixed elements and connectivity plus an ensemble of conformers.
///
/// Molecules are immutable once built. Every conformer shares the atom order,
/// elements and topology, and every reactive atom resolves to a valid
/// [`LocalFrame`] in every conformer. Use [`super::builder::MoleculeBuilder`]
/// to construct one.
#[derive(Debug, Clone, PartialEq)]
pub struct Molecule {
    pub(super) name: String,
    pub(super) elements: Vec<Element>,
    pub(super) topology: BondGraph,
    pub(super) reactive_atoms: Vec<ReactiveAtom>,
    pub(super) conformers: Vec<Conformer>,
}

impl Molecule {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn atom_count(&self) -> usize {
        self.elements.len()
    }

    pub fn topology(&self) -> &BondGraph {
        &self.topology
    }

    /// Reactive atoms in declaration order.
    pub fn reactive_atoms(&self) -> &[ReactiveAtom] {
        &self.reactive_atoms
    }

    pub fn reactive_atom(&self, atom_index: usize) -> Option<&ReactiveAtom> {
        self.reactive_atoms.iter().find(|r| r.index == atom_index)
    }

    pub fn conformers(&self) -> &[Conformer] {
        &self.conformers
    }

    pub fn conformer(&self, index: usize) -> Option<&Conformer> {
        self.conformers.get(index)
    }

    pub fn conformer_count(&self) -> usize {
        self.conformers.len()
    }

    pub fn atoms(&self, conformer: usize) -> Option<impl Iterator<Item = Atom> + '_> {
        let conformer = self.conformers.get(conformer)?;
        Some(
            self.elements
                .iter()
                .zip(conformer.positions())
                .enumerate()
                .map(|(index, (element, position))| Atom::new(index, *element, *position)),
        )
    }

    pub fn heavy_atom_indices(&self) -> Vec<usize> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_hydrogen())
            .map(|(i, _)| i)
            .collect()
    }

    /// Resolves the local frame of a reactive atom in the given conformer.
    pub fn frame(&self, conformer: usize, atom_index: usize) -> Result<LocalFrame, ModelError> {
        let reactive = self
            .reactive_atom(atom_index)
            .ok_or(ModelError::NotReactive(atom_index))?;
        let coords =
            self.conformers
                .get(conformer)
                .ok_or_else(|| ModelError::ConformerOutOfRange {
                    molecule: self.name.clone(),
                    conformer,
                    count: self.conformers.len(),
                })?;
        let origin = coords.positions[atom_index];
        let neighbors: Vec<Point3<f64>> = self
            .topology
            .neighbors(atom_index)
            .iter()
            .map(|&n| coords.positions[n])
            .collect();
        let frame = LocalFrame::resolve(atom_index, conformer, reactive.kind, &origin, &neighbors)?;
        if reactive.kind != ReactiveKind::Linear {
            return Ok(frame);
        }
        // First off-axis atom by index; the same atom in every conformer.
        let reference = frame.bond_directions.first().and_then(|axis| {
            coords.positions.iter().find(|p| {
                geometry::project_perpendicular(&(*p - origin), axis).norm() >= LINEAR_REFERENCE_OFFSET
            })
        });
        Ok(match reference {
            Some(reference) => frame.oriented_toward(reference),
            None => frame,
        })
    }
}

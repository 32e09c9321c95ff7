use super::element::Element;
use super::error::ModelError;
use super::ids::MoleculeId;
use super::molecule::Molecule;
use slotmap::SlotMap;
use std::collections::HashMap;

/// The immutable set of reactants taking part in an embedding run.
///
/// Molecules keep their insertion order, which defines atom numbering in
/// every pose: the atoms of the first molecule come first, followed by
/// those of the second, and so on. The first molecule is the reference
/// frame that never moves during alignment.
#[derive(Debug, Clone, Default)]
pub struct MoleculeRegistry {
    molecules: SlotMap<MoleculeId, Molecule>,
    order: Vec<MoleculeId>,
    name_map: HashMap<String, MoleculeId>,
}

impl MoleculeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, molecule: Molecule) -> Result<MoleculeId, ModelError> {
        if self.name_map.contains_key(molecule.name()) {
            return Err(ModelError::DuplicateName(molecule.name().to_string()));
        }
        let name = molecule.name().to_string();
        let id = self.molecules.insert(molecule);
        self.order.push(id);
        self.name_map.insert(name, id);
        Ok(id)
    }

    pub fn get(&self, id: MoleculeId) -> Option<&Molecule> {
        self.molecules.get(id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<MoleculeId> {
        self.name_map.get(name).copied()
    }

    /// Position of a molecule in insertion order.
    pub fn position_of(&self, id: MoleculeId) -> Option<usize> {
        self.order.iter().position(|&other| other == id)
    }

    pub fn by_position(&self, position: usize) -> Option<&Molecule> {
        self.order.get(position).and_then(|&id| self.molecules.get(id))
    }

    pub fn ids(&self) -> &[MoleculeId] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &Molecule> {
        self.order.iter().filter_map(|&id| self.molecules.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn total_atoms(&self) -> usize {
        self.iter().map(Molecule::atom_count).sum()
    }

    /// Index of each molecule's first atom in the concatenated atom numbering.
    pub fn atom_offsets(&self) -> Vec<usize> {
        self.iter()
            .scan(0, |offset, molecule| {
                let start = *offset;
                *offset += molecule.atom_count();
                Some(start)
            })
            .collect()
    }

    /// Elements of every atom in concatenated order.
    pub fn elements(&self) -> Vec<Element> {
        self.iter()
            .flat_map(|m| m.elements().iter().copied())
            .collect()
    }

    pub fn conformer_counts(&self) -> Vec<usize> {
        self.iter().map(Molecule::conformer_count).collect()
    }
}

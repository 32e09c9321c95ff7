use crate::core::models::error::ModelError;
use crate::core::models::reactive::LocalFrame;
use crate::core::models::registry::MoleculeRegistry;
use crate::engine::pairing::AtomRef;
use kiddo::KdTree;
use std::collections::HashMap;

/// Local frames of every reactive atom, keyed by (molecule, conformer).
#[derive(Debug, Default, Clone)]
pub struct FrameCache {
    data: HashMap<(usize, usize), HashMap<usize, LocalFrame>>,
}

impl FrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(registry: &MoleculeRegistry) -> Result<Self, ModelError> {
        let mut cache = Self::new();
        for (position, molecule) in registry.iter().enumerate() {
            for conformer in 0..molecule.conformer_count() {
                for reactive in molecule.reactive_atoms() {
                    let frame = molecule.frame(conformer, reactive.index)?;
                    cache.insert(position, conformer, frame);
                }
            }
        }
        Ok(cache)
    }

    pub fn insert(&mut self, molecule: usize, conformer: usize, frame: LocalFrame) {
        self.data
            .entry((molecule, conformer))
            .or_default()
            .insert(frame.index, frame);
    }

    pub fn get(&self, atom: AtomRef, conformer: usize) -> Option<&LocalFrame> {
        self.data
            .get(&(atom.molecule, conformer))
            .and_then(|frames| frames.get(&atom.atom))
    }

    pub fn len(&self) -> usize {
        self.data.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// k-d trees over the atoms of every conformer, in the conformer's own frame.
#[derive(Default)]
pub struct SpatialIndexCache {
    data: HashMap<(usize, usize), KdTree<f64, 3>>,
}

impl SpatialIndexCache {
    pub fn build(registry: &MoleculeRegistry) -> Self {
        let mut data = HashMap::new();
        for (position, molecule) in registry.iter().enumerate() {
            for (index, conformer) in molecule.conformers().iter().enumerate() {
                let points: Vec<[f64; 3]> = conformer
                    .positions()
                    .iter()
                    .map(|p| [p.x, p.y, p.z])
                    .collect();
                let tree: KdTree<f64, 3> = (&points).into();
                data.insert((position, index), tree);
            }
        }
        Self { data }
    }

    pub fn get(&self, molecule: usize, conformer: usize) -> Option<&KdTree<f64, 3>> {
        self.data.get(&(molecule, conformer))
    }
}

use super::cache::{FrameCache, SpatialIndexCache};
use super::config::{ConfigError, EmbedConfig, RmsdSubset};
use super::error::EngineError;
use super::pairing::{AtomRef, Pairing, enumerate_pairings};
use super::progress::ProgressReporter;
use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use crate::core::models::reactive::LocalFrame;
use crate::core::models::registry::MoleculeRegistry;
use kiddo::KdTree;
use tracing::debug;

/// Read-only state shared by every worker of an embedding run.
///
/// Built once before any search work begins; construction performs all
/// configuration checks that need the molecules, so invalid input fails
/// before the first pose is generated.
pub struct EmbedContext<'a> {
    pub registry: &'a MoleculeRegistry,
    pub config: &'a EmbedConfig,
    pub reporter: &'a ProgressReporter<'a>,
    pairings: Vec<Pairing>,
    frames: FrameCache,
    spatial: SpatialIndexCache,
    offsets: Vec<usize>,
    elements: Vec<Element>,
    rmsd_atoms: Vec<usize>,
}

impl<'a> EmbedContext<'a> {
    pub fn new(
        registry: &'a MoleculeRegistry,
        config: &'a EmbedConfig,
        reporter: &'a ProgressReporter<'a>,
    ) -> Result<Self, EngineError> {
        for pin in &config.pruning.pins {
            for atom in [pin.first, pin.second] {
                let known = registry
                    .by_position(atom.molecule)
                    .is_some_and(|m| atom.atom < m.atom_count());
                if !known {
                    return Err(ConfigError::UnknownAtom {
                        molecule: atom.molecule,
                        atom: atom.atom,
                    }
                    .into());
                }
            }
        }

        let pairings = enumerate_pairings(registry, &config.pruning.pins)?;
        let frames = FrameCache::build(registry)?;
        let spatial = SpatialIndexCache::build(registry);
        let offsets = registry.atom_offsets();
        let elements = registry.elements();

        let rmsd_atoms: Vec<usize> = match config.pruning.rmsd_subset {
            RmsdSubset::All => (0..elements.len()).collect(),
            RmsdSubset::HeavyAtoms => {
                let heavy: Vec<usize> = registry
                    .iter()
                    .zip(&offsets)
                    .flat_map(|(molecule, &offset)| {
                        molecule
                            .heavy_atom_indices()
                            .into_iter()
                            .map(move |i| offset + i)
                    })
                    .collect();
                if heavy.len() < 3 {
                    (0..elements.len()).collect()
                } else {
                    heavy
                }
            }
        };

        debug!(
            pairings = pairings.len(),
            frames = frames.len(),
            rmsd_atoms = rmsd_atoms.len(),
            "Embedding context initialized."
        );

        Ok(Self {
            registry,
            config,
            reporter,
            pairings,
            frames,
            spatial,
            offsets,
            elements,
            rmsd_atoms,
        })
    }

    pub fn pairings(&self) -> &[Pairing] {
        &self.pairings
    }

    pub fn pairing(&self, index: usize) -> Option<&Pairing> {
        self.pairings.get(index)
    }

    pub fn molecule(&self, position: usize) -> Option<&'a Molecule> {
        self.registry.by_position(position)
    }

    pub fn molecule_count(&self) -> usize {
        self.registry.len()
    }

    pub fn frame(&self, atom: AtomRef, conformer: usize) -> Option<&LocalFrame> {
        self.frames.get(atom, conformer)
    }

    pub fn spatial_index(&self, molecule: usize, conformer: usize) -> Option<&KdTree<f64, 3>> {
        self.spatial.get(molecule, conformer)
    }

    pub fn atom_offset(&self, molecule: usize) -> usize {
        self.offsets.get(molecule).copied().unwrap_or(0)
    }

    /// Index of `atom` in the concatenated numbering used by pose coordinates.
    pub fn global_index(&self, atom: AtomRef) -> usize {
        self.atom_offset(atom.molecule) + atom.atom
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn total_atoms(&self) -> usize {
        self.elements.len()
    }

    /// Global indices of the atoms compared during RMSD deduplication.
    pub fn rmsd_atoms(&self) -> &[usize] {
        &self.rmsd_atoms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{EmbedConfigBuilder, PinnedDistance};
    use crate::test_fixtures;

    #[test]
    fn new_caches_frames_pairings_and_offsets() {
        let registry = test_fixtures::diels_alder_registry();
        let config = EmbedConfigBuilder::new().build().unwrap();
        let reporter = ProgressReporter::new();
        let context = EmbedContext::new(&registry, &config, &reporter).unwrap();

        assert_eq!(context.pairings().len(), 2);
        assert_eq!(context.molecule_count(), 2);
        assert_eq!(context.global_index(AtomRef::new(1, 1)), 11);
        assert_eq!(context.total_atoms(), 16);
        assert_eq!(context.rmsd_atoms(), &[0, 1, 2, 3, 10, 11]);
        assert!(context.frame(AtomRef::new(0, 3), 0).is_some());
        assert!(context.spatial_index(1, 0).is_some());
    }

    #[test]
    fn new_rejects_pins_on_unknown_atoms() {
        let registry = test_fixtures::addition_registry();
        let config = EmbedConfigBuilder::new()
            .pin(PinnedDistance::new(AtomRef::new(0, 0), AtomRef::new(1, 42), 2.0))
            .build()
            .unwrap();
        let reporter = ProgressReporter::new();
        let result = EmbedContext::new(&registry, &config, &reporter);
        assert!(matches!(
            result,
            Err(EngineError::Configuration(ConfigError::UnknownAtom {
                molecule: 1,
                atom: 42
            }))
        ));
    }

    #[test]
    fn all_atom_subset_includes_hydrogens() {
        let registry = test_fixtures::addition_registry();
        let config = EmbedConfigBuilder::new()
            .rmsd_subset(RmsdSubset::All)
            .build()
            .unwrap();
        let reporter = ProgressReporter::new();
        let context = EmbedContext::new(&registry, &config, &reporter).unwrap();
        assert_eq!(context.rmsd_atoms().len(), 10);
    }
}

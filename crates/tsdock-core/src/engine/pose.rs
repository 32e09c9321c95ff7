use super::context::EmbedContext;
use super::pairing::AtomRef;
use crate::core::utils::geometry::RigidTransform;
use nalgebra::{Point3, Unit, Vector3};
use serde::Serialize;

/// The lobe of a reactive atom used for a forming bond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LobeChoice {
    pub atom: AtomRef,
    pub lobe: usize,
}

/// How a pose was constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoseProvenance {
    /// Conformer index used for each molecule, in registry order.
    pub conformers: Vec<usize>,
    pub pairing: usize,
    /// Index of the seed alignment within its (conformers, pairing) task.
    pub seed: usize,
    /// Rotation step applied to each non-reference molecule.
    pub rotation_steps: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoseMetrics {
    /// Distances of the forming pairs, in pairing order.
    pub pair_distances: Vec<f64>,
    /// Product of the shrink multiplier and any ring-closure stretch used while embedding.
    pub embed_scale: f64,
    pub clash_count: Option<usize>,
    pub max_pin_deviation: Option<f64>,
    pub new_bonds: Option<usize>,
    pub nearest_rmsd: Option<f64>,
    pub energy: Option<f64>,
}

/// One candidate arrangement of every input molecule.
///
/// Coordinates are not stored; they are derived on demand from the
/// referenced conformers and the per-molecule rigid transforms. Only the
/// metrics are mutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    provenance: PoseProvenance,
    transforms: Vec<RigidTransform>,
    lobes: Vec<LobeChoice>,
    metrics: PoseMetrics,
}

impl Pose {
    pub fn new(
        provenance: PoseProvenance,
        transforms: Vec<RigidTransform>,
        lobes: Vec<LobeChoice>,
        embed_scale: f64,
    ) -> Self {
        Self {
            provenance,
            transforms,
            lobes,
            metrics: PoseMetrics {
                embed_scale,
                ..PoseMetrics::default()
            },
        }
    }

    pub fn provenance(&self) -> &PoseProvenance {
        &self.provenance
    }

    pub fn transforms(&self) -> &[RigidTransform] {
        &self.transforms
    }

    pub fn transform(&self, molecule: usize) -> Option<&RigidTransform> {
        self.transforms.get(molecule)
    }

    pub fn lobes(&self) -> &[LobeChoice] {
        &self.lobes
    }

    pub fn lobe_for(&self, atom: AtomRef) -> Option<usize> {
        self.lobes.iter().find(|c| c.atom == atom).map(|c| c.lobe)
    }

    pub fn metrics(&self) -> &PoseMetrics {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut PoseMetrics {
        &mut self.metrics
    }

    pub fn molecule_count(&self) -> usize {
        self.transforms.len()
    }

    /// Transformed coordinates of one molecule.
    pub fn molecule_coordinates(&self, ctx: &EmbedContext, molecule: usize) -> Vec<Point3<f64>> {
        let conformer = ctx.molecule(molecule).and_then(|m| {
            let index = *self.provenance.conformers.get(molecule)?;
            m.conformer(index)
        });
        match (conformer, self.transforms.get(molecule)) {
            (Some(conformer), Some(transform)) => transform.apply_all(conformer.positions()),
            _ => Vec::new(),
        }
    }

    /// Coordinates of every atom in concatenated registry order.
    pub fn coordinates(&self, ctx: &EmbedContext) -> Vec<Point3<f64>> {
        (0..self.molecule_count())
            .flat_map(|m| self.molecule_coordinates(ctx, m))
            .collect()
    }

    /// Coordinates restricted to the atoms listed in `indices`.
    pub fn subset_coordinates(&self, ctx: &EmbedContext, indices: &[usize]) -> Vec<Point3<f64>> {
        let all = self.coordinates(ctx);
        indices.iter().filter_map(|&i| all.get(i).copied()).collect()
    }

    pub fn atom_position(&self, ctx: &EmbedContext, atom: AtomRef) -> Option<Point3<f64>> {
        let molecule = ctx.molecule(atom.molecule)?;
        let conformer = molecule.conformer(*self.provenance.conformers.get(atom.molecule)?)?;
        let position = conformer.position(atom.atom)?;
        Some(self.transforms.get(atom.molecule)?.apply(position))
    }

    /// Direction of the chosen lobe of a reacting atom, in the pose frame.
    pub fn lobe_direction(&self, ctx: &EmbedContext, atom: AtomRef) -> Option<Unit<Vector3<f64>>> {
        let lobe = self.lobe_for(atom)?;
        let conformer = *self.provenance.conformers.get(atom.molecule)?;
        let frame = ctx.frame(atom, conformer)?;
        let direction = frame.lobe(lobe)?;
        let transform = self.transforms.get(atom.molecule)?;
        Some(Unit::new_unchecked(transform.apply_vector(direction)))
    }

    /// Records the current length of every forming bond of the pose's pairing.
    pub fn measure_pairs(&mut self, ctx: &EmbedContext) {
        let Some(pairing) = ctx.pairing(self.provenance.pairing) else {
            return;
        };
        self.metrics.pair_distances = pairing
            .pairs
            .iter()
            .filter_map(|pair| {
                let donor = self.atom_position(ctx, pair.donor)?;
                let acceptor = self.atom_position(ctx, pair.acceptor)?;
                Some(nalgebra::distance(&donor, &acceptor))
            })
            .collect();
    }
}

/// Ordered collection of surviving poses.
#[derive(Debug, Clone, Default)]
pub struct PosePopulation {
    poses: Vec<Pose>,
}

impl PosePopulation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pose: Pose) {
        self.poses.push(pose);
    }

    pub fn extend(&mut self, poses: impl IntoIterator<Item = Pose>) {
        self.poses.extend(poses);
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pose> {
        self.poses.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Pose> {
        self.poses.get(index)
    }

    pub fn as_slice(&self) -> &[Pose] {
        &self.poses
    }

    pub fn into_vec(self) -> Vec<Pose> {
        self.poses
    }
}

impl From<Vec<Pose>> for PosePopulation {
    fn from(poses: Vec<Pose>) -> Self {
        Self { poses }
    }
}

impl IntoIterator for PosePopulation {
    type Item = Pose;
    type IntoIter = std::vec::IntoIter<Pose>;

    fn into_iter(self) -> Self::IntoIter {
        self.poses.into_iter()
    }
}

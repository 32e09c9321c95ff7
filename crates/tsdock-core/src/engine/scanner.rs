use super::alignment::{DockingAxis, SeedAlignment};
use super::config::EmbedConfig;
use super::pairing::EmbedKind;
use super::pose::{Pose, PoseProvenance};
use crate::core::utils::geometry::RigidTransform;
use itertools::Itertools;
use std::f64::consts::TAU;

/// Sweeps the free rotation of every placed molecule about its docking axis.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationalScanner {
    angles: Vec<f64>,
}

impl RotationalScanner {
    /// Equal increments over the full turn, or over `[-range, +range)` degrees when a range is given.
    pub fn new(steps: usize, range_degrees: Option<f64>) -> Self {
        let steps = steps.max(1);
        let angles = match range_degrees {
            None => (0..steps).map(|k| k as f64 * TAU / steps as f64).collect(),
            Some(range) => {
                let range = range.to_radians();
                (0..steps)
                    .map(|k| -range + k as f64 * 2.0 * range / steps as f64)
                    .collect()
            }
        };
        Self { angles }
    }

    pub fn for_kind(config: &EmbedConfig, kind: EmbedKind) -> Self {
        Self::new(config.rotation_steps(kind), config.scan.range_degrees)
    }

    pub fn steps(&self) -> usize {
        self.angles.len()
    }

    /// Rotation angle of `step`, in radians.
    pub fn angle(&self, step: usize) -> Option<f64> {
        self.angles.get(step).copied()
    }

    pub fn step_transform(&self, axis: &DockingAxis, step: usize) -> RigidTransform {
        let angle = self.angle(step).unwrap_or(0.0);
        RigidTransform::about_axis(&axis.origin, &axis.direction, angle)
    }

    /// Number of poses produced for a seed with `scanned` rotatable molecules.
    pub fn poses_per_seed(&self, scanned: usize) -> u128 {
        (self.steps() as u128).saturating_pow(scanned as u32)
    }

    /// Expands a seed into one pose per point of the rotation grid.
    ///
    /// With several rotatable molecules the grid is their cartesian product,
    /// ordered lexicographically by step index in registry order.
    pub fn scan<'s>(
        &'s self,
        seed: &'s SeedAlignment,
        base: PoseProvenance,
    ) -> impl Iterator<Item = Pose> + 's {
        let scanned: Vec<(usize, DockingAxis)> = seed
            .axes
            .iter()
            .enumerate()
            .filter_map(|(m, axis)| axis.map(|a| (m, a)))
            .collect();
        let grid: Vec<Vec<usize>> = if scanned.is_empty() {
            vec![Vec::new()]
        } else {
            scanned
                .iter()
                .map(|_| 0..self.steps())
                .multi_cartesian_product()
                .collect()
        };

        grid.into_iter().map(move |steps| {
            let mut transforms = seed.transforms.clone();
            for ((molecule, axis), &step) in scanned.iter().zip(&steps) {
                transforms[*molecule] = transforms[*molecule].then(&self.step_transform(axis, step));
            }
            Pose::new(
                PoseProvenance {
                    rotation_steps: steps,
                    ..base.clone()
                },
                transforms,
                seed.lobes.clone(),
                seed.embed_scale,
            )
        })
    }
}

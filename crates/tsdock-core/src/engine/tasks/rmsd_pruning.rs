use crate::core::utils::geometry::superposed_rmsd;
use crate::engine::context::EmbedContext;
use crate::engine::pose::Pose;
use nalgebra::Point3;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Outcome of offering a structure to an [`RmsdDeduplicator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    /// Distinct from every representative; `nearest` is `None` for the first one.
    Accepted { nearest: Option<f64> },
    Duplicate { nearest: f64 },
}

/// Greedy representative set: a structure is kept only if its superposed RMSD
/// to every representative accepted before it exceeds the threshold.
///
/// Acceptance depends on offer order. The comparisons against existing
/// representatives run in parallel; the accept step is sequential.
#[derive(Debug, Clone)]
pub struct RmsdDeduplicator {
    threshold: f64,
    representatives: Vec<Vec<Point3<f64>>>,
}

impl RmsdDeduplicator {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            representatives: Vec::new(),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.representatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.representatives.is_empty()
    }

    /// Smallest superposed RMSD between `coordinates` and any representative.
    pub fn nearest(&self, coordinates: &[Point3<f64>]) -> Option<f64> {
        #[cfg(not(feature = "parallel"))]
        let iterator = self.representatives.iter();

        #[cfg(feature = "parallel")]
        let iterator = self.representatives.par_iter();

        iterator
            .map(|representative| {
                superposed_rmsd(coordinates, representative).unwrap_or(f64::INFINITY)
            })
            .min_by(|a, b| a.total_cmp(b))
    }

    pub fn offer(&mut self, coordinates: Vec<Point3<f64>>) -> Admission {
        match self.nearest(&coordinates) {
            Some(nearest) if nearest <= self.threshold => Admission::Duplicate { nearest },
            nearest => {
                self.representatives.push(coordinates);
                Admission::Accepted { nearest }
            }
        }
    }
}

/// Feeds `poses` through `deduplicator` in order, returning the accepted ones.
///
/// Each accepted pose records its RMSD to the nearest earlier representative.
#[instrument(skip_all, name = "rmsd_pruning_task", fields(poses = poses.len()))]
pub fn deduplicate(
    ctx: &EmbedContext,
    poses: Vec<Pose>,
    deduplicator: &mut RmsdDeduplicator,
) -> (Vec<Pose>, usize) {
    let mut duplicates = 0;
    let mut kept = Vec::with_capacity(poses.len());
    for mut pose in poses {
        let coordinates = pose.subset_coordinates(ctx, ctx.rmsd_atoms());
        match deduplicator.offer(coordinates) {
            Admission::Accepted { nearest } => {
                pose.metrics_mut().nearest_rmsd = nearest;
                kept.push(pose);
            }
            Admission::Duplicate { .. } => duplicates += 1,
        }
    }
    debug!(
        kept = kept.len(),
        duplicates,
        representatives = deduplicator.len(),
        "RMSD pruning pass complete."
    );
    (kept, duplicates)
}

/// Deduplication split by pairing: each group keeps its own representatives
/// while poses stream in, and [`PartitionedDeduplicator::merge`] reconciles
/// the groups with a final greedy pass.
#[derive(Debug, Clone)]
pub struct PartitionedDeduplicator {
    threshold: f64,
    groups: BTreeMap<usize, RmsdDeduplicator>,
}

impl PartitionedDeduplicator {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            groups: BTreeMap::new(),
        }
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn deduplicate(&mut self, ctx: &EmbedContext, poses: Vec<Pose>) -> (Vec<Pose>, usize) {
        let mut duplicates = 0;
        let mut kept = Vec::with_capacity(poses.len());
        for mut pose in poses {
            let group = self
                .groups
                .entry(pose.provenance().pairing)
                .or_insert_with(|| RmsdDeduplicator::new(self.threshold));
            match group.offer(pose.subset_coordinates(ctx, ctx.rmsd_atoms())) {
                Admission::Accepted { nearest } => {
                    pose.metrics_mut().nearest_rmsd = nearest;
                    kept.push(pose);
                }
                Admission::Duplicate { .. } => duplicates += 1,
            }
        }
        (kept, duplicates)
    }

    /// Greedy pass over the group survivors in their original order.
    pub fn merge(&self, ctx: &EmbedContext, survivors: Vec<Pose>) -> (Vec<Pose>, usize) {
        let mut global = RmsdDeduplicator::new(self.threshold);
        deduplicate(ctx, survivors, &mut global)
    }
}

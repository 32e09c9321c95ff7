//! Pruning filters applied to candidate poses.
//!
//! Geometric filters implement [`PoseFilter`] and are chained by a
//! [`FilterPipeline`], which evaluates each pose independently (in parallel
//! when the `parallel` feature is enabled) and stops at the first rejection.
//! RMSD deduplication and the post-refinement checks are order dependent or
//! operate on refined coordinates, so they live in their own modules and are
//! driven directly by the workflows.

pub mod clash_detection;
pub mod distance_pins;
pub mod energy_window;
pub mod new_bonds;
pub mod rmsd_pruning;
pub mod suprafacial;

use crate::engine::config::PruningConfig;
use crate::engine::context::EmbedContext;
use crate::engine::pose::Pose;
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, instrument, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A stateless accept/reject test on a single pose.
///
/// Implementations may record what they measured in the pose metrics.
pub trait PoseFilter: Send + Sync {
    fn name(&self) -> &'static str;

    fn accept(&self, ctx: &EmbedContext, pose: &mut Pose) -> bool;
}

/// Counts of poses seen and dropped at each pruning stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PruningStats {
    pub generated: usize,
    pub rejected: Vec<(&'static str, usize)>,
    pub duplicates: usize,
    pub survivors: usize,
}

impl PruningStats {
    pub fn record(&mut self, stage: &'static str, count: usize) {
        match self.rejected.iter_mut().find(|(name, _)| *name == stage) {
            Some((_, total)) => *total += count,
            None => self.rejected.push((stage, count)),
        }
    }

    pub fn rejected_by(&self, stage: &str) -> usize {
        self.rejected
            .iter()
            .find(|(name, _)| *name == stage)
            .map_or(0, |(_, count)| *count)
    }

    pub fn summary(&self) -> String {
        let stages = self
            .rejected
            .iter()
            .map(|(name, count)| format!("{name}: {count}"))
            .join(", ");
        if stages.is_empty() {
            format!("{} duplicates removed", self.duplicates)
        } else {
            format!("rejected by {stages}; {} duplicates removed", self.duplicates)
        }
    }
}

/// Ordered chain of pose filters.
#[derive(Default)]
pub struct FilterPipeline {
    filters: Vec<Box<dyn PoseFilter>>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clash filter, then pins when any are set, then the suprafacial test when enabled.
    pub fn from_config(config: &PruningConfig) -> Self {
        let mut pipeline = Self::new().with_filter(clash_detection::ClashFilter::new(config.clash));
        if !config.pins.is_empty() {
            pipeline = pipeline.with_filter(distance_pins::PinFilter::new(
                config.pins.clone(),
                config.pin_tolerance,
            ));
        }
        if config.suprafacial_only {
            pipeline = pipeline.with_filter(suprafacial::SuprafacialFilter);
        }
        pipeline
    }

    pub fn with_filter(mut self, filter: impl PoseFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Index of the first filter rejecting `pose`, if any.
    fn verdict(&self, ctx: &EmbedContext, pose: &mut Pose) -> Option<usize> {
        self.filters.iter().position(|filter| {
            let accepted = filter.accept(ctx, pose);
            if !accepted {
                trace!(filter = filter.name(), provenance = ?pose.provenance(), "Pose rejected.");
            }
            !accepted
        })
    }

    /// Returns the poses that pass every filter, in input order.
    #[instrument(skip_all, name = "filter_pipeline", fields(poses = poses.len()))]
    pub fn run(&self, ctx: &EmbedContext, poses: Vec<Pose>, stats: &mut PruningStats) -> Vec<Pose> {
        #[cfg(not(feature = "parallel"))]
        let iterator = poses.into_iter();

        #[cfg(feature = "parallel")]
        let iterator = poses.into_par_iter();

        let evaluated: Vec<(Pose, Option<usize>)> = iterator
            .map(|mut pose| {
                let verdict = self.verdict(ctx, &mut pose);
                (pose, verdict)
            })
            .collect();

        let mut rejected = vec![0usize; self.filters.len()];
        let survivors: Vec<Pose> = evaluated
            .into_iter()
            .filter_map(|(pose, verdict)| match verdict {
                Some(index) => {
                    rejected[index] += 1;
                    None
                }
                None => Some(pose),
            })
            .collect();

        for (filter, count) in self.filters.iter().zip(rejected) {
            stats.record(filter.name(), count);
        }
        debug!(survivors = survivors.len(), "Filter pipeline pass complete.");
        survivors
    }
}

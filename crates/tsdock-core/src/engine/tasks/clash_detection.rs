use super::PoseFilter;
use crate::engine::config::ClashCriteria;
use crate::engine::context::EmbedContext;
use crate::engine::pairing::AtomRef;
use crate::engine::pose::Pose;
use itertools::Itertools;
use kiddo::SquaredEuclidean;

/// Counts inter-molecular atom pairs of `pose` closer than `distance`.
///
/// Forming pairs of the pose's pairing are not clashes. Intra-molecular
/// pairs are never counted since each conformer is placed rigidly.
pub fn count_clashes(ctx: &EmbedContext, pose: &Pose, distance: f64) -> usize {
    let pairing = ctx.pairing(pose.provenance().pairing);
    let radius_sq = distance * distance;
    let conformers = &pose.provenance().conformers;

    (0..pose.molecule_count())
        .tuple_combinations()
        .map(|(i, j)| {
            let (Some(tree), Some(molecule_j), Some(ti), Some(tj)) = (
                ctx.spatial_index(i, conformers[i]),
                ctx.molecule(j),
                pose.transform(i),
                pose.transform(j),
            ) else {
                return 0;
            };
            let Some(conformer_j) = molecule_j.conformer(conformers[j]) else {
                return 0;
            };
            // Query j's atoms in the untransformed frame of molecule i.
            let into_i = tj.then(&ti.inverse());
            conformer_j
                .positions()
                .iter()
                .enumerate()
                .map(|(b, position)| {
                    let p = into_i.apply(position);
                    tree.within_unsorted::<SquaredEuclidean>(&[p.x, p.y, p.z], radius_sq)
                        .iter()
                        .filter(|hit| hit.distance < radius_sq)
                        .filter(|hit| {
                            let a = AtomRef::new(i, hit.item as usize);
                            !pairing.is_some_and(|pairing| pairing.is_forming(a, AtomRef::new(j, b)))
                        })
                        .count()
                })
                .sum::<usize>()
        })
        .sum()
}

/// Rejects poses with more short contacts than allowed.
#[derive(Debug, Clone, Copy)]
pub struct ClashFilter {
    criteria: ClashCriteria,
}

impl ClashFilter {
    pub fn new(criteria: ClashCriteria) -> Self {
        Self { criteria }
    }
}

impl PoseFilter for ClashFilter {
    fn name(&self) -> &'static str {
        "clash"
    }

    fn accept(&self, ctx: &EmbedContext, pose: &mut Pose) -> bool {
        let clashes = count_clashes(ctx, pose, self.criteria.distance);
        pose.metrics_mut().clash_count = Some(clashes);
        clashes <= self.criteria.max_clashes
    }
}

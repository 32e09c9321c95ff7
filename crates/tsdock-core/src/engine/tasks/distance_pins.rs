use super::PoseFilter;
use crate::engine::config::PinnedDistance;
use crate::engine::context::EmbedContext;
use crate::engine::pose::Pose;

/// Rejects poses whose pinned atom pairs deviate from their requested distances.
///
/// A pin on a forming pair is compared against the distance the pair was
/// embedded at, which includes any shrink or ring-closure stretch.
#[derive(Debug, Clone)]
pub struct PinFilter {
    pins: Vec<PinnedDistance>,
    tolerance: f64,
}

impl PinFilter {
    pub fn new(pins: Vec<PinnedDistance>, tolerance: f64) -> Self {
        Self { pins, tolerance }
    }

    /// Largest absolute deviation over all pins, or `None` if a pinned atom cannot be located.
    pub fn max_deviation(&self, ctx: &EmbedContext, pose: &Pose) -> Option<f64> {
        let pairing = ctx.pairing(pose.provenance().pairing);
        self.pins.iter().try_fold(0.0f64, |worst, pin| {
            let first = pose.atom_position(ctx, pin.first)?;
            let second = pose.atom_position(ctx, pin.second)?;
            let forming = pairing.is_some_and(|p| p.is_forming(pin.first, pin.second));
            let expected = if forming {
                pin.distance * pose.metrics().embed_scale
            } else {
                pin.distance
            };
            Some(worst.max(((first - second).norm() - expected).abs()))
        })
    }
}

impl PoseFilter for PinFilter {
    fn name(&self) -> &'static str {
        "distance-pin"
    }

    fn accept(&self, ctx: &EmbedContext, pose: &mut Pose) -> bool {
        match self.max_deviation(ctx, pose) {
            Some(deviation) => {
                pose.metrics_mut().max_pin_deviation = Some(deviation);
                deviation <= self.tolerance
            }
            None => false,
        }
    }
}

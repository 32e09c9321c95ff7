use super::PoseFilter;
use crate::engine::context::EmbedContext;
use crate::engine::pairing::EmbedKind;
use crate::engine::pose::Pose;

/// Whether every molecule contributing two ring atoms uses lobes on one face.
///
/// Open poses have no ring and always pass.
pub fn is_suprafacial(ctx: &EmbedContext, pose: &Pose) -> bool {
    let Some(pairing) = ctx.pairing(pose.provenance().pairing) else {
        return false;
    };
    if pairing.kind == EmbedKind::Open {
        return true;
    }
    pairing
        .segments()
        .iter()
        .filter(|segment| segment.atoms.len() == 2)
        .all(|segment| {
            match (
                pose.lobe_direction(ctx, segment.atoms[0]),
                pose.lobe_direction(ctx, segment.atoms[1]),
            ) {
                (Some(first), Some(second)) => first.dot(&second.into_inner()) > 0.0,
                _ => false,
            }
        })
}

/// Rejects antarafacial ring arrangements.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuprafacialFilter;

impl PoseFilter for SuprafacialFilter {
    fn name(&self) -> &'static str {
        "suprafacial"
    }

    fn accept(&self, ctx: &EmbedContext, pose: &mut Pose) -> bool {
        is_suprafacial(ctx, pose)
    }
}

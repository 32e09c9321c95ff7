use super::config::NebSettings;
use super::context::EmbedContext;
use super::error::EngineError;
use super::refine::{
    CancellationFlag, PoolLimits, RefinedStructure, RefinementFailure, run_bounded,
};
use crate::core::models::element::Element;
use crate::core::utils::geometry::normalize;
use nalgebra::Point3;
use std::sync::Arc;
use tracing::{debug, warn};

/// Extra separation of the reactant-like endpoint beyond bonding distance, in Angstrom.
pub const REACTANT_SEPARATION: f64 = 1.5;

#[derive(Debug, Clone, PartialEq)]
pub struct NebRequest {
    pub index: usize,
    pub elements: Vec<Element>,
    pub reactant: Vec<Point3<f64>>,
    pub product: Vec<Point3<f64>>,
    /// The refined structure the path is expected to pass near.
    pub transition_guess: Vec<Point3<f64>>,
    pub images: usize,
    pub preoptimize: bool,
    pub theory_level: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NebOutcome {
    pub transition_state: Vec<Point3<f64>>,
    pub energy: Option<f64>,
}

/// External transition-state search seeded with two endpoints.
pub trait TransitionStateSearch: Send + Sync + 'static {
    fn search(
        &self,
        request: &NebRequest,
        cancel: &CancellationFlag,
    ) -> Result<NebOutcome, RefinementFailure>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct NebResult {
    /// Position of the source structure in the refined population.
    pub index: usize,
    pub outcome: Result<NebOutcome, RefinementFailure>,
}

/// Product-like and reactant-like endpoints for `structure`.
///
/// The acceptor molecule of the first forming pair is slid along the
/// donor-acceptor line until the pair sits at covalent bonding distance
/// (product), and then a further [`REACTANT_SEPARATION`] away (reactant).
/// Returns `None` when the pair atoms coincide.
pub fn endpoints(
    ctx: &EmbedContext,
    structure: &RefinedStructure,
) -> Option<(Vec<Point3<f64>>, Vec<Point3<f64>>)> {
    let pairing = ctx.pairing(structure.pose.provenance().pairing)?;
    let pair = pairing.pairs.first()?;
    let donor = *structure.coordinates.get(ctx.global_index(pair.donor))?;
    let acceptor = *structure.coordinates.get(ctx.global_index(pair.acceptor))?;
    let direction = normalize(&(acceptor - donor)).ok()?;

    let elements = ctx.elements();
    let bonded = elements.get(ctx.global_index(pair.donor))?.covalent_radius()
        + elements.get(ctx.global_index(pair.acceptor))?.covalent_radius();
    let current = nalgebra::distance(&donor, &acceptor);

    let start = ctx.atom_offset(pair.acceptor.molecule);
    let end = start + ctx.molecule(pair.acceptor.molecule)?.atom_count();
    let slide = |shift: f64| -> Vec<Point3<f64>> {
        structure
            .coordinates
            .iter()
            .enumerate()
            .map(|(i, p)| {
                if (start..end).contains(&i) {
                    p + direction.into_inner() * shift
                } else {
                    *p
                }
            })
            .collect()
    };

    let product = slide(bonded - current);
    let reactant = slide(bonded + REACTANT_SEPARATION - current);
    Some((product, reactant))
}

/// Issues one transition-state search per refined structure.
///
/// `structures` is the whole refined population; result indices point into
/// it. Structures that kept their embedded geometry are not searched, and
/// those whose endpoints cannot be built are skipped with a warning.
pub async fn search_transition_states(
    ctx: &EmbedContext<'_>,
    structures: &[RefinedStructure],
    settings: NebSettings,
    search: Arc<dyn TransitionStateSearch>,
) -> Result<Vec<NebResult>, EngineError> {
    let mut requests = Vec::with_capacity(structures.len());
    for (index, structure) in structures.iter().enumerate() {
        if !structure.is_refined() {
            debug!(index, "Structure was not refined; no transition-state search.");
            continue;
        }
        match endpoints(ctx, structure) {
            Some((product, reactant)) => requests.push(NebRequest {
                index,
                elements: ctx.elements().to_vec(),
                reactant,
                product,
                transition_guess: structure.coordinates.clone(),
                images: settings.images,
                preoptimize: settings.preoptimize,
                theory_level: ctx.config.refinement.theory_level.clone(),
            }),
            None => warn!(index, "Could not build NEB endpoints; skipping structure."),
        }
    }
    debug!(requests = requests.len(), images = settings.images, "Dispatching NEB requests.");

    let indices: Vec<usize> = requests.iter().map(|r| r.index).collect();
    let limits = PoolLimits {
        workers: ctx.config.refinement.workers,
        timeout: ctx.config.refinement.timeout,
    };
    let outcomes = run_bounded(requests, limits, ctx.reporter, move |request, cancel| {
        search.search(&request, cancel)
    })
    .await?;

    Ok(indices
        .into_iter()
        .zip(outcomes)
        .map(|(index, outcome)| {
            if let Err(failure) = &outcome {
                warn!(index, %failure, "Transition-state search failed.");
            }
            NebResult { index, outcome }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::utils::geometry::RigidTransform;
    use crate::engine::config::{DEFAULT_NEB_IMAGES, EmbedConfigBuilder};
    use crate::engine::pairing::AtomRef;
    use crate::engine::pose::{Pose, PoseProvenance};
    use crate::engine::progress::ProgressReporter;
    use crate::test_fixtures;
    use nalgebra::Vector3;

    fn structure_at(ctx: &EmbedContext, height: f64) -> RefinedStructure {
        let pose = Pose::new(
            PoseProvenance {
                conformers: vec![0, 0],
                pairing: 0,
                seed: 0,
                rotation_steps: vec![0],
            },
            vec![
                RigidTransform::identity(),
                RigidTransform::from_translation(Vector3::new(0.0, 0.0, height)),
            ],
            Vec::new(),
            1.0,
        );
        RefinedStructure {
            coordinates: pose.coordinates(ctx),
            pose,
            energy: Some(-1.0),
            failure: None,
        }
    }

    #[test]
    fn endpoints_slide_acceptor_molecule_only() {
        let registry = test_fixtures::addition_registry();
        let config = EmbedConfigBuilder::new().build().unwrap();
        let reporter = ProgressReporter::new();
        let ctx = EmbedContext::new(&registry, &config, &reporter).unwrap();
        let structure = structure_at(&ctx, 2.2);

        let (product, reactant) = endpoints(&ctx, &structure).unwrap();
        let oxygen = ctx.global_index(AtomRef::new(0, 0));
        let carbon = ctx.global_index(AtomRef::new(1, 0));
        let bonded = Element::O.covalent_radius() + Element::C.covalent_radius();

        assert!((nalgebra::distance(&product[oxygen], &product[carbon]) - bonded).abs() < 1e-9);
        assert!(
            (nalgebra::distance(&reactant[oxygen], &reactant[carbon]) - bonded - REACTANT_SEPARATION)
                .abs()
                < 1e-9
        );
        assert_eq!(product[..4], structure.coordinates[..4]);
        let shift = product[5] - structure.coordinates[5];
        assert!((shift - (product[carbon] - structure.coordinates[carbon])).norm() < 1e-12);
    }

    #[test]
    fn endpoints_require_distinct_pair_atoms() {
        let registry = test_fixtures::addition_registry();
        let config = EmbedConfigBuilder::new().build().unwrap();
        let reporter = ProgressReporter::new();
        let ctx = EmbedContext::new(&registry, &config, &reporter).unwrap();
        assert!(endpoints(&ctx, &structure_at(&ctx, 0.0)).is_none());
    }

    struct EchoGuess;

    impl TransitionStateSearch for EchoGuess {
        fn search(
            &self,
            request: &NebRequest,
            _cancel: &CancellationFlag,
        ) -> Result<NebOutcome, RefinementFailure> {
            if request.images != DEFAULT_NEB_IMAGES {
                return Err(RefinementFailure::Backend("unexpected image count".into()));
            }
            Ok(NebOutcome {
                transition_state: request.transition_guess.clone(),
                energy: Some(12.0),
            })
        }
    }

    #[tokio::test]
    async fn search_skips_degenerate_structures_and_keeps_indices() {
        let registry = test_fixtures::addition_registry();
        let config = EmbedConfigBuilder::new().build().unwrap();
        let reporter = ProgressReporter::new();
        let ctx = EmbedContext::new(&registry, &config, &reporter).unwrap();
        let structures = vec![
            structure_at(&ctx, 2.2),
            structure_at(&ctx, 0.0),
            structure_at(&ctx, 2.4),
        ];
        let settings = NebSettings {
            images: DEFAULT_NEB_IMAGES,
            preoptimize: false,
        };

        let results = search_transition_states(&ctx, &structures, settings, Arc::new(EchoGuess))
            .await
            .unwrap();
        let indices: Vec<usize> = results.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 2]);
        let outcome = results[1].outcome.as_ref().unwrap();
        assert_eq!(outcome.transition_state, structures[2].coordinates);
    }

    #[tokio::test]
    async fn unrefined_structures_are_not_searched_and_indices_stay_aligned() {
        let registry = test_fixtures::addition_registry();
        let config = EmbedConfigBuilder::new().build().unwrap();
        let reporter = ProgressReporter::new();
        let ctx = EmbedContext::new(&registry, &config, &reporter).unwrap();
        let mut unrefined = structure_at(&ctx, 2.3);
        unrefined.failure = Some(RefinementFailure::NotConverged);
        unrefined.energy = None;
        let structures = vec![structure_at(&ctx, 2.2), unrefined, structure_at(&ctx, 2.4)];
        let settings = NebSettings {
            images: DEFAULT_NEB_IMAGES,
            preoptimize: false,
        };

        let results = search_transition_states(&ctx, &structures, settings, Arc::new(EchoGuess))
            .await
            .unwrap();
        let indices: Vec<usize> = results.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 2]);
        for result in &results {
            assert!(structures[result.index].is_refined());
            let outcome = result.outcome.as_ref().unwrap();
            assert_eq!(outcome.transition_state, structures[result.index].coordinates);
        }
    }
}

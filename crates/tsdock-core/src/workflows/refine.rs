use crate::engine::context::EmbedContext;
use crate::engine::error::EngineError;
use crate::engine::neb::{NebResult, TransitionStateSearch, search_transition_states};
use crate::engine::pose::PosePopulation;
use crate::engine::progress::Progress;
use crate::engine::refine::{RefinedStructure, Refiner, refine_poses};
use crate::engine::tasks::PruningStats;
use crate::engine::tasks::energy_window::within_window;
use crate::engine::tasks::new_bonds::NewBondCounter;
use crate::engine::tasks::rmsd_pruning::{Admission, RmsdDeduplicator};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const REFINEMENT_FAILED: &str = "refinement";
pub const NEW_BONDS: &str = "new-bonds";
pub const ENERGY_WINDOW: &str = "energy-window";

#[derive(Debug, Clone)]
pub struct RefineResult {
    pub structures: Vec<RefinedStructure>,
    pub transition_states: Vec<NebResult>,
    pub stats: PruningStats,
    /// `false` when optimization was disabled and the structures are the raw poses.
    pub refined: bool,
}

/// Hands the embedded population to `refiner` and prunes what comes back.
///
/// Failed refinements are dropped under the only-refined policy and kept
/// with their unrefined geometry otherwise. Survivors then pass the
/// new-bond check, the energy window and a second RMSD deduplication on
/// refined coordinates. When NEB settings are configured and a
/// `transition_search` is supplied, one transition-state search is issued
/// per surviving refined structure.
#[instrument(skip_all, name = "refine_workflow", fields(poses = population.len()))]
pub async fn run(
    ctx: &EmbedContext<'_>,
    population: PosePopulation,
    refiner: Arc<dyn Refiner>,
    transition_search: Option<Arc<dyn TransitionStateSearch>>,
) -> Result<RefineResult, EngineError> {
    let config = ctx.config;
    let mut stats = PruningStats {
        generated: population.len(),
        ..PruningStats::default()
    };

    if !config.optimization_enabled() {
        info!("Optimization disabled; returning unrefined poses.");
        let structures: Vec<RefinedStructure> = population
            .into_iter()
            .map(|pose| RefinedStructure {
                coordinates: pose.coordinates(ctx),
                pose,
                energy: None,
                failure: None,
            })
            .collect();
        stats.survivors = structures.len();
        return Ok(RefineResult {
            structures,
            transition_states: Vec::new(),
            stats,
            refined: false,
        });
    }

    // === Phase 1: Refinement ===
    ctx.reporter.report(Progress::PhaseStart {
        name: "Refinement",
    });
    info!(
        poses = population.len(),
        theory_level = %config.refinement.theory_level,
        "Submitting poses for refinement."
    );
    let refined = refine_poses(ctx, population.into_vec(), refiner).await;
    ctx.reporter.report(Progress::PhaseFinish);
    let refined = refined?;

    // === Phase 2: Post-refinement pruning ===
    let structures = ctx.reporter.phase("Post-refinement Pruning", || {
        prune_refined(ctx, refined, &mut stats)
    });
    stats.survivors = structures.len();
    info!(survivors = stats.survivors, "Refinement complete. {}", stats.summary());

    // === Phase 3: Transition-state search (optional) ===
    let transition_states = match (config.neb, transition_search) {
        (Some(settings), Some(search)) => {
            ctx.reporter.report(Progress::PhaseStart {
                name: "Transition-state Search",
            });
            let results = search_transition_states(ctx, &structures, settings, search).await;
            ctx.reporter.report(Progress::PhaseFinish);
            results?
        }
        (Some(_), None) => {
            warn!("NEB settings are configured but no transition-state search backend was supplied.");
            Vec::new()
        }
        _ => Vec::new(),
    };

    if structures.is_empty() && !config.safety_override {
        return Err(EngineError::SearchExhausted {
            generated: stats.generated,
            summary: stats.summary(),
        });
    }

    Ok(RefineResult {
        structures,
        transition_states,
        stats,
        refined: true,
    })
}

fn prune_refined(
    ctx: &EmbedContext,
    refined: Vec<RefinedStructure>,
    stats: &mut PruningStats,
) -> Vec<RefinedStructure> {
    let config = ctx.config;

    let before = refined.len();
    let mut structures: Vec<RefinedStructure> = refined
        .into_iter()
        .filter(|s| s.is_refined() || !config.refinement.only_refined)
        .collect();
    stats.record(REFINEMENT_FAILED, before - structures.len());

    let counter = NewBondCounter::new(ctx);
    let before = structures.len();
    structures.retain_mut(|structure| {
        let pairing = ctx.pairing(structure.pose.provenance().pairing);
        let count = counter.count(ctx, &structure.coordinates, pairing);
        let metrics = structure.pose.metrics_mut();
        metrics.new_bonds = Some(count);
        metrics.energy = structure.energy;
        count <= config.pruning.max_new_bonds
    });
    stats.record(NEW_BONDS, before - structures.len());

    if let Some(window) = config.pruning.energy_window_kcal {
        let energies: Vec<Option<f64>> = structures.iter().map(|s| s.energy).collect();
        let keep = within_window(&energies, window);
        let before = structures.len();
        structures = structures
            .into_iter()
            .zip(keep)
            .filter_map(|(structure, keep)| keep.then_some(structure))
            .collect();
        stats.record(ENERGY_WINDOW, before - structures.len());
    }

    let mut deduplicator = RmsdDeduplicator::new(config.pruning.rmsd_threshold);
    let mut kept = Vec::with_capacity(structures.len());
    for mut structure in structures {
        let subset: Vec<_> = ctx
            .rmsd_atoms()
            .iter()
            .filter_map(|&i| structure.coordinates.get(i).copied())
            .collect();
        match deduplicator.offer(subset) {
            Admission::Accepted { nearest } => {
                structure.pose.metrics_mut().nearest_rmsd = nearest;
                kept.push(structure);
            }
            Admission::Duplicate { .. } => stats.duplicates += 1,
        }
    }
    debug!(
        kept = kept.len(),
        duplicates = stats.duplicates,
        "Post-refinement pruning complete."
    );
    kept
}

use crate::core::models::registry::MoleculeRegistry;
use crate::engine::alignment::align;
use crate::engine::config::{ConfigError, EmbedConfig, SAFETY_POSE_LIMIT};
use crate::engine::context::EmbedContext;
use crate::engine::error::EngineError;
use crate::engine::pairing::Pairing;
use crate::engine::pose::{Pose, PosePopulation, PoseProvenance};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::scanner::RotationalScanner;
use crate::engine::stream::{EmbedTask, TaskStream, estimate_pose_count};
use crate::engine::tasks::rmsd_pruning::{PartitionedDeduplicator, RmsdDeduplicator, deduplicate};
use crate::engine::tasks::{FilterPipeline, PruningStats};
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone)]
pub struct EmbedResult {
    pub population: PosePopulation,
    pub pairings: Vec<Pairing>,
    pub stats: PruningStats,
    pub estimated_poses: u128,
}

/// Generates and prunes transition-state candidate poses for the molecules in `registry`.
#[instrument(skip_all, name = "embed_workflow")]
pub fn run(
    registry: &MoleculeRegistry,
    config: &EmbedConfig,
    reporter: &ProgressReporter,
) -> Result<EmbedResult, EngineError> {
    // === Phase 0: Preparation ===
    let ctx = reporter.phase("Preparation", || {
        info!(
            molecules = registry.len(),
            "Starting embedding setup: resolving reactive atoms and pairings."
        );
        EmbedContext::new(registry, config, reporter)
    })?;

    run_with_context(&ctx)
}

/// Runs the search on an already prepared context.
#[instrument(skip_all, name = "embed_search")]
pub fn run_with_context(ctx: &EmbedContext) -> Result<EmbedResult, EngineError> {
    let config = ctx.config;

    // === Phase 1: Size check ===
    let estimated_poses = estimate_pose_count(ctx);
    info!(
        pairings = ctx.pairings().len(),
        estimated_poses, "Search space estimated."
    );
    if estimated_poses > SAFETY_POSE_LIMIT {
        if !config.safety_override {
            return Err(ConfigError::SearchTooLarge {
                estimated: estimated_poses,
                limit: SAFETY_POSE_LIMIT,
            }
            .into());
        }
        warn!(estimated_poses, "Search exceeds the safety limit; continuing under override.");
    }

    // === Phase 2: Generation and pruning ===
    let (population, stats) = generate_and_prune(ctx);

    // === Phase 3: Results ===
    info!(
        generated = stats.generated,
        survivors = stats.survivors,
        "Embedding complete. {}",
        stats.summary()
    );
    if population.is_empty() && !config.safety_override {
        return Err(EngineError::SearchExhausted {
            generated: stats.generated,
            summary: stats.summary(),
        });
    }

    Ok(EmbedResult {
        population,
        pairings: ctx.pairings().to_vec(),
        stats,
        estimated_poses,
    })
}

enum Deduplication {
    Sequential(RmsdDeduplicator),
    Partitioned(PartitionedDeduplicator),
}

fn generate_and_prune(ctx: &EmbedContext) -> (PosePopulation, PruningStats) {
    let config = ctx.config;
    ctx.reporter.report(Progress::PhaseStart {
        name: "Embedding",
    });

    let mut stream = TaskStream::for_context(ctx);
    ctx.reporter.report(Progress::TaskStart {
        total_steps: stream.total() as u64,
    });

    let pipeline = FilterPipeline::from_config(&config.pruning);
    let threshold = config.pruning.rmsd_threshold;
    let mut deduplication = if config.pruning.partition_by_pairing {
        Deduplication::Partitioned(PartitionedDeduplicator::new(threshold))
    } else {
        Deduplication::Sequential(RmsdDeduplicator::new(threshold))
    };
    if config.bypass {
        info!("Bypass engaged: every raw pose is kept.");
    } else {
        debug!(filters = ?pipeline.names(), "Pruning pipeline assembled.");
    }

    let mut stats = PruningStats::default();
    let mut population = PosePopulation::new();
    loop {
        let batch: Vec<EmbedTask> = stream.by_ref().take(config.batch_size).collect();
        if batch.is_empty() {
            break;
        }
        let poses = build_poses(ctx, &batch);
        stats.generated += poses.len();

        if config.bypass {
            population.extend(poses);
        } else {
            let filtered = pipeline.run(ctx, poses, &mut stats);
            let (kept, duplicates) = match &mut deduplication {
                Deduplication::Sequential(dedup) => deduplicate(ctx, filtered, dedup),
                Deduplication::Partitioned(dedup) => dedup.deduplicate(ctx, filtered),
            };
            stats.duplicates += duplicates;
            population.extend(kept);
        }
        ctx.reporter
            .report(Progress::TaskIncrementBy(batch.len() as u64));
    }
    ctx.reporter.report(Progress::TaskFinish);

    if let Deduplication::Partitioned(dedup) = &deduplication {
        if !config.bypass {
            let (merged, duplicates) = dedup.merge(ctx, population.into_vec());
            stats.duplicates += duplicates;
            population = merged.into();
        }
    }
    stats.survivors = population.len();

    ctx.reporter.report(Progress::PhaseFinish);
    (population, stats)
}

/// Raw poses for a batch of tasks, in task order.
fn build_poses(ctx: &EmbedContext, tasks: &[EmbedTask]) -> Vec<Pose> {
    #[cfg(not(feature = "parallel"))]
    let iterator = tasks.iter();

    #[cfg(feature = "parallel")]
    let iterator = tasks.par_iter();

    let per_task: Vec<Vec<Pose>> = iterator.map(|task| poses_for_task(ctx, task)).collect();
    per_task.into_iter().flatten().collect()
}

fn poses_for_task(ctx: &EmbedContext, task: &EmbedTask) -> Vec<Pose> {
    let Some(pairing) = ctx.pairing(task.pairing) else {
        return Vec::new();
    };
    let seeds = match align(ctx, pairing, &task.conformers) {
        Ok(seeds) => seeds,
        Err(error) => {
            debug!(task = task.index, pairing = %pairing.label(), %error, "Skipping alignment branch.");
            return Vec::new();
        }
    };

    let scanner = RotationalScanner::for_kind(ctx.config, pairing.kind);
    let mut poses = Vec::new();
    for (seed_index, seed) in seeds.iter().enumerate() {
        let base = PoseProvenance {
            conformers: task.conformers.clone(),
            pairing: task.pairing,
            seed: seed_index,
            rotation_steps: Vec::new(),
        };
        poses.extend(scanner.scan(seed, base).map(|mut pose| {
            pose.measure_pairs(ctx);
            pose
        }));
    }
    poses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::utils::geometry::superposed_rmsd;
    use crate::engine::config::{EmbedConfigBuilder, PinnedDistance};
    use crate::engine::pairing::AtomRef;
    use crate::test_fixtures;
    use std::sync::Mutex;

    fn addition_config() -> EmbedConfigBuilder {
        EmbedConfigBuilder::new()
            .rotation_steps(6)
            .max_clashes(3)
            .clash_distance(1.0)
            .rmsd_threshold(0.5)
            .pin(PinnedDistance::new(AtomRef::new(0, 0), AtomRef::new(1, 0), 2.2))
    }

    #[test]
    fn addition_yields_distinct_poses_at_pinned_distance() {
        let registry = test_fixtures::addition_registry();
        let config = addition_config().build().unwrap();
        let reporter = ProgressReporter::new();
        let result = run(&registry, &config, &reporter).unwrap();

        assert!((1..=6).contains(&result.population.len()));
        assert_eq!(result.stats.generated, 6 * 2);
        assert_eq!(result.stats.survivors, result.population.len());
        for pose in result.population.iter() {
            assert!((pose.metrics().pair_distances[0] - 2.2).abs() < 1e-6);
            assert!(pose.metrics().clash_count.unwrap() <= 3);
        }

        let ctx = EmbedContext::new(&registry, &config, &reporter).unwrap();
        let poses = result.population.as_slice();
        for (i, a) in poses.iter().enumerate() {
            for b in &poses[i + 1..] {
                let rmsd = superposed_rmsd(
                    &a.subset_coordinates(&ctx, ctx.rmsd_atoms()),
                    &b.subset_coordinates(&ctx, ctx.rmsd_atoms()),
                )
                .unwrap();
                assert!(rmsd > 0.5);
            }
        }
    }

    #[test]
    fn empty_result_is_exhausted_unless_overridden() {
        let registry = test_fixtures::addition_registry();
        let reporter = ProgressReporter::new();
        let strict = addition_config().clash_distance(50.0).max_clashes(0);

        let err = run(&registry, &strict.build().unwrap(), &reporter).unwrap_err();
        assert!(matches!(err, EngineError::SearchExhausted { generated: 12, .. }));
        assert!(err.to_string().contains("clash"));

        let overridden = addition_config()
            .clash_distance(50.0)
            .max_clashes(0)
            .safety_override(true)
            .build()
            .unwrap();
        let result = run(&registry, &overridden, &reporter).unwrap();
        assert!(result.population.is_empty());
        assert_eq!(result.stats.rejected_by("clash"), 12);
    }

    #[test]
    fn looser_clash_criteria_never_reduce_survivors() {
        let registry = test_fixtures::diels_alder_registry();
        let reporter = ProgressReporter::new();
        let survivors = |max_clashes: usize| {
            let config = EmbedConfigBuilder::new()
                .rotation_steps(4)
                .max_clashes(max_clashes)
                .rmsd_threshold(0.0)
                .safety_override(true)
                .build()
                .unwrap();
            run(&registry, &config, &reporter).unwrap().population.len()
        };
        assert!(survivors(0) <= survivors(2));
        assert!(survivors(2) <= survivors(10));
    }

    #[test]
    fn smaller_rmsd_threshold_never_reduces_survivors() {
        let registry = test_fixtures::diels_alder_registry();
        let reporter = ProgressReporter::new();
        let survivors = |threshold: f64| {
            let config = EmbedConfigBuilder::new()
                .rotation_steps(6)
                .max_clashes(100)
                .rmsd_threshold(threshold)
                .safety_override(true)
                .build()
                .unwrap();
            run(&registry, &config, &reporter).unwrap().population.len()
        };
        let (coarse, fine) = (survivors(1.0), survivors(0.1));
        assert!(fine >= coarse);
    }

    #[test]
    fn bypass_keeps_every_raw_pose() {
        let registry = test_fixtures::addition_registry();
        let reporter = ProgressReporter::new();
        let config = addition_config()
            .clash_distance(50.0)
            .max_clashes(0)
            .bypass(true)
            .build()
            .unwrap();
        let result = run(&registry, &config, &reporter).unwrap();
        assert_eq!(result.population.len(), 12);
        assert!(result.stats.rejected.is_empty());
        assert!(result.population.iter().all(|p| p.metrics().clash_count.is_none()));
    }

    #[test]
    fn partitioned_deduplication_matches_survivor_invariant() {
        let registry = test_fixtures::diels_alder_registry();
        let reporter = ProgressReporter::new();
        let config = EmbedConfigBuilder::new()
            .rotation_steps(4)
            .max_clashes(100)
            .rmsd_threshold(0.5)
            .partition_by_pairing(true)
            .safety_override(true)
            .build()
            .unwrap();
        let result = run(&registry, &config, &reporter).unwrap();
        let ctx = EmbedContext::new(&registry, &config, &reporter).unwrap();
        let poses = result.population.as_slice();
        for (i, a) in poses.iter().enumerate() {
            for b in &poses[i + 1..] {
                let rmsd = superposed_rmsd(
                    &a.subset_coordinates(&ctx, ctx.rmsd_atoms()),
                    &b.subset_coordinates(&ctx, ctx.rmsd_atoms()),
                )
                .unwrap();
                assert!(rmsd > 0.5);
            }
        }
    }

    #[test]
    fn oversized_search_is_refused_without_override() {
        let registry = test_fixtures::diels_alder_registry();
        let reporter = ProgressReporter::new();
        let config = EmbedConfigBuilder::new()
            .rotation_steps(100_000)
            .build()
            .unwrap();
        let err = run(&registry, &config, &reporter).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Configuration(ConfigError::SearchTooLarge { .. })
        ));
    }

    #[test]
    fn progress_reports_phases_and_every_task() {
        let registry = test_fixtures::addition_registry();
        let config = addition_config().build().unwrap();
        let increments = Mutex::new(0u64);
        let phases = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| match event {
            Progress::TaskIncrementBy(n) => *increments.lock().unwrap() += n,
            Progress::PhaseStart { name } => phases.lock().unwrap().push(name),
            _ => {}
        }));
        run(&registry, &config, &reporter).unwrap();
        drop(reporter);
        assert_eq!(increments.into_inner().unwrap(), 1);
        assert_eq!(phases.into_inner().unwrap(), vec!["Preparation", "Embedding"]);
    }
}

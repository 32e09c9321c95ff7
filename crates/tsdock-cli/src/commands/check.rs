use super::load_job;
use crate::cli::CheckArgs;
use crate::error::Result;
use tracing::info;
use tsdock::core::models::atom::Atom;
use tsdock::engine::config::SAFETY_POSE_LIMIT;
use tsdock::engine::context::EmbedContext;
use tsdock::engine::progress::ProgressReporter;
use tsdock::engine::stream::{TaskStream, estimate_pose_count};

/// What a dry run learned about a job.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckSummary {
    pub molecules: usize,
    pub pairings: usize,
    pub tasks: usize,
    pub estimated_poses: u128,
    pub within_limit: bool,
}

pub async fn run(args: CheckArgs) -> Result<()> {
    let summary = inspect(&args)?;
    if summary.within_limit {
        println!(
            "✓ Job is valid: {} pose(s) at most across {} task(s).",
            summary.estimated_poses, summary.tasks
        );
    } else {
        println!(
            "Warning: about {} raw poses exceeds the safety limit of {}; pass --let to run it anyway.",
            summary.estimated_poses, SAFETY_POSE_LIMIT
        );
    }
    Ok(())
}

/// Resolves molecules and pairings and sizes the search without generating poses.
pub fn inspect(args: &CheckArgs) -> Result<CheckSummary> {
    let (registry, config) = load_job(&args.input, &args.overrides)?;
    let reporter = ProgressReporter::new();
    let ctx = EmbedContext::new(&registry, &config, &reporter)?;

    for (position, molecule) in registry.iter().enumerate() {
        let atoms: Vec<Atom> = molecule
            .atoms(0)
            .map(|view| view.collect())
            .unwrap_or_default();
        let reactive = molecule
            .reactive_atoms()
            .iter()
            .map(|reactive| {
                format!(
                    "{}{} ({})",
                    atoms.get(reactive.index).map_or("?", |a| a.element.symbol()),
                    reactive.index,
                    reactive.kind
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "[{}] {}: {} atom(s), {} conformer(s), reactive: {}",
            position,
            molecule.name(),
            molecule.atom_count(),
            molecule.conformer_count(),
            reactive
        );
    }
    for (index, pairing) in ctx.pairings().iter().enumerate() {
        let distances = pairing
            .pairs
            .iter()
            .map(|pair| format!("{:.2}", pair.distance))
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "  pairing {}: {:?} {} at {} Å",
            index,
            pairing.kind,
            pairing.label(),
            distances
        );
    }

    let estimated_poses = estimate_pose_count(&ctx);
    let summary = CheckSummary {
        molecules: registry.len(),
        pairings: ctx.pairings().len(),
        tasks: TaskStream::for_context(&ctx).total(),
        estimated_poses,
        within_limit: config.safety_override || estimated_poses <= SAFETY_POSE_LIMIT,
    };
    info!(?summary, "Job check complete.");
    Ok(summary)
}

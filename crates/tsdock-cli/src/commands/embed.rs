use super::load_job;
use crate::cli::EmbedArgs;
use crate::error::Result;
use crate::report::EmbedReport;
use crate::utils::progress::CliProgressHandler;
use tracing::{info, warn};
use tsdock::engine::context::EmbedContext;
use tsdock::engine::progress::ProgressReporter;
use tsdock::workflows;

pub async fn run(args: EmbedArgs) -> Result<()> {
    let (registry, config) = load_job(&args.input, &args.overrides)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Embedding {} molecule(s)...", registry.len());
    info!("Invoking the core embedding workflow...");

    let report = tokio::task::block_in_place(|| -> Result<EmbedReport> {
        let ctx = reporter.phase("Preparation", || {
            EmbedContext::new(&registry, &config, &reporter)
        })?;
        let result = workflows::embed::run_with_context(&ctx)?;
        Ok(EmbedReport::new(&ctx, &result))
    })?;

    info!(
        "Workflow finished: {} of {} generated pose(s) kept.",
        report.survivors, report.generated
    );
    if report.poses.is_empty() {
        warn!("Workflow completed under the safety override but no pose survived.");
        println!("Warning: no pose survived pruning; the report lists only the statistics.");
    }

    report.write_toml(&args.output)?;
    println!(
        "✓ {} pose(s) from {} pairing(s) written to: {}",
        report.poses.len(),
        report.pairings.len(),
        args.output.display()
    );

    if let Some(csv_path) = &args.csv {
        report.write_csv(csv_path)?;
        println!("  Pose table written to: {}", csv_path.display());
    }

    Ok(())
}

pub mod check;
pub mod embed;

use crate::cli::{JobInput, SearchOverrides};
use crate::config::PartialEmbedConfig;
use crate::error::Result;
use crate::job::JobFile;
use tracing::info;
use tsdock::core::models::registry::MoleculeRegistry;
use tsdock::engine::config::EmbedConfig;

/// Reads the job and configuration files and resolves the engine configuration.
pub(crate) fn load_job(
    input: &JobInput,
    overrides: &SearchOverrides,
) -> Result<(MoleculeRegistry, EmbedConfig)> {
    info!("Loading job from {:?}", &input.job);
    let job = JobFile::from_file(&input.job)?;
    let registry = job.into_registry()?;
    let pins = job.pins(&registry)?;

    let partial_config = match &input.config {
        Some(path) => PartialEmbedConfig::from_file(path)?,
        None => PartialEmbedConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(overrides, pins)?;
    Ok((registry, config))
}

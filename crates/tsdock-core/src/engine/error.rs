use thiserror::Error;

use super::config::ConfigError;
use super::pairing::PairingError;
use crate::core::models::error::ModelError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Invalid molecule input: {0}")]
    Model(#[from] ModelError),

    #[error("Pairing error: {0}")]
    Pairing(#[from] PairingError),

    #[error(
        "Search space exhausted: {generated} poses were generated but none survived ({summary}). \
         Relax the clash tolerance, increase the rotation steps or engage the safety override"
    )]
    SearchExhausted { generated: usize, summary: String },

    #[error("Refinement pool failed: {0}")]
    Refinement(String),

    #[error("Internal logic error: {0}")]
    Internal(String),
}

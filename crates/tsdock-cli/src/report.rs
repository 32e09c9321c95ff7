use crate::error::{CliError, Result};
use serde::Serialize;
use std::path::Path;
use tracing::info;
use tsdock::engine::context::EmbedContext;
use tsdock::engine::pairing::{EmbedKind, Pairing};
use tsdock::engine::pose::Pose;
use tsdock::workflows::embed::EmbedResult;

#[derive(Serialize, Debug)]
#[serde(rename_all = "kebab-case")]
pub struct StageRecord {
    pub stage: String,
    pub rejected: usize,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "kebab-case")]
pub struct PairingRecord {
    pub index: usize,
    pub kind: &'static str,
    pub bonds: String,
    pub distances: Vec<f64>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "kebab-case")]
pub struct PoseRecord {
    pub index: usize,
    pub pairing: usize,
    pub conformers: Vec<usize>,
    pub rotation_steps: Vec<usize>,
    pub pair_distances: Vec<f64>,
    pub embed_scale: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clash_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pin_deviation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_rmsd: Option<f64>,
    pub coordinates: Vec<[f64; 3]>,
}

/// Everything the `embed` command writes about a finished search.
#[derive(Serialize, Debug)]
#[serde(rename_all = "kebab-case")]
pub struct EmbedReport {
    pub estimated_poses: u64,
    pub generated: usize,
    pub duplicates: usize,
    pub survivors: usize,
    pub elements: Vec<String>,
    pub rejected: Vec<StageRecord>,
    pub pairings: Vec<PairingRecord>,
    pub poses: Vec<PoseRecord>,
}

/// One CSV row per surviving pose.
#[derive(Serialize, Debug)]
struct PoseRow<'a> {
    pose: usize,
    pairing: usize,
    bonds: &'a str,
    conformers: String,
    rotation_steps: String,
    pair_distances: String,
    embed_scale: f64,
    clash_count: Option<usize>,
    max_pin_deviation: Option<f64>,
    nearest_rmsd: Option<f64>,
}

fn kind_label(kind: EmbedKind) -> &'static str {
    match kind {
        EmbedKind::Open => "open",
        EmbedKind::Cyclical => "cyclical",
    }
}

fn pairing_record(index: usize, pairing: &Pairing) -> PairingRecord {
    PairingRecord {
        index,
        kind: kind_label(pairing.kind),
        bonds: pairing.label(),
        distances: pairing.pairs.iter().map(|pair| pair.distance).collect(),
    }
}

fn pose_record(ctx: &EmbedContext, index: usize, pose: &Pose) -> PoseRecord {
    let provenance = pose.provenance();
    let metrics = pose.metrics();
    PoseRecord {
        index,
        pairing: provenance.pairing,
        conformers: provenance.conformers.clone(),
        rotation_steps: provenance.rotation_steps.clone(),
        pair_distances: metrics.pair_distances.clone(),
        embed_scale: metrics.embed_scale,
        clash_count: metrics.clash_count,
        max_pin_deviation: metrics.max_pin_deviation,
        nearest_rmsd: metrics.nearest_rmsd,
        coordinates: pose
            .coordinates(ctx)
            .iter()
            .map(|p| [p.x, p.y, p.z])
            .collect(),
    }
}

fn joined<T: ToString>(values: &[T], separator: &str) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

impl EmbedReport {
    pub fn new(ctx: &EmbedContext, result: &EmbedResult) -> Self {
        Self {
            estimated_poses: u64::try_from(result.estimated_poses).unwrap_or(u64::MAX),
            generated: result.stats.generated,
            duplicates: result.stats.duplicates,
            survivors: result.population.len(),
            elements: ctx.elements().iter().map(|e| e.symbol().to_string()).collect(),
            rejected: result
                .stats
                .rejected
                .iter()
                .map(|(stage, count)| StageRecord {
                    stage: stage.to_string(),
                    rejected: *count,
                })
                .collect(),
            pairings: result
                .pairings
                .iter()
                .enumerate()
                .map(|(i, p)| pairing_record(i, p))
                .collect(),
            poses: result
                .population
                .iter()
                .enumerate()
                .map(|(i, pose)| pose_record(ctx, i, pose))
                .collect(),
        }
    }

    pub fn write_toml(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| CliError::Report {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        std::fs::write(path, content)?;
        info!(path = %path.display(), poses = self.poses.len(), "Pose report written.");
        Ok(())
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let report_error = |e: csv::Error| CliError::Report {
            path: path.to_path_buf(),
            source: e.into(),
        };
        let mut writer = csv::Writer::from_path(path).map_err(report_error)?;
        for pose in &self.poses {
            let bonds = self
                .pairings
                .get(pose.pairing)
                .map_or("", |p| p.bonds.as_str());
            writer
                .serialize(PoseRow {
                    pose: pose.index,
                    pairing: pose.pairing,
                    bonds,
                    conformers: joined(&pose.conformers, ";"),
                    rotation_steps: joined(&pose.rotation_steps, ";"),
                    pair_distances: pose
                        .pair_distances
                        .iter()
                        .map(|d| format!("{d:.3}"))
                        .collect::<Vec<_>>()
                        .join(";"),
                    embed_scale: pose.embed_scale,
                    clash_count: pose.clash_count,
                    max_pin_deviation: pose.max_pin_deviation,
                    nearest_rmsd: pose.nearest_rmsd,
                })
                .map_err(report_error)?;
        }
        writer.flush()?;
        info!(path = %path.display(), rows = self.poses.len(), "Pose table written.");
        Ok(())
    }
}

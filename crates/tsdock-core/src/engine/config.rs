use super::pairing::{AtomRef, EmbedKind};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_OPEN_ROTATION_STEPS: usize = 24;
pub const DEFAULT_CYCLICAL_ROTATION_STEPS: usize = 12;
pub const DEFAULT_RMSD_THRESHOLD: f64 = 0.5;
pub const DEFAULT_MAX_CLASHES: usize = 0;
pub const DEFAULT_CLASH_DISTANCE: f64 = 1.5;
pub const DEFAULT_MAX_NEW_BONDS: usize = 0;
pub const DEFAULT_PIN_TOLERANCE: f64 = 0.1;
pub const DEFAULT_ENERGY_WINDOW_KCAL: f64 = 10.0;
pub const DEFAULT_SHRINK_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_BATCH_SIZE: usize = 64;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_THEORY_LEVEL: &str = "PM7";
pub const DEFAULT_NEB_IMAGES: usize = 6;

pub const DEEP_ROTATION_STEPS: usize = 72;
pub const DEEP_RMSD_THRESHOLD: f64 = 0.3;
pub const DEEP_MAX_CLASHES: usize = 1;
pub const DEEP_CLASH_DISTANCE: f64 = 1.4;

/// Raw pose count above which a search is refused unless the safety override is engaged.
pub const SAFETY_POSE_LIMIT: u128 = 1_000_000;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Conflicting options: {0}")]
    Conflict(String),

    #[error("Pinned distance references unknown atom {atom} of molecule {molecule}")]
    UnknownAtom { molecule: usize, atom: usize },

    #[error(
        "Estimated search size of {estimated} raw poses exceeds the safety limit of {limit}; engage the safety override to run it anyway"
    )]
    SearchTooLarge { estimated: u128, limit: u128 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchDepth {
    #[default]
    Standard,
    Deep,
}

/// Atoms that take part in RMSD comparisons between poses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RmsdSubset {
    All,
    #[default]
    HeavyAtoms,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClashCriteria {
    pub max_clashes: usize,
    pub distance: f64,
}

/// A user-imposed target distance between two atoms of different molecules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinnedDistance {
    pub first: AtomRef,
    pub second: AtomRef,
    pub distance: f64,
}

impl PinnedDistance {
    pub fn new(first: AtomRef, second: AtomRef, distance: f64) -> Self {
        Self {
            first,
            second,
            distance,
        }
    }

    pub fn joins(&self, a: AtomRef, b: AtomRef) -> bool {
        (self.first == a && self.second == b) || (self.first == b && self.second == a)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    pub steps: Option<usize>,
    pub range_degrees: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PruningConfig {
    pub rmsd_threshold: f64,
    pub rmsd_subset: RmsdSubset,
    pub clash: ClashCriteria,
    pub max_new_bonds: usize,
    pub pins: Vec<PinnedDistance>,
    pub pin_tolerance: f64,
    pub suprafacial_only: bool,
    pub energy_window_kcal: Option<f64>,
    pub partition_by_pairing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefinementSettings {
    pub theory_level: String,
    pub workers: usize,
    pub timeout: Option<Duration>,
    pub only_refined: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NebSettings {
    pub images: usize,
    pub preoptimize: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbedConfig {
    pub depth: SearchDepth,
    pub scan: ScanConfig,
    pub pruning: PruningConfig,
    pub refinement: RefinementSettings,
    pub neb: Option<NebSettings>,
    pub shrink_multiplier: f64,
    pub rigid: bool,
    pub bypass: bool,
    pub skip_optimization: bool,
    pub safety_override: bool,
    pub batch_size: usize,
}

impl EmbedConfig {
    /// Number of rotation steps for an embed of the given kind.
    pub fn rotation_steps(&self, kind: EmbedKind) -> usize {
        self.scan.steps.unwrap_or(match (self.depth, kind) {
            (SearchDepth::Deep, _) => DEEP_ROTATION_STEPS,
            (SearchDepth::Standard, EmbedKind::Open) => DEFAULT_OPEN_ROTATION_STEPS,
            (SearchDepth::Standard, EmbedKind::Cyclical) => DEFAULT_CYCLICAL_ROTATION_STEPS,
        })
    }

    pub fn optimization_enabled(&self) -> bool {
        !self.skip_optimization && !self.bypass
    }
}

#[derive(Default)]
pub struct EmbedConfigBuilder {
    deep: bool,
    rotation_steps: Option<usize>,
    rotation_range: Option<f64>,
    rmsd_threshold: Option<f64>,
    rmsd_subset: Option<RmsdSubset>,
    max_clashes: Option<usize>,
    clash_distance: Option<f64>,
    max_new_bonds: Option<usize>,
    pins: Vec<PinnedDistance>,
    pin_tolerance: Option<f64>,
    suprafacial_only: bool,
    energy_window_kcal: Option<f64>,
    partition_by_pairing: bool,
    theory_level: Option<String>,
    workers: Option<usize>,
    timeout: Option<Duration>,
    only_refined: bool,
    neb: Option<NebSettings>,
    shrink_multiplier: Option<f64>,
    rigid: bool,
    bypass: bool,
    skip_optimization: bool,
    safety_override: bool,
    batch_size: Option<usize>,
}

impl EmbedConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Denser search preset; only fills values the caller has not set.
    pub fn deep(mut self, enabled: bool) -> Self {
        self.deep = enabled;
        self
    }
    pub fn rotation_steps(mut self, steps: usize) -> Self {
        self.rotation_steps = Some(steps);
        self
    }
    pub fn rotation_range(mut self, degrees: f64) -> Self {
        self.rotation_range = Some(degrees);
        self
    }
    pub fn rmsd_threshold(mut self, threshold: f64) -> Self {
        self.rmsd_threshold = Some(threshold);
        self
    }
    pub fn rmsd_subset(mut self, subset: RmsdSubset) -> Self {
        self.rmsd_subset = Some(subset);
        self
    }
    pub fn max_clashes(mut self, count: usize) -> Self {
        self.max_clashes = Some(count);
        self
    }
    pub fn clash_distance(mut self, distance: f64) -> Self {
        self.clash_distance = Some(distance);
        self
    }
    pub fn max_new_bonds(mut self, count: usize) -> Self {
        self.max_new_bonds = Some(count);
        self
    }
    pub fn pin(mut self, pin: PinnedDistance) -> Self {
        self.pins.push(pin);
        self
    }
    pub fn pin_tolerance(mut self, tolerance: f64) -> Self {
        self.pin_tolerance = Some(tolerance);
        self
    }
    pub fn suprafacial_only(mut self, enabled: bool) -> Self {
        self.suprafacial_only = enabled;
        self
    }
    pub fn energy_window(mut self, kcal: f64) -> Self {
        self.energy_window_kcal = Some(kcal);
        self
    }
    pub fn partition_by_pairing(mut self, enabled: bool) -> Self {
        self.partition_by_pairing = enabled;
        self
    }
    pub fn theory_level(mut self, level: &str) -> Self {
        self.theory_level = Some(level.to_string());
        self
    }
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
    pub fn only_refined(mut self, enabled: bool) -> Self {
        self.only_refined = enabled;
        self
    }
    pub fn neb(mut self, settings: NebSettings) -> Self {
        self.neb = Some(settings);
        self
    }
    pub fn shrink(mut self, multiplier: f64) -> Self {
        self.shrink_multiplier = Some(multiplier);
        self
    }
    pub fn rigid(mut self, enabled: bool) -> Self {
        self.rigid = enabled;
        self
    }
    pub fn bypass(mut self, enabled: bool) -> Self {
        self.bypass = enabled;
        self
    }
    pub fn skip_optimization(mut self, enabled: bool) -> Self {
        self.skip_optimization = enabled;
        self
    }
    pub fn safety_override(mut self, enabled: bool) -> Self {
        self.safety_override = enabled;
        self
    }
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    pub fn build(self) -> Result<EmbedConfig, ConfigError> {
        let depth = if self.deep {
            SearchDepth::Deep
        } else {
            SearchDepth::Standard
        };
        let (default_rmsd, default_clashes, default_clash_distance) = match depth {
            SearchDepth::Deep => (DEEP_RMSD_THRESHOLD, DEEP_MAX_CLASHES, DEEP_CLASH_DISTANCE),
            SearchDepth::Standard => (
                DEFAULT_RMSD_THRESHOLD,
                DEFAULT_MAX_CLASHES,
                DEFAULT_CLASH_DISTANCE,
            ),
        };

        if self.rotation_steps == Some(0) {
            return Err(invalid("rotation_steps", "must be at least 1"));
        }
        if let Some(range) = self.rotation_range {
            if !range.is_finite() || range <= 0.0 || range > 180.0 {
                return Err(invalid(
                    "rotation_range",
                    format!("{range} is outside (0, 180] degrees"),
                ));
            }
        }

        let rmsd_threshold = self.rmsd_threshold.unwrap_or(default_rmsd);
        require_non_negative("rmsd_threshold", rmsd_threshold)?;
        let clash_distance = self.clash_distance.unwrap_or(default_clash_distance);
        require_non_negative("clash_distance", clash_distance)?;
        let pin_tolerance = self.pin_tolerance.unwrap_or(DEFAULT_PIN_TOLERANCE);
        require_non_negative("pin_tolerance", pin_tolerance)?;

        for pin in &self.pins {
            if !pin.distance.is_finite() || pin.distance <= 0.0 {
                return Err(invalid(
                    "pins",
                    format!("distance {} must be positive", pin.distance),
                ));
            }
            if pin.first.molecule == pin.second.molecule {
                return Err(invalid(
                    "pins",
                    format!(
                        "atoms {} and {} belong to the same molecule",
                        pin.first.atom, pin.second.atom
                    ),
                ));
            }
        }

        let energy_window_kcal = match self.energy_window_kcal {
            Some(window) => {
                require_non_negative("energy_window", window)?;
                Some(window)
            }
            None => Some(DEFAULT_ENERGY_WINDOW_KCAL),
        };

        let shrink_multiplier = self.shrink_multiplier.unwrap_or(1.0);
        if !shrink_multiplier.is_finite() || shrink_multiplier < 1.0 {
            return Err(invalid("shrink", "multiplier must be at least 1.0"));
        }

        let batch_size = self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(invalid("batch_size", "must be at least 1"));
        }
        let workers = self.workers.unwrap_or(DEFAULT_WORKERS);
        if workers == 0 {
            return Err(invalid("workers", "must be at least 1"));
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(invalid("timeout", "must be greater than zero"));
        }
        if let Some(neb) = &self.neb {
            if neb.images == 0 {
                return Err(invalid("neb_images", "must be at least 1"));
            }
        }

        let optimization_enabled = !self.skip_optimization && !self.bypass;
        if self.neb.is_some() && !optimization_enabled {
            return Err(ConfigError::Conflict(
                "the NEB handoff requires refinement, which is disabled by skip-optimization or bypass"
                    .to_string(),
            ));
        }
        if self.only_refined && !optimization_enabled {
            return Err(ConfigError::Conflict(
                "only-refined would discard every pose because refinement is disabled".to_string(),
            ));
        }

        Ok(EmbedConfig {
            depth,
            scan: ScanConfig {
                steps: self.rotation_steps,
                range_degrees: self.rotation_range,
            },
            pruning: PruningConfig {
                rmsd_threshold,
                rmsd_subset: self.rmsd_subset.unwrap_or_default(),
                clash: ClashCriteria {
                    max_clashes: self.max_clashes.unwrap_or(default_clashes),
                    distance: clash_distance,
                },
                max_new_bonds: self.max_new_bonds.unwrap_or(DEFAULT_MAX_NEW_BONDS),
                pins: self.pins,
                pin_tolerance,
                suprafacial_only: self.suprafacial_only,
                energy_window_kcal,
                partition_by_pairing: self.partition_by_pairing,
            },
            refinement: RefinementSettings {
                theory_level: self
                    .theory_level
                    .unwrap_or_else(|| DEFAULT_THEORY_LEVEL.to_string()),
                workers,
                timeout: self.timeout,
                only_refined: self.only_refined,
            },
            neb: self.neb,
            shrink_multiplier,
            rigid: self.rigid,
            bypass: self.bypass,
            skip_optimization: self.skip_optimization || self.bypass,
            safety_override: self.safety_override,
            batch_size,
        })
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}

fn require_non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(name, format!("{value} must be a finite, non-negative number")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(molecule: usize, atom: usize) -> AtomRef {
        AtomRef { molecule, atom }
    }

    #[test]
    fn build_applies_standard_defaults() {
        let config = EmbedConfigBuilder::new().build().unwrap();
        assert_eq!(config.depth, SearchDepth::Standard);
        assert_eq!(config.pruning.rmsd_threshold, DEFAULT_RMSD_THRESHOLD);
        assert_eq!(config.pruning.clash.max_clashes, DEFAULT_MAX_CLASHES);
        assert_eq!(config.pruning.clash.distance, DEFAULT_CLASH_DISTANCE);
        assert_eq!(config.pruning.energy_window_kcal, Some(DEFAULT_ENERGY_WINDOW_KCAL));
        assert_eq!(config.rotation_steps(EmbedKind::Open), DEFAULT_OPEN_ROTATION_STEPS);
        assert_eq!(
            config.rotation_steps(EmbedKind::Cyclical),
            DEFAULT_CYCLICAL_ROTATION_STEPS
        );
        assert_eq!(config.shrink_multiplier, 1.0);
        assert!(config.optimization_enabled());
    }

    #[test]
    fn deep_preset_fills_only_unset_values() {
        let config = EmbedConfigBuilder::new()
            .deep(true)
            .max_clashes(5)
            .build()
            .unwrap();
        assert_eq!(config.pruning.rmsd_threshold, DEEP_RMSD_THRESHOLD);
        assert_eq!(config.pruning.clash.distance, DEEP_CLASH_DISTANCE);
        assert_eq!(config.pruning.clash.max_clashes, 5);
        assert_eq!(config.rotation_steps(EmbedKind::Open), DEEP_ROTATION_STEPS);
        assert_eq!(config.rotation_steps(EmbedKind::Cyclical), DEEP_ROTATION_STEPS);
    }

    #[test]
    fn explicit_steps_override_kind_defaults() {
        let config = EmbedConfigBuilder::new().rotation_steps(6).build().unwrap();
        assert_eq!(config.rotation_steps(EmbedKind::Open), 6);
        assert_eq!(config.rotation_steps(EmbedKind::Cyclical), 6);
    }

    #[test]
    fn build_rejects_negative_thresholds() {
        let err = EmbedConfigBuilder::new()
            .rmsd_threshold(-0.1)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidParameter {
                name: "rmsd_threshold",
                ..
            }
        ));
        assert!(EmbedConfigBuilder::new().clash_distance(-1.0).build().is_err());
        assert!(EmbedConfigBuilder::new().pin_tolerance(f64::NAN).build().is_err());
        assert!(EmbedConfigBuilder::new().energy_window(-3.0).build().is_err());
    }

    #[test]
    fn build_rejects_zero_counts_and_bad_ranges() {
        assert!(EmbedConfigBuilder::new().rotation_steps(0).build().is_err());
        assert!(EmbedConfigBuilder::new().batch_size(0).build().is_err());
        assert!(EmbedConfigBuilder::new().workers(0).build().is_err());
        assert!(EmbedConfigBuilder::new().rotation_range(0.0).build().is_err());
        assert!(EmbedConfigBuilder::new().rotation_range(270.0).build().is_err());
        assert!(
            EmbedConfigBuilder::new()
                .timeout(Duration::ZERO)
                .build()
                .is_err()
        );
        assert!(EmbedConfigBuilder::new().shrink(0.5).build().is_err());
    }

    #[test]
    fn build_validates_pins() {
        let same_molecule = PinnedDistance::new(atom(0, 1), atom(0, 2), 2.0);
        assert!(EmbedConfigBuilder::new().pin(same_molecule).build().is_err());

        let negative = PinnedDistance::new(atom(0, 1), atom(1, 2), -2.0);
        assert!(EmbedConfigBuilder::new().pin(negative).build().is_err());

        let valid = PinnedDistance::new(atom(0, 1), atom(1, 2), 2.1);
        let config = EmbedConfigBuilder::new().pin(valid).build().unwrap();
        assert_eq!(config.pruning.pins.len(), 1);
        assert!(valid.joins(atom(1, 2), atom(0, 1)));
        assert!(!valid.joins(atom(1, 2), atom(0, 2)));
    }

    #[test]
    fn build_rejects_conflicting_flags() {
        let neb = NebSettings {
            images: DEFAULT_NEB_IMAGES,
            preoptimize: false,
        };
        assert!(matches!(
            EmbedConfigBuilder::new()
                .neb(neb)
                .skip_optimization(true)
                .build(),
            Err(ConfigError::Conflict(_))
        ));
        assert!(matches!(
            EmbedConfigBuilder::new().only_refined(true).bypass(true).build(),
            Err(ConfigError::Conflict(_))
        ));
    }

    #[test]
    fn bypass_implies_skipping_optimization() {
        let config = EmbedConfigBuilder::new().bypass(true).build().unwrap();
        assert!(config.skip_optimization);
        assert!(!config.optimization_enabled());
    }
}

use crate::cli::SearchOverrides;
use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;
use tsdock::engine::config::{self as core_config, PinnedDistance};

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialSearchConfig {
    steps: Option<usize>,
    rotation_range: Option<f64>,
    deep: Option<bool>,
    shrink: Option<f64>,
    rigid: Option<bool>,
    batch_size: Option<usize>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
enum PartialRmsdSubset {
    All,
    HeavyAtoms,
}

impl From<PartialRmsdSubset> for core_config::RmsdSubset {
    fn from(p: PartialRmsdSubset) -> Self {
        match p {
            PartialRmsdSubset::All => core_config::RmsdSubset::All,
            PartialRmsdSubset::HeavyAtoms => core_config::RmsdSubset::HeavyAtoms,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialPruningConfig {
    rmsd: Option<f64>,
    rmsd_subset: Option<PartialRmsdSubset>,
    max_clashes: Option<usize>,
    clash_distance: Option<f64>,
    max_new_bonds: Option<usize>,
    pin_tolerance: Option<f64>,
    suprafacial: Option<bool>,
    partition: Option<bool>,
    energy_window: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialEmbedConfig {
    search: Option<PartialSearchConfig>,
    pruning: Option<PartialPruningConfig>,
    bypass: Option<bool>,
    safety_override: Option<bool>,
}

impl PartialEmbedConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Resolves the final engine configuration. Command-line values win over
    /// `--set` values, which win over the file.
    pub fn merge_with_cli(
        mut self,
        args: &SearchOverrides,
        pins: Vec<PinnedDistance>,
    ) -> Result<core_config::EmbedConfig> {
        self.apply_set_values(&args.set_values)?;

        let search = self.search.take().unwrap_or_default();
        let pruning = self.pruning.take().unwrap_or_default();

        let mut builder = core_config::EmbedConfigBuilder::new()
            .deep(args.deep || search.deep.unwrap_or(false))
            .rigid(args.rigid || search.rigid.unwrap_or(false))
            .suprafacial_only(args.suprafacial || pruning.suprafacial.unwrap_or(false))
            .partition_by_pairing(args.partition || pruning.partition.unwrap_or(false))
            .bypass(args.bypass || self.bypass.unwrap_or(false))
            .safety_override(args.safety_override || self.safety_override.unwrap_or(false))
            // Refinement runs through the library API, not this binary.
            .skip_optimization(true);

        if let Some(steps) = args.steps.or(search.steps) {
            builder = builder.rotation_steps(steps);
        }
        if let Some(range) = args.rotation_range.or(search.rotation_range) {
            builder = builder.rotation_range(range);
        }
        let shrink = match args.shrink {
            Some(flag) => Some(flag.unwrap_or(core_config::DEFAULT_SHRINK_MULTIPLIER)),
            None => search.shrink,
        };
        if let Some(multiplier) = shrink {
            builder = builder.shrink(multiplier);
        }
        if let Some(size) = search.batch_size {
            builder = builder.batch_size(size);
        }
        if let Some(threshold) = args.rmsd.or(pruning.rmsd) {
            builder = builder.rmsd_threshold(threshold);
        }
        if let Some(subset) = pruning.rmsd_subset {
            builder = builder.rmsd_subset(subset.into());
        }
        if let Some(count) = args.max_clashes.or(pruning.max_clashes) {
            builder = builder.max_clashes(count);
        }
        if let Some(distance) = args.clash_distance.or(pruning.clash_distance) {
            builder = builder.clash_distance(distance);
        }
        if let Some(count) = args.new_bonds.or(pruning.max_new_bonds) {
            builder = builder.max_new_bonds(count);
        }
        if let Some(tolerance) = pruning.pin_tolerance {
            builder = builder.pin_tolerance(tolerance);
        }
        if let Some(window) = pruning.energy_window {
            builder = builder.energy_window(window);
        }
        for pin in pins {
            builder = builder.pin(pin);
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            match key {
                "search.steps" => {
                    self.search.get_or_insert_with(Default::default).steps = Some(parse_value(key, value_str)?)
                }
                "search.rotation-range" => {
                    self.search.get_or_insert_with(Default::default).rotation_range =
                        Some(parse_value(key, value_str)?)
                }
                "search.shrink" => {
                    self.search.get_or_insert_with(Default::default).shrink = Some(parse_value(key, value_str)?)
                }
                "search.batch-size" => {
                    self.search.get_or_insert_with(Default::default).batch_size =
                        Some(parse_value(key, value_str)?)
                }
                "pruning.rmsd" => {
                    self.pruning.get_or_insert_with(Default::default).rmsd = Some(parse_value(key, value_str)?)
                }
                "pruning.max-clashes" => {
                    self.pruning.get_or_insert_with(Default::default).max_clashes =
                        Some(parse_value(key, value_str)?)
                }
                "pruning.clash-distance" => {
                    self.pruning.get_or_insert_with(Default::default).clash_distance =
                        Some(parse_value(key, value_str)?)
                }
                "pruning.max-new-bonds" => {
                    self.pruning.get_or_insert_with(Default::default).max_new_bonds =
                        Some(parse_value(key, value_str)?)
                }
                "pruning.pin-tolerance" => {
                    self.pruning.get_or_insert_with(Default::default).pin_tolerance =
                        Some(parse_value(key, value_str)?)
                }
                "pruning.energy-window" => {
                    self.pruning.get_or_insert_with(Default::default).energy_window =
                        Some(parse_value(key, value_str)?)
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tsdock::engine::config::{RmsdSubset, SearchDepth};
    use tsdock::engine::pairing::{AtomRef, EmbedKind};

    fn overrides() -> SearchOverrides {
        SearchOverrides::default()
    }

    #[test]
    fn file_values_reach_the_engine_config() {
        let partial = PartialEmbedConfig::from_toml(
            r#"
            safety-override = true

            [search]
            steps = 36
            rotation-range = 45.0

            [pruning]
            rmsd = 0.25
            rmsd-subset = "all"
            max-clashes = 2
            suprafacial = true
            "#,
        )
        .unwrap();

        let config = partial.merge_with_cli(&overrides(), Vec::new()).unwrap();
        assert_eq!(config.rotation_steps(EmbedKind::Open), 36);
        assert_eq!(config.scan.range_degrees, Some(45.0));
        assert_eq!(config.pruning.rmsd_threshold, 0.25);
        assert_eq!(config.pruning.rmsd_subset, RmsdSubset::All);
        assert_eq!(config.pruning.clash.max_clashes, 2);
        assert!(config.pruning.suprafacial_only);
        assert!(config.safety_override);
        assert!(config.skip_optimization);
    }

    #[test]
    fn cli_overrides_take_precedence_over_file() {
        let partial = PartialEmbedConfig::from_toml("[search]\nsteps = 36\n[pruning]\nrmsd = 0.25\n")
            .unwrap();
        let args = SearchOverrides {
            steps: Some(8),
            rmsd: Some(0.75),
            deep: true,
            ..overrides()
        };

        let config = partial.merge_with_cli(&args, Vec::new()).unwrap();
        assert_eq!(config.depth, SearchDepth::Deep);
        assert_eq!(config.rotation_steps(EmbedKind::Cyclical), 8);
        assert_eq!(config.pruning.rmsd_threshold, 0.75);
    }

    #[test]
    fn set_values_override_file_but_not_flags() {
        let partial = PartialEmbedConfig::from_toml("[pruning]\nmax-clashes = 3\n").unwrap();
        let args = SearchOverrides {
            clash_distance: Some(1.2),
            set_values: vec![
                "pruning.max-clashes=1".to_string(),
                "pruning.clash-distance=2.0".to_string(),
            ],
            ..overrides()
        };

        let config = partial.merge_with_cli(&args, Vec::new()).unwrap();
        assert_eq!(config.pruning.clash.max_clashes, 1);
        assert_eq!(config.pruning.clash.distance, 1.2);
    }

    #[test]
    fn set_values_reject_bad_input() {
        let bad_format = SearchOverrides {
            set_values: vec!["pruning.rmsd".to_string()],
            ..overrides()
        };
        let err = PartialEmbedConfig::default()
            .merge_with_cli(&bad_format, Vec::new())
            .unwrap_err();
        assert!(err.to_string().contains("Invalid --set format"));

        let unknown = SearchOverrides {
            set_values: vec!["search.color=blue".to_string()],
            ..overrides()
        };
        let err = PartialEmbedConfig::default()
            .merge_with_cli(&unknown, Vec::new())
            .unwrap_err();
        assert!(err.to_string().contains("Unsupported configuration key"));

        let not_a_number = SearchOverrides {
            set_values: vec!["search.steps=many".to_string()],
            ..overrides()
        };
        assert!(matches!(
            PartialEmbedConfig::default().merge_with_cli(&not_a_number, Vec::new()),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn engine_validation_errors_surface_as_config_errors() {
        let args = SearchOverrides {
            shrink: Some(Some(0.5)),
            ..overrides()
        };
        assert!(matches!(
            PartialEmbedConfig::default().merge_with_cli(&args, Vec::new()),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn bare_shrink_flag_uses_library_default() {
        let args = SearchOverrides {
            shrink: Some(None),
            ..overrides()
        };
        let config = PartialEmbedConfig::default()
            .merge_with_cli(&args, Vec::new())
            .unwrap();
        assert_eq!(config.shrink_multiplier, core_config::DEFAULT_SHRINK_MULTIPLIER);

        let file = PartialEmbedConfig {
            search: Some(PartialSearchConfig {
                shrink: Some(1.2),
                ..Default::default()
            }),
            ..Default::default()
        };
        let config = file.merge_with_cli(&overrides(), Vec::new()).unwrap();
        assert_eq!(config.shrink_multiplier, 1.2);
    }

    #[test]
    fn pins_are_forwarded() {
        let pin = PinnedDistance::new(AtomRef::new(0, 1), AtomRef::new(1, 0), 2.2);
        let config = PartialEmbedConfig::default()
            .merge_with_cli(&overrides(), vec![pin])
            .unwrap();
        assert_eq!(config.pruning.pins, vec![pin]);
    }

    #[test]
    fn from_file_reports_unknown_fields_with_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[search]\nstep = 12").unwrap();

        let err = PartialEmbedConfig::from_file(file.path()).unwrap_err();
        match err {
            CliError::FileParsing { path, .. } => assert_eq!(path, file.path()),
            other => panic!("Expected FileParsing error, got {other:?}"),
        }
    }

    #[test]
    fn from_file_missing_path_is_io_error() {
        let err = PartialEmbedConfig::from_file(Path::new("/nonexistent/tsdock.toml")).unwrap_err();
        assert!(matches!(err, CliError::Io(_)));
    }
}

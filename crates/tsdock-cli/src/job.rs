use crate::error::{CliError, Result};
use nalgebra::Point3;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};
use tsdock::core::models::builder::MoleculeBuilder;
use tsdock::core::models::element::Element;
use tsdock::core::models::reactive::ReactiveKind;
use tsdock::core::models::registry::MoleculeRegistry;
use tsdock::engine::config::PinnedDistance;
use tsdock::engine::pairing::AtomRef;

/// A reactive atom given either as a bare index or with a forced kind.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
enum ReactiveSpec {
    Index(usize),
    Detailed {
        atom: usize,
        kind: Option<ReactiveKind>,
    },
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct MoleculeSpec {
    name: String,
    elements: Vec<String>,
    conformers: Vec<Vec<[f64; 3]>>,
    bonds: Option<Vec<[usize; 2]>>,
    reactive: Vec<ReactiveSpec>,
    #[serde(default = "default_verify_topology")]
    verify_topology: bool,
}

fn default_verify_topology() -> bool {
    true
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PinSpec {
    first: String,
    second: String,
    distance: f64,
}

/// Molecules and pinned distances of one embedding job.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct JobFile {
    molecules: Vec<MoleculeSpec>,
    #[serde(default)]
    pins: Vec<PinSpec>,
}

impl JobFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading job from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: anyhow::Error::from(e),
        })
    }

    /// Builds every molecule, resolving reactive atom kinds and frames, in file order.
    pub fn into_registry(&self) -> Result<MoleculeRegistry> {
        let mut registry = MoleculeRegistry::new();
        for spec in &self.molecules {
            let elements = spec
                .elements
                .iter()
                .map(|symbol| symbol.parse::<Element>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| CliError::Job(format!("molecule '{}': {}", spec.name, e)))?;

            let mut builder = MoleculeBuilder::new(&spec.name)
                .elements(elements)
                .verify_topology(spec.verify_topology);
            for conformer in &spec.conformers {
                builder = builder.conformer(
                    conformer
                        .iter()
                        .map(|p| Point3::new(p[0], p[1], p[2]))
                        .collect(),
                );
            }
            if let Some(bonds) = &spec.bonds {
                builder = builder.bonds(bonds.iter().map(|[i, j]| (*i, *j)));
            }
            for reactive in &spec.reactive {
                builder = match *reactive {
                    ReactiveSpec::Index(atom) | ReactiveSpec::Detailed { atom, kind: None } => {
                        builder.reactive_atom(atom)
                    }
                    ReactiveSpec::Detailed {
                        atom,
                        kind: Some(kind),
                    } => builder.reactive_atom_with_kind(atom, kind),
                };
            }

            let molecule = builder.build()?;
            info!(
                molecule = molecule.name(),
                atoms = molecule.atom_count(),
                conformers = molecule.conformer_count(),
                "Loaded molecule."
            );
            registry.insert(molecule)?;
        }
        Ok(registry)
    }

    /// Resolves `name:index` pin endpoints against a registry built from this job.
    pub fn pins(&self, registry: &MoleculeRegistry) -> Result<Vec<PinnedDistance>> {
        self.pins
            .iter()
            .map(|pin| {
                Ok(PinnedDistance::new(
                    resolve_atom(registry, &pin.first)?,
                    resolve_atom(registry, &pin.second)?,
                    pin.distance,
                ))
            })
            .collect()
    }
}

fn resolve_atom(registry: &MoleculeRegistry, label: &str) -> Result<AtomRef> {
    let (name, index) = label.rsplit_once(':').ok_or_else(|| {
        CliError::Job(format!(
            "Invalid atom reference '{}'. Expected MOLECULE:INDEX.",
            label
        ))
    })?;
    let atom = index
        .trim()
        .parse()
        .map_err(|_| CliError::Job(format!("Invalid atom index in '{}'", label)))?;
    let molecule = registry
        .find_by_name(name.trim())
        .and_then(|id| registry.position_of(id))
        .ok_or_else(|| CliError::Job(format!("Unknown molecule '{}' in '{}'", name, label)))?;
    Ok(AtomRef::new(molecule, atom))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tsdock::core::models::error::ModelError;

    pub(crate) const ADDITION_JOB: &str = r#"
[[molecules]]
name = "formaldehyde"
elements = ["O", "C", "H", "H"]
reactive = [0]
conformers = [[
    [0.0, 0.0, 0.0],
    [1.21, 0.0, 0.0],
    [1.76, 0.95, 0.0],
    [1.76, -0.95, 0.0],
]]

[[molecules]]
name = "ethylene"
elements = ["C", "C", "H", "H", "H", "H"]
reactive = [{ atom = 0, kind = "planar" }]
conformers = [[
    [0.0, 0.0, 0.0],
    [1.33, 0.0, 0.0],
    [-0.57, 0.92, 0.0],
    [-0.57, -0.92, 0.0],
    [1.90, 0.92, 0.0],
    [1.90, -0.92, 0.0],
]]

[[pins]]
first = "formaldehyde:0"
second = "ethylene:0"
distance = 2.2
"#;

    fn job(content: &str) -> JobFile {
        toml::from_str(content).unwrap()
    }

    #[test]
    fn builds_registry_in_file_order() {
        let registry = job(ADDITION_JOB).into_registry().unwrap();
        assert_eq!(registry.len(), 2);

        let formaldehyde = registry.by_position(0).unwrap();
        assert_eq!(formaldehyde.name(), "formaldehyde");
        assert_eq!(formaldehyde.reactive_atoms()[0].kind, ReactiveKind::Terminal);

        let ethylene = registry.by_position(1).unwrap();
        assert_eq!(ethylene.reactive_atoms()[0].kind, ReactiveKind::Planar);
    }

    #[test]
    fn pins_resolve_to_registry_positions() {
        let job = job(ADDITION_JOB);
        let registry = job.into_registry().unwrap();
        let pins = job.pins(&registry).unwrap();
        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].first, AtomRef::new(0, 0));
        assert_eq!(pins[0].second, AtomRef::new(1, 0));
        assert_eq!(pins[0].distance, 2.2);
    }

    #[test]
    fn bad_pin_references_are_job_errors() {
        let registry = job(ADDITION_JOB).into_registry().unwrap();
        for label in ["formaldehyde", "water:0", "ethylene:x"] {
            assert!(
                matches!(resolve_atom(&registry, label), Err(CliError::Job(_))),
                "label {label} should be rejected"
            );
        }
    }

    #[test]
    fn unknown_element_is_reported_with_molecule_name() {
        let content = ADDITION_JOB.replace(r#"["O", "C", "H", "H"]"#, r#"["O", "Xx", "H", "H"]"#);
        let err = job(&content).into_registry().unwrap_err();
        match err {
            CliError::Job(message) => assert!(message.contains("formaldehyde")),
            other => panic!("Expected Job error, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let content = ADDITION_JOB.replace(r#"name = "ethylene""#, r#"name = "formaldehyde""#);
        let err = job(&content).into_registry().unwrap_err();
        assert!(matches!(err, CliError::Model(ModelError::DuplicateName(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = JobFile::from_file(Path::new("/nonexistent/job.toml")).unwrap_err();
        assert!(matches!(err, CliError::Io(_)));
    }

    #[test]
    fn unknown_keys_are_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.toml");
        std::fs::write(&path, format!("{ADDITION_JOB}\nsolvent = \"water\"\n")).unwrap();
        assert!(matches!(
            JobFile::from_file(&path),
            Err(CliError::FileParsing { .. })
        ));
    }
}

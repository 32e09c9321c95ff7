use crate::core::models::builder::MoleculeBuilder;
use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use crate::core::models::registry::MoleculeRegistry;
use nalgebra::{Point3, Rotation3, Vector3};

fn points(raw: &[[f64; 3]]) -> Vec<Point3<f64>> {
    raw.iter().map(|p| Point3::new(p[0], p[1], p[2])).collect()
}

const FORMALDEHYDE: [[f64; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [1.21, 0.0, 0.0],
    [1.76, 0.95, 0.0],
    [1.76, -0.95, 0.0],
];

const ETHYLENE: [[f64; 3]; 6] = [
    [0.0, 0.0, 0.0],
    [1.33, 0.0, 0.0],
    [-0.57, 0.92, 0.0],
    [-0.57, -0.92, 0.0],
    [1.90, 0.92, 0.0],
    [1.90, -0.92, 0.0],
];

const BUTADIENE: [[f64; 3]; 10] = [
    [-0.67, 1.16, 0.0],
    [0.0, 0.0, 0.0],
    [1.47, 0.0, 0.0],
    [2.14, 1.16, 0.0],
    [-0.13, 2.095, 0.0],
    [-1.75, 1.16, 0.0],
    [-0.54, -0.935, 0.0],
    [2.01, -0.935, 0.0],
    [3.22, 1.16, 0.0],
    [1.60, 2.095, 0.0],
];

/// H2C=O with the oxygen as a terminal reactive atom.
pub fn formaldehyde() -> Molecule {
    MoleculeBuilder::new("formaldehyde")
        .elements(vec![Element::O, Element::C, Element::H, Element::H])
        .conformer(points(&FORMALDEHYDE))
        .reactive_atom(0)
        .build()
        .unwrap()
}

/// Ethylene with both carbons reactive.
pub fn ethylene() -> Molecule {
    named_ethylene("ethylene", &[0, 1])
}

pub fn named_ethylene(name: &str, reactive: &[usize]) -> Molecule {
    let mut builder = MoleculeBuilder::new(name)
        .elements(vec![
            Element::C,
            Element::C,
            Element::H,
            Element::H,
            Element::H,
            Element::H,
        ])
        .conformer(points(&ETHYLENE));
    for &index in reactive {
        builder = builder.reactive_atom(index);
    }
    builder.build().unwrap()
}

/// s-cis butadiene reacting through C1 and C4.
pub fn butadiene() -> Molecule {
    butadiene_builder().build().unwrap()
}

/// Butadiene with a second conformer that is a rigid copy of the first.
pub fn butadiene_ensemble() -> Molecule {
    let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), 0.7);
    let rotated = points(&BUTADIENE)
        .iter()
        .map(|p| rotation * p + Vector3::new(0.5, -1.0, 2.0))
        .collect();
    butadiene_builder().conformer(rotated).build().unwrap()
}

fn butadiene_builder() -> MoleculeBuilder {
    let mut elements = vec![Element::C; 4];
    elements.extend(vec![Element::H; 6]);
    MoleculeBuilder::new("butadiene")
        .elements(elements)
        .conformer(points(&BUTADIENE))
        .reactive_atom(0)
        .reactive_atom(3)
}

/// Formaldehyde oxygen attacking one ethylene carbon.
pub fn addition_registry() -> MoleculeRegistry {
    let mut registry = MoleculeRegistry::new();
    registry.insert(formaldehyde()).unwrap();
    registry
        .insert(named_ethylene("ethylene", &[0]))
        .unwrap();
    registry
}

/// Butadiene plus ethylene, the textbook [4+2] cycloaddition.
pub fn diels_alder_registry() -> MoleculeRegistry {
    let mut registry = MoleculeRegistry::new();
    registry.insert(butadiene()).unwrap();
    registry.insert(ethylene()).unwrap();
    registry
}

/// Three ethylenes closing a six-membered ring.
pub fn trimer_registry() -> MoleculeRegistry {
    let mut registry = MoleculeRegistry::new();
    for name in ["ethylene-a", "ethylene-b", "ethylene-c"] {
        registry.insert(named_ethylene(name, &[0, 1])).unwrap();
    }
    registry
}

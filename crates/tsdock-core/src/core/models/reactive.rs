use super::error::ModelError;
use crate::core::utils::geometry::{self, GeometryError};
use nalgebra::{Point3, Unit, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Angular tolerance, in degrees, used when deciding whether a center is linear or planar.
pub const SHAPE_TOLERANCE_DEGREES: f64 = 10.0;

/// Minimum distance, in Angstrom, of an atom from a linear axis to orient its lobes.
pub const LINEAR_REFERENCE_OFFSET: f64 = 0.1;

/// Local bonding geometry of a reactive atom.
///
/// The kind decides how many approach directions ("lobes") the atom offers
/// and how they are derived from the positions of its bonded neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactiveKind {
    /// One neighbor; the lobe continues the bond axis away from the neighbor.
    Terminal,
    /// Two neighbors at a bent angle; the lobe opposes the bisector.
    Bent,
    /// Two neighbors on a line; two lobes perpendicular to that line.
    Linear,
    /// Three coplanar neighbors; one lobe on each face of the plane.
    Planar,
    /// Three non-coplanar neighbors; the lobe opposes the neighbor sum.
    Pyramidal,
}

impl ReactiveKind {
    pub fn expected_neighbors(&self) -> usize {
        match self {
            Self::Terminal => 1,
            Self::Bent | Self::Linear => 2,
            Self::Planar | Self::Pyramidal => 3,
        }
    }

    /// Infers the kind from the positions of a center and its bonded neighbors.
    pub fn classify(
        index: usize,
        center: &Point3<f64>,
        neighbors: &[Point3<f64>],
    ) -> Result<Self, ModelError> {
        let unsupported = || ModelError::UnsupportedCoordination {
            index,
            neighbors: neighbors.len(),
        };
        match neighbors.len() {
            1 => Ok(Self::Terminal),
            2 => {
                let angle = geometry::angle_between(&(neighbors[0] - center), &(neighbors[1] - center));
                if angle.to_degrees() > 180.0 - SHAPE_TOLERANCE_DEGREES {
                    Ok(Self::Linear)
                } else {
                    Ok(Self::Bent)
                }
            }
            3 => {
                let v: Vec<Vector3<f64>> = neighbors.iter().map(|n| n - center).collect();
                let angle_sum = geometry::angle_between(&v[0], &v[1])
                    + geometry::angle_between(&v[1], &v[2])
                    + geometry::angle_between(&v[2], &v[0]);
                if angle_sum.to_degrees() > 360.0 - SHAPE_TOLERANCE_DEGREES {
                    Ok(Self::Planar)
                } else {
                    Ok(Self::Pyramidal)
                }
            }
            _ => Err(unsupported()),
        }
    }
}

impl fmt::Display for ReactiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Terminal => "terminal",
            Self::Bent => "bent",
            Self::Linear => "linear",
            Self::Planar => "planar",
            Self::Pyramidal => "pyramidal",
        })
    }
}

#[derive(Debug, Error)]
#[error("Invalid reactive atom kind")]
pub struct ParseReactiveKindError;

impl FromStr for ReactiveKind {
    type Err = ParseReactiveKindError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "terminal" | "single" => Ok(Self::Terminal),
            "bent" => Ok(Self::Bent),
            "linear" | "sp" => Ok(Self::Linear),
            "planar" | "sp2" => Ok(Self::Planar),
            "pyramidal" | "sp3" => Ok(Self::Pyramidal),
            _ => Err(ParseReactiveKindError),
        }
    }
}

/// An atom that takes part in a forming bond, with its resolved kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactiveAtom {
    pub index: usize,
    pub kind: ReactiveKind,
}

/// Orientation data of a reactive atom in one conformer.
///
/// Lobes are ordered deterministically: for planar and linear centers lobe 0
/// points along the computed normal and lobe 1 along its opposite.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalFrame {
    pub index: usize,
    pub kind: ReactiveKind,
    pub origin: Point3<f64>,
    pub lobes: Vec<Unit<Vector3<f64>>>,
    pub bond_directions: Vec<Unit<Vector3<f64>>>,
}

impl LocalFrame {
    pub fn resolve(
        index: usize,
        conformer: usize,
        kind: ReactiveKind,
        origin: &Point3<f64>,
        neighbors: &[Point3<f64>],
    ) -> Result<Self, ModelError> {
        if neighbors.len() != kind.expected_neighbors() {
            return Err(ModelError::KindMismatch {
                index,
                kind: kind.to_string(),
                neighbors: neighbors.len(),
            });
        }
        let bond_directions = neighbors
            .iter()
            .map(|n| geometry::normalize(&(n - origin)))
            .collect::<Result<Vec<_>, GeometryError>>()
            .map_err(|source| ModelError::UnresolvableFrame {
                index,
                conformer,
                kind: kind.to_string(),
                source,
            })?;

        let lobes = lobe_directions(kind, &bond_directions).map_err(|source| {
            ModelError::UnresolvableFrame {
                index,
                conformer,
                kind: kind.to_string(),
                source,
            }
        })?;

        Ok(Self {
            index,
            kind,
            origin: *origin,
            lobes,
            bond_directions,
        })
    }

    pub fn lobe(&self, choice: usize) -> Option<&Unit<Vector3<f64>>> {
        self.lobes.get(choice)
    }

    /// Points lobe 0 of a linear center at the perpendicular foot of `reference`.
    ///
    /// Other kinds, and references on the axis, are returned unchanged.
    pub fn oriented_toward(mut self, reference: &Point3<f64>) -> Self {
        if self.kind != ReactiveKind::Linear {
            return self;
        }
        let Some(axis) = self.bond_directions.first() else {
            return self;
        };
        let offset = geometry::project_perpendicular(&(reference - self.origin), axis);
        if offset.norm() < LINEAR_REFERENCE_OFFSET {
            return self;
        }
        if let Ok(normal) = geometry::normalize(&offset) {
            self.lobes = vec![normal, -normal];
        }
        self
    }
}

fn lobe_directions(
    kind: ReactiveKind,
    bonds: &[Unit<Vector3<f64>>],
) -> Result<Vec<Unit<Vector3<f64>>>, GeometryError> {
    match kind {
        ReactiveKind::Terminal => Ok(vec![-bonds[0]]),
        ReactiveKind::Bent => {
            let lobe = geometry::normalize(&-(bonds[0].into_inner() + bonds[1].into_inner()))?;
            Ok(vec![lobe])
        }
        ReactiveKind::Linear => {
            let axis = geometry::normalize(&(bonds[0].into_inner() - bonds[1].into_inner()))?;
            let normal = geometry::any_perpendicular(&axis);
            Ok(vec![normal, -normal])
        }
        ReactiveKind::Planar => {
            let (a, b, c) = (
                bonds[0].into_inner(),
                bonds[1].into_inner(),
                bonds[2].into_inner(),
            );
            let normal = geometry::normalize(&(a.cross(&b) + b.cross(&c) + c.cross(&a)))?;
            Ok(vec![normal, -normal])
        }
        ReactiveKind::Pyramidal => {
            let lobe = geometry::normalize(
                &-(bonds[0].into_inner() + bonds[1].into_inner() + bonds[2].into_inner()),
            )?;
            Ok(vec![lobe])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Point3<f64> {
        Point3::origin()
    }

    fn trigonal_neighbors() -> Vec<Point3<f64>> {
        let r = 1.4;
        (0..3)
            .map(|k| {
                let angle = (k as f64) * 120f64.to_radians();
                Point3::new(r * angle.cos(), r * angle.sin(), 0.0)
            })
            .collect()
    }

    #[test]
    fn classify_distinguishes_all_shapes() {
        let o = origin();
        assert_eq!(
            ReactiveKind::classify(0, &o, &[Point3::new(1.0, 0.0, 0.0)]).unwrap(),
            ReactiveKind::Terminal
        );
        assert_eq!(
            ReactiveKind::classify(0, &o, &[Point3::new(1.0, 0.0, 0.0), Point3::new(-1.0, 0.0, 0.0)])
                .unwrap(),
            ReactiveKind::Linear
        );
        assert_eq!(
            ReactiveKind::classify(0, &o, &[Point3::new(1.0, 0.0, 0.0), Point3::new(-0.3, 0.95, 0.0)])
                .unwrap(),
            ReactiveKind::Bent
        );
        assert_eq!(
            ReactiveKind::classify(0, &o, &trigonal_neighbors()).unwrap(),
            ReactiveKind::Planar
        );
        let pyramid: Vec<_> = trigonal_neighbors()
            .into_iter()
            .map(|p| Point3::new(p.x, p.y, -0.5))
            .collect();
        assert_eq!(
            ReactiveKind::classify(0, &o, &pyramid).unwrap(),
            ReactiveKind::Pyramidal
        );
    }

    #[test]
    fn classify_rejects_isolated_and_saturated_centers() {
        let o = origin();
        assert_eq!(
            ReactiveKind::classify(4, &o, &[]),
            Err(ModelError::UnsupportedCoordination {
                index: 4,
                neighbors: 0
            })
        );
        let four = vec![Point3::new(1.0, 0.0, 0.0); 4];
        assert!(matches!(
            ReactiveKind::classify(4, &o, &four),
            Err(ModelError::UnsupportedCoordination { neighbors: 4, .. })
        ));
    }

    #[test]
    fn terminal_lobe_extends_bond_axis() {
        let frame = LocalFrame::resolve(
            0,
            0,
            ReactiveKind::Terminal,
            &origin(),
            &[Point3::new(-1.2, 0.0, 0.0)],
        )
        .unwrap();
        assert_eq!(frame.lobes.len(), 1);
        assert!((frame.lobes[0].into_inner() - Vector3::x()).norm() < 1e-12);
    }

    #[test]
    fn planar_lobes_are_opposite_plane_normals() {
        let frame =
            LocalFrame::resolve(0, 0, ReactiveKind::Planar, &origin(), &trigonal_neighbors()).unwrap();
        assert_eq!(frame.lobes.len(), 2);
        assert!(frame.lobes[0].z.abs() > 1.0 - 1e-9);
        assert!((frame.lobes[0].into_inner() + frame.lobes[1].into_inner()).norm() < 1e-12);
    }

    #[test]
    fn linear_lobes_are_perpendicular_to_axis() {
        let frame = LocalFrame::resolve(
            0,
            0,
            ReactiveKind::Linear,
            &origin(),
            &[Point3::new(0.0, 0.0, 1.2), Point3::new(0.0, 0.0, -1.2)],
        )
        .unwrap();
        for lobe in &frame.lobes {
            assert!(lobe.z.abs() < 1e-12);
        }
    }

    #[test]
    fn linear_lobes_follow_reference_atom() {
        let frame = LocalFrame::resolve(
            0,
            0,
            ReactiveKind::Linear,
            &origin(),
            &[Point3::new(0.0, 0.0, 1.2), Point3::new(0.0, 0.0, -1.2)],
        )
        .unwrap()
        .oriented_toward(&Point3::new(3.0, 1.0, 5.0));
        let expected = Vector3::new(3.0, 1.0, 0.0).normalize();
        assert!((frame.lobes[0].into_inner() - expected).norm() < 1e-12);
        assert!((frame.lobes[1].into_inner() + expected).norm() < 1e-12);

        let unchanged = frame.clone().oriented_toward(&Point3::new(0.0, 0.0, 4.0));
        assert_eq!(unchanged, frame);
    }

    #[test]
    fn bent_lobe_points_away_from_neighbors() {
        let frame = LocalFrame::resolve(
            0,
            0,
            ReactiveKind::Bent,
            &origin(),
            &[Point3::new(1.0, 1.0, 0.0), Point3::new(-1.0, 1.0, 0.0)],
        )
        .unwrap();
        assert!((frame.lobes[0].into_inner() + Vector3::y()).norm() < 1e-12);
    }

    #[test]
    fn resolve_rejects_kind_with_wrong_neighbor_count() {
        let result = LocalFrame::resolve(
            2,
            0,
            ReactiveKind::Planar,
            &origin(),
            &[Point3::new(1.0, 0.0, 0.0)],
        );
        assert!(matches!(
            result,
            Err(ModelError::KindMismatch { index: 2, neighbors: 1, .. })
        ));
    }

    #[test]
    fn resolve_reports_coincident_neighbors() {
        let result = LocalFrame::resolve(0, 0, ReactiveKind::Terminal, &origin(), &[origin()]);
        assert!(matches!(result, Err(ModelError::UnresolvableFrame { .. })));
    }

    #[test]
    fn kind_parses_common_aliases() {
        assert_eq!("sp2".parse::<ReactiveKind>().unwrap(), ReactiveKind::Planar);
        assert_eq!("Terminal".parse::<ReactiveKind>().unwrap(), ReactiveKind::Terminal);
        assert!("tetrahedral".parse::<ReactiveKind>().is_err());
    }
}

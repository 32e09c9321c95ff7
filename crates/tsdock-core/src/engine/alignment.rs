use super::context::EmbedContext;
use super::pairing::{AtomRef, EmbedKind, Pairing, RingSegment};
use super::pose::LobeChoice;
use crate::core::models::reactive::LocalFrame;
use crate::core::utils::geometry::{
    self, EPSILON, GeometryError, RigidTransform, project_perpendicular, rotation_to_align,
    signed_angle_about,
};
use itertools::Itertools;
use nalgebra::{Point3, Rotation3, Unit, Vector3};
use std::f64::consts::{PI, TAU};
use thiserror::Error;
use tracing::debug;

/// Slack added on top of the minimal stretch that lets a ring close.
const RING_STRETCH_MARGIN: f64 = 1.05;
const POLYGON_MAX_ITERATIONS: usize = 200;
const POLYGON_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AlignmentError {
    #[error("No local frame for reactive atom {atom} in conformer {conformer}")]
    MissingFrame { atom: AtomRef, conformer: usize },

    #[error(
        "Ring cannot close: longest side {longest:.3} is not shorter than the sum of the others {rest:.3}"
    )]
    RingCannotClose { longest: f64, rest: f64 },

    #[error("Cyclic polygon solver did not converge for sides {sides:?}")]
    PolygonNotSolved { sides: Vec<f64> },

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Line about which a placed molecule can be rotated without disturbing its docking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DockingAxis {
    pub origin: Point3<f64>,
    pub direction: Unit<Vector3<f64>>,
}

impl DockingAxis {
    fn transformed(&self, transform: &RigidTransform) -> Self {
        Self {
            origin: transform.apply(&self.origin),
            direction: Unit::new_unchecked(transform.apply_vector(&self.direction)),
        }
    }
}

/// Placement of every molecule for one lobe combination, before scanning.
///
/// The reference molecule always carries the identity transform and no axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedAlignment {
    pub transforms: Vec<RigidTransform>,
    pub lobes: Vec<LobeChoice>,
    pub embed_scale: f64,
    pub axes: Vec<Option<DockingAxis>>,
}

/// Computes every seed alignment of `pairing` for the given conformer choice.
///
/// Seeds are ordered by lobe index combination, lexicographically over the
/// reacting atoms in ring (or donor, acceptor) order. A combination that
/// fails for geometric reasons is skipped; an error is returned only when
/// the pairing as a whole cannot be embedded.
pub fn align(
    ctx: &EmbedContext,
    pairing: &Pairing,
    conformers: &[usize],
) -> Result<Vec<SeedAlignment>, AlignmentError> {
    match pairing.kind {
        EmbedKind::Open => align_open(ctx, pairing, conformers),
        EmbedKind::Cyclical => align_cyclical(ctx, pairing, conformers),
    }
}

fn frame_of<'c>(
    ctx: &'c EmbedContext,
    atom: AtomRef,
    conformers: &[usize],
) -> Result<&'c LocalFrame, AlignmentError> {
    let conformer = conformers.get(atom.molecule).copied().unwrap_or(0);
    ctx.frame(atom, conformer)
        .ok_or(AlignmentError::MissingFrame { atom, conformer })
}

/// Lobe index combinations over `frames`, optionally keeping only those where
/// every molecule with two reacting atoms uses lobes on the same face.
fn lobe_combinations(frames: &[&LocalFrame], atoms: &[AtomRef], same_face: bool) -> Vec<Vec<usize>> {
    frames
        .iter()
        .map(|frame| 0..frame.lobes.len())
        .multi_cartesian_product()
        .filter(|combo| {
            !same_face
                || atoms.iter().enumerate().tuple_combinations().all(|((i, a), (j, b))| {
                    a.molecule != b.molecule
                        || frames[i].lobes[combo[i]].dot(&frames[j].lobes[combo[j]].into_inner())
                            > 0.0
                })
        })
        .collect()
}

fn align_open(
    ctx: &EmbedContext,
    pairing: &Pairing,
    conformers: &[usize],
) -> Result<Vec<SeedAlignment>, AlignmentError> {
    let Some(pair) = pairing.pairs.first() else {
        return Ok(Vec::new());
    };
    let shrink = ctx.config.shrink_multiplier;
    let atoms = [pair.donor, pair.acceptor];
    let fixed = frame_of(ctx, pair.donor, conformers)?;
    let mobile = frame_of(ctx, pair.acceptor, conformers)?;
    let distance = pair.distance * shrink;

    let mut seeds = Vec::new();
    for combo in lobe_combinations(&[fixed, mobile], &atoms, false) {
        let fixed_lobe = fixed.lobes[combo[0]].into_inner();
        let mobile_lobe = mobile.lobes[combo[1]].into_inner();

        let rotation = match rotation_to_align(&mobile_lobe, &-fixed_lobe) {
            Ok(rotation) => rotation,
            Err(error) => {
                debug!(?combo, %error, "Skipping open alignment branch.");
                continue;
            }
        };
        let target = fixed.origin + fixed_lobe * distance;
        let transform = RigidTransform::new(rotation, target.coords - rotation * mobile.origin.coords);

        let mut transforms = vec![RigidTransform::identity(); ctx.molecule_count()];
        transforms[pair.acceptor.molecule] = transform;
        let mut axes = vec![None; ctx.molecule_count()];
        axes[pair.acceptor.molecule] = Some(DockingAxis {
            origin: fixed.origin,
            direction: fixed.lobes[combo[0]],
        });

        seeds.push(SeedAlignment {
            transforms,
            lobes: atoms
                .iter()
                .zip(&combo)
                .map(|(&atom, &lobe)| LobeChoice { atom, lobe })
                .collect(),
            embed_scale: shrink,
            axes,
        });
    }
    Ok(seeds)
}

/// Vertices of a convex polygon with the given sides inscribed in a circle.
///
/// Vertices lie in the xy-plane; side `k` joins vertex `k` and `k + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct CyclicPolygon {
    pub radius: f64,
    pub vertices: Vec<Point3<f64>>,
}

impl CyclicPolygon {
    pub fn solve(sides: &[f64]) -> Result<Self, AlignmentError> {
        let not_solved = || AlignmentError::PolygonNotSolved {
            sides: sides.to_vec(),
        };
        if sides.len() < 3 || sides.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(not_solved());
        }
        let (longest_index, longest) = sides
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .ok_or_else(not_solved)?;
        let rest: f64 = sides.iter().sum::<f64>() - longest;
        if longest >= rest {
            return Err(AlignmentError::RingCannotClose { longest, rest });
        }

        let central_angle = |side: f64, radius: f64| 2.0 * (side / (2.0 * radius)).min(1.0).asin();
        let minimum = longest / 2.0;
        let others_at = |radius: f64| -> f64 {
            sides
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != longest_index)
                .map(|(_, &s)| central_angle(s, radius))
                .sum()
        };

        // The circle centre lies inside the polygon when all central angles can sum to a full turn.
        let centre_inside = others_at(minimum) + PI >= TAU;
        let residual = |radius: f64| -> f64 {
            if centre_inside {
                others_at(radius) + central_angle(longest, radius) - TAU
            } else {
                others_at(radius) - central_angle(longest, radius)
            }
        };

        // residual is positive near the minimum radius in the first case and negative in the second.
        let sign_at_minimum = if centre_inside { 1.0 } else { -1.0 };
        let mut low = minimum;
        let mut high = longest.max(minimum * 2.0);
        let mut expansions = 0;
        while residual(high) * sign_at_minimum > 0.0 {
            high *= 2.0;
            expansions += 1;
            if expansions > 60 {
                return Err(not_solved());
            }
        }
        for _ in 0..POLYGON_MAX_ITERATIONS {
            let mid = 0.5 * (low + high);
            if residual(mid) * sign_at_minimum > 0.0 {
                low = mid;
            } else {
                high = mid;
            }
            if high - low < POLYGON_TOLERANCE {
                break;
            }
        }
        let radius = 0.5 * (low + high);

        let mut angle: f64 = 0.0;
        let mut vertices = Vec::with_capacity(sides.len());
        for (k, &side) in sides.iter().enumerate() {
            vertices.push(Point3::new(radius * angle.cos(), radius * angle.sin(), 0.0));
            let step = central_angle(side, radius);
            if !centre_inside && k == longest_index {
                angle -= step;
            } else {
                angle += step;
            }
        }
        Ok(Self { radius, vertices })
    }

    pub fn centroid(&self) -> Point3<f64> {
        geometry::centroid(&self.vertices).unwrap_or_else(Point3::origin)
    }
}

/// Lengths of the ring sides and the uniform stretch applied to the forming ones.
fn ring_sides(
    ctx: &EmbedContext,
    pairing: &Pairing,
    conformers: &[usize],
) -> Result<(Vec<f64>, f64), AlignmentError> {
    let ring = &pairing.ring;
    let shrink = ctx.config.shrink_multiplier;
    let mut sides = Vec::with_capacity(ring.len());
    let mut forming = Vec::with_capacity(ring.len());
    for k in 0..ring.len() {
        let (a, b) = (ring[k], ring[(k + 1) % ring.len()]);
        if a.molecule == b.molecule {
            let pa = frame_of(ctx, a, conformers)?.origin;
            let pb = frame_of(ctx, b, conformers)?.origin;
            sides.push((pb - pa).norm());
            forming.push(false);
        } else {
            let target = pairing
                .pair_between(a, b)
                .map(|pair| pair.distance)
                .unwrap_or_default();
            sides.push(target * shrink);
            forming.push(true);
        }
    }

    let closes = |sides: &[f64]| {
        let total: f64 = sides.iter().sum();
        sides.iter().all(|&s| 2.0 * s < total)
    };
    if closes(&sides) {
        return Ok((sides, 1.0));
    }

    let longest = sides.iter().copied().fold(0.0, f64::max);
    let total: f64 = sides.iter().sum();
    if ctx.config.rigid {
        return Err(AlignmentError::RingCannotClose {
            longest,
            rest: total - longest,
        });
    }
    let forming_total: f64 = sides
        .iter()
        .zip(&forming)
        .filter(|(_, f)| **f)
        .map(|(s, _)| s)
        .sum();
    let intra_total = total - forming_total;
    if forming_total <= EPSILON {
        return Err(AlignmentError::RingCannotClose {
            longest,
            rest: total - longest,
        });
    }
    let stretch = ((2.0 * longest - intra_total) / forming_total * RING_STRETCH_MARGIN).max(1.0);
    let stretched: Vec<f64> = sides
        .iter()
        .zip(&forming)
        .map(|(&s, &f)| if f { s * stretch } else { s })
        .collect();
    if !closes(&stretched) {
        let longest = stretched.iter().copied().fold(0.0, f64::max);
        return Err(AlignmentError::RingCannotClose {
            longest,
            rest: stretched.iter().sum::<f64>() - longest,
        });
    }
    debug!(stretch, "Stretched forming distances to close the ring.");
    Ok((stretched, stretch))
}

fn align_cyclical(
    ctx: &EmbedContext,
    pairing: &Pairing,
    conformers: &[usize],
) -> Result<Vec<SeedAlignment>, AlignmentError> {
    let (sides, stretch) = ring_sides(ctx, pairing, conformers)?;
    let polygon = CyclicPolygon::solve(&sides)?;
    let centre = polygon.centroid();
    let segments = pairing.segments();

    let frames: Vec<&LocalFrame> = pairing
        .ring
        .iter()
        .map(|&atom| frame_of(ctx, atom, conformers))
        .collect::<Result<_, _>>()?;
    let same_face = ctx.config.pruning.suprafacial_only;

    let mut seeds = Vec::new();
    for combo in lobe_combinations(&frames, &pairing.ring, same_face) {
        match place_ring(ctx, &segments, &frames, &combo, &polygon.vertices, &centre) {
            Ok((transforms, axes)) => seeds.push(SeedAlignment {
                transforms,
                lobes: pairing
                    .ring
                    .iter()
                    .zip(&combo)
                    .map(|(&atom, &lobe)| LobeChoice { atom, lobe })
                    .collect(),
                embed_scale: ctx.config.shrink_multiplier * stretch,
                axes,
            }),
            Err(error) => debug!(?combo, %error, "Skipping cyclical alignment branch."),
        }
    }
    Ok(seeds)
}

type Placement = (Vec<RigidTransform>, Vec<Option<DockingAxis>>);

/// Places each ring segment on its polygon vertices with its lobes facing the ring interior,
/// then expresses everything relative to the reference molecule.
fn place_ring(
    ctx: &EmbedContext,
    segments: &[RingSegment],
    frames: &[&LocalFrame],
    lobes: &[usize],
    vertices: &[Point3<f64>],
    centre: &Point3<f64>,
) -> Result<Placement, AlignmentError> {
    let mut transforms = vec![RigidTransform::identity(); ctx.molecule_count()];
    let mut axes: Vec<Option<DockingAxis>> = vec![None; ctx.molecule_count()];

    let mut ring_index = 0;
    for segment in segments {
        let (transform, axis) = match segment.atoms.len() {
            1 => {
                let frame = frames[ring_index];
                let vertex = vertices[ring_index];
                let lobe = frame.lobes[lobes[ring_index]].into_inner();
                let inward = geometry::normalize(&(centre - vertex))?;
                let rotation = rotation_to_align(&lobe, &inward.into_inner())?;
                let transform =
                    RigidTransform::new(rotation, vertex.coords - rotation * frame.origin.coords);
                (
                    transform,
                    DockingAxis {
                        origin: vertex,
                        direction: inward,
                    },
                )
            }
            _ => {
                let (first, second) = (frames[ring_index], frames[ring_index + 1]);
                let (va, vb) = (vertices[ring_index], vertices[ring_index + 1]);
                let chord = geometry::normalize(&(vb - va))?;
                let align = rotation_to_align(&(second.origin - first.origin), &chord.into_inner())?;

                let la = align * first.lobes[lobes[ring_index]].into_inner();
                let lb = align * second.lobes[lobes[ring_index + 1]].into_inner();
                let mut facing = project_perpendicular(&(la + lb), &chord);
                if facing.norm() < 1e-6 {
                    facing = project_perpendicular(&la, &chord);
                }
                let midpoint = Point3::from((va.coords + vb.coords) * 0.5);
                let inward = project_perpendicular(&(centre - midpoint), &chord);
                let twist = signed_angle_about(&chord, &facing, &inward)?;
                let rotation = Rotation3::from_axis_angle(&chord, twist) * align;
                let transform = RigidTransform::new(rotation, va.coords - rotation * first.origin.coords);
                (
                    transform,
                    DockingAxis {
                        origin: va,
                        direction: chord,
                    },
                )
            }
        };
        transforms[segment.molecule] = transform;
        axes[segment.molecule] = Some(axis);
        ring_index += segment.atoms.len();
    }

    let to_reference = transforms[0].inverse();
    let transforms: Vec<RigidTransform> = transforms
        .iter()
        .enumerate()
        .map(|(m, t)| {
            if m == 0 {
                RigidTransform::identity()
            } else {
                t.then(&to_reference)
            }
        })
        .collect();
    let axes: Vec<Option<DockingAxis>> = axes
        .iter()
        .enumerate()
        .map(|(m, axis)| {
            if m == 0 {
                None
            } else {
                axis.map(|a| a.transformed(&to_reference))
            }
        })
        .collect();
    Ok((transforms, axes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::registry::MoleculeRegistry;
    use crate::engine::config::{EmbedConfigBuilder, PinnedDistance};
    use crate::engine::pairing::enumerate_pairings;
    use crate::engine::progress::ProgressReporter;
    use crate::test_fixtures;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() < tol, "{a} vs {b}");
    }

    fn placed(ctx: &EmbedContext, seed: &SeedAlignment, atom: AtomRef, conformer: usize) -> Point3<f64> {
        let position = ctx
            .molecule(atom.molecule)
            .unwrap()
            .conformer(conformer)
            .unwrap()
            .position(atom.atom)
            .unwrap();
        seed.transforms[atom.molecule].apply(position)
    }

    #[test]
    fn cyclic_polygon_reproduces_regular_hexagon() {
        let polygon = CyclicPolygon::solve(&[1.0; 6]).unwrap();
        assert_close(polygon.radius, 1.0, 1e-9);
        for k in 0..6 {
            let side = (polygon.vertices[(k + 1) % 6] - polygon.vertices[k]).norm();
            assert_close(side, 1.0, 1e-9);
        }
    }

    #[test]
    fn cyclic_polygon_handles_centre_outside() {
        let sides = [1.0, 1.0, 1.9];
        let polygon = CyclicPolygon::solve(&sides).unwrap();
        for k in 0..3 {
            let side = (polygon.vertices[(k + 1) % 3] - polygon.vertices[k]).norm();
            assert_close(side, sides[k], 1e-9);
            assert_close(polygon.vertices[k].coords.norm(), polygon.radius, 1e-9);
        }
    }

    #[test]
    fn cyclic_polygon_rejects_impossible_rings() {
        assert!(matches!(
            CyclicPolygon::solve(&[1.0, 1.0, 2.5]),
            Err(AlignmentError::RingCannotClose { .. })
        ));
        assert!(CyclicPolygon::solve(&[1.0, 1.0]).is_err());
    }

    #[test]
    fn open_alignment_docks_at_target_distance_with_opposed_lobes() {
        let registry = test_fixtures::addition_registry();
        let config = EmbedConfigBuilder::new().build().unwrap();
        let reporter = ProgressReporter::new();
        let ctx = EmbedContext::new(&registry, &config, &reporter).unwrap();
        let pairing = &ctx.pairings()[0];
        let seeds = align(&ctx, pairing, &[0, 0]).unwrap();

        assert_eq!(seeds.len(), 2);
        let pair = pairing.pairs[0];
        for seed in &seeds {
            assert_eq!(seed.transforms[0], RigidTransform::identity());
            let d = (placed(&ctx, seed, pair.donor, 0) - placed(&ctx, seed, pair.acceptor, 0)).norm();
            assert_close(d, pair.distance, 1e-9);

            let donor_lobe = ctx.frame(pair.donor, 0).unwrap().lobes[seed.lobes[0].lobe];
            let acceptor_lobe = ctx.frame(pair.acceptor, 0).unwrap().lobes[seed.lobes[1].lobe];
            let moved = seed.transforms[1].apply_vector(&acceptor_lobe.into_inner());
            assert_close(moved.dot(&donor_lobe.into_inner()), -1.0, 1e-9);
            assert!(seed.axes[0].is_none() && seed.axes[1].is_some());
        }
    }

    #[test]
    fn identical_planar_partners_give_face_flipped_seeds() {
        let mut registry = MoleculeRegistry::new();
        registry
            .insert(test_fixtures::named_ethylene("left", &[0]))
            .unwrap();
        registry
            .insert(test_fixtures::named_ethylene("right", &[0]))
            .unwrap();
        let config = EmbedConfigBuilder::new().build().unwrap();
        let reporter = ProgressReporter::new();
        let ctx = EmbedContext::new(&registry, &config, &reporter).unwrap();
        let seeds = align(&ctx, &ctx.pairings()[0], &[0, 0]).unwrap();

        assert_eq!(seeds.len(), 4);
        let lobes: Vec<(usize, usize)> = seeds.iter().map(|s| (s.lobes[0].lobe, s.lobes[1].lobe)).collect();
        assert_eq!(lobes, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert_ne!(seeds[0].transforms[1], seeds[2].transforms[1]);
    }

    #[test]
    fn shrink_scales_docking_distance() {
        let registry = test_fixtures::addition_registry();
        let config = EmbedConfigBuilder::new().shrink(1.5).build().unwrap();
        let reporter = ProgressReporter::new();
        let ctx = EmbedContext::new(&registry, &config, &reporter).unwrap();
        let pairing = &ctx.pairings()[0];
        let seed = &align(&ctx, pairing, &[0, 0]).unwrap()[0];
        let pair = pairing.pairs[0];
        let d = (placed(&ctx, seed, pair.donor, 0) - placed(&ctx, seed, pair.acceptor, 0)).norm();
        assert_close(d, pair.distance * 1.5, 1e-9);
        assert_close(seed.embed_scale, 1.5, 1e-12);
    }

    #[test]
    fn cyclical_alignment_closes_diels_alder_ring() {
        let registry = test_fixtures::diels_alder_registry();
        let config = EmbedConfigBuilder::new().build().unwrap();
        let reporter = ProgressReporter::new();
        let ctx = EmbedContext::new(&registry, &config, &reporter).unwrap();

        for pairing in ctx.pairings() {
            let seeds = align(&ctx, pairing, &[0, 0]).unwrap();
            assert_eq!(seeds.len(), 16);
            for seed in &seeds {
                assert_eq!(seed.transforms[0], RigidTransform::identity());
                assert_close(seed.embed_scale, 1.0, 1e-12);
                for pair in &pairing.pairs {
                    let d = (placed(&ctx, seed, pair.donor, 0) - placed(&ctx, seed, pair.acceptor, 0))
                        .norm();
                    assert_close(d, pair.distance, 1e-6);
                }
            }
        }
    }

    #[test]
    fn same_face_lobes_point_into_the_ring() {
        let registry = test_fixtures::diels_alder_registry();
        let config = EmbedConfigBuilder::new().suprafacial_only(true).build().unwrap();
        let reporter = ProgressReporter::new();
        let ctx = EmbedContext::new(&registry, &config, &reporter).unwrap();
        let pairing = &ctx.pairings()[0];
        let seed = &align(&ctx, pairing, &[0, 0]).unwrap()[0];

        let ring: Vec<Point3<f64>> = pairing.ring.iter().map(|&a| placed(&ctx, seed, a, 0)).collect();
        let centre = geometry::centroid(&ring).unwrap();
        for choice in &seed.lobes {
            let lobe = ctx.frame(choice.atom, 0).unwrap().lobes[choice.lobe];
            let moved = seed.transforms[choice.atom.molecule].apply_vector(&lobe.into_inner());
            let position = placed(&ctx, seed, choice.atom, 0);
            assert!(moved.dot(&(centre - position)) > 0.0);
        }
    }

    #[test]
    fn suprafacial_option_keeps_same_face_lobe_combinations() {
        let registry = test_fixtures::diels_alder_registry();
        let config = EmbedConfigBuilder::new().suprafacial_only(true).build().unwrap();
        let reporter = ProgressReporter::new();
        let ctx = EmbedContext::new(&registry, &config, &reporter).unwrap();
        let seeds = align(&ctx, &ctx.pairings()[0], &[0, 0]).unwrap();
        assert_eq!(seeds.len(), 4);
    }

    #[test]
    fn three_membered_ring_places_single_atom_segment() {
        let mut registry = MoleculeRegistry::new();
        registry.insert(test_fixtures::formaldehyde()).unwrap();
        registry.insert(test_fixtures::ethylene()).unwrap();
        let config = EmbedConfigBuilder::new().build().unwrap();
        let reporter = ProgressReporter::new();
        let ctx = EmbedContext::new(&registry, &config, &reporter).unwrap();
        let pairings = enumerate_pairings(&registry, &[]).unwrap();
        let seeds = align(&ctx, &pairings[0], &[0, 0]).unwrap();
        assert_eq!(seeds.len(), 4);
        for seed in &seeds {
            for pair in &pairings[0].pairs {
                let d = (placed(&ctx, seed, pair.donor, 0) - placed(&ctx, seed, pair.acceptor, 0)).norm();
                assert_close(d, pair.distance, 1e-6);
            }
        }
    }

    #[test]
    fn rigid_mode_refuses_rings_that_need_stretching() {
        let mut registry = MoleculeRegistry::new();
        registry.insert(test_fixtures::butadiene()).unwrap();
        registry.insert(test_fixtures::ethylene()).unwrap();
        let pin_a = PinnedDistance::new(AtomRef::new(0, 0), AtomRef::new(1, 0), 0.5);
        let pin_b = PinnedDistance::new(AtomRef::new(0, 3), AtomRef::new(1, 1), 0.5);
        let reporter = ProgressReporter::new();

        let rigid = EmbedConfigBuilder::new().pin(pin_a).pin(pin_b).rigid(true).build().unwrap();
        let ctx = EmbedContext::new(&registry, &rigid, &reporter).unwrap();
        assert!(matches!(
            align(&ctx, &ctx.pairings()[0], &[0, 0]),
            Err(AlignmentError::RingCannotClose { .. })
        ));

        let flexible = EmbedConfigBuilder::new().pin(pin_a).pin(pin_b).build().unwrap();
        let ctx = EmbedContext::new(&registry, &flexible, &reporter).unwrap();
        let seeds = align(&ctx, &ctx.pairings()[0], &[0, 0]).unwrap();
        assert!(!seeds.is_empty());
        assert!(seeds[0].embed_scale > 1.0);
    }
}

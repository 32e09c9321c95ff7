use nalgebra::{Matrix3, Point3, Rotation3, Unit, Vector3};
use thiserror::Error;

/// Length below which a vector is treated as degenerate.
pub const EPSILON: f64 = 1e-8;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Degenerate vector of length {length:.3e} cannot define a direction")]
    DegenerateVector { length: f64 },
    #[error("Point sets differ in size ({left} vs {right})")]
    SizeMismatch { left: usize, right: usize },
    #[error("Point set is empty")]
    EmptyPointSet,
    #[error("Singular value decomposition did not produce orthogonal factors")]
    DecompositionFailed,
}

/// A proper rigid-body motion `x -> R x + t`.
///
/// Transforms compose with [`RigidTransform::then`] and never carry scaling or
/// reflection, so every pose built from them preserves intramolecular geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    pub fn new(rotation: Rotation3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Rotation3::identity(), Vector3::zeros())
    }

    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self::new(Rotation3::identity(), translation)
    }

    /// Rotation by `angle_radians` about the line through `origin` along `axis`.
    ///
    /// Points on the axis are fixed by the resulting transform.
    pub fn about_axis(origin: &Point3<f64>, axis: &Unit<Vector3<f64>>, angle_radians: f64) -> Self {
        let rotation = Rotation3::from_axis_angle(axis, angle_radians);
        let translation = origin.coords - rotation * origin.coords;
        Self::new(rotation, translation)
    }

    #[inline]
    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        self.rotation * point + self.translation
    }

    #[inline]
    pub fn apply_vector(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * vector
    }

    pub fn apply_all(&self, points: &[Point3<f64>]) -> Vec<Point3<f64>> {
        points.iter().map(|p| self.apply(p)).collect()
    }

    /// Returns the transform equivalent to applying `self` first and `next` second.
    pub fn then(&self, next: &RigidTransform) -> RigidTransform {
        RigidTransform::new(
            next.rotation * self.rotation,
            next.rotation * self.translation + next.translation,
        )
    }

    pub fn inverse(&self) -> RigidTransform {
        let inverse_rotation = self.rotation.inverse();
        RigidTransform::new(inverse_rotation, -(inverse_rotation * self.translation))
    }
}

pub fn normalize(vector: &Vector3<f64>) -> Result<Unit<Vector3<f64>>, GeometryError> {
    Unit::try_new(*vector, EPSILON).ok_or(GeometryError::DegenerateVector {
        length: vector.norm(),
    })
}

/// Returns a unit vector orthogonal to `vector`.
///
/// The helper axis is chosen from whichever Cartesian direction is least
/// aligned with `vector`, so the result is well conditioned for any input.
pub fn any_perpendicular(vector: &Unit<Vector3<f64>>) -> Unit<Vector3<f64>> {
    let helper = if vector.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    Unit::new_normalize(helper - vector.into_inner() * vector.dot(&helper))
}

/// Component of `vector` orthogonal to `axis`.
pub fn project_perpendicular(vector: &Vector3<f64>, axis: &Unit<Vector3<f64>>) -> Vector3<f64> {
    vector - axis.into_inner() * axis.dot(vector)
}

/// Minimal rotation taking the direction of `from` onto the direction of `to`.
///
/// Parallel inputs yield the identity and antiparallel inputs a half turn
/// about an arbitrary perpendicular axis.
pub fn rotation_to_align(
    from: &Vector3<f64>,
    to: &Vector3<f64>,
) -> Result<Rotation3<f64>, GeometryError> {
    let from_unit = normalize(from)?;
    let from = from_unit.into_inner();
    let to = normalize(to)?.into_inner();
    let cosine = from.dot(&to);

    if cosine > 1.0 - 1e-12 {
        return Ok(Rotation3::identity());
    }
    if cosine < -1.0 + 1e-12 {
        return Ok(Rotation3::from_axis_angle(
            &any_perpendicular(&from_unit),
            std::f64::consts::PI,
        ));
    }

    let axis = Unit::new_normalize(from.cross(&to));
    Ok(Rotation3::from_axis_angle(&axis, cosine.clamp(-1.0, 1.0).acos()))
}

/// Angle in radians between two vectors, stable near 0 and pi.
pub fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    a.cross(b).norm().atan2(a.dot(b))
}

/// Signed angle that rotates `from` onto `to` about `axis`, after both are
/// projected into the plane orthogonal to `axis`.
pub fn signed_angle_about(
    axis: &Unit<Vector3<f64>>,
    from: &Vector3<f64>,
    to: &Vector3<f64>,
) -> Result<f64, GeometryError> {
    let from = normalize(&project_perpendicular(from, axis))?.into_inner();
    let to = normalize(&project_perpendicular(to, axis))?.into_inner();
    let sine = axis.dot(&from.cross(&to));
    Ok(sine.atan2(from.dot(&to)))
}

pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / points.len() as f64))
}

/// Kabsch superposition: the rigid transform that best maps `mobile` onto
/// `target` in the least-squares sense.
pub fn superpose(
    mobile: &[Point3<f64>],
    target: &[Point3<f64>],
) -> Result<RigidTransform, GeometryError> {
    if mobile.len() != target.len() {
        return Err(GeometryError::SizeMismatch {
            left: mobile.len(),
            right: target.len(),
        });
    }
    let mobile_centroid = centroid(mobile).ok_or(GeometryError::EmptyPointSet)?;
    let target_centroid = centroid(target).ok_or(GeometryError::EmptyPointSet)?;

    let h = mobile
        .iter()
        .zip(target.iter())
        .fold(Matrix3::zeros(), |acc, (m, t)| {
            acc + (t - target_centroid) * (m - mobile_centroid).transpose()
        });

    let svd = h.svd(true, true);
    let u = svd.u.ok_or(GeometryError::DecompositionFailed)?;
    let v_t = svd.v_t.ok_or(GeometryError::DecompositionFailed)?;

    let mut correction = Matrix3::identity();
    if (u * v_t).determinant() < 0.0 {
        correction[(2, 2)] = -1.0;
    }
    let rotation = Rotation3::from_matrix_unchecked(u * correction * v_t);
    let translation = target_centroid.coords - rotation * mobile_centroid.coords;

    Ok(RigidTransform::new(rotation, translation))
}

/// Root-mean-square deviation between two equally ordered point sets, without superposition.
pub fn rmsd(left: &[Point3<f64>], right: &[Point3<f64>]) -> Result<f64, GeometryError> {
    if left.len() != right.len() {
        return Err(GeometryError::SizeMismatch {
            left: left.len(),
            right: right.len(),
        });
    }
    if left.is_empty() {
        return Err(GeometryError::EmptyPointSet);
    }
    let squared_sum: f64 = left
        .iter()
        .zip(right.iter())
        .map(|(a, b)| (a - b).norm_squared())
        .sum();
    Ok((squared_sum / left.len() as f64).sqrt())
}

/// RMSD after optimal rigid superposition of `mobile` onto `target`.
pub fn superposed_rmsd(
    mobile: &[Point3<f64>],
    target: &[Point3<f64>],
) -> Result<f64, GeometryError> {
    let transform = superpose(mobile, target)?;
    let moved = transform.apply_all(mobile);
    rmsd(&moved, target)
}

use nalgebra::{Point3, Vector3};

/// Wraps a displacement vector into the primary orthorhombic cell.
pub fn minimum_image(delta: Vector3<f64>, box_lengths: Option<&Vector3<f64>>) -> Vector3<f64> {
    match box_lengths {
        Some(lengths) => delta.zip_map(lengths, |d, l| {
            if l > 0.0 { d - l * (d / l).round() } else { d }
        }),
        None => delta,
    }
}

pub fn distance(a: &Point3<f64>, b: &Point3<f64>, box_lengths: Option<&Vector3<f64>>) -> f64 {
    minimum_image(b - a, box_lengths).norm()
}

/// Angle in radians at vertex `b` of the triplet `a-b-c`.
///
/// Returns NaN when either arm has zero length.
pub fn angle(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    box_lengths: Option<&Vector3<f64>>,
) -> f64 {
    let ba = minimum_image(a - b, box_lengths);
    let bc = minimum_image(c - b, box_lengths);
    let norms = ba.norm() * bc.norm();
    if norms == 0.0 {
        return f64::NAN;
    }
    (ba.dot(&bc) / norms).clamp(-1.0, 1.0).acos()
}

/// Mass-weighted center of the given positions.
///
/// Falls back to the geometric center when the total mass is not positive.
/// Returns `None` for an empty selection or mismatched slices.
pub fn center_of_mass(positions: &[Point3<f64>], masses: &[f64]) -> Option<Point3<f64>> {
    if positions.is_empty() || positions.len() != masses.len() {
        return None;
    }
    let total_mass: f64 = masses.iter().sum();
    let weighted = if total_mass > 0.0 {
        positions
            .iter()
            .zip(masses)
            .fold(Vector3::zeros(), |acc, (p, &m)| acc + p.coords * m)
            / total_mass
    } else {
        positions
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords)
            / positions.len() as f64
    };
    Some(Point3::from(weighted))
}

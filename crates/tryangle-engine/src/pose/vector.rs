//! 2D vector helpers.

use tryangle_models::Keypoint;

/// Cosine similarity of two vectors, `None` when either has no length.
pub fn cosine_similarity(a: (f64, f64), b: (f64, f64)) -> Option<f64> {
    let na = (a.0 * a.0 + a.1 * a.1).sqrt();
    let nb = (b.0 * b.0 + b.1 * b.1).sqrt();
    if na <= f64::EPSILON || nb <= f64::EPSILON {
        return None;
    }
    Some(((a.0 * b.0 + a.1 * b.1) / (na * nb)).clamp(-1.0, 1.0))
}

/// Interior angle at `b` in degrees (0-180).
pub fn joint_angle(a: &Keypoint, b: &Keypoint, c: &Keypoint) -> Option<f64> {
    let cos = cosine_similarity((a.x - b.x, a.y - b.y), (c.x - b.x, c.y - b.y))?;
    Some(cos.acos().to_degrees())
}

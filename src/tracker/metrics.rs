//! Consistency metrics for the constellation geometry.

use nalgebra::{Matrix2, SymmetricEigen};

use crate::frame::Point2D;

/// Per-frame consistency scores reported by the constellation tracker.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsistencyMetrics {
    /// Best-match residual at the center point, in [0, 1].
    pub correlation_error: f32,
    /// 0 for well spread peripheral points, 1 when they are collinear or collapsed.
    pub degeneracy: f32,
    /// Mean displacement of the peripheral offsets between frames, in units of
    /// the peripheral radius.
    pub shape_change: f32,
}

/// Collinearity of the peripheral points around the center.
///
/// Computed from the eigenvalues of the 2x2 scatter matrix of the
/// center-relative offsets as `1 - min / max`.
pub fn degeneracy(center: Point2D, peripheral: &[Point2D]) -> f32 {
    let mut scatter = Matrix2::<f64>::zeros();
    for p in peripheral {
        let (dr, dc) = p.delta(center);
        let (dr, dc) = (dr as f64, dc as f64);
        scatter[(0, 0)] += dr * dr;
        scatter[(0, 1)] += dr * dc;
        scatter[(1, 0)] += dr * dc;
        scatter[(1, 1)] += dc * dc;
    }

    let eigen = SymmetricEigen::new(scatter);
    let max = eigen.eigenvalues.max();
    let min = eigen.eigenvalues.min().max(0.0);
    if max <= f64::EPSILON {
        return 1.0;
    }
    (1.0 - min / max) as f32
}

/// Change of the constellation's shape between two frames.
///
/// Each peripheral point is expressed relative to its own center; the metric
/// is the mean distance between old and new offsets divided by `radius`.
pub fn shape_change(
    old_center: Point2D,
    old_peripheral: &[Point2D],
    new_center: Point2D,
    new_peripheral: &[Point2D],
    radius: i32,
) -> f32 {
    let n = old_peripheral.len().min(new_peripheral.len());
    if n == 0 || radius <= 0 {
        return 0.0;
    }
    let total: f32 = old_peripheral
        .iter()
        .zip(new_peripheral)
        .map(|(old, new)| {
            let (or, oc) = old.delta(old_center);
            let (nr, nc) = new.delta(new_center);
            ((nr - or).powi(2) + (nc - oc).powi(2)).sqrt()
        })
        .sum();
    total / n as f32 / radius as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cross(center: Point2D, r: i32) -> Vec<Point2D> {
        vec![
            center.offset(0, -r),
            center.offset(0, r),
            center.offset(-r, 0),
            center.offset(r, 0),
        ]
    }

    #[test]
    fn test_cross_is_not_degenerate() {
        let c = Point2D::new(10, 10);
        assert_relative_eq!(degeneracy(c, &cross(c, 5)), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_collinear_is_degenerate() {
        let c = Point2D::new(10, 10);
        let line = [c.offset(0, -5), c.offset(0, 5), c.offset(0, -2), c.offset(0, 2)];
        assert_relative_eq!(degeneracy(c, &line), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_collapsed_is_degenerate() {
        let c = Point2D::new(10, 10);
        assert_eq!(degeneracy(c, &[c, c, c, c]), 1.0);
    }

    #[test]
    fn test_translation_is_not_a_shape_change() {
        let a = Point2D::new(10, 10);
        let b = Point2D::new(14, 7);
        assert_eq!(shape_change(a, &cross(a, 5), b, &cross(b, 5), 5), 0.0);
    }

    #[test]
    fn test_shape_change_scales_with_radius() {
        let c = Point2D::new(10, 10);
        let old = cross(c, 5);
        let mut new = old.clone();
        new[0] = new[0].offset(0, -5);
        // one of four points moved by one radius
        assert_relative_eq!(shape_change(c, &old, c, &new, 5), 0.25, epsilon = 1e-6);
    }
}

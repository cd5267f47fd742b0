use ndarray::Array3;

use crate::error::Result;
use crate::frame::{Frame, Point2D};

/// Supported optical-flow families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlowMethod {
    HornSchunck,
    Farneback,
    LucasKanade,
}

impl FlowMethod {
    /// Dense methods produce a vector per pixel; sparse ones follow seed points.
    pub fn is_dense(self) -> bool {
        !matches!(self, FlowMethod::LucasKanade)
    }
}

/// Motion of one seed point between two frames.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlowVector {
    pub from: Point2D,
    pub drow: f32,
    pub dcol: f32,
    /// False when the estimator could not follow the point.
    pub tracked: bool,
}

impl FlowVector {
    pub fn new(from: Point2D, drow: f32, dcol: f32) -> Self {
        Self {
            from,
            drow,
            dcol,
            tracked: true,
        }
    }

    pub fn lost(from: Point2D) -> Self {
        Self {
            from,
            drow: 0.0,
            dcol: 0.0,
            tracked: false,
        }
    }

    /// Destination rounded to the nearest pixel.
    pub fn to(&self) -> Point2D {
        Point2D::new(
            (self.from.row as f32 + self.drow).round() as i32,
            (self.from.col as f32 + self.dcol).round() as i32,
        )
    }

    pub fn magnitude(&self) -> f32 {
        (self.drow * self.drow + self.dcol * self.dcol).sqrt()
    }
}

/// Output of a flow estimator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MotionField {
    /// (rows, cols, 2) array of [drow, dcol] per pixel.
    Dense(Array3<f32>),
    Sparse(Vec<FlowVector>),
}

impl MotionField {
    pub fn zeros(width: usize, height: usize) -> Self {
        MotionField::Dense(Array3::zeros((height, width, 2)))
    }

    pub fn is_finite(&self) -> bool {
        match self {
            MotionField::Dense(field) => field.iter().all(|v| v.is_finite()),
            MotionField::Sparse(vectors) => vectors
                .iter()
                .all(|v| v.drow.is_finite() && v.dcol.is_finite()),
        }
    }

    /// Number of motion vectors.
    pub fn len(&self) -> usize {
        match self {
            MotionField::Dense(field) => field.dim().0 * field.dim().1,
            MotionField::Sparse(vectors) => vectors.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Average (drow, dcol) over all tracked vectors.
    pub fn mean_motion(&self) -> Option<(f32, f32)> {
        let (sum, n) = match self {
            MotionField::Dense(field) => {
                let (rows, cols, _) = field.dim();
                let mut sum = (0.0f32, 0.0f32);
                for r in 0..rows {
                    for c in 0..cols {
                        sum.0 += field[[r, c, 0]];
                        sum.1 += field[[r, c, 1]];
                    }
                }
                (sum, rows * cols)
            }
            MotionField::Sparse(vectors) => vectors
                .iter()
                .filter(|v| v.tracked)
                .fold(((0.0, 0.0), 0), |(s, n), v| ((s.0 + v.drow, s.1 + v.dcol), n + 1)),
        };
        if n == 0 {
            return None;
        }
        Some((sum.0 / n as f32, sum.1 / n as f32))
    }
}

/// External optical-flow capability.
///
/// Dense estimators ignore `seeds` and return [`MotionField::Dense`] with the
/// frame's shape. Sparse estimators return one [`FlowVector`] per seed, in
/// seed order. Numerical non-convergence is reported as
/// [`crate::TrackError::FlowComputation`].
pub trait FlowEstimator {
    fn method(&self) -> FlowMethod;

    fn estimate(&mut self, prev: &Frame, curr: &Frame, seeds: &[Point2D]) -> Result<MotionField>;
}

impl<E: FlowEstimator + ?Sized> FlowEstimator for Box<E> {
    fn method(&self) -> FlowMethod {
        (**self).method()
    }

    fn estimate(&mut self, prev: &Frame, curr: &Frame, seeds: &[Point2D]) -> Result<MotionField> {
        (**self).estimate(prev, curr, seeds)
    }
}

//! Frame-pair motion estimation behind the [`TrackingBackend`] lifecycle.

use crate::backend::{BackendKind, BackendOutput, TrackingBackend};
use crate::error::{Result, TrackError};
use crate::flow::estimator::{FlowEstimator, FlowVector, MotionField};
use crate::frame::{Frame, Point2D};

/// Configuration for the [`OpticalFlowBackend`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlowConfig {
    /// Spacing of the seed grid used by sparse methods, in pixels.
    pub seed_spacing: usize,
    /// Upper bound on the number of sparse points.
    pub max_points: usize,
    /// Refill lost sparse points from the seed grid after each update.
    pub replace_lost: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            seed_spacing: 16,
            max_points: 150,
            replace_lost: true,
        }
    }
}

impl FlowConfig {
    pub fn with_seed_spacing(mut self, spacing: usize) -> Self {
        self.seed_spacing = spacing;
        self
    }

    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }

    pub fn with_replace_lost(mut self, replace: bool) -> Self {
        self.replace_lost = replace;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.seed_spacing == 0 {
            return Err(TrackError::invalid_config("seed_spacing must be positive"));
        }
        if self.max_points == 0 {
            return Err(TrackError::invalid_config("max_points must be positive"));
        }
        Ok(())
    }
}

/// Wraps a [`FlowEstimator`] as a tracking backend.
///
/// Nothing is kept between updates except the sparse point set; frames are
/// only borrowed during a call.
pub struct OpticalFlowBackend<E: FlowEstimator> {
    estimator: E,
    config: FlowConfig,
    points: Vec<Point2D>,
    dimensions: Option<(usize, usize)>,
    active: bool,
}

impl<E: FlowEstimator> OpticalFlowBackend<E> {
    pub fn new(estimator: E, config: FlowConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            estimator,
            config,
            points: Vec::new(),
            dimensions: None,
            active: false,
        })
    }

    pub fn with_default_config(estimator: E) -> Result<Self> {
        Self::new(estimator, FlowConfig::default())
    }

    /// Points currently followed by a sparse method.
    pub fn points(&self) -> &[Point2D] {
        &self.points
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// Grid seeds not already covered by a tracked point.
    fn refill(&mut self, width: usize, height: usize) {
        let spacing = self.config.seed_spacing;
        let min_gap = (spacing / 2).max(1) as f32;
        let mut row = spacing / 2;
        while row < height && self.points.len() < self.config.max_points {
            let mut col = spacing / 2;
            while col < width && self.points.len() < self.config.max_points {
                let seed = Point2D::new(row as i32, col as i32);
                if self.points.iter().all(|p| p.distance(seed) >= min_gap) {
                    self.points.push(seed);
                }
                col += spacing;
            }
            row += spacing;
        }
    }

    fn check_shape(&self, field: &MotionField, width: usize, height: usize) -> Result<()> {
        match field {
            MotionField::Dense(f) if f.dim() != (height, width, 2) => Err(TrackError::FlowComputation(
                format!("dense field shape {:?} does not match {}x{} frame", f.dim(), width, height),
            )),
            MotionField::Sparse(v) if v.len() != self.points.len() => {
                Err(TrackError::FlowComputation(format!(
                    "{} vectors returned for {} seeds",
                    v.len(),
                    self.points.len()
                )))
            }
            _ => Ok(()),
        }
    }
}

impl<E: FlowEstimator> TrackingBackend for OpticalFlowBackend<E> {
    fn kind(&self) -> BackendKind {
        BackendKind::OpticalFlow(self.estimator.method())
    }

    fn activate(&mut self, frame: &Frame, selection: Option<Point2D>) -> Result<BackendOutput> {
        let (width, height) = frame.dimensions();
        self.points.clear();
        self.dimensions = Some((width, height));

        let output = if self.estimator.method().is_dense() {
            MotionField::zeros(width, height)
        } else {
            if let Some(p) = selection.filter(|p| frame.contains(*p)) {
                self.points.push(p);
            }
            self.refill(width, height);
            MotionField::Sparse(self.points.iter().map(|&p| FlowVector::new(p, 0.0, 0.0)).collect())
        };

        self.active = true;
        tracing::info!(
            method = ?self.estimator.method(),
            points = self.points.len(),
            "optical flow activated"
        );
        Ok(BackendOutput::Motion(output))
    }

    fn update(&mut self, prev: &Frame, curr: &Frame) -> Result<BackendOutput> {
        if !self.active {
            return Err(TrackError::InvalidState("optical flow backend is not activated"));
        }
        prev.ensure_same_size(curr)?;
        let (width, height) = curr.dimensions();
        if let Some(expected) = self.dimensions {
            if expected != (width, height) {
                return Err(TrackError::FrameSizeMismatch {
                    expected,
                    actual: (width, height),
                });
            }
        }

        let field = self.estimator.estimate(prev, curr, &self.points)?;
        if !field.is_finite() {
            return Err(TrackError::FlowComputation("non-finite motion vectors".into()));
        }
        self.check_shape(&field, width, height)?;

        if let MotionField::Sparse(vectors) = &field {
            let before = self.points.len();
            self.points = vectors
                .iter()
                .filter(|v| v.tracked)
                .map(FlowVector::to)
                .filter(|p| curr.contains(*p))
                .collect();
            let lost = before - self.points.len();
            if lost > 0 {
                tracing::warn!(lost, remaining = self.points.len(), "flow points lost");
            }
            if self.points.is_empty() {
                self.active = false;
                return Err(TrackError::TrackLoss {
                    best_confidence: 0.0,
                });
            }
            if self.config.replace_lost && lost > 0 {
                self.refill(width, height);
            }
        }

        tracing::debug!(vectors = field.len(), mean = ?field.mean_motion(), "flow estimated");
        Ok(BackendOutput::Motion(field))
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn deactivate(&mut self) {
        self.active = false;
        self.points.clear();
        self.dimensions = None;
    }
}

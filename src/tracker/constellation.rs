//! Five-point constellation tracker.

use crate::error::{Result, TrackError};
use crate::frame::{Frame, Point2D};
use crate::tracker::correlation::{self, PatchMatch, SearchWindow};
use crate::tracker::metrics::{self, ConsistencyMetrics};
use crate::tracker::point_role::PointRole;

/// Configuration for the [`ConstellationTracker`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstellationConfig {
    /// Distance of the four peripheral points from the center, in pixels.
    pub peripheral_radius: i32,
    /// Half size of the correlation patch (3 gives 7x7 patches).
    pub patch_radius: i32,
    /// Half size of the search window centered on the previous location.
    pub search_radius: i32,
    /// Matches below this confidence count as failed.
    pub min_match_confidence: f32,
    /// Fraction of a patch that must be inside the frame to score a candidate.
    pub min_patch_coverage: f32,
    /// Re-seed failed peripheral points from the center.
    pub replace_lost_points: bool,
}

impl Default for ConstellationConfig {
    fn default() -> Self {
        Self {
            peripheral_radius: 5,
            patch_radius: 3,
            search_radius: 8,
            min_match_confidence: 0.7,
            min_patch_coverage: 0.25,
            replace_lost_points: true,
        }
    }
}

impl ConstellationConfig {
    pub fn with_peripheral_radius(mut self, radius: i32) -> Self {
        self.peripheral_radius = radius;
        self
    }

    pub fn with_patch_radius(mut self, radius: i32) -> Self {
        self.patch_radius = radius;
        self
    }

    pub fn with_search_radius(mut self, radius: i32) -> Self {
        self.search_radius = radius;
        self
    }

    pub fn with_min_match_confidence(mut self, confidence: f32) -> Self {
        self.min_match_confidence = confidence;
        self
    }

    pub fn with_min_patch_coverage(mut self, coverage: f32) -> Self {
        self.min_patch_coverage = coverage;
        self
    }

    pub fn with_replace_lost_points(mut self, replace: bool) -> Self {
        self.replace_lost_points = replace;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.peripheral_radius <= 0 {
            return Err(TrackError::invalid_config("peripheral_radius must be positive"));
        }
        if self.patch_radius < 0 || self.search_radius < 0 {
            return Err(TrackError::invalid_config(
                "patch_radius and search_radius must not be negative",
            ));
        }
        if !(0.0..=1.0).contains(&self.min_match_confidence) {
            return Err(TrackError::invalid_config("min_match_confidence must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.min_patch_coverage) || self.min_patch_coverage == 0.0 {
            return Err(TrackError::invalid_config("min_patch_coverage must be in (0, 1]"));
        }
        Ok(())
    }

    fn window(&self) -> SearchWindow {
        SearchWindow {
            patch_radius: self.patch_radius,
            search_radius: self.search_radius,
            min_coverage: self.min_patch_coverage,
        }
    }
}

/// The tracked constellation after activation or an update.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstellationState {
    pub center: Point2D,
    pub left: Point2D,
    pub right: Point2D,
    pub top: Point2D,
    pub bottom: Point2D,
    /// Match confidence per point, in [`PointRole::ALL`] order.
    pub confidences: [f32; 5],
    pub metrics: ConsistencyMetrics,
    /// Peripheral points re-seeded during the last update.
    pub replaced: usize,
    /// Updates applied since activation.
    pub frame_index: u32,
}

impl ConstellationState {
    fn from_points(points: [Point2D; 5]) -> Self {
        Self {
            center: points[0],
            left: points[1],
            right: points[2],
            top: points[3],
            bottom: points[4],
            confidences: [1.0; 5],
            metrics: ConsistencyMetrics::default(),
            replaced: 0,
            frame_index: 0,
        }
    }

    /// The five points in [`PointRole::ALL`] order.
    pub fn points(&self) -> [Point2D; 5] {
        [self.center, self.left, self.right, self.top, self.bottom]
    }

    pub fn point(&self, role: PointRole) -> Point2D {
        self.points()[role.index()]
    }

    pub fn peripheral(&self) -> [Point2D; 4] {
        [self.left, self.right, self.top, self.bottom]
    }

    #[inline]
    pub fn correlation_error(&self) -> f32 {
        self.metrics.correlation_error
    }

    #[inline]
    pub fn degeneracy(&self) -> f32 {
        self.metrics.degeneracy
    }

    #[inline]
    pub fn shape_change(&self) -> f32 {
        self.metrics.shape_change
    }

    /// Highest per-point confidence.
    pub fn best_confidence(&self) -> f32 {
        self.confidences.iter().copied().fold(0.0, f32::max)
    }
}

/// Tracks a center point and four peripheral reference points by localized
/// correlation search.
///
/// The tracker only reports consistency metrics; deciding whether they are
/// acceptable is up to the caller.
#[derive(Debug, Clone)]
pub struct ConstellationTracker {
    config: ConstellationConfig,
    tracking_activated: bool,
    state: Option<ConstellationState>,
}

impl ConstellationTracker {
    pub fn new(config: ConstellationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            tracking_activated: false,
            state: None,
        })
    }

    pub fn config(&self) -> &ConstellationConfig {
        &self.config
    }

    /// False until activation, and again after track loss or a boundary violation.
    pub fn is_tracking_activated(&self) -> bool {
        self.tracking_activated
    }

    /// Most recent state, if tracking was ever activated.
    pub fn state(&self) -> Option<&ConstellationState> {
        self.state.as_ref()
    }

    /// Place the constellation around `click`.
    ///
    /// Every point must lie strictly inside the frame, so the click needs more
    /// than `peripheral_radius` pixels of margin to each edge.
    pub fn activate(&mut self, frame: &Frame, click: Point2D) -> Result<ConstellationState> {
        let radius = self.config.peripheral_radius;
        let points = PointRole::ALL.map(|role| {
            let (dr, dc) = role.nominal_offset(radius);
            click.offset(dr, dc)
        });

        let (width, height) = frame.dimensions();
        let inside = |p: &Point2D| {
            p.row > 0 && p.col > 0 && (p.row as usize) < height - 1 && (p.col as usize) < width - 1
        };
        if !points.iter().all(inside) {
            return Err(TrackError::Initialization {
                point: click,
                reason: format!(
                    "constellation of radius {} does not fit inside {}x{} frame",
                    radius, width, height
                ),
            });
        }

        let mut state = ConstellationState::from_points(points);
        state.metrics.degeneracy = metrics::degeneracy(state.center, &state.peripheral());

        tracing::info!(center = %click, radius, "constellation activated");
        self.tracking_activated = true;
        self.state = Some(state.clone());
        Ok(state)
    }

    /// Track every point of `state` from `prev` into `curr`.
    pub fn update(
        &mut self,
        prev: &Frame,
        curr: &Frame,
        state: &ConstellationState,
    ) -> Result<ConstellationState> {
        if !self.tracking_activated {
            return Err(TrackError::InvalidState("constellation tracker is not activated"));
        }
        prev.ensure_same_size(curr)?;

        let window = self.config.window();
        let min_conf = self.config.min_match_confidence;
        let old_points = state.points();

        let matches: Vec<Option<PatchMatch>> = old_points
            .iter()
            .map(|&p| correlation::search(prev, curr, p, &window))
            .collect();

        let mut positions = old_points;
        let mut confidences = [0.0f32; 5];
        for (i, m) in matches.iter().enumerate() {
            if let Some(m) = m {
                positions[i] = m.position;
                confidences[i] = m.confidence();
            }
            tracing::trace!(point = i, position = %positions[i], confidence = confidences[i], "correlation");
        }

        let best_confidence = confidences.iter().copied().fold(0.0, f32::max);
        if best_confidence < min_conf {
            self.tracking_activated = false;
            tracing::info!(best_confidence, "constellation lost");
            return Err(TrackError::TrackLoss { best_confidence });
        }

        let radius = self.config.peripheral_radius;
        let center_ok = confidences[0] >= min_conf;

        if !center_ok {
            if let Some(center) = self.center_from_peripheral(&positions, &confidences) {
                tracing::warn!(from = %positions[0], to = %center, "center re-derived from peripheral points");
                positions[0] = center;
            }
        }

        let mut replaced = 0;
        if center_ok && self.config.replace_lost_points {
            for role in PointRole::PERIPHERAL {
                let i = role.index();
                if confidences[i] < min_conf {
                    let (dr, dc) = role.nominal_offset(radius);
                    positions[i] = positions[0].offset(dr, dc);
                    replaced += 1;
                    tracing::warn!(point = ?role, position = %positions[i], "peripheral point replaced");
                }
            }
        }

        if let Some((point_index, &position)) =
            positions.iter().enumerate().find(|(_, p)| !curr.contains(**p))
        {
            self.tracking_activated = false;
            tracing::info!(point_index, %position, "constellation left the frame");
            return Err(TrackError::BoundaryViolation {
                point_index,
                position,
            });
        }

        let mut next = ConstellationState::from_points(positions);
        next.confidences = confidences;
        next.replaced = replaced;
        next.frame_index = state.frame_index + 1;
        next.metrics = ConsistencyMetrics {
            correlation_error: matches[0].map_or(1.0, |m| m.error()),
            degeneracy: metrics::degeneracy(next.center, &next.peripheral()),
            shape_change: metrics::shape_change(
                state.center,
                &state.peripheral(),
                next.center,
                &next.peripheral(),
                radius,
            ),
        };

        tracing::debug!(
            center = %next.center,
            correlation_error = next.metrics.correlation_error,
            degeneracy = next.metrics.degeneracy,
            shape_change = next.metrics.shape_change,
            "constellation updated"
        );

        self.state = Some(next.clone());
        Ok(next)
    }

    /// Update from the internally stored state.
    pub fn track(&mut self, prev: &Frame, curr: &Frame) -> Result<ConstellationState> {
        let state = self
            .state
            .clone()
            .ok_or(TrackError::InvalidState("constellation tracker has no state"))?;
        self.update(prev, curr, &state)
    }

    pub fn deactivate(&mut self) {
        if self.tracking_activated {
            tracing::info!("constellation deactivated");
        }
        self.tracking_activated = false;
        self.state = None;
    }

    /// Average center implied by the confident peripheral points, if at least two agree.
    fn center_from_peripheral(&self, positions: &[Point2D; 5], confidences: &[f32; 5]) -> Option<Point2D> {
        let radius = self.config.peripheral_radius;
        let implied: Vec<Point2D> = PointRole::PERIPHERAL
            .iter()
            .filter(|role| confidences[role.index()] >= self.config.min_match_confidence)
            .map(|role| {
                let (dr, dc) = role.nominal_offset(radius);
                positions[role.index()].offset(-dr, -dc)
            })
            .collect();
        if implied.len() < 2 {
            return None;
        }
        let n = implied.len() as f32;
        let row = implied.iter().map(|p| p.row as f32).sum::<f32>() / n;
        let col = implied.iter().map(|p| p.col as f32).sum::<f32>() / n;
        Some(Point2D::new(row.round() as i32, col.round() as i32))
    }
}

//! Frame-to-frame motion vectors from matched features.

use crate::features::feature::Correspondence;

/// Speed band of motion vectors worth reporting, in pixels per frame.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionFilter {
    /// Exclusive lower bound
    pub min_speed: f32,
    /// Exclusive upper bound
    pub max_speed: f32,
}

impl Default for MotionFilter {
    fn default() -> Self {
        Self {
            min_speed: 5.0,
            max_speed: 30.0,
        }
    }
}

impl MotionFilter {
    /// Keep every vector.
    pub fn unbounded() -> Self {
        Self {
            min_speed: f32::NEG_INFINITY,
            max_speed: f32::INFINITY,
        }
    }

    #[inline]
    pub fn accepts(&self, speed: f32) -> bool {
        speed > self.min_speed && speed < self.max_speed
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionVector {
    pub origin: (f32, f32),
    pub dx: f32,
    pub dy: f32,
}

impl MotionVector {
    #[inline]
    pub fn speed(&self) -> f32 {
        (self.dx * self.dx + self.dy * self.dy).sqrt()
    }
}

/// Displacements of matched features whose speed lies inside `filter`.
pub fn motion_vectors(correspondences: &[Correspondence], filter: &MotionFilter) -> Vec<MotionVector> {
    correspondences
        .iter()
        .map(|c| MotionVector {
            origin: c.source,
            dx: c.target.0 - c.source.0,
            dy: c.target.1 - c.source.1,
        })
        .filter(|v| filter.accepts(v.speed()))
        .collect()
}

use crate::error::{Result, TrackError};
use crate::tracker::ConsistencyMetrics;

/// How the session moves to the next frame once tracking runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AdvancePolicy {
    /// [`SessionEvent::Advance`](crate::session::SessionEvent::Advance) moves one frame.
    Auto,
    /// Every further selection event moves one frame.
    #[default]
    EventGated,
}

/// Consistency metric that can force an early stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Metric {
    CorrelationError,
    Degeneracy,
    ShapeChange,
}

/// Upper bounds on the consistency metrics. `None` disables a check.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsistencyThresholds {
    pub max_correlation_error: Option<f32>,
    pub max_degeneracy: Option<f32>,
    pub max_shape_change: Option<f32>,
}

impl ConsistencyThresholds {
    pub fn with_max_correlation_error(mut self, max: f32) -> Self {
        self.max_correlation_error = Some(max);
        self
    }

    pub fn with_max_degeneracy(mut self, max: f32) -> Self {
        self.max_degeneracy = Some(max);
        self
    }

    pub fn with_max_shape_change(mut self, max: f32) -> Self {
        self.max_shape_change = Some(max);
        self
    }

    /// First metric strictly above its bound, checked in declaration order.
    pub fn exceeded(&self, metrics: &ConsistencyMetrics) -> Option<Metric> {
        let checks = [
            (Metric::CorrelationError, self.max_correlation_error, metrics.correlation_error),
            (Metric::Degeneracy, self.max_degeneracy, metrics.degeneracy),
            (Metric::ShapeChange, self.max_shape_change, metrics.shape_change),
        ];
        checks
            .into_iter()
            .find(|(_, max, value)| max.is_some_and(|max| *value > max))
            .map(|(metric, _, _)| metric)
    }

    fn validate(&self) -> Result<()> {
        let bounds = [
            self.max_correlation_error,
            self.max_degeneracy,
            self.max_shape_change,
        ];
        if bounds.iter().flatten().any(|b| !b.is_finite() || *b < 0.0) {
            return Err(TrackError::invalid_config(
                "consistency thresholds must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// Configuration for a [`TrackingSession`](crate::session::TrackingSession).
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionConfig {
    pub advance: AdvancePolicy,
    pub thresholds: ConsistencyThresholds,
    /// Consecutive recoverable backend failures tolerated before stopping.
    pub max_backend_retries: usize,
    /// Frame shown when the session starts.
    pub start_index: usize,
}

impl SessionConfig {
    pub fn with_advance(mut self, advance: AdvancePolicy) -> Self {
        self.advance = advance;
        self
    }

    pub fn with_thresholds(mut self, thresholds: ConsistencyThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_max_backend_retries(mut self, retries: usize) -> Self {
        self.max_backend_retries = retries;
        self
    }

    pub fn with_start_index(mut self, index: usize) -> Self {
        self.start_index = index;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(correlation_error: f32, degeneracy: f32, shape_change: f32) -> ConsistencyMetrics {
        ConsistencyMetrics {
            correlation_error,
            degeneracy,
            shape_change,
        }
    }

    #[test]
    fn test_no_thresholds_never_exceeded() {
        let t = ConsistencyThresholds::default();
        assert_eq!(t.exceeded(&metrics(1.0, 1.0, 100.0)), None);
    }

    #[test]
    fn test_exceeded_is_strict() {
        let t = ConsistencyThresholds::default()
            .with_max_degeneracy(0.5)
            .with_max_shape_change(0.2);
        assert_eq!(t.exceeded(&metrics(0.9, 0.5, 0.2)), None);
        assert_eq!(t.exceeded(&metrics(0.0, 0.6, 0.3)), Some(Metric::Degeneracy));
        assert_eq!(t.exceeded(&metrics(0.0, 0.1, 0.3)), Some(Metric::ShapeChange));
    }

    #[test]
    fn test_default_is_event_gated() {
        let config = SessionConfig::default();
        assert_eq!(config.advance, AdvancePolicy::EventGated);
        assert_eq!(config.max_backend_retries, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let config = SessionConfig::default()
            .with_thresholds(ConsistencyThresholds::default().with_max_correlation_error(-0.1));
        assert!(matches!(config.validate(), Err(TrackError::InvalidConfig(_))));
    }
}

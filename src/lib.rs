//! Single-target visual tracking over frame sequences.
//!
//! A [`TrackingSession`] walks a [`FrameSource`], activates a
//! [`TrackingBackend`] on the user's selection and stops when the backend
//! loses the target or its consistency metrics leave configured bounds.
//!
//! Backends:
//! - [`ConstellationTracker`]: five-point correlation constellation with
//!   correlation-error, degeneracy and shape-change metrics.
//! - [`flow::OpticalFlowBackend`]: wraps an external dense or sparse flow estimator.
//! - [`features::SparseFeatureBackend`]: feature matching with the ratio test and
//!   optional RANSAC homography registration.

pub mod backend;
pub mod error;
pub mod features;
pub mod flow;
pub mod frame;
pub mod session;
pub mod tracker;

pub use backend::{BackendKind, BackendOutput, TrackingBackend};
pub use error::{Result, TrackError};
pub use frame::{Frame, FrameSource, InMemoryFrames, Point2D};
pub use session::{
    AdvancePolicy, ConsistencyThresholds, Metric, SessionConfig, SessionEvent, SessionState, Snapshot,
    StepOutcome, StopReason, TrackingSession,
};
pub use tracker::{ConsistencyMetrics, ConstellationConfig, ConstellationState, ConstellationTracker};

//! Optical-flow backends.
//!
//! The flow math itself (Horn-Schunck, Farneback, Lucas-Kanade) is supplied
//! by an external [`FlowEstimator`]; this module validates its output and
//! drives it through the [`crate::TrackingBackend`] lifecycle.

mod backend;
mod estimator;

pub use backend::{FlowConfig, OpticalFlowBackend};
pub use estimator::{FlowEstimator, FlowMethod, FlowVector, MotionField};

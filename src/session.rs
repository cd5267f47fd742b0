//! Frame-walk orchestration.
//!
//! A [`TrackingSession`] owns the frame source and the active backend, turns
//! selection clicks into backend activation and decides after each frame pair
//! whether tracking continues.

mod config;
mod event;
mod state;
mod tracking_session;

pub use config::{AdvancePolicy, ConsistencyThresholds, Metric, SessionConfig};
pub use event::SessionEvent;
pub use state::{SessionState, StopReason};
pub use tracking_session::{Snapshot, StepOutcome, TrackingSession};

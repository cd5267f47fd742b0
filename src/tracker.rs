mod backend;
mod constellation;
mod correlation;
mod metrics;
mod point_role;

pub use constellation::{ConstellationConfig, ConstellationState, ConstellationTracker};
pub use correlation::{PatchMatch, SearchWindow, patch_score, search};
pub use metrics::{ConsistencyMetrics, degeneracy, shape_change};
pub use point_role::PointRole;

//! Sparse-feature (blob) registration: feature sets, ratio-test matching,
//! robust homography fitting and frame-to-frame motion vectors.
//!
//! Descriptor extraction (SIFT, SURF) is an external capability plugged in via
//! [`FeatureExtractor`].

mod backend;
mod feature;
mod homography;
mod matching;
mod motion;

pub use backend::{FeatureExtractor, Registration, SparseFeatureBackend, SparseFeatureConfig};
pub use feature::{Correspondence, DescriptorKind, Feature, FeatureSet};
pub use homography::{Homography, HomographyEstimator, HomographyFit, RansacConfig, RansacHomography};
pub use matching::{AssignmentResult, FeatureMatcher, MatcherConfig, distance_matrix, linear_assignment};
pub use motion::{MotionFilter, MotionVector, motion_vectors};

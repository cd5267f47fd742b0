//! Sparse-feature registration behind the [`TrackingBackend`] lifecycle.

use crate::backend::{BackendKind, BackendOutput, TrackingBackend};
use crate::error::{Result, TrackError};
use crate::features::feature::{Correspondence, DescriptorKind, FeatureSet};
use crate::features::homography::{Homography, HomographyEstimator, RansacHomography};
use crate::features::matching::{FeatureMatcher, MatcherConfig};
use crate::features::motion::{MotionFilter, MotionVector, motion_vectors};
use crate::frame::{Frame, Point2D};

/// External feature detection and description (SIFT, SURF, ...).
pub trait FeatureExtractor {
    fn descriptor_kind(&self) -> DescriptorKind;

    fn extract(&mut self, frame: &Frame) -> Result<FeatureSet>;
}

impl<X: FeatureExtractor + ?Sized> FeatureExtractor for Box<X> {
    fn descriptor_kind(&self) -> DescriptorKind {
        (**self).descriptor_kind()
    }

    fn extract(&mut self, frame: &Frame) -> Result<FeatureSet> {
        (**self).extract(frame)
    }
}

/// Registration between two consecutive frames.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub correspondences: Vec<Correspondence>,
    /// Motion vectors inside the configured speed band
    pub motion: Vec<MotionVector>,
    pub homography: Option<Homography>,
    /// Number of features extracted from (prev, curr)
    pub feature_counts: (usize, usize),
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SparseFeatureConfig {
    pub matcher: MatcherConfig,
    /// Fit a homography to each frame pair's correspondences.
    pub estimate_homography: bool,
    /// Fail the update when the fit fails. Otherwise the registration is
    /// returned with `homography: None`.
    pub require_homography: bool,
    pub motion: MotionFilter,
}

impl Default for SparseFeatureConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherConfig::default(),
            estimate_homography: false,
            require_homography: true,
            motion: MotionFilter::default(),
        }
    }
}

impl SparseFeatureConfig {
    pub fn with_require_homography(mut self, require: bool) -> Self {
        self.require_homography = require;
        self
    }

    pub fn with_homography(mut self, estimate: bool) -> Self {
        self.estimate_homography = estimate;
        self
    }

    pub fn with_matcher(mut self, matcher: MatcherConfig) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_motion_filter(mut self, motion: MotionFilter) -> Self {
        self.motion = motion;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.matcher.validate()?;
        let MotionFilter { min_speed, max_speed } = self.motion;
        if min_speed.is_nan() || max_speed.is_nan() || min_speed >= max_speed {
            return Err(TrackError::invalid_config("motion filter needs min_speed < max_speed"));
        }
        Ok(())
    }
}

/// Extracts, matches and optionally registers consecutive frames.
pub struct SparseFeatureBackend<X: FeatureExtractor, H: HomographyEstimator = RansacHomography> {
    extractor: X,
    estimator: H,
    matcher: FeatureMatcher,
    config: SparseFeatureConfig,
    active: bool,
}

impl<X: FeatureExtractor> SparseFeatureBackend<X, RansacHomography> {
    pub fn new(extractor: X, config: SparseFeatureConfig) -> Result<Self> {
        Self::with_estimator(extractor, RansacHomography::default(), config)
    }
}

impl<X: FeatureExtractor, H: HomographyEstimator> SparseFeatureBackend<X, H> {
    pub fn with_estimator(extractor: X, estimator: H, config: SparseFeatureConfig) -> Result<Self> {
        config.validate()?;
        let matcher = FeatureMatcher::new(config.matcher.clone())?;
        Ok(Self {
            extractor,
            estimator,
            matcher,
            config,
            active: false,
        })
    }

    /// Register `prev` onto `curr`.
    ///
    /// A failed homography fit is an error only with `require_homography`;
    /// otherwise the matches are still returned.
    pub fn register(&mut self, prev: &Frame, curr: &Frame) -> Result<Registration> {
        prev.ensure_same_size(curr)?;
        let query = self.extractor.extract(prev)?;
        let train = self.extractor.extract(curr)?;
        let correspondences = self.matcher.matches(&query, &train);
        tracing::debug!(
            query = query.len(),
            train = train.len(),
            matches = correspondences.len(),
            "features matched"
        );

        let homography = if self.config.estimate_homography {
            match self.estimator.estimate(&correspondences) {
                Ok(h) => Some(h),
                Err(err) if !self.config.require_homography => {
                    tracing::warn!(%err, matches = correspondences.len(), "homography not fitted");
                    None
                }
                Err(err) => return Err(err),
            }
        } else {
            None
        };

        Ok(Registration {
            motion: motion_vectors(&correspondences, &self.config.motion),
            correspondences,
            homography,
            feature_counts: (query.len(), train.len()),
        })
    }
}

impl<X: FeatureExtractor, H: HomographyEstimator> TrackingBackend for SparseFeatureBackend<X, H> {
    fn kind(&self) -> BackendKind {
        BackendKind::SparseFeature(self.extractor.descriptor_kind())
    }

    fn activate(&mut self, frame: &Frame, _selection: Option<Point2D>) -> Result<BackendOutput> {
        let features = self.extractor.extract(frame)?;
        self.active = true;
        tracing::info!(
            descriptor = ?self.extractor.descriptor_kind(),
            features = features.len(),
            "sparse feature backend activated"
        );
        Ok(BackendOutput::Registration(Registration {
            feature_counts: (features.len(), 0),
            ..Registration::default()
        }))
    }

    fn update(&mut self, prev: &Frame, curr: &Frame) -> Result<BackendOutput> {
        if !self.active {
            return Err(TrackError::InvalidState("sparse feature backend is not activated"));
        }
        self.register(prev, curr).map(BackendOutput::Registration)
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn deactivate(&mut self) {
        self.active = false;
    }
}

//! Robust projective transform fitting.
//!
//! [`HomographyEstimator`] is the contract; [`RansacHomography`] is the
//! reference adapter: normalized DLT solved by SVD inside a RANSAC loop, then a
//! least-squares refit on the inliers.

use nalgebra::{DMatrix, Matrix3, Vector3};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::{Result, TrackError};
use crate::features::feature::Correspondence;

/// Minimum number of correspondences for a projective fit.
pub const MIN_CORRESPONDENCES: usize = 4;

/// A 3x3 projective transform mapping source (x, y) to target (x, y).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    pub matrix: Matrix3<f64>,
}

impl Homography {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    /// Transform a point; `None` when it maps to infinity.
    pub fn apply(&self, point: (f64, f64)) -> Option<(f64, f64)> {
        let p = self.matrix * Vector3::new(point.0, point.1, 1.0);
        if p[2].abs() < 1e-12 {
            return None;
        }
        Some((p[0] / p[2], p[1] / p[2]))
    }

    /// Forward transfer error of a correspondence, in pixels.
    pub fn transfer_error(&self, c: &Correspondence) -> f64 {
        let src = (c.source.0 as f64, c.source.1 as f64);
        match self.apply(src) {
            Some((x, y)) => ((x - c.target.0 as f64).powi(2) + (y - c.target.1 as f64).powi(2)).sqrt(),
            None => f64::INFINITY,
        }
    }
}

/// A fitted homography with its inlier mask.
#[derive(Debug, Clone)]
pub struct HomographyFit {
    pub homography: Homography,
    /// One flag per input correspondence
    pub inliers: Vec<bool>,
}

impl HomographyFit {
    pub fn num_inliers(&self) -> usize {
        self.inliers.iter().filter(|&&b| b).count()
    }
}

/// Outlier-tolerant projective fit from correspondences.
///
/// Implementations fail with [`TrackError::InsufficientCorrespondences`]
/// when fewer than four inlying correspondences are available.
pub trait HomographyEstimator {
    fn estimate(&mut self, correspondences: &[Correspondence]) -> Result<Homography>;
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RansacConfig {
    pub max_iterations: usize,
    /// Maximum transfer error of an inlier, in pixels.
    pub inlier_threshold: f64,
    pub min_inliers: usize,
    /// Fixed RNG seed; random when `None`.
    pub seed: Option<u64>,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            inlier_threshold: 3.0,
            min_inliers: MIN_CORRESPONDENCES,
            seed: None,
        }
    }
}

impl RansacConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(TrackError::invalid_config("max_iterations must be positive"));
        }
        if self.min_inliers < MIN_CORRESPONDENCES {
            return Err(TrackError::invalid_config("min_inliers must be at least 4"));
        }
        if !(self.inlier_threshold > 0.0) {
            return Err(TrackError::invalid_config("inlier_threshold must be positive"));
        }
        Ok(())
    }
}

/// RANSAC homography estimator.
#[derive(Debug, Clone)]
pub struct RansacHomography {
    config: RansacConfig,
    rng: StdRng,
}

impl Default for RansacHomography {
    fn default() -> Self {
        Self {
            config: RansacConfig::default(),
            rng: StdRng::from_os_rng(),
        }
    }
}

impl RansacHomography {
    pub fn new(config: RansacConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self { config, rng })
    }

    /// Fit a homography and report which correspondences support it.
    pub fn fit(&mut self, correspondences: &[Correspondence]) -> Result<HomographyFit> {
        let n = correspondences.len();
        if n < MIN_CORRESPONDENCES {
            return Err(TrackError::InsufficientCorrespondences {
                found: n,
                required: MIN_CORRESPONDENCES,
            });
        }

        let mut best: Option<(Homography, Vec<bool>, usize)> = None;

        for _ in 0..self.config.max_iterations {
            let sample: Vec<Correspondence> = rand::seq::index::sample(&mut self.rng, n, MIN_CORRESPONDENCES)
                .into_iter()
                .map(|i| correspondences[i])
                .collect();
            if is_degenerate(&sample) {
                continue;
            }
            let Some(h) = solve_dlt(&sample) else {
                continue;
            };

            let inliers: Vec<bool> = correspondences
                .iter()
                .map(|c| h.transfer_error(c) <= self.config.inlier_threshold)
                .collect();
            let count = inliers.iter().filter(|&&b| b).count();
            if best.as_ref().is_none_or(|(_, _, c)| count > *c) {
                best = Some((h, inliers, count));
            }
            if count == n {
                break;
            }
        }

        let found = best.as_ref().map_or(0, |(_, _, c)| *c);
        let (sample_h, inliers, count) = match best {
            Some(b) if b.2 >= self.config.min_inliers => b,
            _ => {
                return Err(TrackError::InsufficientCorrespondences {
                    found,
                    required: self.config.min_inliers,
                });
            }
        };

        let inlying: Vec<Correspondence> = correspondences
            .iter()
            .zip(&inliers)
            .filter(|(_, keep)| **keep)
            .map(|(c, _)| *c)
            .collect();
        let homography = solve_dlt(&inlying).unwrap_or(sample_h);

        tracing::debug!(inliers = count, total = n, "homography fitted");
        Ok(HomographyFit {
            homography,
            inliers,
        })
    }
}

impl HomographyEstimator for RansacHomography {
    fn estimate(&mut self, correspondences: &[Correspondence]) -> Result<Homography> {
        self.fit(correspondences).map(|fit| fit.homography)
    }
}

/// True when three of the sample points are (nearly) collinear in either image.
fn is_degenerate(sample: &[Correspondence]) -> bool {
    fn collinear(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> bool {
        let area = (b.0 - a.0) as f64 * (c.1 - a.1) as f64 - (b.1 - a.1) as f64 * (c.0 - a.0) as f64;
        area.abs() < 1e-6
    }
    let n = sample.len();
    for i in 0..n {
        for j in i + 1..n {
            for k in j + 1..n {
                let (a, b, c) = (&sample[i], &sample[j], &sample[k]);
                if collinear(a.source, b.source, c.source) || collinear(a.target, b.target, c.target) {
                    return true;
                }
            }
        }
    }
    false
}

/// Similarity transform moving the centroid to the origin with mean distance sqrt(2).
fn normalization(points: &[(f64, f64)]) -> Matrix3<f64> {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.0).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.1).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn transform(t: &Matrix3<f64>, p: (f64, f64)) -> (f64, f64) {
    let v = t * Vector3::new(p.0, p.1, 1.0);
    (v[0] / v[2], v[1] / v[2])
}

/// Direct linear transform over all given correspondences.
fn solve_dlt(correspondences: &[Correspondence]) -> Option<Homography> {
    if correspondences.len() < MIN_CORRESPONDENCES {
        return None;
    }
    let src: Vec<(f64, f64)> = correspondences
        .iter()
        .map(|c| (c.source.0 as f64, c.source.1 as f64))
        .collect();
    let dst: Vec<(f64, f64)> = correspondences
        .iter()
        .map(|c| (c.target.0 as f64, c.target.1 as f64))
        .collect();
    let t_src = normalization(&src);
    let t_dst = normalization(&dst);

    let rows = (2 * correspondences.len()).max(9);
    let mut a = DMatrix::<f64>::zeros(rows, 9);
    for (i, (s, d)) in src.iter().zip(&dst).enumerate() {
        let (x1, y1) = transform(&t_src, *s);
        let (x2, y2) = transform(&t_dst, *d);
        let r1 = 2 * i;
        let r2 = 2 * i + 1;
        a[(r1, 0)] = -x1;
        a[(r1, 1)] = -y1;
        a[(r1, 2)] = -1.0;
        a[(r1, 6)] = x2 * x1;
        a[(r1, 7)] = x2 * y1;
        a[(r1, 8)] = x2;
        a[(r2, 3)] = -x1;
        a[(r2, 4)] = -y1;
        a[(r2, 5)] = -1.0;
        a[(r2, 6)] = y2 * x1;
        a[(r2, 7)] = y2 * y1;
        a[(r2, 8)] = y2;
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    let (min_idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let h = v_t.row(min_idx);
    let normalized = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    let t_dst_inv = t_dst.try_inverse()?;
    let mut matrix = t_dst_inv * normalized * t_src;
    let scale = matrix[(2, 2)];
    if scale.abs() > 1e-12 {
        matrix /= scale;
    }
    if !matrix.iter().all(|v| v.is_finite()) || matrix.determinant().abs() < 1e-12 {
        return None;
    }
    Some(Homography { matrix })
}

//! Localized patch correlation search.
//!
//! The template is the patch around a point in the previous frame. Every
//! candidate in a square window of the current frame is scored by zero-mean
//! normalized cross-correlation (ZNCC) over the pixels that are inside both
//! frames, clamped to [0, 1]. Candidates may sit outside the frame as long as
//! enough of their patch is visible.

use crate::frame::{Frame, Point2D};

const TIE_EPSILON: f32 = 1e-6;

/// Per-pixel variance below which a patch counts as flat.
const FLAT_VARIANCE: f64 = 1e-6;

/// Best match found by [`search`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchMatch {
    pub position: Point2D,
    /// Correlation score in [0, 1]; 1 is a perfect match.
    pub score: f32,
}

impl PatchMatch {
    #[inline]
    pub fn confidence(&self) -> f32 {
        self.score
    }

    /// Residual `1 - score`; 0 is a perfect match.
    #[inline]
    pub fn error(&self) -> f32 {
        1.0 - self.score
    }
}

/// Search parameters, all in pixels except `min_coverage`.
#[derive(Debug, Clone, Copy)]
pub struct SearchWindow {
    pub patch_radius: i32,
    pub search_radius: i32,
    /// Minimum fraction of the patch that must be comparable.
    pub min_coverage: f32,
}

/// Correlation between the patch at `template` in `prev` and the patch at
/// `candidate` in `curr`. `None` when too little of the patch is comparable.
///
/// Two flat patches score by how close their levels are; a flat patch against
/// a textured one scores 0.
pub fn patch_score(
    prev: &Frame,
    curr: &Frame,
    template: Point2D,
    candidate: Point2D,
    window: &SearchWindow,
) -> Option<f32> {
    let r = window.patch_radius;
    let total = ((2 * r + 1) * (2 * r + 1)) as f32;
    let (mut sa, mut sb, mut saa, mut sbb, mut sab) = (0.0f64, 0.0f64, 0.0f64, 0.0f64, 0.0f64);
    let mut valid = 0usize;

    for dr in -r..=r {
        for dc in -r..=r {
            let a = prev.intensity(template.row + dr, template.col + dc);
            let b = curr.intensity(candidate.row + dr, candidate.col + dc);
            if let (Some(a), Some(b)) = (a, b) {
                let (a, b) = (a as f64, b as f64);
                sa += a;
                sb += b;
                saa += a * a;
                sbb += b * b;
                sab += a * b;
                valid += 1;
            }
        }
    }

    if valid == 0 || (valid as f32) < window.min_coverage * total {
        return None;
    }

    let n = valid as f64;
    let var_a = (saa - sa * sa / n).max(0.0);
    let var_b = (sbb - sb * sb / n).max(0.0);
    let flat_a = var_a / n < FLAT_VARIANCE;
    let flat_b = var_b / n < FLAT_VARIANCE;
    let score = match (flat_a, flat_b) {
        (true, true) => 1.0 - ((sa - sb) / n).abs() / 255.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => (sab - sa * sb / n) / (var_a * var_b).sqrt(),
    };
    Some(score.clamp(0.0, 1.0) as f32)
}

/// Find the best match for the patch at `from` within the search window.
///
/// Ties go to the candidate nearest `from`, so a static scene never moves the
/// point.
pub fn search(prev: &Frame, curr: &Frame, from: Point2D, window: &SearchWindow) -> Option<PatchMatch> {
    let s = window.search_radius;
    let mut best: Option<(PatchMatch, i32)> = None;

    for dr in -s..=s {
        for dc in -s..=s {
            let candidate = from.offset(dr, dc);
            let Some(score) = patch_score(prev, curr, from, candidate, window) else {
                continue;
            };
            let dist = dr * dr + dc * dc;
            let better = match &best {
                None => true,
                Some((m, best_dist)) => {
                    score > m.score + TIE_EPSILON
                        || ((score - m.score).abs() <= TIE_EPSILON && dist < *best_dist)
                }
            };
            if better {
                best = Some((
                    PatchMatch {
                        position: candidate,
                        score,
                    },
                    dist,
                ));
            }
        }
    }

    best.map(|(m, _)| m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn window() -> SearchWindow {
        SearchWindow {
            patch_radius: 3,
            search_radius: 6,
            min_coverage: 0.5,
        }
    }

    fn blob(width: usize, height: usize, row: usize, col: usize) -> Frame {
        Frame::from_fn(width, height, |r, c| {
            let dr = r.abs_diff(row);
            let dc = c.abs_diff(col);
            if dr <= 2 && dc <= 2 {
                (200 - 30 * (dr + dc)) as u8
            } else {
                20
            }
        })
        .unwrap()
    }

    #[test]
    fn test_static_scene_keeps_position() {
        let frame = Frame::filled(32, 32, 90).unwrap();
        let m = search(&frame, &frame, Point2D::new(16, 16), &window()).unwrap();
        assert_eq!(m.position, Point2D::new(16, 16));
        assert_eq!(m.score, 1.0);
    }

    #[test]
    fn test_finds_shifted_blob() {
        let prev = blob(40, 40, 20, 20);
        let curr = blob(40, 40, 23, 18);
        let m = search(&prev, &curr, Point2D::new(20, 20), &window()).unwrap();
        assert_eq!(m.position, Point2D::new(23, 18));
        assert!(m.error() < 1e-6);
        assert!((m.confidence() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_coverage_rejects_far_outside() {
        let frame = Frame::filled(16, 16, 10).unwrap();
        let w = window();
        // patch centered 3 px outside the frame has no visible pixel
        assert!(patch_score(&frame, &frame, Point2D::new(8, 8), Point2D::new(8, -4), &w).is_none());
        // partially visible patch is still scored
        assert!(patch_score(&frame, &frame, Point2D::new(8, 8), Point2D::new(8, 0), &w).is_some());
    }

    #[test]
    fn test_noise_scores_low() {
        let prev = blob(40, 40, 20, 20);
        let mut rng = StdRng::seed_from_u64(3);
        let curr = Frame::from_fn(40, 40, |_, _| rng.random()).unwrap();
        let m = search(&prev, &curr, Point2D::new(20, 20), &window()).unwrap();
        assert!(m.score < 0.7, "score {}", m.score);
    }

    #[test]
    fn test_flat_patches_compare_levels() {
        let a = Frame::filled(16, 16, 90).unwrap();
        let b = Frame::filled(16, 16, 141).unwrap();
        let p = Point2D::new(8, 8);
        let score = patch_score(&a, &b, p, p, &window()).unwrap();
        assert!((score - 0.8).abs() < 1e-6);
        // flat against textured is uncorrelated
        let textured = blob(16, 16, 8, 8);
        assert_eq!(patch_score(&a, &textured, p, p, &window()), Some(0.0));
    }

    #[test]
    fn test_candidate_past_the_edge_is_scored() {
        let prev = blob(40, 40, 3, 20);
        let curr = blob(40, 40, 0, 20);
        let w = SearchWindow {
            min_coverage: 0.25,
            ..window()
        };
        // the blob moved so that a point 1 px above it now sits at row -1
        let m = search(&prev, &curr, Point2D::new(2, 20), &w).unwrap();
        assert_eq!(m.position, Point2D::new(-1, 20));
        assert!(m.error() < 1e-6);
    }
}

//! Descriptor matching with the nearest / second-nearest ratio test.

use ndarray::Array2;

use crate::error::{Result, TrackError};
use crate::features::feature::{Correspondence, FeatureSet};

/// Configuration for the [`FeatureMatcher`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatcherConfig {
    /// Accept when `best < ratio * second_best` on squared distances.
    pub ratio: f32,
    /// Resolve several queries claiming the same train feature by optimal assignment.
    pub one_to_one: bool,
    /// Optional ceiling on the accepted squared distance.
    pub max_distance_sq: Option<f32>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            ratio: 0.49,
            one_to_one: false,
            max_distance_sq: None,
        }
    }
}

impl MatcherConfig {
    pub fn with_ratio(mut self, ratio: f32) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn with_one_to_one(mut self, one_to_one: bool) -> Self {
        self.one_to_one = one_to_one;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.ratio > 0.0 && self.ratio <= 1.0) {
            return Err(TrackError::invalid_config("ratio must be in (0, 1]"));
        }
        Ok(())
    }
}

/// Brute-force two-nearest-neighbour matcher.
#[derive(Debug, Clone, Default)]
pub struct FeatureMatcher {
    config: MatcherConfig,
}

impl FeatureMatcher {
    pub fn new(config: MatcherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Match every feature of `query` against `train`.
    ///
    /// A match needs at least two train features: the best one is kept only
    /// when it is clearly closer than the runner-up.
    pub fn matches(&self, query: &FeatureSet, train: &FeatureSet) -> Vec<Correspondence> {
        if query.is_empty() || train.len() < 2 {
            return Vec::new();
        }

        let dists = distance_matrix(query, train);
        let (rows, cols) = dists.dim();
        let mut accepted = Vec::new();

        for i in 0..rows {
            let mut best = (usize::MAX, f32::INFINITY);
            let mut second = f32::INFINITY;
            for j in 0..cols {
                let d = dists[[i, j]];
                if d < best.1 {
                    second = best.1;
                    best = (j, d);
                } else if d < second {
                    second = d;
                }
            }
            let (j, d0) = best;
            if !(d0 < self.config.ratio * second) {
                continue;
            }
            if self.config.max_distance_sq.is_some_and(|max| d0 > max) {
                continue;
            }
            accepted.push((i, j, d0, d0 / second));
        }

        if self.config.one_to_one {
            accepted = self.resolve_one_to_one(accepted, rows, cols);
        }

        accepted
            .into_iter()
            .filter_map(|(i, j, distance_sq, _)| {
                let q = query.get(i)?;
                let t = train.get(j)?;
                Some(Correspondence {
                    query: i,
                    train: j,
                    distance_sq,
                    source: q.location(),
                    target: t.location(),
                })
            })
            .collect()
    }

    /// Keep, for each contested train feature, the query with the lowest ratio.
    fn resolve_one_to_one(
        &self,
        accepted: Vec<(usize, usize, f32, f32)>,
        rows: usize,
        cols: usize,
    ) -> Vec<(usize, usize, f32, f32)> {
        let mut cost = Array2::<f32>::from_elem((rows, cols), 1.0);
        for &(i, j, _, ratio) in &accepted {
            cost[[i, j]] = ratio;
        }
        let assignment = linear_assignment(&cost, self.config.ratio);
        let mut kept: Vec<_> = accepted
            .into_iter()
            .filter(|(i, j, _, _)| assignment.matches.contains(&(*i, *j)))
            .collect();
        kept.sort_by_key(|(i, _, _, _)| *i);
        kept
    }
}

/// Squared descriptor distances, shape (query.len(), train.len()).
pub fn distance_matrix(query: &FeatureSet, train: &FeatureSet) -> Array2<f32> {
    let mut dists = Array2::zeros((query.len(), train.len()));
    for (i, q) in query.iter().enumerate() {
        for (j, t) in train.iter().enumerate() {
            dists[[i, j]] = q.distance_sq(t);
        }
    }
    dists
}

#[derive(Debug, Clone)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_queries: Vec<usize>,
    pub unmatched_trains: Vec<usize>,
}

/// Minimum-cost one-to-one assignment; pairs costing more than `thresh` are
/// reported as unmatched.
pub fn linear_assignment(cost_matrix: &Array2<f32>, thresh: f32) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    if num_rows == 0 || num_cols == 0 {
        return AssignmentResult {
            matches: vec![],
            unmatched_queries: (0..num_rows).collect(),
            unmatched_trains: (0..num_cols).collect(),
        };
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), 1e6);
    for i in 0..num_rows {
        for j in 0..num_cols {
            padded[[i, j]] = cost_matrix[[i, j]] as f64;
        }
    }

    let mut matches = vec![];
    let mut unmatched_queries = vec![];
    let mut train_free = vec![true; num_cols];

    match lapjv::lapjv(&padded) {
        Ok((row_to_col, _)) => {
            for (row, &col) in row_to_col.iter().enumerate().take(num_rows) {
                if col < num_cols && cost_matrix[[row, col]] <= thresh {
                    matches.push((row, col));
                    train_free[col] = false;
                } else {
                    unmatched_queries.push(row);
                }
            }
        }
        Err(err) => {
            tracing::warn!(?err, "linear assignment failed");
            unmatched_queries = (0..num_rows).collect();
        }
    }

    let unmatched_trains = train_free
        .iter()
        .enumerate()
        .filter_map(|(j, &free)| free.then_some(j))
        .collect();

    AssignmentResult {
        matches,
        unmatched_queries,
        unmatched_trains,
    }
}

//! Interest centroid calculation.
//!
//! Averages a user's embeddings into one vector. Vectors disagreeing with the
//! dominant dimension are left out rather than padded or truncated.

use rand::Rng;
use serde::Serialize;

use super::DEFAULT_DIMENSION;

/// Lower bound (inclusive) of default centroid components
pub const DEFAULT_COMPONENT_MIN: f32 = 0.0001;

/// Upper bound (exclusive) of random default centroid components
pub const DEFAULT_COMPONENT_MAX: f32 = 0.001;

/// Stand-in for averaged components that came out non-finite
const NON_FINITE_REPLACEMENT: f32 = 0.0001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CentroidOptions {
    /// Dimension of the default centroid
    pub fallback_dimension: usize,
    /// Fill the default centroid with small random noise instead of a constant
    pub randomize_default: bool,
}

impl Default for CentroidOptions {
    fn default() -> Self {
        Self {
            fallback_dimension: DEFAULT_DIMENSION,
            randomize_default: true,
        }
    }
}

/// Where a centroid came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CentroidSource {
    /// Mean of this many real embeddings
    Observed { contributors: usize },
    /// No usable embedding, placeholder values only
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Centroid {
    values: Vec<f32>,
    source: CentroidSource,
}

impl Centroid {
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn source(&self) -> CentroidSource {
        self.source
    }

    pub fn is_default(&self) -> bool {
        self.source == CentroidSource::Default
    }
}

/// Compute the component-wise mean of `vectors`.
///
/// The dimension is the most common vector length (first seen wins a tie).
/// Non-finite components are skipped; a vector counts towards the mean if it
/// contributed at least one finite component. Falls back to a default
/// centroid when nothing contributes.
///
/// The result always has `dimension() > 0` and only finite components.
pub fn calculate_centroid(vectors: &[Vec<f32>], options: &CentroidOptions) -> Centroid {
    let Some(dimension) = dominant_dimension(vectors.iter().map(Vec::len)) else {
        return default_centroid(options);
    };

    let mut sums = vec![0.0f64; dimension];
    let mut contributors = 0usize;

    for vector in vectors.iter().filter(|v| v.len() == dimension) {
        let mut contributed = false;

        for (sum, value) in sums.iter_mut().zip(vector) {
            if value.is_finite() {
                *sum += f64::from(*value);
                contributed = true;
            }
        }

        if contributed {
            contributors += 1;
        }
    }

    if contributors == 0 {
        return default_centroid(options);
    }

    let count = contributors as f64;
    let values = sums
        .into_iter()
        .map(|sum| {
            let mean = (sum / count) as f32;
            if mean.is_finite() {
                mean
            } else {
                NON_FINITE_REPLACEMENT
            }
        })
        .collect();

    Centroid {
        values,
        source: CentroidSource::Observed { contributors },
    }
}

/// Most frequent non-zero length, ties broken by first appearance.
pub fn dominant_dimension<I>(lengths: I) -> Option<usize>
where
    I: IntoIterator<Item = usize>,
{
    // (length, occurrences) in first-seen order
    let mut counts: Vec<(usize, usize)> = Vec::new();

    for len in lengths.into_iter().filter(|len| *len > 0) {
        match counts.iter_mut().find(|(seen, _)| *seen == len) {
            Some((_, n)) => *n += 1,
            None => counts.push((len, 1)),
        }
    }

    counts
        .into_iter()
        .fold(None, |best: Option<(usize, usize)>, (len, n)| match best {
            Some((_, best_n)) if best_n >= n => best,
            _ => Some((len, n)),
        })
        .map(|(len, _)| len)
}

/// Placeholder centroid for users without a usable embedding.
///
/// A zero vector would be rejected by cosine-based indexes, so components sit
/// in `[DEFAULT_COMPONENT_MIN, DEFAULT_COMPONENT_MAX)`.
pub fn default_centroid(options: &CentroidOptions) -> Centroid {
    let dimension = options.fallback_dimension.max(1);

    let values = if options.randomize_default {
        let mut rng = rand::rng();
        (0..dimension)
            .map(|_| rng.random_range(DEFAULT_COMPONENT_MIN..DEFAULT_COMPONENT_MAX))
            .collect()
    } else {
        vec![DEFAULT_COMPONENT_MIN; dimension]
    };

    Centroid {
        values,
        source: CentroidSource::Default,
    }
}

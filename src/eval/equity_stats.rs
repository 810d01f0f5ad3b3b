//! Per-Episode Equity Statistics
//!
//! Statistics over a single episode's equity sequence, plus the NaN-skipping
//! sample reductions the aggregators share.
//!
//! # Drawdown
//!
//! ```text
//! peak_i = max(seq[0..=i])
//! dd_i   = (peak_i - seq[i]) / peak_i      only when peak_i > 0
//! mdd    = max(0, dd_0, ..., dd_n)
//! ```
//!
//! The ratio is peak-relative, so it is meaningful both for dollar curves and
//! for curves normalized to 1.0.

use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};

/// Minimum number of points before any statistic is defined.
pub const MIN_EQUITY_POINTS: usize = 2;

/// An episode fails when it finishes below this fraction of its peak.
///
/// Placeholder proxy carried over from the research notebooks; the peak is
/// taken over the finite points of the whole sequence, not up to each point.
pub const FAILURE_PEAK_FRACTION: f64 = 0.95;

// =============================================================================
// EQUITY SERIES
// =============================================================================

/// Sanitized equity sequence. Elements are finite or NaN.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquitySeries {
    values: Vec<f64>,
}

impl EquitySeries {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Long enough for statistics.
    pub fn is_valid(&self) -> bool {
        self.values.len() >= MIN_EQUITY_POINTS
    }

    pub fn final_value(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Maximum over the finite elements of the whole sequence.
    pub fn peak(&self) -> Option<f64> {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .reduce(f64::max)
    }

    /// Largest peak-relative decline as a positive fraction. NaN when empty.
    pub fn max_drawdown(&self) -> f64 {
        max_drawdown(&self.values)
    }

    /// Summary statistics, or `None` for sequences shorter than
    /// [`MIN_EQUITY_POINTS`].
    pub fn stats(&self) -> Option<EpisodeStats> {
        if !self.is_valid() {
            return None;
        }
        Some(EpisodeStats {
            final_value: self.final_value()?,
            peak: self.peak().unwrap_or(f64::NAN),
            max_drawdown: self.max_drawdown(),
        })
    }
}

/// Max drawdown over a raw slice.
///
/// The running peak starts at the first finite element, the same seed
/// [`EquitySeries::peak`] uses. NaN elements never move the peak or the
/// maximum. Non-positive peaks skip the division, so all-negative curves
/// report 0.
pub fn max_drawdown(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }

    let mut finite = values.iter().copied().filter(|v| v.is_finite());
    let Some(mut peak) = finite.next() else {
        return 0.0;
    };
    let mut mdd = 0.0;
    for v in finite {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            let dd = (peak - v) / peak;
            if dd > mdd {
                mdd = dd;
            }
        }
    }
    mdd
}

// =============================================================================
// EPISODE STATS
// =============================================================================

/// Derived statistics for one valid episode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeStats {
    pub final_value: f64,
    pub peak: f64,
    pub max_drawdown: f64,
}

impl EpisodeStats {
    /// `final < FAILURE_PEAK_FRACTION * peak`, only for positive peaks.
    pub fn is_failure(&self) -> bool {
        self.peak > 0.0 && self.final_value < FAILURE_PEAK_FRACTION * self.peak
    }
}

// =============================================================================
// SAMPLE REDUCTIONS
// =============================================================================

fn finite(xs: &[f64]) -> Vec<f64> {
    xs.iter().copied().filter(|x| x.is_finite()).collect()
}

/// Arithmetic mean of the finite samples; NaN when there are none.
pub fn mean(xs: &[f64]) -> f64 {
    let samples = finite(xs);
    if samples.is_empty() {
        return f64::NAN;
    }
    samples.iter().mean()
}

/// Median of the finite samples; NaN when there are none.
///
/// Even-length samples average the two middle values.
pub fn median(xs: &[f64]) -> f64 {
    let samples = finite(xs);
    if samples.is_empty() {
        return f64::NAN;
    }
    Data::new(samples).median()
}

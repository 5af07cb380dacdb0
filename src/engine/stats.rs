//! Empirical hit-probability statistics.
//!
//! Everything here is a pure function of a value sequence and a threshold.
//! Probability and descriptive stats ignore order; trend assumes the values
//! are oldest → newest.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Guards divisions by a mean that may be zero.
pub const EPSILON: f64 = 0.01;

/// Games per trend window.
pub const RECENT_N: usize = 5;

/// Percentage change between trend windows that counts as a trend.
pub const TREND_THRESHOLD_PCT: f64 = 10.0;

/// Observations at which sample confidence saturates.
pub const FULL_CONFIDENCE_SAMPLE: f64 = 20.0;

/// Multiples of the mean used for the hit-rate ladder.
pub const LADDER_MULTIPLIERS: [f64; 5] = [0.7, 0.85, 1.0, 1.15, 1.3];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    TrendingUp,
    TrendingDown,
    Stable,
    InsufficientData,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::TrendingUp => "trending_up",
            Trend::TrendingDown => "trending_down",
            Trend::Stable => "stable",
            Trend::InsufficientData => "insufficient_data",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HitRate {
    pub threshold: f64,
    /// Percentage of values `>= threshold`.
    pub rate: f64,
}

impl HitRate {
    /// Display label, e.g. `"17.5+"`.
    pub fn label(&self) -> String {
        format!("{:.1}+", self.threshold)
    }
}

/// Hit rates at fixed multiples of the mean, lowest threshold first.
///
/// Serializes as a JSON object `{"17.5+": 80.0, ...}` in ladder order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HitRateLadder(pub Vec<HitRate>);

impl HitRateLadder {
    pub fn iter(&self) -> impl Iterator<Item = &HitRate> {
        self.0.iter()
    }
}

impl Serialize for HitRateLadder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for hr in &self.0 {
            map.serialize_entry(&hr.label(), &round1(hr.rate))?;
        }
        map.end()
    }
}

/// Full-precision statistics for one value sequence and threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct StatSummary {
    /// Percentage of values `>= threshold`, in [0, 100].
    pub probability: f64,
    /// Consistency/sample-size score, in [0, 100].
    pub confidence: f64,
    pub sample_size: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub trend: Trend,
    pub hit_rates: HitRateLadder,
    pub times_hit: usize,
    pub times_missed: usize,
}

/// Compute every statistic for `values` against `threshold`.
///
/// Returns `None` for an empty sequence.
pub fn summarize(values: &[f64], threshold: f64) -> Option<StatSummary> {
    if values.is_empty() {
        return None;
    }

    let n = values.len();
    let times_hit = count_at_least(values, threshold);
    let probability = 100.0 * times_hit as f64 / n as f64;

    let mean = mean(values);
    let std_dev = population_std_dev(values);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(StatSummary {
        probability,
        confidence: confidence_score(mean, std_dev, n),
        sample_size: n,
        mean,
        median: median(values),
        std_dev,
        min,
        max,
        trend: classify_trend(values),
        hit_rates: hit_rate_ladder(values),
        times_hit,
        times_missed: n - times_hit,
    })
}

fn count_at_least(values: &[f64], threshold: f64) -> usize {
    values.iter().filter(|&&v| v >= threshold).count()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with an N denominator (no Bessel correction).
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Middle value; the mean of the two middle values for even lengths.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Compare the mean of the last `RECENT_N` values with the `RECENT_N`
/// before them. `values` must be oldest first.
pub fn classify_trend(values: &[f64]) -> Trend {
    if values.len() < RECENT_N * 2 {
        return Trend::InsufficientData;
    }
    let split = values.len() - RECENT_N;
    let recent = &values[split..];
    let previous = &values[split - RECENT_N..split];

    let previous_avg = mean(previous);
    let pct_diff = 100.0 * (mean(recent) - previous_avg) / (previous_avg + EPSILON);

    if pct_diff > TREND_THRESHOLD_PCT {
        Trend::TrendingUp
    } else if pct_diff < -TREND_THRESHOLD_PCT {
        Trend::TrendingDown
    } else {
        Trend::Stable
    }
}

/// Relative consistency component, clamped at zero.
pub fn consistency(mean: f64, std_dev: f64) -> f64 {
    (1.0 - std_dev / (mean + EPSILON)).max(0.0)
}

/// Sample-size component; reaches 1.0 at `FULL_CONFIDENCE_SAMPLE` values.
pub fn sample_confidence(n: usize) -> f64 {
    (n as f64 / FULL_CONFIDENCE_SAMPLE).min(1.0)
}

/// Average of consistency and sample confidence, as a percentage.
///
/// Both components lie in `[0, 1]` for non-negative stat values, so the
/// score lies in `[0, 100]`.
pub fn confidence_score(mean: f64, std_dev: f64, n: usize) -> f64 {
    100.0 * (consistency(mean, std_dev) + sample_confidence(n)) / 2.0
}

pub fn hit_rate_ladder(values: &[f64]) -> HitRateLadder {
    if values.is_empty() {
        return HitRateLadder::default();
    }
    let m = mean(values);
    let n = values.len() as f64;
    HitRateLadder(
        LADDER_MULTIPLIERS
            .iter()
            .map(|mult| {
                let threshold = m * mult;
                let rate = 100.0 * count_at_least(values, threshold) as f64 / n;
                HitRate { threshold, rate }
            })
            .collect(),
    )
}

/// Descriptive stats over the most recent `window` values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSummary {
    pub window: usize,
    pub label: String,
    pub average: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// One summary per window size that the sequence is long enough to fill.
/// `values` must be oldest first; output is rounded to two decimals.
pub fn window_summaries(values: &[f64], windows: &[usize]) -> Vec<WindowSummary> {
    windows
        .iter()
        .filter(|&&w| w > 0 && values.len() >= w)
        .map(|&w| {
            let recent = &values[values.len() - w..];
            WindowSummary {
                window: w,
                label: format!("Last {w} games"),
                average: round2(mean(recent)),
                median: round2(median(recent)),
                std_dev: round2(population_std_dev(recent)),
                min: round2(recent.iter().copied().fold(f64::INFINITY, f64::min)),
                max: round2(recent.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
            }
        })
        .collect()
}

pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

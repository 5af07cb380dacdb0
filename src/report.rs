//! Console rendering of prediction results.

use serde::Serialize;
use std::fmt::Write;

use crate::engine::{PredictionResult, Trend};

const RULE_WIDTH: usize = 70;

/// Betting lean derived from the hit probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Recommendation {
    #[serde(rename = "BET OVER")]
    BetOver,
    #[serde(rename = "BET UNDER")]
    BetUnder,
    #[serde(rename = "TOSS UP")]
    TossUp,
}

impl Recommendation {
    /// `>= 55` over, `<= 45` under, otherwise a toss-up.
    pub fn from_probability(probability: f64) -> Self {
        if probability >= 55.0 {
            Recommendation::BetOver
        } else if probability <= 45.0 {
            Recommendation::BetUnder
        } else {
            Recommendation::TossUp
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::BetOver => "BET OVER",
            Recommendation::BetUnder => "BET UNDER",
            Recommendation::TossUp => "TOSS UP",
        }
    }

    /// Display class for the web UI.
    pub fn css_class(&self) -> &'static str {
        match self {
            Recommendation::BetOver => "success",
            Recommendation::BetUnder => "danger",
            Recommendation::TossUp => "warning",
        }
    }
}

/// Display class for a probability value.
pub fn probability_class(probability: f64) -> &'static str {
    if probability >= 60.0 {
        "success"
    } else if probability >= 40.0 {
        "warning"
    } else {
        "danger"
    }
}

fn trend_text(trend: Trend) -> &'static str {
    match trend {
        Trend::TrendingUp => "Trending Up",
        Trend::TrendingDown => "Trending Down",
        Trend::Stable => "Stable",
        Trend::InsufficientData => "Insufficient data",
    }
}

/// Render a result as a plain-text report.
pub fn render_report(result: &PredictionResult) -> String {
    let p = match result {
        PredictionResult::Failure { error } => return format!("Error: {error}\n"),
        PredictionResult::Success(p) => p,
    };

    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "PREDICTION REPORT: {}", p.player);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Stat: {}", p.stat.label().to_uppercase());
    let _ = writeln!(out, "Target: {}+", p.threshold);
    let _ = writeln!(out, "Season: {}", p.season);
    if let Some(opp) = &p.opponent_filter {
        let _ = writeln!(out, "Opponent: {opp}");
    }
    if let Some(period) = &p.time_filter {
        let _ = writeln!(out, "Time Period: {period}");
    }

    let rec = Recommendation::from_probability(p.probability);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "PROBABILITY: {:.1}%", p.probability);
    let _ = writeln!(out, "CONFIDENCE:  {:.1}%", p.confidence);
    let _ = writeln!(out, "LEAN:        {}", rec.as_str());
    let _ = writeln!(out, "{rule}");

    let _ = writeln!(out, "Performance Metrics:");
    let _ = writeln!(out, "  Games Analyzed: {}", p.games_analyzed);
    let _ = writeln!(out, "  Sample Size:    {}", p.sample_size);
    let _ = writeln!(out, "  Average:        {:.1}", p.average);
    let _ = writeln!(out, "  Median:         {:.1}", p.median);
    let _ = writeln!(out, "  Std Dev:        {:.1}", p.std_dev);
    let _ = writeln!(out, "  Range:          {:.1} - {:.1}", p.min, p.max);
    let _ = writeln!(out, "  Hit:            {} times", p.times_hit);
    let _ = writeln!(out, "  Miss:           {} times", p.times_missed);
    let _ = writeln!(out, "  Trend:          {}", trend_text(p.trend));

    let _ = writeln!(out, "Hit Rates at Different Thresholds:");
    for hr in p.hit_rates.iter() {
        let bars = "█".repeat((hr.rate / 5.0) as usize);
        let _ = writeln!(out, "  {:>7}: {:>5.1}% {}", hr.label(), hr.rate, bars);
    }
    let _ = writeln!(out, "  (data source: {})", p.data_source);
    let _ = writeln!(out, "{rule}");
    out
}

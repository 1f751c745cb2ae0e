use crate::domain::indicators::{mean, std_dev, tail};
use serde::{Deserialize, Serialize};

/// Gap assumed between big rounds until two peaks have been seen.
const DEFAULT_CYCLE_LENGTH: f64 = 15.0;

/// Where the series sits between big (>= 5) peaks, over the last 50 rounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CyclePosition {
    /// Mean gap between consecutive peaks, rounded
    pub avg_cycle_length: usize,
    /// Rounds elapsed since the last peak (or since the window start)
    pub position_in_cycle: usize,
    /// position / unrounded gap, capped at 1
    pub cycle_progress: f64,
    pub expected_peak_soon: bool,
    pub avg_value: f64,
    pub peak_count: usize,
}

impl CyclePosition {
    pub fn detect(multipliers: &[f64]) -> Self {
        let last50 = tail(multipliers, 50);

        // strict local maxima at or above 5
        let peaks: Vec<usize> = (1..last50.len().saturating_sub(1))
            .filter(|&i| {
                last50[i] >= 5.0 && last50[i] > last50[i - 1] && last50[i] > last50[i + 1]
            })
            .collect();

        let avg_cycle_length = if peaks.len() >= 2 {
            let gaps: Vec<f64> = peaks.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
            mean(&gaps)
        } else {
            DEFAULT_CYCLE_LENGTH
        };

        let last_peak = peaks.last().copied().unwrap_or(0);
        let position_in_cycle = last50.len().saturating_sub(1 + last_peak);
        let cycle_progress = (position_in_cycle as f64 / avg_cycle_length).min(1.0);

        Self {
            avg_cycle_length: avg_cycle_length.round() as usize,
            position_in_cycle,
            cycle_progress,
            expected_peak_soon: cycle_progress > 0.7,
            avg_value: mean(last50),
            peak_count: peaks.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityRegime {
    Normal,
    HighVolatility,
    LowVolatility,
}

impl VolatilityRegime {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolatilityRegime::Normal => "normal",
            VolatilityRegime::HighVolatility => "high_volatility",
            VolatilityRegime::LowVolatility => "low_volatility",
        }
    }
}

impl std::fmt::Display for VolatilityRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Short (10), medium (20) and long (50) round dispersion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityState {
    pub short: f64,
    pub medium: f64,
    pub long: f64,
    pub regime: VolatilityRegime,
    pub is_increasing: bool,
    /// short / max(0.1, long)
    pub ratio: f64,
}

impl VolatilityState {
    pub fn detect(multipliers: &[f64]) -> Self {
        let short = std_dev(tail(multipliers, 10));
        let medium = std_dev(tail(multipliers, 20));
        let long = std_dev(tail(multipliers, 50));

        let regime = if short > long * 1.5 {
            VolatilityRegime::HighVolatility
        } else if short < long * 0.5 {
            VolatilityRegime::LowVolatility
        } else {
            VolatilityRegime::Normal
        };

        Self {
            short,
            medium,
            long,
            regime,
            is_increasing: short > medium,
            ratio: short / long.max(0.1),
        }
    }
}

/// Distance of the latest round from its recent means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanReversion {
    pub mean_20: f64,
    pub mean_50: f64,
    pub mean_100: f64,
    /// (latest - mean20) / mean20
    pub deviation_20: f64,
    pub deviation_50: f64,
    /// Positive up to 100 below the mean, negative down to -50 above it
    pub reversion_pressure: f64,
    pub should_revert: bool,
}

impl MeanReversion {
    pub fn detect(multipliers: &[f64]) -> Self {
        let mean_20 = mean(tail(multipliers, 20));
        let mean_50 = mean(tail(multipliers, 50));
        let mean_100 = mean(tail(multipliers, 100));
        let last = multipliers.last().copied().unwrap_or(0.0);

        let deviation_20 = relative_deviation(last, mean_20);
        let deviation_50 = relative_deviation(last, mean_50);

        let reversion_pressure = if deviation_20 < -0.3 {
            (deviation_20.abs() * 100.0).min(100.0)
        } else if deviation_20 > 0.5 {
            -(deviation_20 * 30.0).min(50.0)
        } else {
            0.0
        };

        Self {
            mean_20,
            mean_50,
            mean_100,
            deviation_20,
            deviation_50,
            reversion_pressure,
            should_revert: deviation_20.abs() > 0.25,
        }
    }
}

fn relative_deviation(value: f64, base: f64) -> f64 {
    if base <= 0.0 {
        return 0.0;
    }
    (value - base) / base
}

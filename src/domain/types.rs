use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One round exactly as the history feed reports it, before parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRound {
    pub round_id: u64,
    pub result: String,
    pub timestamp: String,
}

/// A resolved round. Immutable once recorded in the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub round_id: u64,
    pub multiplier: f64,
    pub observed_at: String,
}

impl Outcome {
    /// Parse a raw feed record. The multiplier must be a finite number > 0.
    pub fn from_raw(raw: &RawRound) -> Result<Self> {
        // the next round must stay addressable
        if raw.round_id == u64::MAX {
            return Err(Error::malformed(format!(
                "round id {} has no successor",
                raw.round_id
            )));
        }
        let multiplier: f64 = raw.result.trim().parse().map_err(|_| {
            Error::malformed(format!(
                "round {}: result {:?} is not a number",
                raw.round_id, raw.result
            ))
        })?;
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(Error::malformed(format!(
                "round {}: multiplier {} out of range",
                raw.round_id, multiplier
            )));
        }
        Ok(Self {
            round_id: raw.round_id,
            multiplier,
            observed_at: raw.timestamp.clone(),
        })
    }
}

/// Forecast class: how far above the safe zone the forecast reaches.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastClass {
    Safe,
    Medium,
    High,
}

impl ForecastClass {
    pub const ALL: [ForecastClass; 3] = [ForecastClass::Safe, ForecastClass::Medium, ForecastClass::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastClass::Safe => "safe",
            ForecastClass::Medium => "medium",
            ForecastClass::High => "high",
        }
    }
}

impl std::fmt::Display for ForecastClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Forecast for the round following the last observed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// Target round: last observed round id + 1
    pub round_id: u64,
    pub value: f64,
    pub class: ForecastClass,
    /// [10, 95] once indicators run; 30 for the warm-up placeholder
    pub confidence: u8,
    pub reasoning: Vec<String>,
    pub issued_at: DateTime<Utc>,
}

impl Forecast {
    /// A forecast hits when the realized multiplier reaches the forecast value.
    pub fn is_hit(&self, actual: f64) -> bool {
        actual >= self.value
    }
}

/// A forecast paired with the outcome of the round it targeted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    #[serde(flatten)]
    pub forecast: Forecast,
    pub actual: f64,
    pub correct: bool,
    pub resolved_at: DateTime<Utc>,
}

impl ForecastRecord {
    pub fn resolve(forecast: Forecast, actual: f64) -> Self {
        let correct = forecast.is_hit(actual);
        Self {
            forecast,
            actual,
            correct,
            resolved_at: Utc::now(),
        }
    }
}

/// Engine tunables that sit outside the analysis rules themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Below this many outcomes the engine emits the warm-up placeholder
    pub min_history: usize,
    /// Retained outcome cap; 0 keeps everything
    pub max_history: usize,
    pub accuracy_capacity: usize,
    pub rolling_window: usize,
    pub history_query_len: usize,
    pub raw_query_default: usize,
}

/// Longest window any detector reads.
pub const DETECTOR_WINDOW: usize = 100;

impl EngineConfig {
    /// A retention cap must hold at least one full detector window.
    pub fn validate(&self) -> Result<()> {
        if self.max_history != 0 && self.max_history < DETECTOR_WINDOW {
            return Err(Error::Config(format!(
                "max_history {} must be 0 or at least {}",
                self.max_history, DETECTOR_WINDOW
            )));
        }
        if self.min_history == 0 || self.accuracy_capacity == 0 || self.rolling_window == 0 {
            return Err(Error::Config(
                "min_history, accuracy_capacity and rolling_window must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_history: 5,
            max_history: 500, // detectors never look further back than 100
            accuracy_capacity: 100,
            rolling_window: 20,
            history_query_len: 30,
            raw_query_default: 50,
        }
    }
}

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// EMA value reported for an empty series.
const EMPTY_SERIES_EMA: f64 = 2.0;

/// Dispersion below this is rounding residue from a flat series.
const FLAT_SERIES_EPSILON: f64 = 1e-12;

/// Bollinger band triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Technical indicators over the multiplier series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub ema_5: f64,
    pub ema_10: f64,
    pub ema_20: f64,
    pub rsi_14: f64,
    pub bollinger: Bands,
    /// Latest value against the last 50
    pub z_score: f64,
}

impl IndicatorSet {
    /// EMA5 < EMA10 < EMA20: short averages sitting below long ones.
    pub fn is_downtrend(&self) -> bool {
        self.ema_5 < self.ema_10 && self.ema_10 < self.ema_20
    }
}

/// Compute all indicators. The last element of `multipliers` is the most
/// recent resolved round.
pub fn compute_indicators(multipliers: &[f64]) -> IndicatorSet {
    let last = multipliers.last().copied().unwrap_or(0.0);
    IndicatorSet {
        ema_5: ema(multipliers, 5),
        ema_10: ema(multipliers, 10),
        ema_20: ema(multipliers, 20),
        rsi_14: rsi(multipliers, 14),
        bollinger: bollinger_bands(multipliers, 20, 2.0),
        z_score: z_score(last, tail(multipliers, 50)),
    }
}

/// The last `n` elements (or all of them when shorter).
pub fn tail(data: &[f64], n: usize) -> &[f64] {
    &data[data.len().saturating_sub(n)..]
}

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().mean()
}

/// Exponential moving average seeded with the simple mean of the first
/// `period` values.
pub fn ema(data: &[f64], period: usize) -> f64 {
    if period == 0 || data.len() < period {
        return data.last().copied().unwrap_or(EMPTY_SERIES_EMA);
    }
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema_val = mean(&data[..period]);
    for &val in &data[period..] {
        ema_val = val * k + ema_val * (1.0 - k);
    }
    ema_val
}

/// Relative strength over the last `period` deltas, plain averages.
pub fn rsi(data: &[f64], period: usize) -> f64 {
    if period == 0 || data.len() < period + 1 {
        return 50.0;
    }

    let mut gains = 0.0;
    let mut losses = 0.0;
    for i in (data.len() - period)..data.len() {
        let change = data[i] - data[i - 1];
        if change > 0.0 {
            gains += change;
        } else {
            losses -= change;
        }
    }

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// Population standard deviation (divides by N).
pub fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let sd = data.iter().population_std_dev();
    if sd < FLAT_SERIES_EPSILON {
        0.0
    } else {
        sd
    }
}

pub fn z_score(value: f64, data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let sd = std_dev(data);
    if sd == 0.0 {
        return 0.0;
    }
    (value - mean(data)) / sd
}

/// Bands from the last `period` samples. Shorter histories degrade to
/// fixed ±50% bands around the whole-series mean.
pub fn bollinger_bands(data: &[f64], period: usize, num_std: f64) -> Bands {
    if data.len() < period {
        let m = mean(data);
        return Bands {
            upper: m * 1.5,
            middle: m,
            lower: m * 0.5,
        };
    }
    let recent = tail(data, period);
    let middle = mean(recent);
    let sd = std_dev(recent);
    Bands {
        upper: middle + num_std * sd,
        middle,
        lower: middle - num_std * sd,
    }
}

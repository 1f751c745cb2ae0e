use crate::engine::analysis::AnalysisBundle;
use crate::strategy::VolatilityRegime;

pub const MIN_CONFIDENCE: f64 = 10.0;
pub const MAX_CONFIDENCE: f64 = 95.0;

/// Map an analysis bundle to a confidence score in [10, 95].
/// Starts at 50 and applies fixed adjustments; trap score contributes at
/// most 30 points of penalty.
pub fn confidence_score(analysis: &AnalysisBundle) -> u8 {
    let mut score = 50.0;

    let rsi = analysis.indicators.rsi_14;
    if rsi < 25.0 {
        score += 15.0;
    } else if rsi > 75.0 {
        score -= 10.0;
    }

    match analysis.volatility.regime {
        VolatilityRegime::LowVolatility => score += 10.0,
        VolatilityRegime::HighVolatility => score -= 15.0,
        VolatilityRegime::Normal => {}
    }

    score -= analysis.traps.score.min(100) as f64 * 0.3;

    if analysis.cycle.expected_peak_soon {
        score += 10.0;
    }

    let mr = &analysis.mean_reversion;
    if mr.should_revert && mr.deviation_20 < -0.2 {
        score += 15.0;
    }

    if analysis.intent.signals.len() >= 2 {
        score += 10.0;
    }

    if analysis.indicators.is_downtrend() {
        score += 5.0;
    }

    clamp_confidence(score)
}

fn clamp_confidence(score: f64) -> u8 {
    if !score.is_finite() {
        return MIN_CONFIDENCE as u8;
    }
    score.round().clamp(MIN_CONFIDENCE, MAX_CONFIDENCE) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flat series with every adjustment switched off: scores exactly 50.
    fn neutral_bundle() -> AnalysisBundle {
        let mut a = AnalysisBundle::compute(&[2.0; 60]);
        a.indicators.rsi_14 = 50.0;
        a.cycle.expected_peak_soon = false;
        a
    }

    #[test]
    fn test_flat_series_raw_score() {
        // RSI 100 (-10), no peak for 59 rounds so a peak is expected (+10)
        let a = AnalysisBundle::compute(&[2.0; 60]);
        assert_eq!(a.indicators.rsi_14, 100.0);
        assert!(a.cycle.expected_peak_soon);
        assert_eq!(confidence_score(&a), 50);
    }

    #[test]
    fn test_neutral_baseline() {
        assert_eq!(confidence_score(&neutral_bundle()), 50);
    }

    #[test]
    fn test_trap_penalty_is_capped() {
        let mut a = neutral_bundle();
        a.traps.score = 135;
        assert_eq!(confidence_score(&a), 20);
        a.traps.score = 100;
        assert_eq!(confidence_score(&a), 20);
        a.traps.score = 20;
        assert_eq!(confidence_score(&a), 44);
    }

    #[test]
    fn test_rsi_adjustments() {
        let mut a = neutral_bundle();
        a.indicators.rsi_14 = 24.0;
        assert_eq!(confidence_score(&a), 65);
        a.indicators.rsi_14 = 76.0;
        assert_eq!(confidence_score(&a), 40);
        a.indicators.rsi_14 = 75.0;
        assert_eq!(confidence_score(&a), 50);
    }

    #[test]
    fn test_bullish_adjustments_stack() {
        let mut a = neutral_bundle();
        a.indicators.rsi_14 = 20.0;
        a.volatility.regime = VolatilityRegime::LowVolatility;
        a.cycle.expected_peak_soon = true;
        a.mean_reversion.should_revert = true;
        a.mean_reversion.deviation_20 = -0.4;
        a.intent.signals = vec!["a".into(), "b".into()];
        a.indicators.ema_5 = 1.0;
        a.indicators.ema_10 = 1.5;
        a.indicators.ema_20 = 2.0;
        // 50 + 15 + 10 + 10 + 15 + 10 + 5 = 115
        assert_eq!(confidence_score(&a), 95);
    }

    #[test]
    fn test_reversion_bonus_needs_both_conditions() {
        let mut a = neutral_bundle();
        a.mean_reversion.should_revert = true;
        a.mean_reversion.deviation_20 = 0.3;
        assert_eq!(confidence_score(&a), 50);
        a.mean_reversion.deviation_20 = -0.26;
        assert_eq!(confidence_score(&a), 65);
    }

    #[test]
    fn test_single_signal_gets_no_bonus() {
        let mut a = neutral_bundle();
        a.intent.signals = vec!["only".into()];
        assert_eq!(confidence_score(&a), 50);
    }

    #[test]
    fn test_high_volatility_penalty() {
        let mut a = neutral_bundle();
        a.volatility.regime = VolatilityRegime::HighVolatility;
        assert_eq!(confidence_score(&a), 35);
    }

    #[test]
    fn test_fractional_penalty_rounds() {
        let mut a = neutral_bundle();
        a.traps.score = 11; // 3.3 penalty -> 46.7
        assert_eq!(confidence_score(&a), 47);
    }

    #[test]
    fn test_always_in_range() {
        for seed in 0..50u64 {
            let data: Vec<f64> = (0..80u64)
                .map(|i| 1.0 + ((i * 7919 + seed * 104_729) % 1000) as f64 / 100.0)
                .collect();
            let c = confidence_score(&AnalysisBundle::compute(&data));
            assert!((10..=95).contains(&c), "confidence {} out of range", c);
        }
    }

    #[test]
    fn test_clamp_non_finite() {
        assert_eq!(clamp_confidence(f64::NAN), 10);
    }
}

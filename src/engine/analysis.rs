use super::intent::{infer_intent, Intent, IntentInputs};
use super::synthesizer::SynthesisInputs;
use crate::domain::indicators::{compute_indicators, IndicatorSet};
use crate::strategy::{CyclePosition, MeanReversion, StreakPattern, TrapPattern, VolatilityState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything derived from the outcome series in one refresh cycle.
/// Recomputed from scratch each cycle; only the latest is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisBundle {
    pub indicators: IndicatorSet,
    pub streaks: StreakPattern,
    pub traps: TrapPattern,
    pub cycle: CyclePosition,
    pub volatility: VolatilityState,
    pub mean_reversion: MeanReversion,
    pub intent: Intent,
    pub last_multiplier: f64,
    pub computed_at: DateTime<Utc>,
}

impl AnalysisBundle {
    /// `multipliers` must be in ascending round order.
    pub fn compute(multipliers: &[f64]) -> Self {
        let indicators = compute_indicators(multipliers);
        let streaks = StreakPattern::detect(multipliers);
        let traps = TrapPattern::detect(multipliers);
        let cycle = CyclePosition::detect(multipliers);
        let volatility = VolatilityState::detect(multipliers);
        let mean_reversion = MeanReversion::detect(multipliers);
        let intent = infer_intent(&IntentInputs {
            traps: &traps,
            cycle: &cycle,
            volatility: &volatility,
            mean_reversion: &mean_reversion,
        });

        Self {
            indicators,
            streaks,
            traps,
            cycle,
            volatility,
            mean_reversion,
            intent,
            last_multiplier: multipliers.last().copied().unwrap_or(0.0),
            computed_at: Utc::now(),
        }
    }

    pub fn synthesis_inputs(&self) -> SynthesisInputs<'_> {
        SynthesisInputs {
            phase: self.intent.phase,
            expected_peak_soon: self.cycle.expected_peak_soon,
            rsi: self.indicators.rsi_14,
            volatility_ratio: self.volatility.ratio,
            deviation_20: self.mean_reversion.deviation_20,
            trap_score: self.traps.score,
            streak: &self.streaks,
            last: self.last_multiplier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::intent::Phase;

    #[test]
    fn test_bundle_from_spike_collapse() {
        let data = [1.4, 2.2, 1.9, 6.0, 1.2, 1.1, 1.3, 1.0];
        let a = AnalysisBundle::compute(&data);
        assert!(a.traps.post_spike_collapse);
        assert_eq!(a.intent.phase, Phase::Distribution);
        assert_eq!(a.last_multiplier, 1.0);
        assert_eq!(a.streaks.consecutive_low, 4);
    }

    #[test]
    fn test_bundle_is_finite_on_flat_series() {
        let a = AnalysisBundle::compute(&[1.0; 60]);
        assert!(a.indicators.z_score.is_finite());
        assert!(a.volatility.ratio.is_finite());
        assert!(a.mean_reversion.deviation_20.is_finite());
        assert!(a.cycle.cycle_progress.is_finite());
    }

    #[test]
    fn test_synthesis_inputs_mirror_bundle() {
        let data: Vec<f64> = (0..30).map(|i| 1.0 + (i % 4) as f64 * 0.6).collect();
        let a = AnalysisBundle::compute(&data);
        let inputs = a.synthesis_inputs();
        assert_eq!(inputs.phase, a.intent.phase);
        assert_eq!(inputs.trap_score, a.traps.score);
        assert_eq!(inputs.rsi, a.indicators.rsi_14);
        assert_eq!(inputs.last, *data.last().unwrap());
    }
}

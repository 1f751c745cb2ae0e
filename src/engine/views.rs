//! Serializable snapshots of engine state, one per query.

use super::analysis::AnalysisBundle;
use super::predictor::Engine;
use crate::domain::{Bands, ForecastRecord, Outcome};
use crate::error::{Error, Result};
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;

/// Signals carried by the abbreviated forecast analysis.
const TOP_SIGNALS: usize = 3;

fn fmt2(v: f64) -> String {
    format!("{:.2}", v)
}

/// Fraction rendered as a percentage, e.g. 0.634 -> "63%" at 0 dp.
fn pct(v: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, v * 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmaView {
    pub ema5: String,
    pub ema10: String,
    pub ema20: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleSummary {
    pub position: usize,
    pub avg_length: usize,
}

/// Compact analysis attached to the forecast query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub rsi: i64,
    pub ema: EmaView,
    pub volatility: String,
    pub cycle: CycleSummary,
    pub trap_score: u32,
    pub phase: String,
    pub signals: Vec<String>,
}

impl AnalysisSummary {
    pub fn from_bundle(a: &AnalysisBundle) -> Self {
        Self {
            rsi: a.indicators.rsi_14.round() as i64,
            ema: EmaView {
                ema5: fmt2(a.indicators.ema_5),
                ema10: fmt2(a.indicators.ema_10),
                ema20: fmt2(a.indicators.ema_20),
            },
            volatility: a.volatility.regime.to_string(),
            cycle: CycleSummary {
                position: a.cycle.position_in_cycle,
                avg_length: a.cycle.avg_cycle_length,
            },
            trap_score: a.traps.score,
            phase: a.intent.phase.to_string(),
            signals: a.intent.signals.iter().take(TOP_SIGNALS).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastView {
    pub round_id: String,
    pub value: String,
    pub confidence: u8,
    pub class: String,
    pub reasoning: Vec<String>,
    /// None while the engine is still warming up
    pub analysis: Option<AnalysisSummary>,
}

impl ForecastView {
    pub fn build<R: Rng>(engine: &Engine<R>) -> Result<Self> {
        let f = engine
            .current_forecast()
            .ok_or(Error::NotReady("no forecast produced yet"))?;
        // the bundle is only attached when it backs this forecast
        let analysis = engine
            .analysis()
            .filter(|_| engine.history().len() >= engine.config().min_history)
            .map(AnalysisSummary::from_bundle);
        Ok(Self {
            round_id: f.round_id.to_string(),
            value: fmt2(f.value),
            confidence: f.confidence,
            class: f.class.to_string(),
            reasoning: f.reasoning.clone(),
            analysis,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordView {
    pub round_id: String,
    pub value: String,
    pub class: String,
    pub confidence: u8,
    pub actual: String,
    pub correct: bool,
    /// First reasoning line only
    pub reason: String,
    pub resolved_at: String,
}

impl From<&ForecastRecord> for RecordView {
    fn from(r: &ForecastRecord) -> Self {
        Self {
            round_id: r.forecast.round_id.to_string(),
            value: fmt2(r.forecast.value),
            class: r.forecast.class.to_string(),
            confidence: r.forecast.confidence,
            actual: fmt2(r.actual),
            correct: r.correct,
            reason: r.forecast.reasoning.first().cloned().unwrap_or_default(),
            resolved_at: r.resolved_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryStats {
    pub total: usize,
    pub correct: usize,
    pub wrong: usize,
    pub accuracy: String,
    /// "correct/total" per class
    pub by_class: BTreeMap<String, String>,
    pub rolling_accuracy: Option<String>,
    /// "correct/total" per class over the whole accuracy log
    pub retained_by_class: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryView {
    pub stats: HistoryStats,
    pub records: Vec<RecordView>,
}

impl HistoryView {
    /// Newest `history_query_len` records with stats over that same slice;
    /// rolling accuracy covers the newest `rolling_window` records.
    pub fn build<R: Rng>(engine: &Engine<R>) -> Self {
        let config = engine.config();
        let log = engine.accuracy();
        let recent = log.recent(config.history_query_len);
        let summary = log.summary(config.history_query_len);

        let by_class = summary
            .by_class
            .iter()
            .map(|(class, s)| (class.clone(), format!("{}/{}", s.correct, s.total)))
            .collect();

        Self {
            stats: HistoryStats {
                total: summary.total,
                correct: summary.correct,
                wrong: summary.wrong,
                accuracy: format!("{:.1}%", summary.accuracy_pct),
                by_class,
                rolling_accuracy: log
                    .rolling_accuracy(config.rolling_window)
                    .map(|pct| format!("{:.1}%", pct)),
                retained_by_class: log
                    .class_breakdown()
                    .into_iter()
                    .map(|(class, s)| (class.to_string(), format!("{}/{}", s.correct, s.total)))
                    .collect(),
            },
            records: recent.iter().map(RecordView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandsView {
    pub upper: String,
    pub middle: String,
    pub lower: String,
}

impl From<&Bands> for BandsView {
    fn from(b: &Bands) -> Self {
        Self {
            upper: fmt2(b.upper),
            middle: fmt2(b.middle),
            lower: fmt2(b.lower),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorsView {
    pub ema5: String,
    pub ema10: String,
    pub ema20: String,
    pub rsi: String,
    pub bollinger: BandsView,
    pub z_score: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrapsView {
    pub post_spike_collapse: bool,
    pub grind: bool,
    pub tease: bool,
    pub fake_breakout: bool,
    pub exhaustion: bool,
    pub detected: bool,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleView {
    pub avg_cycle_length: usize,
    pub position_in_cycle: usize,
    pub progress: String,
    pub expected_peak_soon: bool,
    pub avg_value: String,
    pub peak_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolatilityView {
    pub short: String,
    pub medium: String,
    pub long: String,
    pub regime: String,
    pub is_increasing: bool,
    pub ratio: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeanReversionView {
    pub mean_20: String,
    pub mean_50: String,
    pub mean_100: String,
    pub deviation_20: String,
    pub deviation_50: String,
    pub reversion_pressure: String,
    pub should_revert: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentView {
    pub phase: String,
    pub expected_action: super::intent::ExpectedAction,
    pub confidence: u8,
    pub risk_level: super::intent::RiskLevel,
    pub signals: Vec<String>,
}

/// The full latest bundle, numbers formatted to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisView {
    pub indicators: IndicatorsView,
    pub traps: TrapsView,
    pub cycle: CycleView,
    pub volatility: VolatilityView,
    pub mean_reversion: MeanReversionView,
    pub intent: IntentView,
    pub streaks: crate::strategy::StreakPattern,
    pub last_multiplier: String,
    pub updated_at: String,
}

impl AnalysisView {
    pub fn build<R: Rng>(engine: &Engine<R>) -> Result<Self> {
        let a = engine
            .analysis()
            .ok_or(Error::NotReady("analysis not computed yet"))?;
        Ok(Self::from_bundle(a))
    }

    pub fn from_bundle(a: &AnalysisBundle) -> Self {
        let ind = &a.indicators;
        let mr = &a.mean_reversion;
        let vol = &a.volatility;
        Self {
            indicators: IndicatorsView {
                ema5: fmt2(ind.ema_5),
                ema10: fmt2(ind.ema_10),
                ema20: fmt2(ind.ema_20),
                rsi: format!("{:.1}", ind.rsi_14),
                bollinger: BandsView::from(&ind.bollinger),
                z_score: fmt2(ind.z_score),
            },
            traps: TrapsView {
                post_spike_collapse: a.traps.post_spike_collapse,
                grind: a.traps.grind,
                tease: a.traps.tease,
                fake_breakout: a.traps.fake_breakout,
                exhaustion: a.traps.exhaustion,
                detected: a.traps.any(),
                score: a.traps.score,
            },
            cycle: CycleView {
                avg_cycle_length: a.cycle.avg_cycle_length,
                position_in_cycle: a.cycle.position_in_cycle,
                progress: pct(a.cycle.cycle_progress, 0),
                expected_peak_soon: a.cycle.expected_peak_soon,
                avg_value: fmt2(a.cycle.avg_value),
                peak_count: a.cycle.peak_count,
            },
            volatility: VolatilityView {
                short: fmt2(vol.short),
                medium: fmt2(vol.medium),
                long: fmt2(vol.long),
                regime: vol.regime.to_string(),
                is_increasing: vol.is_increasing,
                ratio: fmt2(vol.ratio),
            },
            mean_reversion: MeanReversionView {
                mean_20: fmt2(mr.mean_20),
                mean_50: fmt2(mr.mean_50),
                mean_100: fmt2(mr.mean_100),
                deviation_20: pct(mr.deviation_20, 1),
                deviation_50: pct(mr.deviation_50, 1),
                reversion_pressure: format!("{:.0}", mr.reversion_pressure),
                should_revert: mr.should_revert,
            },
            intent: IntentView {
                phase: a.intent.phase.to_string(),
                expected_action: a.intent.expected_action,
                confidence: a.intent.confidence,
                risk_level: a.intent.risk_level,
                signals: a.intent.signals.clone(),
            },
            streaks: a.streaks.clone(),
            last_multiplier: fmt2(a.last_multiplier),
            updated_at: a.computed_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawView {
    pub total: usize,
    pub rounds: Vec<Outcome>,
}

impl RawView {
    /// Newest first; a missing or zero `limit` means the configured default.
    pub fn build<R: Rng>(engine: &Engine<R>, limit: Option<usize>) -> Self {
        let limit = limit
            .filter(|&n| n > 0)
            .unwrap_or(engine.config().raw_query_default);
        Self {
            total: engine.history().len(),
            rounds: engine.history().recent(limit),
        }
    }
}

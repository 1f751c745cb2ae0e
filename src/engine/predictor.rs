use super::analysis::AnalysisBundle;
use super::synthesizer::synthesize;
use crate::domain::{
    normalize_snapshot, EngineConfig, Forecast, ForecastClass, ForecastRecord, Outcome,
    OutcomeHistory, RawRound,
};
use crate::error::{Error, Result};
use crate::evaluation::{confidence_score, AccuracyLog};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

pub const PLACEHOLDER_VALUE: f64 = 1.50;
pub const PLACEHOLDER_CONFIDENCE: u8 = 30;
const PLACEHOLDER_REASON: &str = "Warming up: not enough rounds to analyse yet";

/// What one `ingest` call did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// No round newer than the retained history; live forecast kept as is.
    Unchanged,
    Forecasted {
        forecast: Forecast,
        /// Record produced by scoring the previous forecast, if there was one
        resolved: Option<ForecastRecord>,
    },
}

/// Owner of the outcome history, the live forecast and the accuracy log.
///
/// Every refresh goes through [`Engine::ingest`], which takes `&mut self`,
/// so a reader holding a shared borrow sees the state either before or
/// after a whole cycle.
pub struct Engine<R: Rng = StdRng> {
    config: EngineConfig,
    history: OutcomeHistory,
    forecast: Option<Forecast>,
    last_resolved: Option<u64>,
    accuracy: AccuracyLog,
    analysis: Option<AnalysisBundle>,
    rng: R,
}

impl Engine<StdRng> {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_seed(config: EngineConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Engine<R> {
    pub fn with_rng(config: EngineConfig, rng: R) -> Self {
        Self {
            history: OutcomeHistory::new(config.max_history),
            accuracy: AccuracyLog::new(config.accuracy_capacity),
            config,
            forecast: None,
            last_resolved: None,
            analysis: None,
            rng,
        }
    }

    /// Run one refresh cycle against a feed snapshot: resolve the live
    /// forecast against the new round, then forecast the next one.
    /// A snapshot that fails to normalize leaves the engine untouched.
    pub fn ingest(&mut self, snapshot: &[RawRound]) -> Result<CycleOutcome> {
        let normalized = normalize_snapshot(snapshot)?;
        let appended = self.history.extend(normalized);

        if appended == 0 && self.forecast.is_some() {
            debug!(
                latest = self.history.latest().map(|o| o.round_id),
                "no new rounds in snapshot"
            );
            return Ok(CycleOutcome::Unchanged);
        }

        let latest = self.history.latest().cloned().ok_or(Error::EmptySnapshot)?;
        let resolved = self.resolve_live(&latest);
        let forecast = self.issue(latest.round_id + 1);

        Ok(CycleOutcome::Forecasted { forecast, resolved })
    }

    /// Score the live forecast once its round (or any later one) shows up.
    fn resolve_live(&mut self, latest: &Outcome) -> Option<ForecastRecord> {
        if self.last_resolved.is_some_and(|id| latest.round_id <= id) {
            return None;
        }
        let forecast = self.forecast.take()?;

        // Rounds can be skipped between polls; fall back to the latest one.
        let actual = self
            .history
            .get(forecast.round_id)
            .map_or(latest.multiplier, |o| o.multiplier);
        let record = ForecastRecord::resolve(forecast, actual);
        self.last_resolved = Some(latest.round_id);
        self.accuracy.push(record.clone());

        let win_rate = self.accuracy.rolling_accuracy(self.config.rolling_window);
        info!(
            round = latest.round_id,
            target = record.forecast.round_id,
            actual = %format!("{:.2}", actual),
            forecast = %format!("{:.2}", record.forecast.value),
            class = %record.forecast.class,
            confidence = record.forecast.confidence,
            hit = record.correct,
            win_rate = %format!("{:.0}%", win_rate.unwrap_or(0.0)),
            "forecast resolved"
        );
        debug!(reasoning = %record.forecast.reasoning.join(" | "), "resolved forecast reasoning");

        Some(record)
    }

    fn issue(&mut self, round_id: u64) -> Forecast {
        let forecast = if self.history.len() < self.config.min_history {
            placeholder(round_id)
        } else {
            let bundle = AnalysisBundle::compute(&self.history.multipliers());
            let synthesis = synthesize(&bundle.synthesis_inputs(), &mut self.rng);
            let forecast = Forecast {
                round_id,
                value: synthesis.value,
                class: synthesis.class,
                confidence: confidence_score(&bundle),
                reasoning: synthesis.reasoning,
                issued_at: Utc::now(),
            };
            self.analysis = Some(bundle);
            forecast
        };

        info!(
            round = forecast.round_id,
            value = %format!("{:.2}", forecast.value),
            class = %forecast.class,
            confidence = forecast.confidence,
            phase = self.analysis.as_ref().map(|a| a.intent.phase.as_str()).unwrap_or("warmup"),
            "forecast issued"
        );

        self.forecast = Some(forecast.clone());
        forecast
    }

    pub fn current_forecast(&self) -> Option<&Forecast> {
        self.forecast.as_ref()
    }

    /// Latest analysis bundle; None until enough rounds have been seen.
    pub fn analysis(&self) -> Option<&AnalysisBundle> {
        self.analysis.as_ref()
    }

    pub fn accuracy(&self) -> &AccuracyLog {
        &self.accuracy
    }

    pub fn history(&self) -> &OutcomeHistory {
        &self.history
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

fn placeholder(round_id: u64) -> Forecast {
    Forecast {
        round_id,
        value: PLACEHOLDER_VALUE,
        class: ForecastClass::Safe,
        confidence: PLACEHOLDER_CONFIDENCE,
        reasoning: vec![PLACEHOLDER_REASON.to_string()],
        issued_at: Utc::now(),
    }
}

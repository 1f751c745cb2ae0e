use crate::domain::{ForecastRecord, RawRound};
use crate::engine::{CycleOutcome, Engine};
use crate::error::{Error, Result};
use crate::evaluation::{summarize, AccuracySummary};
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;

/// Accuracy of an engine replayed over a recorded history.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayResult {
    pub rounds: usize,
    pub forecasts: usize,
    /// Over every resolved forecast, not only the bounded accuracy log
    pub summary: AccuracySummary,
    /// Forecasts issued per inferred phase ("warmup" for placeholders)
    pub phases: BTreeMap<String, usize>,
    pub mean_confidence: f64,
}

/// Feed `rounds` (ascending) through `engine` one round per cycle, the way
/// the live poller would see them. The first `warmup` rounds go in as a
/// single snapshot.
pub fn replay<R: Rng>(
    engine: &mut Engine<R>,
    rounds: &[RawRound],
    warmup: usize,
) -> Result<ReplayResult> {
    if rounds.is_empty() {
        return Err(Error::EmptySnapshot);
    }
    let warmup = warmup.clamp(1, rounds.len());

    let mut resolved: Vec<ForecastRecord> = Vec::new();
    let mut phases: BTreeMap<String, usize> = BTreeMap::new();
    let mut confidence_sum = 0.0;
    let mut forecasts = 0;

    let batches = std::iter::once(&rounds[..warmup]).chain(rounds[warmup..].chunks(1));
    for batch in batches {
        let CycleOutcome::Forecasted { forecast, resolved: record } = engine.ingest(batch)? else {
            continue;
        };
        resolved.extend(record);

        let phase = match engine.analysis() {
            Some(a) if engine.history().len() >= engine.config().min_history => {
                a.intent.phase.to_string()
            }
            _ => "warmup".to_string(),
        };
        *phases.entry(phase).or_insert(0) += 1;
        confidence_sum += forecast.confidence as f64;
        forecasts += 1;
    }

    Ok(ReplayResult {
        rounds: rounds.len(),
        forecasts,
        summary: summarize(resolved.iter()),
        phases,
        mean_confidence: if forecasts > 0 {
            confidence_sum / forecasts as f64
        } else {
            0.0
        },
    })
}

impl ReplayResult {
    pub fn print_summary(&self) {
        let s = &self.summary;
        println!("\n{}", "=".repeat(60));
        println!("  REPLAY RESULTS");
        println!("{}", "=".repeat(60));
        println!("  Rounds replayed:    {:>10}", self.rounds);
        println!("  Forecasts issued:   {:>10}", self.forecasts);
        println!("  Resolved:           {:>10}", s.total);
        println!("  Correct:            {:>10}", s.correct);
        println!("  Wrong:              {:>10}", s.wrong);
        println!("  Accuracy:           {:>9.1}%", s.accuracy_pct);
        println!("  Mean confidence:    {:>10.1}", self.mean_confidence);

        println!("\n  --- By Class ---");
        for (class, stats) in &s.by_class {
            println!(
                "  {:<8} {:>5}/{:<5} {:>6.1}%",
                class,
                stats.correct,
                stats.total,
                stats.accuracy_pct().unwrap_or(0.0)
            );
        }

        println!("\n  --- Forecasts By Phase ---");
        let mut phases: Vec<_> = self.phases.iter().collect();
        phases.sort_by(|a, b| b.1.cmp(a.1));
        for (phase, count) in phases {
            println!("  {:<14} {:>6}", phase, count);
        }
        println!("{}", "=".repeat(60));
    }
}

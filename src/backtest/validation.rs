use super::replay::{replay, ReplayResult};
use crate::domain::{EngineConfig, RawRound};
use crate::engine::Engine;
use crate::error::Result;
use serde::Serialize;
use statrs::statistics::Statistics;

/// Spread of replay accuracy across random seeds. Forecast values are drawn
/// at random, so a single replay says little on its own.
#[derive(Debug, Clone, Serialize)]
pub struct SeedSweep {
    pub seeds: Vec<u64>,
    pub accuracies: Vec<f64>,
    pub mean_accuracy: f64,
    pub std_accuracy: f64,
    pub min_accuracy: f64,
    pub max_accuracy: f64,
}

/// Replay the same history once per seed with a fresh engine each time.
pub fn seed_sweep(
    rounds: &[RawRound],
    config: &EngineConfig,
    seeds: &[u64],
    warmup: usize,
) -> Result<SeedSweep> {
    let results = seeds
        .iter()
        .map(|&seed| replay(&mut Engine::with_seed(config.clone(), seed), rounds, warmup))
        .collect::<Result<Vec<ReplayResult>>>()?;

    let accuracies: Vec<f64> = results.iter().map(|r| r.summary.accuracy_pct).collect();
    let (mean_accuracy, std_accuracy) = if accuracies.is_empty() {
        (0.0, 0.0)
    } else {
        (
            accuracies.iter().mean(),
            accuracies.iter().population_std_dev(),
        )
    };

    Ok(SeedSweep {
        seeds: seeds.to_vec(),
        min_accuracy: accuracies.iter().copied().fold(f64::INFINITY, f64::min),
        max_accuracy: accuracies.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        accuracies,
        mean_accuracy,
        std_accuracy,
    })
}

impl SeedSweep {
    pub fn print_summary(&self) {
        println!("\n  --- Seed Sweep ({} seeds) ---", self.seeds.len());
        for (seed, acc) in self.seeds.iter().zip(&self.accuracies) {
            println!("  seed {:>6}: {:>6.1}%", seed, acc);
        }
        println!(
            "  mean {:.1}% | std {:.2} | min {:.1}% | max {:.1}%",
            self.mean_accuracy, self.std_accuracy, self.min_accuracy, self.max_accuracy
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rounds(n: usize) -> Vec<RawRound> {
        (0..n)
            .map(|i| RawRound {
                round_id: i as u64,
                result: format!("{:.2}", 1.0 + ((i * 71 + 3) % 97) as f64 / 15.0),
                timestamp: String::new(),
            })
            .collect()
    }

    #[test]
    fn test_sweep_bounds() {
        let data = rounds(150);
        let sweep = seed_sweep(&data, &EngineConfig::default(), &[1, 2, 3, 4], 20).unwrap();
        assert_eq!(sweep.accuracies.len(), 4);
        assert!(sweep.min_accuracy <= sweep.mean_accuracy);
        assert!(sweep.mean_accuracy <= sweep.max_accuracy);
        assert!(sweep.std_accuracy >= 0.0);
        for acc in &sweep.accuracies {
            assert!((0.0..=100.0).contains(acc));
        }
    }

    #[test]
    fn test_repeated_seed_has_no_spread() {
        let data = rounds(80);
        let sweep = seed_sweep(&data, &EngineConfig::default(), &[9, 9, 9], 10).unwrap();
        assert!(sweep.std_accuracy.abs() < 1e-10);
        assert_eq!(sweep.min_accuracy, sweep.max_accuracy);
    }
}

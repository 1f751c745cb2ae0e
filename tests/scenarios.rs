use rand::rngs::mock::StepRng;
use roundsight::domain::indicators::{bollinger_bands, ema, rsi, std_dev, z_score};
use roundsight::domain::{EngineConfig, ForecastClass, RawRound};
use roundsight::engine::{AnalysisBundle, CycleOutcome, Engine, Phase};
use roundsight::evaluation::confidence_score;
use roundsight::strategy::{StreakPattern, TrapPattern, VolatilityRegime};

fn feed(start: u64, values: &[f64]) -> Vec<RawRound> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| RawRound {
            round_id: start + i as u64,
            result: format!("{:.2}", v),
            timestamp: "2024-06-01T12:00:00Z".to_string(),
        })
        .collect()
}

#[test]
fn test_short_series_fallbacks_are_finite() {
    for n in 0..20 {
        let data: Vec<f64> = (0..n).map(|i| 1.0 + i as f64 * 0.3).collect();
        assert!(ema(&data, 20).is_finite());
        assert!(rsi(&data, 14).is_finite());
        let b = bollinger_bands(&data, 20, 2.0);
        assert!(b.upper.is_finite() && b.middle.is_finite() && b.lower.is_finite());
    }
    assert_eq!(rsi(&[1.0, 2.0], 14), 50.0);
    assert_eq!(std_dev(&[3.0]), 0.0);
    assert_eq!(z_score(3.0, &[3.0]), 0.0);
    assert_eq!(z_score(5.0, &[2.0, 2.0, 2.0]), 0.0);
}

#[test]
fn test_all_low_streak() {
    let s = StreakPattern::detect(&[1.2, 1.1, 1.8, 1.3, 1.05]);
    assert_eq!(s.consecutive_low, 5);
}

#[test]
fn test_grind_trap_adds_twenty() {
    let data = vec![1.3; 20];
    let t = TrapPattern::detect(&data);
    assert!(t.grind);
    assert!(!t.post_spike_collapse && !t.fake_breakout && !t.exhaustion);
    assert_eq!(t.score, 20);
}

#[test]
fn test_single_point_feed_gives_placeholder() {
    let mut engine = Engine::with_seed(EngineConfig::default(), 1);
    let snapshot = vec![RawRound {
        round_id: 1,
        result: "2.50".to_string(),
        timestamp: "T".to_string(),
    }];
    engine.ingest(&snapshot).unwrap();
    let f = engine.current_forecast().unwrap();
    assert_eq!(f.value, 1.50);
    assert_eq!(f.class, ForecastClass::Safe);
    assert_eq!(f.confidence, 30);
}

#[test]
fn test_post_spike_forces_safe_forecast() {
    // upper-end draws
    let mut engine = Engine::with_rng(EngineConfig::default(), StepRng::new(u64::MAX, 0));
    let values = [1.6, 2.3, 1.9, 2.8, 1.7, 6.0, 1.2, 1.1, 1.3, 1.0];
    engine.ingest(&feed(1, &values)).unwrap();

    let a = engine.analysis().unwrap();
    assert!(a.traps.post_spike_collapse);
    assert!(a.traps.score >= 25);
    assert!(a.traps.score > 50, "fake breakout co-triggers here");

    let f = engine.current_forecast().unwrap();
    assert_eq!(f.class, ForecastClass::Safe);
    // distribution range tops out at 1.50; 1.50 * 0.7 falls under the floor
    assert_eq!(f.value, 1.10);
    assert_eq!(f.reasoning.len(), 2);
}

#[test]
fn test_duplicate_delivery_scores_once() {
    let mut engine = Engine::with_seed(EngineConfig::default(), 9);
    let base: Vec<f64> = (0..12).map(|i| 1.0 + (i % 4) as f64 * 0.8).collect();
    engine.ingest(&feed(100, &base)).unwrap();

    let mut next = base.clone();
    next.push(2.2);
    let first = engine.ingest(&feed(100, &next)).unwrap();
    assert!(matches!(first, CycleOutcome::Forecasted { resolved: Some(_), .. }));

    let mut shuffled = feed(100, &next);
    shuffled.reverse();
    assert_eq!(engine.ingest(&shuffled).unwrap(), CycleOutcome::Unchanged);
    assert_eq!(engine.accuracy().len(), 1);
}

#[test]
fn test_long_run_invariants() {
    let mut engine = Engine::with_seed(EngineConfig::default(), 2024);
    let values: Vec<f64> = (0..400u64)
        .map(|i| 1.0 + ((i * 2_654_435_761) % 1_000) as f64 / 90.0)
        .collect();

    for n in 1..=values.len() {
        // the feed only ever exposes its newest 60 rounds
        let start = n.saturating_sub(60);
        engine.ingest(&feed(start as u64, &values[start..n])).unwrap();
        assert!(engine.accuracy().len() <= 100);
    }

    assert_eq!(engine.accuracy().len(), 100);
    for r in engine.accuracy().iter() {
        assert_eq!(r.correct, r.actual >= r.forecast.value);
        assert!((10..=95).contains(&r.forecast.confidence));
    }
    let ids: Vec<u64> = engine.accuracy().iter().map(|r| r.forecast.round_id).collect();
    assert!(ids.windows(2).all(|w| w[1] == w[0] + 1));
    assert_eq!(*ids.last().unwrap(), 399);
}

#[test]
fn test_confidence_in_range_for_extremes() {
    let spikes: Vec<f64> = (0..60).map(|i| if i % 3 == 0 { 40.0 } else { 1.0 }).collect();
    let lows = vec![1.01; 60];
    for data in [spikes, lows] {
        let c = confidence_score(&AnalysisBundle::compute(&data));
        assert!((10..=95).contains(&c));
    }
}

#[test]
fn test_flat_history_has_no_dispersion() {
    let mut engine = Engine::with_seed(EngineConfig::default(), 5);
    engine.ingest(&feed(1, &[1.2; 60])).unwrap();

    let a = engine.analysis().unwrap();
    assert_eq!(a.indicators.z_score, 0.0);
    assert_eq!(a.volatility.regime, VolatilityRegime::Normal);
    assert_ne!(a.intent.phase, Phase::PreExplosion);
    let b = a.indicators.bollinger;
    assert_eq!(b.upper, b.lower);
}

#[test]
fn test_last_possible_round_id_is_rejected() {
    let mut engine = Engine::with_seed(EngineConfig::default(), 1);
    engine.ingest(&feed(10, &[2.0, 1.5])).unwrap();

    let err = engine.ingest(&feed(u64::MAX - 1, &[2.0, 3.0]));
    assert!(err.is_err());
    assert_eq!(engine.history().len(), 2);
    assert_eq!(engine.current_forecast().unwrap().round_id, 12);
}

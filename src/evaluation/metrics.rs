use crate::domain::{ForecastClass, ForecastRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Hits out of resolved forecasts for one slice of the log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassStats {
    pub total: usize,
    pub correct: usize,
}

impl ClassStats {
    fn add(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
    }

    /// Win rate in percent, None when nothing was resolved
    pub fn accuracy_pct(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.correct as f64 / self.total as f64 * 100.0)
        }
    }
}

/// Aggregate accuracy over a slice of the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracySummary {
    pub total: usize,
    pub correct: usize,
    pub wrong: usize,
    pub accuracy_pct: f64,
    pub by_class: BTreeMap<String, ClassStats>,
}

/// Bounded log of resolved forecasts, oldest first. Eviction is strictly FIFO.
#[derive(Debug, Clone)]
pub struct AccuracyLog {
    records: VecDeque<ForecastRecord>,
    capacity: usize,
}

impl AccuracyLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, record: ForecastRecord) {
        self.records.push_back(record);
        while self.records.len() > self.capacity {
            self.records.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ForecastRecord> {
        self.records.iter()
    }

    /// Newest first, at most `n` records.
    pub fn recent(&self, n: usize) -> Vec<ForecastRecord> {
        self.records.iter().rev().take(n).cloned().collect()
    }

    /// Hit rate in percent over the newest `window` records.
    pub fn rolling_accuracy(&self, window: usize) -> Option<f64> {
        let mut stats = ClassStats::default();
        for r in self.records.iter().rev().take(window) {
            stats.add(r.correct);
        }
        stats.accuracy_pct()
    }

    /// Per-class hit counts over every retained record. Every class is
    /// present, with zero counts when it was never forecast.
    pub fn class_breakdown(&self) -> BTreeMap<ForecastClass, ClassStats> {
        breakdown(self.records.iter())
    }

    /// Aggregate over the newest `n` records.
    pub fn summary(&self, n: usize) -> AccuracySummary {
        summarize(self.records.iter().rev().take(n))
    }
}

impl Default for AccuracyLog {
    fn default() -> Self {
        Self::new(100)
    }
}

fn breakdown<'a>(
    records: impl Iterator<Item = &'a ForecastRecord>,
) -> BTreeMap<ForecastClass, ClassStats> {
    let mut by_class: BTreeMap<ForecastClass, ClassStats> = ForecastClass::ALL
        .iter()
        .map(|c| (*c, ClassStats::default()))
        .collect();
    for r in records {
        by_class.entry(r.forecast.class).or_default().add(r.correct);
    }
    by_class
}

pub fn summarize<'a>(records: impl Iterator<Item = &'a ForecastRecord> + Clone) -> AccuracySummary {
    let mut overall = ClassStats::default();
    for r in records.clone() {
        overall.add(r.correct);
    }
    let by_class = breakdown(records)
        .into_iter()
        .map(|(class, stats)| (class.as_str().to_string(), stats))
        .collect();

    AccuracySummary {
        total: overall.total,
        correct: overall.correct,
        wrong: overall.total - overall.correct,
        accuracy_pct: overall.accuracy_pct().unwrap_or(0.0),
        by_class,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Forecast;
    use chrono::Utc;

    fn record(round_id: u64, class: ForecastClass, correct: bool) -> ForecastRecord {
        let forecast = Forecast {
            round_id,
            value: 2.0,
            class,
            confidence: 50,
            reasoning: vec![],
            issued_at: Utc::now(),
        };
        ForecastRecord::resolve(forecast, if correct { 2.5 } else { 1.2 })
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        let mut log = AccuracyLog::new(100);
        for i in 0..250 {
            log.push(record(i, ForecastClass::Safe, i % 2 == 0));
            assert!(log.len() <= 100);
        }
        assert_eq!(log.len(), 100);
    }

    #[test]
    fn test_eviction_is_fifo() {
        let mut log = AccuracyLog::new(3);
        for i in 1..=5 {
            log.push(record(i, ForecastClass::Safe, true));
        }
        let ids: Vec<u64> = log.iter().map(|r| r.forecast.round_id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn test_rolling_accuracy_uses_newest() {
        let mut log = AccuracyLog::new(100);
        for i in 0..10 {
            log.push(record(i, ForecastClass::Safe, false));
        }
        for i in 10..30 {
            log.push(record(i, ForecastClass::Safe, i % 4 != 0));
        }
        // last 20 = ids 10..30, misses at 12,16,20,24,28
        let acc = log.rolling_accuracy(20).unwrap();
        assert!((acc - 75.0).abs() < 1e-10);
    }

    #[test]
    fn test_rolling_accuracy_short_log() {
        let mut log = AccuracyLog::new(100);
        assert_eq!(log.rolling_accuracy(20), None);
        log.push(record(1, ForecastClass::High, true));
        log.push(record(2, ForecastClass::High, false));
        assert!((log.rolling_accuracy(20).unwrap() - 50.0).abs() < 1e-10);
    }

    #[test]
    fn test_class_breakdown() {
        let mut log = AccuracyLog::new(100);
        log.push(record(1, ForecastClass::Safe, true));
        log.push(record(2, ForecastClass::Safe, false));
        log.push(record(3, ForecastClass::High, true));
        let by_class = log.class_breakdown();
        assert_eq!(by_class[&ForecastClass::Safe], ClassStats { total: 2, correct: 1 });
        assert_eq!(by_class[&ForecastClass::High], ClassStats { total: 1, correct: 1 });
        assert_eq!(by_class[&ForecastClass::Medium], ClassStats::default());
        assert_eq!(by_class[&ForecastClass::Medium].accuracy_pct(), None);
    }

    #[test]
    fn test_summary_over_recent() {
        let mut log = AccuracyLog::new(100);
        for i in 0..40 {
            let class = if i < 10 { ForecastClass::High } else { ForecastClass::Medium };
            log.push(record(i, class, i >= 20));
        }
        let s = log.summary(30);
        assert_eq!(s.total, 30);
        assert_eq!(s.correct, 20);
        assert_eq!(s.wrong, 10);
        assert!((s.accuracy_pct - 200.0 / 3.0).abs() < 1e-10);
        assert_eq!(s.by_class["medium"].total, 30);
        assert_eq!(s.by_class["high"].total, 0);
    }

    #[test]
    fn test_empty_summary() {
        let s = AccuracyLog::default().summary(30);
        assert_eq!(s.total, 0);
        assert_eq!(s.accuracy_pct, 0.0);
        assert_eq!(s.by_class.len(), 3);
    }

    #[test]
    fn test_recent_is_newest_first() {
        let mut log = AccuracyLog::new(10);
        for i in 1..=4 {
            log.push(record(i, ForecastClass::Safe, true));
        }
        let ids: Vec<u64> = log.recent(2).iter().map(|r| r.forecast.round_id).collect();
        assert_eq!(ids, vec![4, 3]);
    }
}

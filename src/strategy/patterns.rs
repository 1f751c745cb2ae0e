use crate::domain::indicators::{mean, tail};
use serde::{Deserialize, Serialize};

/// Trap point values, added per detected pattern.
pub const POST_SPIKE_POINTS: u32 = 25;
pub const GRIND_POINTS: u32 = 20;
pub const TEASE_POINTS: u32 = 30;
pub const FAKE_BREAKOUT_POINTS: u32 = 35;
pub const EXHAUSTION_POINTS: u32 = 25;

/// Run lengths measured backward from the latest round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakPattern {
    /// Consecutive rounds < 2.0
    pub consecutive_low: usize,
    /// Consecutive rounds < 1.5
    pub consecutive_very_low: usize,
    /// Consecutive rounds >= 3.0
    pub consecutive_high: usize,
    /// Consecutive rounds in [2.0, 5.0)
    pub consecutive_medium: usize,
    /// Rounds since the last value >= 5
    pub rounds_since_high: usize,
    /// Rounds since the last value >= 3
    pub rounds_since_medium: usize,
    /// Rounds since the last value >= 10
    pub rounds_since_very_high: usize,
}

impl StreakPattern {
    pub fn detect(multipliers: &[f64]) -> Self {
        Self {
            consecutive_low: run_length(multipliers, |m| m < 2.0),
            consecutive_very_low: run_length(multipliers, |m| m < 1.5),
            consecutive_high: run_length(multipliers, |m| m >= 3.0),
            consecutive_medium: run_length(multipliers, |m| (2.0..5.0).contains(&m)),
            rounds_since_high: run_length(multipliers, |m| m < 5.0),
            rounds_since_medium: run_length(multipliers, |m| m < 3.0),
            rounds_since_very_high: run_length(multipliers, |m| m < 10.0),
        }
    }
}

/// Number of trailing samples satisfying `pred`, stopping at the first miss.
fn run_length(data: &[f64], pred: impl Fn(f64) -> bool) -> usize {
    data.iter().rev().take_while(|&&m| pred(m)).count()
}

/// Heuristic manipulation patterns over the recent rounds.
/// Patterns are independent; several may fire together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrapPattern {
    /// A value >= 5 in the last 5 followed by rounds averaging < 1.8
    pub post_spike_collapse: bool,
    /// At least 15 of the last 20 below 2.0
    pub grind: bool,
    /// Exact high/low alternation over the last 5
    pub tease: bool,
    /// Spike above twice the 10-round mean, then two rounds below that mean
    pub fake_breakout: bool,
    /// 7+ rises among the last 10 rounds, ending at >= 3
    pub exhaustion: bool,
    pub score: u32,
}

impl TrapPattern {
    pub fn detect(multipliers: &[f64]) -> Self {
        let last5 = tail(multipliers, 5);
        let last10 = tail(multipliers, 10);
        let last20 = tail(multipliers, 20);
        let mut traps = TrapPattern::default();

        if let Some(spike) = last5.iter().position(|&m| m >= 5.0) {
            if spike + 1 < last5.len() && mean(&last5[spike + 1..]) < 1.8 {
                traps.post_spike_collapse = true;
                traps.score += POST_SPIKE_POINTS;
            }
        }

        if last20.iter().filter(|&&m| m < 2.0).count() >= 15 {
            traps.grind = true;
            traps.score += GRIND_POINTS;
        }

        let shape: String = last5
            .iter()
            .map(|&m| if m >= 2.5 { 'H' } else { 'L' })
            .collect();
        if shape == "LHLHL" || shape == "HLHLH" {
            traps.tease = true;
            traps.score += TEASE_POINTS;
        }

        let avg10 = mean(last10);
        let has_spike = last5.iter().any(|&m| m > avg10 * 2.0);
        let faded = tail(last5, 2).iter().all(|&m| m < avg10);
        if has_spike && faded {
            traps.fake_breakout = true;
            traps.score += FAKE_BREAKOUT_POINTS;
        }

        let rises = last10.windows(2).filter(|w| w[1] > w[0]).count();
        if rises >= 7 && last10.last().is_some_and(|&m| m >= 3.0) {
            traps.exhaustion = true;
            traps.score += EXHAUSTION_POINTS;
        }

        traps
    }

    pub fn any(&self) -> bool {
        self.post_spike_collapse || self.grind || self.tease || self.fake_breakout || self.exhaustion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streak_all_low() {
        let s = StreakPattern::detect(&[1.2, 1.1, 1.8, 1.3, 1.05]);
        assert_eq!(s.consecutive_low, 5);
        assert_eq!(s.consecutive_very_low, 2); // 1.3, 1.05
        assert_eq!(s.consecutive_high, 0);
        assert_eq!(s.consecutive_medium, 0);
        assert_eq!(s.rounds_since_high, 5);
        assert_eq!(s.rounds_since_medium, 5);
        assert_eq!(s.rounds_since_very_high, 5);
    }

    #[test]
    fn test_streak_stops_at_first_break() {
        let s = StreakPattern::detect(&[1.1, 6.0, 1.4, 1.2, 3.5, 4.0]);
        assert_eq!(s.consecutive_high, 2);
        assert_eq!(s.consecutive_medium, 2);
        assert_eq!(s.consecutive_low, 0);
        assert_eq!(s.rounds_since_high, 4);
        assert_eq!(s.rounds_since_medium, 0);
        assert_eq!(s.rounds_since_very_high, 6);
    }

    #[test]
    fn test_streak_medium_excludes_five() {
        let s = StreakPattern::detect(&[2.0, 5.0]);
        assert_eq!(s.consecutive_medium, 0);
        assert_eq!(s.consecutive_high, 1);
        assert_eq!(s.rounds_since_high, 0);
    }

    #[test]
    fn test_streak_empty() {
        assert_eq!(StreakPattern::detect(&[]), StreakPattern::default());
    }

    #[test]
    fn test_post_spike_collapse_and_fake_breakout() {
        let t = TrapPattern::detect(&[6.0, 1.2, 1.1, 1.3, 1.0]);
        assert!(t.post_spike_collapse);
        assert!(t.fake_breakout);
        assert!(!t.grind);
        assert_eq!(t.score, POST_SPIKE_POINTS + FAKE_BREAKOUT_POINTS);
    }

    #[test]
    fn test_post_spike_needs_followers() {
        // spike is the latest round: nothing after it yet
        let t = TrapPattern::detect(&[1.2, 1.1, 1.3, 1.0, 6.0]);
        assert!(!t.post_spike_collapse);
    }

    #[test]
    fn test_post_spike_uses_first_spike() {
        // first spike at index 0; followers 1.0, 1.0, 1.0, 5.5 average 2.125
        let t = TrapPattern::detect(&[5.0, 1.0, 1.0, 1.0, 5.5]);
        assert!(!t.post_spike_collapse);
    }

    #[test]
    fn test_grind_trap() {
        let mut data = vec![1.3; 15];
        data.extend_from_slice(&[2.5, 3.0, 2.2, 2.1, 2.4]);
        let t = TrapPattern::detect(&data);
        assert!(t.grind);
        assert_eq!(t.score, GRIND_POINTS);

        data.push(2.6); // pushes one low out of the 20 window
        assert!(!TrapPattern::detect(&data).grind);
    }

    #[test]
    fn test_tease_trap() {
        let t = TrapPattern::detect(&[1.2, 3.0, 1.1, 2.5, 1.4]);
        assert!(t.tease);
        let t = TrapPattern::detect(&[3.0, 1.1, 2.6, 1.4, 2.9]);
        assert!(t.tease);
        let t = TrapPattern::detect(&[1.2, 3.0, 1.1, 2.5, 2.6]);
        assert!(!t.tease);
    }

    #[test]
    fn test_tease_requires_five_rounds() {
        assert!(!TrapPattern::detect(&[3.0, 1.1, 2.6, 1.4]).tease);
    }

    #[test]
    fn test_exhaustion_trap() {
        let data = [1.0, 1.1, 1.2, 1.3, 1.5, 1.7, 2.0, 2.4, 2.8, 3.2];
        let t = TrapPattern::detect(&data);
        assert!(t.exhaustion);
        assert!(!t.fake_breakout);

        let short_top = [1.0, 1.1, 1.2, 1.3, 1.5, 1.7, 2.0, 2.4, 2.6, 2.9];
        assert!(!TrapPattern::detect(&short_top).exhaustion);
    }

    #[test]
    fn test_quiet_series_has_no_traps() {
        let data: Vec<f64> = (0..30).map(|i| if i % 3 == 0 { 2.4 } else { 2.1 }).collect();
        let t = TrapPattern::detect(&data);
        assert!(!t.any());
        assert_eq!(t.score, 0);
    }

    #[test]
    fn test_empty_series() {
        assert_eq!(TrapPattern::detect(&[]), TrapPattern::default());
    }
}

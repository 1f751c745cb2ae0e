use super::intent::Phase;
use crate::domain::ForecastClass;
use crate::domain::ForecastClass::{High, Medium, Safe};
use crate::strategy::StreakPattern;
use rand::Rng;

/// Trap score above which every forecast is scaled down and forced safe.
pub const TRAP_OVERRIDE_SCORE: u32 = 50;
pub const TRAP_SCALE: f64 = 0.7;
pub const MIN_FORECAST: f64 = 1.10;

/// A uniform range `[low, low + span)` and the class it stands for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Draw {
    pub low: f64,
    pub span: f64,
    pub class: ForecastClass,
    pub reason: &'static str,
}

impl Draw {
    pub fn high(&self) -> f64 {
        self.low + self.span
    }
}

/// Everything the decision tree branches on.
#[derive(Debug, Clone)]
pub struct SynthesisInputs<'a> {
    pub phase: Phase,
    pub expected_peak_soon: bool,
    pub rsi: f64,
    pub volatility_ratio: f64,
    pub deviation_20: f64,
    pub trap_score: u32,
    pub streak: &'a StreakPattern,
    pub last: f64,
}

pub struct SynthesisRule {
    pub applies: fn(&SynthesisInputs) -> bool,
    pub draw: Draw,
}

const fn draw(low: f64, span: f64, class: ForecastClass, reason: &'static str) -> Draw {
    Draw {
        low,
        span,
        class,
        reason,
    }
}

pub const ACCUMULATION_RULES: &[SynthesisRule] = &[
    SynthesisRule {
        applies: |i| {
            i.streak.consecutive_very_low >= 4 || (i.streak.consecutive_low >= 5 && i.rsi < 20.0)
        },
        draw: draw(7.0, 5.0, High, "Long low streak, very low RSI and a peak due in the cycle"),
    },
    SynthesisRule {
        applies: |i| i.streak.consecutive_very_low >= 3 || i.streak.consecutive_low >= 4,
        draw: draw(5.0, 4.0, High, "Accumulation nearly complete, breakout pressure high"),
    },
    SynthesisRule {
        applies: |_| true,
        draw: draw(3.5, 2.5, Medium, "Accumulation under way"),
    },
];

pub const PRE_EXPLOSION_RULES: &[SynthesisRule] = &[
    SynthesisRule {
        applies: |i| i.volatility_ratio < 0.5 && i.streak.rounds_since_high >= 10,
        draw: draw(6.0, 5.0, High, "Very low volatility and a long wait since the last big round"),
    },
    SynthesisRule {
        applies: |_| true,
        draw: draw(4.0, 3.0, High, "Unusually low volatility ahead of a move"),
    },
];

/// Shared by the distribution and exhaustion phases.
pub const DISTRIBUTION_RULES: &[SynthesisRule] = &[
    SynthesisRule {
        applies: |i| i.last >= 5.0,
        draw: draw(1.10, 0.15, Safe, "Big round just paid out during distribution"),
    },
    SynthesisRule {
        applies: |i| i.last >= 3.0,
        draw: draw(1.20, 0.15, Safe, "Medium round just paid out during distribution"),
    },
    SynthesisRule {
        applies: |_| true,
        draw: draw(1.35, 0.15, Safe, "Distribution or exhaustion phase"),
    },
];

pub const MANIPULATION_RULES: &[SynthesisRule] = &[SynthesisRule {
    applies: |_| true,
    draw: draw(1.50, 0.30, Safe, "Manipulated sequence: stay safe"),
}];

pub const REVERSION_RULES: &[SynthesisRule] = &[
    SynthesisRule {
        applies: |i| i.deviation_20 < -0.4,
        draw: draw(4.0, 3.0, High, "Deep below the mean with strong reversion pressure"),
    },
    SynthesisRule {
        applies: |i| i.deviation_20 < -0.25,
        draw: draw(2.5, 2.0, Medium, "Reverting toward the mean"),
    },
    SynthesisRule {
        applies: |_| true,
        draw: draw(1.80, 0.40, Safe, "Mild reversion toward the mean"),
    },
];

const NORMAL_DRAW: Draw = draw(1.40, 0.20, Safe, "Normal conditions");

pub const DEFAULT_RULES: &[SynthesisRule] = &[
    SynthesisRule {
        applies: |i| i.streak.consecutive_very_low >= 3,
        draw: draw(5.0, 4.0, High, "Extended very low streak"),
    },
    SynthesisRule {
        applies: |i| i.streak.consecutive_low >= 4,
        draw: draw(4.0, 3.0, High, "Extended low streak"),
    },
    SynthesisRule {
        applies: |i| i.streak.rounds_since_high >= 8 && i.rsi < 35.0,
        draw: draw(4.5, 3.5, High, "Long wait since a big round and low RSI"),
    },
    SynthesisRule {
        applies: |i| i.streak.rounds_since_medium >= 5 && i.rsi < 40.0,
        draw: draw(3.0, 2.0, Medium, "Long wait since a medium round and soft RSI"),
    },
    SynthesisRule {
        applies: |i| i.rsi < 30.0 && i.deviation_20 < -0.2,
        draw: draw(2.5, 1.5, Medium, "Low RSI and below the mean"),
    },
    SynthesisRule {
        applies: |i| i.streak.consecutive_high >= 2,
        draw: draw(1.15, 0.10, Safe, "Consecutive high rounds: correction due"),
    },
    SynthesisRule {
        applies: |i| i.rsi > 70.0,
        draw: draw(1.25, 0.15, Safe, "RSI overbought"),
    },
    SynthesisRule {
        applies: |i| i.last >= 5.0,
        draw: draw(1.15, 0.15, Safe, "Big round just paid out: sharp drop expected"),
    },
    SynthesisRule {
        applies: |i| i.last >= 3.0,
        draw: draw(1.30, 0.20, Safe, "Medium round just paid out: correction expected"),
    },
    SynthesisRule {
        applies: |_| true,
        draw: NORMAL_DRAW,
    },
];

/// Rule table for the inferred phase. Accumulation only has its own table
/// while a cycle peak is expected; otherwise it falls back to the default.
pub fn rules_for(inputs: &SynthesisInputs) -> &'static [SynthesisRule] {
    match inputs.phase {
        Phase::Accumulation if inputs.expected_peak_soon => ACCUMULATION_RULES,
        Phase::PreExplosion => PRE_EXPLOSION_RULES,
        Phase::Distribution | Phase::Exhaustion => DISTRIBUTION_RULES,
        Phase::Manipulation => MANIPULATION_RULES,
        Phase::Reversion => REVERSION_RULES,
        _ => DEFAULT_RULES,
    }
}

/// First rule in the phase table whose predicate holds.
pub fn select_draw(inputs: &SynthesisInputs) -> &'static Draw {
    rules_for(inputs)
        .iter()
        .find(|rule| (rule.applies)(inputs))
        .map(|rule| &rule.draw)
        .unwrap_or(&NORMAL_DRAW)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    /// Rounded to 2 decimals
    pub value: f64,
    pub class: ForecastClass,
    pub reasoning: Vec<String>,
    /// Value drawn from the range, before the trap override and rounding
    pub raw_value: f64,
}

pub fn synthesize<R: Rng + ?Sized>(inputs: &SynthesisInputs, rng: &mut R) -> Synthesis {
    let chosen = select_draw(inputs);
    let raw_value = chosen.low + rng.gen::<f64>() * chosen.span;
    let mut value = raw_value;
    let mut class = chosen.class;
    let mut reasoning = vec![chosen.reason.to_string()];

    if inputs.trap_score > TRAP_OVERRIDE_SCORE {
        value = (value * TRAP_SCALE).max(MIN_FORECAST);
        class = ForecastClass::Safe;
        reasoning.push(format!(
            "Trap score {} above {}: scaled down and kept safe",
            inputs.trap_score, TRAP_OVERRIDE_SCORE
        ));
    }

    Synthesis {
        value: round2(value),
        class,
        reasoning,
        raw_value,
    }
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

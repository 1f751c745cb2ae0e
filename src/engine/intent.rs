use crate::strategy::{CyclePosition, MeanReversion, TrapPattern, VolatilityRegime, VolatilityState};
use serde::{Deserialize, Serialize};

/// Inferred market state driving forecast synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Neutral,
    Accumulation,
    Distribution,
    PreExplosion,
    Reversion,
    Manipulation,
    Exhaustion,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Neutral => "neutral",
            Phase::Accumulation => "accumulation",
            Phase::Distribution => "distribution",
            Phase::PreExplosion => "pre_explosion",
            Phase::Reversion => "reversion",
            Phase::Manipulation => "manipulation",
            Phase::Exhaustion => "exhaustion",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedAction {
    Normal,
    PreparingBreakout,
    TrappingPlayers,
    MajorMoveIncoming,
    MeanReversion,
    ConfusingPlayers,
    TrendReversal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub phase: Phase,
    pub expected_action: ExpectedAction,
    pub confidence: u8,
    pub risk_level: RiskLevel,
    pub signals: Vec<String>,
}

impl Default for Intent {
    fn default() -> Self {
        Self {
            phase: Phase::Neutral,
            expected_action: ExpectedAction::Normal,
            confidence: 50,
            risk_level: RiskLevel::Medium,
            signals: Vec::new(),
        }
    }
}

/// Detector outputs the intent rules read.
pub struct IntentInputs<'a> {
    pub traps: &'a TrapPattern,
    pub cycle: &'a CyclePosition,
    pub volatility: &'a VolatilityState,
    pub mean_reversion: &'a MeanReversion,
}

struct IntentRule {
    applies: fn(&IntentInputs) -> bool,
    phase: Phase,
    action: ExpectedAction,
    confidence: u8,
    /// None leaves the previous risk level in place
    risk: Option<RiskLevel>,
    signal: &'static str,
}

/// Evaluated top to bottom. Every matching rule overwrites the previous
/// match and adds its signal, so the last match decides the phase.
const RULES: &[IntentRule] = &[
    IntentRule {
        applies: |i| i.traps.grind && i.cycle.cycle_progress > 0.6,
        phase: Phase::Accumulation,
        action: ExpectedAction::PreparingBreakout,
        confidence: 70,
        risk: None,
        signal: "Grinding low rounds late in the cycle: accumulation before a breakout",
    },
    IntentRule {
        applies: |i| i.traps.post_spike_collapse || i.traps.fake_breakout,
        phase: Phase::Distribution,
        action: ExpectedAction::TrappingPlayers,
        confidence: 75,
        risk: Some(RiskLevel::High),
        signal: "Spike followed by collapse: distribution phase",
    },
    IntentRule {
        applies: |i| {
            i.volatility.regime == VolatilityRegime::LowVolatility
                && i.cycle.position_in_cycle as f64 > i.cycle.avg_cycle_length as f64 * 0.8
        },
        phase: Phase::PreExplosion,
        action: ExpectedAction::MajorMoveIncoming,
        confidence: 65,
        risk: None,
        signal: "Unusually low volatility deep into the cycle: large move likely",
    },
    IntentRule {
        applies: |i| i.mean_reversion.reversion_pressure > 60.0,
        phase: Phase::Reversion,
        action: ExpectedAction::MeanReversion,
        confidence: 60,
        risk: None,
        signal: "Strong pressure to revert to the mean",
    },
    IntentRule {
        applies: |i| i.traps.tease,
        phase: Phase::Manipulation,
        action: ExpectedAction::ConfusingPlayers,
        confidence: 70,
        risk: Some(RiskLevel::High),
        signal: "High/low alternation: noise being injected",
    },
    IntentRule {
        applies: |i| i.traps.exhaustion,
        phase: Phase::Exhaustion,
        action: ExpectedAction::TrendReversal,
        confidence: 65,
        risk: None,
        signal: "Rising run is exhausted: reversal likely",
    },
];

pub fn infer_intent(inputs: &IntentInputs) -> Intent {
    let mut intent = Intent::default();
    for rule in RULES {
        if !(rule.applies)(inputs) {
            continue;
        }
        intent.phase = rule.phase;
        intent.expected_action = rule.action;
        intent.confidence = rule.confidence;
        if let Some(risk) = rule.risk {
            intent.risk_level = risk;
        }
        intent.signals.push(rule.signal.to_string());
    }
    intent
}

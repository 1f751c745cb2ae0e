use super::types::{Outcome, RawRound};
use crate::error::{Error, Result};

/// Parse a feed snapshot and put it in ascending round order.
/// All-or-nothing: one unparseable record rejects the whole snapshot.
/// Duplicate round ids keep their first occurrence.
pub fn normalize_snapshot(snapshot: &[RawRound]) -> Result<Vec<Outcome>> {
    if snapshot.is_empty() {
        return Err(Error::EmptySnapshot);
    }
    let mut outcomes = snapshot
        .iter()
        .map(Outcome::from_raw)
        .collect::<Result<Vec<_>>>()?;
    // stable sort keeps feed order among equal ids, so dedup keeps the first
    outcomes.sort_by_key(|o| o.round_id);
    outcomes.dedup_by_key(|o| o.round_id);
    Ok(outcomes)
}

/// Append-only outcome history in ascending round order.
#[derive(Debug, Clone, Default)]
pub struct OutcomeHistory {
    outcomes: Vec<Outcome>,
    /// 0 = unbounded
    cap: usize,
}

impl OutcomeHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            outcomes: Vec::new(),
            cap,
        }
    }

    /// Append every outcome newer than the latest retained round.
    /// Returns how many were appended. Older or repeated rounds are ignored:
    /// past entries are never rewritten.
    pub fn extend(&mut self, normalized: Vec<Outcome>) -> usize {
        let last_id = self.latest().map(|o| o.round_id);
        let before = self.outcomes.len();
        self.outcomes.extend(
            normalized
                .into_iter()
                .filter(|o| last_id.map_or(true, |id| o.round_id > id)),
        );
        let appended = self.outcomes.len() - before;

        if self.cap > 0 && self.outcomes.len() > self.cap {
            let excess = self.outcomes.len() - self.cap;
            self.outcomes.drain(0..excess);
        }
        appended
    }

    pub fn latest(&self) -> Option<&Outcome> {
        self.outcomes.last()
    }

    pub fn get(&self, round_id: u64) -> Option<&Outcome> {
        self.outcomes
            .binary_search_by_key(&round_id, |o| o.round_id)
            .ok()
            .map(|i| &self.outcomes[i])
    }

    pub fn multipliers(&self) -> Vec<f64> {
        self.outcomes.iter().map(|o| o.multiplier).collect()
    }

    /// Newest-first slice of at most `limit` outcomes.
    pub fn recent(&self, limit: usize) -> Vec<Outcome> {
        self.outcomes.iter().rev().take(limit).cloned().collect()
    }

    pub fn as_slice(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

use crate::domain::{Outcome, RawRound};
use crate::error::{Error, Result};
use std::path::Path;

/// Save outcomes to a CSV cache, ascending round order.
pub fn save_outcomes_csv(outcomes: &[Outcome], path: impl AsRef<Path>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["round_id", "multiplier", "observed_at"])?;
    for o in outcomes {
        writer.write_record([
            o.round_id.to_string(),
            o.multiplier.to_string(),
            o.observed_at.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Load a CSV cache back as raw feed records, so replay goes through the
/// same normalization as live snapshots.
pub fn load_rounds_csv(path: impl AsRef<Path>) -> Result<Vec<RawRound>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("cache file not found: {}", path.display()),
        )));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut rounds = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result?;
        let round_id = record
            .get(0)
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| Error::malformed(format!("cache row {}: bad round id", line + 1)))?;
        rounds.push(RawRound {
            round_id,
            result: record.get(1).unwrap_or_default().to_string(),
            timestamp: record.get(2).unwrap_or_default().to_string(),
        });
    }

    // Verify round ordering
    if rounds.windows(2).any(|w| w[1].round_id <= w[0].round_id) {
        return Err(Error::malformed("cache file has non-increasing round ids"));
    }

    Ok(rounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::normalize_snapshot;

    fn outcome(round_id: u64, multiplier: f64) -> Outcome {
        Outcome {
            round_id,
            multiplier,
            observed_at: format!("2024-05-01 10:{:02}", round_id % 60),
        }
    }

    #[test]
    fn test_cache_roundtrip_through_normalization() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rounds.csv");
        let outcomes = vec![outcome(1, 1.35), outcome(2, 12.8), outcome(3, 1.0)];
        save_outcomes_csv(&outcomes, &path).unwrap();

        let rounds = load_rounds_csv(&path).unwrap();
        assert_eq!(rounds.len(), 3);
        assert_eq!(normalize_snapshot(&rounds).unwrap(), outcomes);
    }

    #[test]
    fn test_missing_cache_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_rounds_csv(dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_non_increasing_ids_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rounds.csv");
        save_outcomes_csv(&[outcome(5, 1.2), outcome(4, 2.0)], &path).unwrap();
        assert!(matches!(load_rounds_csv(&path), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_bad_round_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rounds.csv");
        std::fs::write(&path, "round_id,multiplier,observed_at\nabc,1.2,t\n").unwrap();
        assert!(matches!(load_rounds_csv(&path), Err(Error::Malformed(_))));
    }
}

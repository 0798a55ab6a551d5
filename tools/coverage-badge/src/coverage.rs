//! Previous and current statement coverage.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::artifact::ArtifactStore;
use crate::config::Config;
use crate::error::{ActionError, Result};
use crate::summary::CoverageSummary;

/// Outcome of looking up the previous run's coverage.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviousCoverage {
  Found(f64),
  /// No usable prior artifact; carries the reason for the log.
  Absent(String),
}

impl PreviousCoverage {
  /// The value to compare against: the stored percentage, or 0 without one.
  pub fn baseline(&self) -> f64 {
    match self {
      Self::Found(pct) => *pct,
      Self::Absent(_) => 0.0,
    }
  }
}

/// Best effort: every failure (not found, transport, bad archive, bad JSON)
/// becomes `Absent`.
pub async fn fetch_previous(store: &dyn ArtifactStore, config: &Config) -> PreviousCoverage {
  match try_fetch_previous(store, config).await {
    Ok(pct) => PreviousCoverage::Found(pct),
    Err(e) => {
      info!("{}", e);
      PreviousCoverage::Absent(e.to_string())
    }
  }
}

async fn try_fetch_previous(store: &dyn ArtifactStore, config: &Config) -> Result<f64> {
  let path = store
    .download(&config.artifact_name, &config.artifact_download_path)
    .await?;
  let bytes = fs::read(&path).map_err(|e| ActionError::io(&path, e))?;
  let summary = CoverageSummary::from_slice(&bytes)?;
  debug!("previous totals: {}", summary);
  summary.statements_pct()
}

/// Read the summary produced earlier in this job. Any failure is fatal.
pub fn read_current(path: &Path) -> Result<f64> {
  let bytes = fs::read(path).map_err(|e| ActionError::io(path, e))?;
  let summary = CoverageSummary::from_slice(&bytes)?;
  let pct = summary.statements_pct()?;
  info!("Found a valid coverage summary!");
  debug!("current totals: {}", summary);
  Ok(pct)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn baseline_defaults_to_zero() {
    assert_eq!(PreviousCoverage::Found(72.5).baseline(), 72.5);
    assert_eq!(PreviousCoverage::Absent("artifact x not found".into()).baseline(), 0.0);
  }

  #[test]
  fn current_reads_statements() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("coverage-summary.json");
    fs::write(&path, r#"{"total":{"statements":{"total":10,"covered":9,"skipped":0,"pct":90}}}"#).unwrap();
    assert_eq!(read_current(&path).unwrap(), 90.0);
  }

  #[test]
  fn current_missing_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.json");
    let err = read_current(&path).unwrap_err();
    assert!(matches!(err, ActionError::Io { .. }));
    assert!(err.to_string().contains("nope.json"), "{}", err);
  }
}

//! Istanbul `coverage-summary.json` model.
//!
//! Only `total.statements.pct` is required. Per-file entries and any other
//! keys are ignored.

use std::fmt;

use serde::Deserialize;

use crate::error::{ActionError, Result};

/// Field path of the percentage the badge compares.
pub const STATEMENTS_PCT: &str = "total.statements.pct";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoverageSummary {
  #[serde(default)]
  pub total: Option<Totals>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Totals {
  #[serde(default)]
  pub lines: Option<Metric>,
  #[serde(default)]
  pub statements: Option<Metric>,
  #[serde(default)]
  pub functions: Option<Metric>,
  #[serde(default)]
  pub branches: Option<Metric>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metric {
  #[serde(default)]
  pub total: u64,
  #[serde(default)]
  pub covered: u64,
  #[serde(default)]
  pub skipped: u64,
  #[serde(default)]
  pub pct: Option<Pct>,
}

/// Istanbul writes `"Unknown"` instead of a number when a metric has no items.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Pct {
  Value(f64),
  Label(String),
}

impl Pct {
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Self::Value(v) => Some(*v),
      Self::Label(l) if l.eq_ignore_ascii_case("unknown") => Some(0.0),
      Self::Label(_) => None,
    }
  }
}

impl Metric {
  pub fn pct(&self) -> Option<f64> {
    self.pct.as_ref().and_then(Pct::as_f64)
  }
}

impl CoverageSummary {
  pub fn from_slice(bytes: &[u8]) -> Result<Self> {
    Ok(serde_json::from_slice(bytes)?)
  }

  /// `total.statements.pct`, the number the badge is built from.
  pub fn statements_pct(&self) -> Result<f64> {
    self
      .total
      .as_ref()
      .and_then(|t| t.statements.as_ref())
      .and_then(Metric::pct)
      .ok_or(ActionError::MissingField(STATEMENTS_PCT))
  }
}

impl fmt::Display for CoverageSummary {
  /// One-line digest of the available totals, e.g. `lines 81.2%, statements 80%`.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let Some(total) = &self.total else {
      return write!(f, "no totals");
    };
    let metrics = [
      ("lines", &total.lines),
      ("statements", &total.statements),
      ("functions", &total.functions),
      ("branches", &total.branches),
    ];
    let parts: Vec<String> = metrics
      .into_iter()
      .filter_map(|(name, metric)| {
        let m = metric.as_ref()?;
        Some(format!("{} {}% ({}/{})", name, m.pct()?, m.covered, m.total))
      })
      .collect();
    if parts.is_empty() {
      write!(f, "no totals")
    } else {
      write!(f, "{}", parts.join(", "))
    }
  }
}

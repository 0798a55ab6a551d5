//! Step configuration, read once from the action inputs.

use std::path::PathBuf;

use crate::error::{ActionError, Result};

pub const DEFAULT_COVERAGE_SUMMARY_PATH: &str = "coverage/coverage-summary.json";
pub const DEFAULT_ARTIFACT_NAME: &str = "coverage-summary-artifact";
/// Staging root for downloaded artifacts, relative to the workspace.
pub const ARTIFACT_STAGING_DIR: &str = ".github-artifacts";

#[derive(Debug, Clone)]
pub struct Config {
  /// Token used for the REST API (comments, artifact listing/download).
  pub repo_token: String,
  /// Istanbul summary produced earlier in the job.
  pub coverage_summary_path: PathBuf,
  /// Name the summary is persisted under across runs.
  pub artifact_name: String,
  /// Where the previous artifact is unpacked.
  pub artifact_download_path: PathBuf,
}

impl Config {
  pub fn new(repo_token: impl Into<String>) -> Self {
    Self::with_artifact_name(repo_token, DEFAULT_ARTIFACT_NAME)
  }

  pub fn with_artifact_name(repo_token: impl Into<String>, artifact_name: impl Into<String>) -> Self {
    let artifact_name = artifact_name.into();
    Self {
      repo_token: repo_token.into(),
      coverage_summary_path: PathBuf::from(DEFAULT_COVERAGE_SUMMARY_PATH),
      artifact_download_path: PathBuf::from(ARTIFACT_STAGING_DIR).join(&artifact_name),
      artifact_name,
    }
  }

  /// Build from an input lookup keyed by input name (`repo-token`, ...).
  ///
  /// Empty values count as unset, so the defaults apply.
  pub fn from_lookup<F>(lookup: F) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let input = |name: &str| {
      lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
    };

    let repo_token = input("repo-token").ok_or_else(|| ActionError::MissingInput("repo-token".into()))?;
    let artifact_name = input("artifact-name").unwrap_or_else(|| DEFAULT_ARTIFACT_NAME.to_string());

    let mut config = Self::with_artifact_name(repo_token, artifact_name);
    if let Some(path) = input("coverage-summary-path") {
      config.coverage_summary_path = PathBuf::from(path);
    }
    Ok(config)
  }

  /// Read inputs the way the Actions runner exposes them (`INPUT_REPO-TOKEN`, ...).
  pub fn from_env() -> Result<Self> {
    Self::from_lookup(|name| std::env::var(input_env_name(name)).ok())
  }
}

/// `repo-token` -> `INPUT_REPO-TOKEN`. Spaces become underscores; hyphens stay.
pub fn input_env_name(name: &str) -> String {
  format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
}

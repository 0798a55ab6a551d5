//! Run context: which repository, pull request and base branch this run belongs to.
//!
//! Sourced once at process entry and passed down explicitly.

use std::path::Path;

use serde::Deserialize;

use crate::error::{ActionError, Result};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
/// Base branch label when neither the payload nor the environment names one.
pub const UNKNOWN_BASE_REF: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repo {
  pub owner: String,
  pub name: String,
}

impl Repo {
  /// Parse `owner/name` as found in `GITHUB_REPOSITORY`.
  pub fn parse(full_name: &str) -> Result<Self> {
    match full_name.split_once('/') {
      Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => Ok(Self {
        owner: owner.to_string(),
        name: name.to_string(),
      }),
      _ => Err(ActionError::InvalidEnv {
        name: "GITHUB_REPOSITORY",
        value: full_name.to_string(),
      }),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullRequestRef {
  pub number: u64,
}

#[derive(Debug, Clone)]
pub struct RunContext {
  pub repo: Repo,
  pub pull_request: Option<PullRequestRef>,
  pub base_ref: String,
  pub api_url: String,
}

// ---------------------------------------------------------------------------
// Event payload (only the fields we read; everything else is ignored)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct EventPayload {
  #[serde(default)]
  pull_request: Option<PullRequestPayload>,
  #[serde(default)]
  base_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
  number: u64,
  #[serde(default)]
  base: Option<BranchPayload>,
}

#[derive(Debug, Deserialize)]
struct BranchPayload {
  #[serde(rename = "ref")]
  ref_name: String,
}

impl RunContext {
  /// Build from the event payload JSON plus the runner-provided values.
  ///
  /// Base branch order: `pull_request.base.ref`, top-level `base_ref`,
  /// `fallback_base_ref` (usually `GITHUB_BASE_REF`), then `unknown`.
  pub fn from_payload(
    repo: Repo,
    payload: &str,
    api_url: Option<String>,
    fallback_base_ref: Option<String>,
  ) -> Result<Self> {
    let payload: EventPayload = if payload.trim().is_empty() {
      EventPayload::default()
    } else {
      serde_json::from_str(payload)?
    };

    let pr_base = payload
      .pull_request
      .as_ref()
      .and_then(|pr| pr.base.as_ref())
      .map(|b| b.ref_name.clone());
    let base_ref = [pr_base, payload.base_ref, fallback_base_ref]
      .into_iter()
      .flatten()
      .find(|r| !r.is_empty())
      .unwrap_or_else(|| UNKNOWN_BASE_REF.to_string());

    Ok(Self {
      repo,
      pull_request: payload
        .pull_request
        .map(|pr| PullRequestRef { number: pr.number }),
      base_ref,
      api_url: api_url
        .filter(|u| !u.is_empty())
        .map(|u| u.trim_end_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
    })
  }

  /// Read `GITHUB_REPOSITORY`, `GITHUB_EVENT_PATH`, `GITHUB_API_URL` and `GITHUB_BASE_REF`.
  pub fn from_env() -> Result<Self> {
    let repository =
      std::env::var("GITHUB_REPOSITORY").map_err(|_| ActionError::MissingEnv("GITHUB_REPOSITORY".into()))?;
    let repo = Repo::parse(&repository)?;

    let payload = match std::env::var("GITHUB_EVENT_PATH") {
      Ok(path) if Path::new(&path).exists() => {
        std::fs::read_to_string(&path).map_err(|e| ActionError::io(&path, e))?
      }
      _ => String::new(),
    };

    Self::from_payload(
      repo,
      &payload,
      std::env::var("GITHUB_API_URL").ok(),
      std::env::var("GITHUB_BASE_REF").ok(),
    )
  }
}

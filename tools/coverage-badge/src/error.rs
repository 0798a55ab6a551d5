//! Structured error types for the coverage badge step.
//!
//! Everything here is fatal for the run except when raised while fetching the
//! previous artifact, where the fetcher turns it into an absent baseline.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActionError {
  #[error("Input required and not supplied: {0}")]
  MissingInput(String),

  #[error("environment variable {0} is not set")]
  MissingEnv(String),

  #[error("environment variable {name} is invalid: {value:?}")]
  InvalidEnv { name: &'static str, value: String },

  #[error("{}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),

  #[error("coverage summary has no numeric {0}")]
  MissingField(&'static str),

  #[error("http: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{operation} failed with status {status}: {body}")]
  Api {
    operation: &'static str,
    status: u16,
    body: String,
  },

  #[error("artifact {0} not found")]
  ArtifactNotFound(String),

  #[error("artifact archive: {0}")]
  Archive(#[from] zip::result::ZipError),

  #[error("runtime token: {0}")]
  RuntimeToken(String),

  #[error("pull request not exist")]
  NoPullRequest,
}

impl ActionError {
  pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
    Self::Io {
      path: path.as_ref().to_path_buf(),
      source,
    }
  }

  pub fn api(operation: &'static str, status: reqwest::StatusCode, body: impl Into<String>) -> Self {
    Self::Api {
      operation,
      status: status.as_u16(),
      body: body.into(),
    }
  }

  pub fn runtime_token(msg: impl Into<String>) -> Self {
    Self::RuntimeToken(msg.into())
  }
}

pub type Result<T> = std::result::Result<T, ActionError>;

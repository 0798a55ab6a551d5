//! Artifact store: the only state carried from one run to the next.

mod archive;
mod github;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;

pub use archive::{pack, sha256_digest, unpack, PackedArchive};
pub use github::{backend_ids_from_token, select_latest, ArtifactEntry, BackendIds, GithubArtifactStore, ResultsService};

/// What an upload produced; logged for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadResult {
  pub artifact_name: String,
  pub artifact_id: Option<String>,
  /// Size of the uploaded archive in bytes.
  pub size: u64,
  pub digest: String,
  pub items: Vec<String>,
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
  /// Fetch the latest artifact stored under `name`, unpack it into `dest`
  /// (created if missing) and return the path of the summary file inside.
  async fn download(&self, name: &str, dest: &Path) -> Result<PathBuf>;

  /// Store `files` under `name`, superseding earlier uploads. Entry names are
  /// relative to `root`.
  async fn upload(&self, name: &str, files: &[PathBuf], root: &Path) -> Result<UploadResult>;
}

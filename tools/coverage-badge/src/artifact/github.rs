//! GitHub-hosted artifact store.
//!
//! Downloads go through the public REST API so artifacts from earlier runs are
//! visible. Uploads use the runner's artifact service (v4): create, put the
//! zip to the signed URL, finalize.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{archive, ArtifactStore, UploadResult};
use crate::config::Config;
use crate::context::{Repo, RunContext};
use crate::error::{ActionError, Result};
use crate::github::{ensure_success, rest};

const ARTIFACT_SERVICE: &str = "twirp/github.actions.results.api.v1.ArtifactService";
const ARTIFACT_VERSION: u32 = 4;
const RESULTS_SCOPE: &str = "Actions.Results";
const LIST_PAGE_SIZE: &str = "100";

// ---------------------------------------------------------------------------
// REST listing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ArtifactList {
  #[serde(default)]
  artifacts: Vec<ArtifactEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactEntry {
  pub id: u64,
  pub name: String,
  #[serde(default)]
  pub expired: bool,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
  pub archive_download_url: String,
  #[serde(default)]
  pub workflow_run: Option<WorkflowRunRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRunRef {
  #[serde(default)]
  pub head_branch: Option<String>,
}

impl ArtifactEntry {
  fn on_branch(&self, branch: &str) -> bool {
    self
      .workflow_run
      .as_ref()
      .and_then(|r| r.head_branch.as_deref())
      .is_some_and(|b| b == branch)
  }
}

/// Newest live artifact named `name`, preferring runs on `base_ref`.
pub fn select_latest<'a>(entries: &'a [ArtifactEntry], name: &str, base_ref: &str) -> Option<&'a ArtifactEntry> {
  let live: Vec<&ArtifactEntry> = entries
    .iter()
    .filter(|a| a.name == name && !a.expired)
    .collect();
  let on_base = live
    .iter()
    .copied()
    .filter(|a| a.on_branch(base_ref))
    .max_by_key(|a| a.created_at);
  on_base.or_else(|| live.into_iter().max_by_key(|a| a.created_at))
}

// ---------------------------------------------------------------------------
// Results service (upload side)
// ---------------------------------------------------------------------------

/// Backend IDs the artifact service keys uploads by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendIds {
  pub workflow_run: String,
  pub workflow_job: String,
}

#[derive(Deserialize)]
struct RuntimeClaims {
  #[serde(default)]
  scp: String,
}

/// Pull `Actions.Results:<run>:<job>` out of the runtime token's `scp` claim.
pub fn backend_ids_from_token(token: &str) -> Result<BackendIds> {
  let payload = token
    .split('.')
    .nth(1)
    .ok_or_else(|| ActionError::runtime_token("not a JWT"))?;
  let bytes = URL_SAFE_NO_PAD
    .decode(payload.trim_end_matches('='))
    .map_err(|e| ActionError::runtime_token(e.to_string()))?;
  let claims: RuntimeClaims = serde_json::from_slice(&bytes)?;

  claims
    .scp
    .split_whitespace()
    .find_map(|scope| {
      let mut parts = scope.split(':');
      match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(RESULTS_SCOPE), Some(run), Some(job), None) => Some(BackendIds {
          workflow_run: run.to_string(),
          workflow_job: job.to_string(),
        }),
        _ => None,
      }
    })
    .ok_or_else(|| ActionError::runtime_token(format!("no {} scope", RESULTS_SCOPE)))
}

#[derive(Debug, Clone)]
pub struct ResultsService {
  results_url: String,
  token: String,
  backend: BackendIds,
}

#[derive(Serialize)]
struct CreateArtifactRequest<'a> {
  workflow_run_backend_id: &'a str,
  workflow_job_run_backend_id: &'a str,
  name: &'a str,
  version: u32,
}

#[derive(Deserialize)]
struct CreateArtifactResponse {
  #[serde(default)]
  ok: bool,
  #[serde(default)]
  signed_upload_url: String,
}

#[derive(Serialize)]
struct FinalizeArtifactRequest<'a> {
  workflow_run_backend_id: &'a str,
  workflow_job_run_backend_id: &'a str,
  name: &'a str,
  /// int64 travels as a string in proto3 JSON.
  size: String,
  hash: &'a str,
}

#[derive(Deserialize)]
struct FinalizeArtifactResponse {
  #[serde(default)]
  ok: bool,
  #[serde(default)]
  artifact_id: Option<serde_json::Value>,
}

impl ResultsService {
  pub fn new(results_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
    let token = token.into();
    let backend = backend_ids_from_token(&token)?;
    Ok(Self {
      results_url: results_url.into().trim_end_matches('/').to_string(),
      token,
      backend,
    })
  }

  /// `ACTIONS_RESULTS_URL` + `ACTIONS_RUNTIME_TOKEN`, both set by the runner.
  pub fn from_env() -> Result<Self> {
    let var = |name: &str| std::env::var(name).map_err(|_| ActionError::MissingEnv(name.to_string()));
    Self::new(var("ACTIONS_RESULTS_URL")?, var("ACTIONS_RUNTIME_TOKEN")?)
  }

  pub fn method_url(&self, method: &str) -> String {
    format!("{}/{}/{}", self.results_url, ARTIFACT_SERVICE, method)
  }

  async fn call<Req, Resp>(&self, http: &Client, method: &'static str, body: &Req) -> Result<Resp>
  where
    Req: Serialize + Sync,
    Resp: DeserializeOwned,
  {
    let response = http
      .post(self.method_url(method))
      .bearer_auth(&self.token)
      .json(body)
      .send()
      .await?;
    Ok(ensure_success(method, response).await?.json().await?)
  }

  async fn create(&self, http: &Client, name: &str) -> Result<String> {
    let request = CreateArtifactRequest {
      workflow_run_backend_id: &self.backend.workflow_run,
      workflow_job_run_backend_id: &self.backend.workflow_job,
      name,
      version: ARTIFACT_VERSION,
    };
    let created: CreateArtifactResponse = self.call(http, "CreateArtifact", &request).await?;
    if !created.ok || created.signed_upload_url.is_empty() {
      return Err(refused("CreateArtifact", name));
    }
    Ok(created.signed_upload_url)
  }

  async fn finalize(&self, http: &Client, name: &str, size: u64, digest: &str) -> Result<Option<String>> {
    let request = FinalizeArtifactRequest {
      workflow_run_backend_id: &self.backend.workflow_run,
      workflow_job_run_backend_id: &self.backend.workflow_job,
      name,
      size: size.to_string(),
      hash: digest,
    };
    let finalized: FinalizeArtifactResponse = self.call(http, "FinalizeArtifact", &request).await?;
    if !finalized.ok {
      return Err(refused("FinalizeArtifact", name));
    }
    Ok(finalized.artifact_id.map(|id| match id {
      serde_json::Value::String(s) => s,
      other => other.to_string(),
    }))
  }
}

fn refused(operation: &'static str, name: &str) -> ActionError {
  ActionError::Api {
    operation,
    status: 200,
    body: format!("artifact service rejected {}", name),
  }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct GithubArtifactStore {
  http: Client,
  api_url: String,
  repo: Repo,
  token: String,
  base_ref: String,
  results: Option<ResultsService>,
}

impl GithubArtifactStore {
  pub fn new(http: Client, config: &Config, ctx: &RunContext) -> Self {
    Self {
      http,
      api_url: ctx.api_url.clone(),
      repo: ctx.repo.clone(),
      token: config.repo_token.clone(),
      base_ref: ctx.base_ref.clone(),
      results: None,
    }
  }

  /// Use an explicit results service instead of reading the runner env on upload.
  pub fn with_results_service(mut self, results: ResultsService) -> Self {
    self.results = Some(results);
    self
  }

  pub fn artifacts_url(&self) -> String {
    format!("{}/repos/{}/{}/actions/artifacts", self.api_url, self.repo.owner, self.repo.name)
  }

  async fn list(&self, name: &str) -> Result<Vec<ArtifactEntry>> {
    let request = self
      .http
      .get(self.artifacts_url())
      .query(&[("name", name), ("per_page", LIST_PAGE_SIZE)]);
    let response = rest(request, &self.token).send().await?;
    let list: ArtifactList = ensure_success("list artifacts", response).await?.json().await?;
    Ok(list.artifacts)
  }
}

#[async_trait]
impl ArtifactStore for GithubArtifactStore {
  async fn download(&self, name: &str, dest: &Path) -> Result<PathBuf> {
    let entries = self.list(name).await?;
    let entry = select_latest(&entries, name, &self.base_ref)
      .ok_or_else(|| ActionError::ArtifactNotFound(name.to_string()))?;
    debug!(
      "downloading artifact {} (id {}, created {:?})",
      entry.name, entry.id, entry.created_at
    );

    let response = rest(self.http.get(&entry.archive_download_url), &self.token)
      .send()
      .await?;
    let bytes = ensure_success("download artifact", response).await?.bytes().await?;
    let files = archive::unpack(&bytes, dest)?;

    files
      .iter()
      .find(|p| p.extension().is_some_and(|ext| ext == "json"))
      .or_else(|| files.first())
      .cloned()
      .ok_or_else(|| ActionError::ArtifactNotFound(format!("{} (empty archive)", name)))
  }

  async fn upload(&self, name: &str, files: &[PathBuf], root: &Path) -> Result<UploadResult> {
    let results = match &self.results {
      Some(service) => service.clone(),
      None => ResultsService::from_env()?,
    };

    let packed = archive::pack(files, root)?;
    let size = packed.bytes.len() as u64;
    let digest = archive::sha256_digest(&packed.bytes);

    let upload_url = results.create(&self.http, name).await?;
    let response = self
      .http
      .put(upload_url)
      .header("x-ms-blob-type", "BlockBlob")
      .header(CONTENT_TYPE, "application/zip")
      .body(packed.bytes)
      .send()
      .await?;
    ensure_success("upload artifact blob", response).await?;

    let artifact_id = results.finalize(&self.http, name, size, &digest).await?;
    Ok(UploadResult {
      artifact_name: name.to_string(),
      artifact_id,
      size,
      digest,
      items: packed.entries,
    })
  }
}

//! GitHub REST plumbing and the pull-request comment API.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use crate::context::Repo;
use crate::error::{ActionError, Result};

pub const CLIENT_USER_AGENT: &str = concat!("coverage-badge/", env!("CARGO_PKG_VERSION"));
const GITHUB_JSON: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// Shared HTTP client; redirects are followed (artifact archives redirect to blob storage).
pub fn http_client() -> Result<Client> {
  Ok(Client::builder().user_agent(CLIENT_USER_AGENT).build()?)
}

/// Attach token and the REST API headers.
pub(crate) fn rest(builder: RequestBuilder, token: &str) -> RequestBuilder {
  builder
    .bearer_auth(token)
    .header(ACCEPT, GITHUB_JSON)
    .header("X-GitHub-Api-Version", API_VERSION)
}

/// Turn a non-2xx response into `ActionError::Api`, keeping the body for the log.
pub(crate) async fn ensure_success(operation: &'static str, response: Response) -> Result<Response> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }
  let body = response.text().await.unwrap_or_default();
  Err(ActionError::api(operation, status, body))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedComment {
  pub id: u64,
  pub html_url: String,
}

#[async_trait]
pub trait CommentApi: Send + Sync {
  async fn create_comment(&self, repo: &Repo, issue_number: u64, body: &str) -> Result<CreatedComment>;
}

pub struct GithubClient {
  http: Client,
  api_url: String,
  token: String,
}

impl GithubClient {
  pub fn new(http: Client, api_url: impl Into<String>, token: impl Into<String>) -> Self {
    Self {
      http,
      api_url: api_url.into(),
      token: token.into(),
    }
  }

  pub fn comments_url(&self, repo: &Repo, issue_number: u64) -> String {
    format!(
      "{}/repos/{}/{}/issues/{}/comments",
      self.api_url, repo.owner, repo.name, issue_number
    )
  }
}

#[derive(Serialize)]
struct NewComment<'a> {
  body: &'a str,
}

#[async_trait]
impl CommentApi for GithubClient {
  async fn create_comment(&self, repo: &Repo, issue_number: u64, body: &str) -> Result<CreatedComment> {
    let request = self
      .http
      .post(self.comments_url(repo, issue_number))
      .json(&NewComment { body });
    let response = rest(request, &self.token).send().await?;
    let response = ensure_success("create comment", response).await?;
    Ok(response.json().await?)
  }
}

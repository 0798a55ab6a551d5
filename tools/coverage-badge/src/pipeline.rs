//! Linear run: previous -> current -> badge -> upload -> comment.
//!
//! Each stage runs only after the previous one succeeded; the first fatal
//! error ends the run. Completed side effects (an uploaded artifact) stay.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::actions::StepOutputs;
use crate::artifact::{ArtifactStore, UploadResult};
use crate::badge::Badge;
use crate::config::Config;
use crate::context::RunContext;
use crate::coverage::{self, PreviousCoverage};
use crate::error::{ActionError, Result};
use crate::github::{CommentApi, CreatedComment};

/// Step output carrying the created comment's URL.
pub const COMMENT_URL_OUTPUT: &str = "comment-url";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Start,
  PreviousFetched,
  CurrentRead,
  BadgeBuilt,
  ArtifactUploaded,
  CommentPosted,
  Done,
  Failed,
}

impl Stage {
  /// Terminal stage for a finished run.
  pub fn terminal<T>(result: &Result<T>) -> Self {
    match result {
      Ok(_) => Self::Done,
      Err(_) => Self::Failed,
    }
  }
}

#[derive(Debug, Clone)]
pub struct RunReport {
  pub previous: PreviousCoverage,
  pub current: f64,
  pub badge: Badge,
  pub upload: UploadResult,
  pub comment: CreatedComment,
}

/// External collaborators a run talks to.
pub struct Services<'a> {
  pub artifacts: &'a dyn ArtifactStore,
  pub comments: &'a dyn CommentApi,
  pub outputs: &'a StepOutputs,
}

fn enter(stage: Stage) {
  debug!("stage: {:?}", stage);
}

pub async fn run(config: &Config, ctx: &RunContext, services: &Services<'_>) -> Result<RunReport> {
  enter(Stage::Start);
  let result = run_stages(config, ctx, services).await;
  enter(Stage::terminal(&result));
  result
}

async fn run_stages(config: &Config, ctx: &RunContext, services: &Services<'_>) -> Result<RunReport> {
  let previous = coverage::fetch_previous(services.artifacts, config).await;
  enter(Stage::PreviousFetched);

  let current = coverage::read_current(&config.coverage_summary_path)?;
  enter(Stage::CurrentRead);

  let badge = Badge::new(previous.baseline(), current, ctx.base_ref.as_str());
  debug!("base branch: {}", ctx.base_ref);
  enter(Stage::BadgeBuilt);

  info!(
    "previous coverage pct: {}, current coverage pct: {}",
    previous.baseline(),
    current
  );

  let upload = upload_coverage_artifact(services.artifacts, config).await?;
  enter(Stage::ArtifactUploaded);

  let comment = comment_on_pr(services.comments, ctx, services.outputs, &badge.to_html()).await?;
  enter(Stage::CommentPosted);

  Ok(RunReport {
    previous,
    current,
    badge,
    upload,
    comment,
  })
}

/// Store this run's summary for the next run to compare against.
pub async fn upload_coverage_artifact(store: &dyn ArtifactStore, config: &Config) -> Result<UploadResult> {
  let files: Vec<PathBuf> = vec![config.coverage_summary_path.clone()];
  let result = store
    .upload(&config.artifact_name, &files, Path::new("."))
    .await?;
  info!("Artifact upload result: {:?}", result);
  Ok(result)
}

/// Comment `message` on the run's pull request and publish the comment URL.
///
/// Without a pull request in the run context nothing is sent.
pub async fn comment_on_pr(
  comments: &dyn CommentApi,
  ctx: &RunContext,
  outputs: &StepOutputs,
  message: &str,
) -> Result<CreatedComment> {
  let pr = ctx.pull_request.ok_or(ActionError::NoPullRequest)?;
  let comment = comments.create_comment(&ctx.repo, pr.number, message).await?;

  debug!("created PR comment URL: {}", comment.html_url);
  outputs.set(COMMENT_URL_OUTPUT, &comment.html_url)?;
  Ok(comment)
}

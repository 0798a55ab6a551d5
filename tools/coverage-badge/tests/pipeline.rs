//! Integration tests for the full run against in-memory collaborators.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use coverage_badge::actions::StepOutputs;
use coverage_badge::error::Result;
use coverage_badge::{
  ActionError, ArtifactStore, CommentApi, Config, CreatedComment, PreviousCoverage, PullRequestRef, Repo,
  RunContext, Services, UploadResult,
};
use pretty_assertions::assert_eq;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Byte-preserving artifact store keyed by name.
#[derive(Default)]
struct MemoryStore {
  blobs: Mutex<HashMap<String, Vec<u8>>>,
  fail_download: bool,
  fail_upload: bool,
}

#[async_trait]
impl ArtifactStore for MemoryStore {
  async fn download(&self, name: &str, dest: &Path) -> Result<PathBuf> {
    if self.fail_download {
      return Err(ActionError::Api {
        operation: "list artifacts",
        status: 503,
        body: "storage unavailable".into(),
      });
    }
    let bytes = self
      .blobs
      .lock()
      .unwrap()
      .get(name)
      .cloned()
      .ok_or_else(|| ActionError::ArtifactNotFound(name.to_string()))?;
    fs::create_dir_all(dest).map_err(|e| ActionError::io(dest, e))?;
    let path = dest.join("coverage-summary.json");
    fs::write(&path, bytes).map_err(|e| ActionError::io(&path, e))?;
    Ok(path)
  }

  async fn upload(&self, name: &str, files: &[PathBuf], _root: &Path) -> Result<UploadResult> {
    if self.fail_upload {
      return Err(ActionError::Api {
        operation: "CreateArtifact",
        status: 500,
        body: "boom".into(),
      });
    }
    let bytes = fs::read(&files[0]).map_err(|e| ActionError::io(&files[0], e))?;
    let size = bytes.len() as u64;
    self.blobs.lock().unwrap().insert(name.to_string(), bytes);
    Ok(UploadResult {
      artifact_name: name.to_string(),
      artifact_id: Some("1".into()),
      size,
      digest: "sha256:test".into(),
      items: files.iter().map(|f| f.display().to_string()).collect(),
    })
  }
}

#[derive(Default)]
struct RecordingComments {
  calls: Mutex<Vec<(String, u64, String)>>,
  fail: bool,
}

#[async_trait]
impl CommentApi for RecordingComments {
  async fn create_comment(&self, repo: &Repo, issue_number: u64, body: &str) -> Result<CreatedComment> {
    self
      .calls
      .lock()
      .unwrap()
      .push((format!("{}/{}", repo.owner, repo.name), issue_number, body.to_string()));
    if self.fail {
      return Err(ActionError::Api {
        operation: "create comment",
        status: 403,
        body: "Resource not accessible by integration".into(),
      });
    }
    Ok(CreatedComment {
      id: 1,
      html_url: format!(
        "https://github.com/{}/{}/pull/{}#issuecomment-1",
        repo.owner, repo.name, issue_number
      ),
    })
  }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

struct Workspace {
  dir: tempfile::TempDir,
  config: Config,
}

impl Workspace {
  fn new() -> Self {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::new("ghs_test");
    config.coverage_summary_path = dir.path().join("coverage/coverage-summary.json");
    config.artifact_download_path = dir.path().join(".github-artifacts").join(&config.artifact_name);
    Self { dir, config }
  }

  fn write_summary(&self, pct: f64) {
    let json = format!(
      r#"{{"total":{{"lines":{{"total":100,"covered":90,"skipped":0,"pct":90}},"statements":{{"total":100,"covered":0,"skipped":0,"pct":{}}}}}}}"#,
      pct
    );
    let path = &self.config.coverage_summary_path;
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, json).unwrap();
  }

  fn outputs(&self) -> StepOutputs {
    StepOutputs::to_file(self.output_path())
  }

  fn output_path(&self) -> PathBuf {
    self.dir.path().join("github_output")
  }
}

fn pr_context(base: &str) -> RunContext {
  RunContext {
    repo: Repo::parse("octo-org/web-app").unwrap(),
    pull_request: Some(PullRequestRef { number: 7 }),
    base_ref: base.to_string(),
    api_url: "https://api.github.com".to_string(),
  }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_run_compares_against_zero_and_comments() {
  let ws = Workspace::new();
  ws.write_summary(85.0);
  let store = MemoryStore::default();
  let comments = RecordingComments::default();
  let outputs = ws.outputs();
  let services = Services {
    artifacts: &store,
    comments: &comments,
    outputs: &outputs,
  };

  let report = coverage_badge::run(&ws.config, &pr_context("main"), &services).await.unwrap();

  assert!(matches!(report.previous, PreviousCoverage::Absent(_)));
  assert_eq!(report.current, 85.0);

  let calls = comments.calls.lock().unwrap();
  assert_eq!(calls.len(), 1);
  assert_eq!(calls[0].0, "octo-org/web-app");
  assert_eq!(calls[0].1, 7);
  assert_eq!(
    calls[0].2,
    "<img src=\"https://img.shields.io/badge/coverage-85 (85%25)%20vs%20main%200%25-green\" />"
  );

  assert_eq!(
    fs::read_to_string(ws.output_path()).unwrap(),
    "comment-url=https://github.com/octo-org/web-app/pull/7#issuecomment-1\n"
  );
  assert!(store.blobs.lock().unwrap().contains_key("coverage-summary-artifact"));
}

#[tokio::test]
async fn next_run_reads_what_the_previous_run_uploaded() {
  let store = MemoryStore::default();

  let first = Workspace::new();
  first.write_summary(80.0);
  let comments = RecordingComments::default();
  let outputs = first.outputs();
  let services = Services {
    artifacts: &store,
    comments: &comments,
    outputs: &outputs,
  };
  coverage_badge::run(&first.config, &pr_context("main"), &services).await.unwrap();

  let second = Workspace::new();
  second.write_summary(85.0);
  let comments = RecordingComments::default();
  let outputs = second.outputs();
  let services = Services {
    artifacts: &store,
    comments: &comments,
    outputs: &outputs,
  };
  let report = coverage_badge::run(&second.config, &pr_context("main"), &services).await.unwrap();

  assert_eq!(report.previous, PreviousCoverage::Found(80.0));
  assert_eq!(report.badge.diff, 5.0);
  let body = &comments.calls.lock().unwrap()[0].2;
  assert!(body.contains("85 (5%25)%20vs%20main%2080%25"), "{}", body);
  assert!(body.ends_with("-green\" />"), "{}", body);
}

#[tokio::test]
async fn unchanged_coverage_is_red() {
  let store = MemoryStore::default();
  store.blobs.lock().unwrap().insert(
    "coverage-summary-artifact".into(),
    br#"{"total":{"statements":{"pct":90}}}"#.to_vec(),
  );
  let ws = Workspace::new();
  ws.write_summary(90.0);
  let comments = RecordingComments::default();
  let outputs = ws.outputs();
  let services = Services {
    artifacts: &store,
    comments: &comments,
    outputs: &outputs,
  };

  let report = coverage_badge::run(&ws.config, &pr_context("main"), &services).await.unwrap();
  assert_eq!(report.badge.color, coverage_badge::BadgeColor::Red);
  assert!(comments.calls.lock().unwrap()[0].2.ends_with("-red\" />"));
}

#[tokio::test]
async fn storage_outage_falls_back_to_zero_baseline() {
  let store = MemoryStore {
    fail_download: true,
    ..Default::default()
  };
  let ws = Workspace::new();
  ws.write_summary(42.5);
  let comments = RecordingComments::default();
  let outputs = ws.outputs();
  let services = Services {
    artifacts: &store,
    comments: &comments,
    outputs: &outputs,
  };

  let report = coverage_badge::run(&ws.config, &pr_context("main"), &services).await.unwrap();
  match &report.previous {
    PreviousCoverage::Absent(reason) => assert!(reason.contains("storage unavailable"), "{}", reason),
    other => panic!("expected absent baseline, got {:?}", other),
  }
  assert_eq!(report.previous.baseline(), 0.0);
}

#[tokio::test]
async fn corrupt_previous_artifact_falls_back_to_zero_baseline() {
  let store = MemoryStore::default();
  store
    .blobs
    .lock()
    .unwrap()
    .insert("coverage-summary-artifact".into(), b"<html>not json</html>".to_vec());
  let ws = Workspace::new();
  ws.write_summary(60.0);
  let comments = RecordingComments::default();
  let outputs = ws.outputs();
  let services = Services {
    artifacts: &store,
    comments: &comments,
    outputs: &outputs,
  };

  let report = coverage_badge::run(&ws.config, &pr_context("main"), &services).await.unwrap();
  assert!(matches!(report.previous, PreviousCoverage::Absent(_)));
  assert_eq!(report.badge.previous, 0.0);
}

#[tokio::test]
async fn missing_current_summary_fails_before_any_side_effect() {
  let ws = Workspace::new();
  let store = MemoryStore::default();
  let comments = RecordingComments::default();
  let outputs = ws.outputs();
  let services = Services {
    artifacts: &store,
    comments: &comments,
    outputs: &outputs,
  };

  let err = coverage_badge::run(&ws.config, &pr_context("main"), &services).await.unwrap_err();
  assert!(matches!(err, ActionError::Io { .. }));
  assert!(err.to_string().contains("coverage-summary.json"), "{}", err);
  assert!(comments.calls.lock().unwrap().is_empty());
  assert!(store.blobs.lock().unwrap().is_empty());
  assert!(!ws.output_path().exists());
}

#[tokio::test]
async fn invalid_current_summary_fails_with_parse_message() {
  let ws = Workspace::new();
  let path = &ws.config.coverage_summary_path;
  fs::create_dir_all(path.parent().unwrap()).unwrap();
  fs::write(path, "{ not json").unwrap();
  let store = MemoryStore::default();
  let comments = RecordingComments::default();
  let outputs = ws.outputs();
  let services = Services {
    artifacts: &store,
    comments: &comments,
    outputs: &outputs,
  };

  let err = coverage_badge::run(&ws.config, &pr_context("main"), &services).await.unwrap_err();
  assert!(matches!(err, ActionError::Json(_)));
  assert!(comments.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn no_pull_request_fails_without_calling_the_api() {
  let ws = Workspace::new();
  ws.write_summary(70.0);
  let store = MemoryStore::default();
  let comments = RecordingComments::default();
  let outputs = ws.outputs();
  let services = Services {
    artifacts: &store,
    comments: &comments,
    outputs: &outputs,
  };
  let mut ctx = pr_context("main");
  ctx.pull_request = None;

  let err = coverage_badge::run(&ws.config, &ctx, &services).await.unwrap_err();
  assert!(matches!(err, ActionError::NoPullRequest));
  assert_eq!(err.to_string(), "pull request not exist");
  assert!(comments.calls.lock().unwrap().is_empty());
  // The upload already happened and is not rolled back.
  assert!(store.blobs.lock().unwrap().contains_key("coverage-summary-artifact"));
  assert!(!ws.output_path().exists());
}

#[tokio::test]
async fn upload_failure_stops_before_commenting() {
  let ws = Workspace::new();
  ws.write_summary(70.0);
  let store = MemoryStore {
    fail_upload: true,
    ..Default::default()
  };
  let comments = RecordingComments::default();
  let outputs = ws.outputs();
  let services = Services {
    artifacts: &store,
    comments: &comments,
    outputs: &outputs,
  };

  let err = coverage_badge::run(&ws.config, &pr_context("main"), &services).await.unwrap_err();
  assert!(err.to_string().contains("CreateArtifact"), "{}", err);
  assert!(comments.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn comment_failure_propagates_and_sets_no_output() {
  let ws = Workspace::new();
  ws.write_summary(70.0);
  let store = MemoryStore::default();
  let comments = RecordingComments {
    fail: true,
    ..Default::default()
  };
  let outputs = ws.outputs();
  let services = Services {
    artifacts: &store,
    comments: &comments,
    outputs: &outputs,
  };

  let err = coverage_badge::run(&ws.config, &pr_context("main"), &services).await.unwrap_err();
  assert!(err.to_string().contains("403"), "{}", err);
  assert_eq!(comments.calls.lock().unwrap().len(), 1);
  assert!(!ws.output_path().exists());
}

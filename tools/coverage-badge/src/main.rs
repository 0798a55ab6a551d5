//! Binary entrypoint: inputs and run context from the runner environment,
//! one pipeline run, step marked failed on any fatal error.

use coverage_badge::actions::{self, StepOutputs};
use coverage_badge::{github, ActionError, Config, GithubArtifactStore, GithubClient, RunContext, Services};
use tracing::error;

#[tokio::main]
async fn main() {
  actions::init_logging();

  if let Err(e) = run_step().await {
    error!("{}", e);
    actions::set_failed(&e.to_string());
    std::process::exit(1);
  }
}

async fn run_step() -> Result<(), ActionError> {
  let config = Config::from_env()?;
  let ctx = RunContext::from_env()?;

  let http = github::http_client()?;
  let artifacts = GithubArtifactStore::new(http.clone(), &config, &ctx);
  let comments = GithubClient::new(http, ctx.api_url.clone(), config.repo_token.clone());
  let outputs = StepOutputs::from_env();

  let services = Services {
    artifacts: &artifacts,
    comments: &comments,
    outputs: &outputs,
  };
  coverage_badge::run(&config, &ctx, &services).await?;
  Ok(())
}

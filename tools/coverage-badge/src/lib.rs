//! Pull-request coverage badge step for GitHub Actions.
//!
//! Compares the current run's statement coverage against the summary stored
//! by the previous run, uploads the current summary for the next run, and
//! comments a shields.io badge on the pull request.

pub mod actions;
pub mod artifact;
pub mod badge;
pub mod config;
pub mod context;
pub mod coverage;
pub mod error;
pub mod github;
pub mod pipeline;
pub mod summary;

pub use artifact::{ArtifactStore, GithubArtifactStore, UploadResult};
pub use badge::{get_badge, Badge, BadgeColor};
pub use config::Config;
pub use context::{PullRequestRef, Repo, RunContext};
pub use coverage::PreviousCoverage;
pub use error::ActionError;
pub use github::{CommentApi, CreatedComment, GithubClient};
pub use pipeline::{run, RunReport, Services};

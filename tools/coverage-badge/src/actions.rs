//! GitHub Actions workflow-command plumbing: step outputs, failure, log lines.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::{format, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::error::{ActionError, Result};

/// Env var holding an `EnvFilter` directive for this binary's logs.
pub const LOG_ENV: &str = "COVERAGE_BADGE_LOG";
const DEFAULT_LOG_FILTER: &str = "info,coverage_badge=debug";

/// Escape a workflow-command message.
pub fn escape_data(text: &str) -> String {
  text
    .replace('%', "%25")
    .replace('\r', "%0D")
    .replace('\n', "%0A")
}

/// Escape a workflow-command property value.
pub fn escape_property(text: &str) -> String {
  escape_data(text).replace(':', "%3A").replace(',', "%2C")
}

/// Mark the step failed. The caller still owns the exit status.
pub fn set_failed(message: &str) {
  println!("::error::{}", escape_data(message));
}

// ---------------------------------------------------------------------------
// Step outputs
// ---------------------------------------------------------------------------

/// Destination for step outputs: the `GITHUB_OUTPUT` file, or the legacy
/// `::set-output` command when the runner does not provide one.
#[derive(Debug, Clone, Default)]
pub struct StepOutputs {
  path: Option<PathBuf>,
}

impl StepOutputs {
  pub fn from_env() -> Self {
    Self {
      path: std::env::var_os("GITHUB_OUTPUT")
        .filter(|p| !p.is_empty())
        .map(PathBuf::from),
    }
  }

  pub fn to_file(path: impl Into<PathBuf>) -> Self {
    Self {
      path: Some(path.into()),
    }
  }

  pub fn set(&self, name: &str, value: &str) -> Result<()> {
    match &self.path {
      Some(path) => {
        let mut file = OpenOptions::new()
          .create(true)
          .append(true)
          .open(path)
          .map_err(|e| ActionError::io(path, e))?;
        file
          .write_all(output_entry(name, value).as_bytes())
          .map_err(|e| ActionError::io(path, e))
      }
      None => {
        println!("::set-output name={}::{}", escape_property(name), escape_data(value));
        Ok(())
      }
    }
  }
}

/// `name=value`, or the heredoc form when the value spans lines.
fn output_entry(name: &str, value: &str) -> String {
  if value.contains('\n') || value.contains('\r') {
    let delimiter = format!("ghadelimiter_{}", Uuid::new_v4());
    format!("{}<<{}\n{}\n{}\n", name, delimiter, value, delimiter)
  } else {
    format!("{}={}\n", name, value)
  }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Renders tracing events as workflow commands: errors and warnings become
/// annotations, debug and trace go to the step debug log, info stays plain.
pub struct ActionsFormat;

impl<S, N> FormatEvent<S, N> for ActionsFormat
where
  S: Subscriber + for<'a> LookupSpan<'a>,
  N: for<'a> FormatFields<'a> + 'static,
{
  fn format_event(&self, ctx: &FmtContext<'_, S, N>, mut writer: format::Writer<'_>, event: &Event<'_>) -> fmt::Result {
    let mut message = String::new();
    ctx
      .field_format()
      .format_fields(format::Writer::new(&mut message), event)?;
    let command = match *event.metadata().level() {
      Level::ERROR => Some("error"),
      Level::WARN => Some("warning"),
      Level::INFO => None,
      _ => Some("debug"),
    };
    match command {
      Some(cmd) => writeln!(writer, "::{}::{}", cmd, escape_data(&message)),
      None => writeln!(writer, "{}", message),
    }
  }
}

pub fn init_logging() {
  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stdout)
    .event_format(ActionsFormat)
    .init();
}

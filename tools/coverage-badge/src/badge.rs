//! Badge formatter: previous vs current statement coverage as a shields.io image.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

pub const SHIELDS_BADGE_URL: &str = "https://img.shields.io/badge";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeColor {
  Green,
  Red,
}

impl BadgeColor {
  /// Green only for a strict improvement; no change is red.
  pub fn for_diff(diff: f64) -> Self {
    if diff > 0.0 {
      Self::Green
    } else {
      Self::Red
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Green => "green",
      Self::Red => "red",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Badge {
  pub previous: f64,
  pub current: f64,
  pub diff: f64,
  pub color: BadgeColor,
  pub base_branch: String,
}

impl Badge {
  pub fn new(previous: f64, current: f64, base_branch: impl Into<String>) -> Self {
    let diff = current - previous;
    Self {
      previous,
      current,
      diff,
      color: BadgeColor::for_diff(diff),
      base_branch: base_branch.into(),
    }
  }

  /// `<current> (<diff>%25)%20vs%20<branch>%20<previous>%25`, dynamic parts escaped.
  pub fn label(&self) -> String {
    format!(
      "{} ({}%25)%20vs%20{}%20{}%25",
      escape_segment(&self.current.to_string()),
      escape_segment(&self.diff.to_string()),
      escape_segment(&self.base_branch),
      escape_segment(&self.previous.to_string()),
    )
  }

  pub fn url(&self) -> String {
    format!("{}/coverage-{}-{}", SHIELDS_BADGE_URL, self.label(), self.color.as_str())
  }

  pub fn to_html(&self) -> String {
    format!("<img src=\"{}\" />", self.url())
  }
}

impl fmt::Display for Badge {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.to_html())
  }
}

/// Build the comment body for the given percentages and base branch.
pub fn get_badge(previous: f64, current: f64, base_branch: &str) -> String {
  Badge::new(previous, current, base_branch).to_html()
}

/// Everything but RFC 3986 unreserved characters.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Escape text for one shields.io path field: `-`/`_` are doubled, anything
/// outside the unreserved set is percent-encoded as UTF-8.
pub fn escape_segment(text: &str) -> String {
  utf8_percent_encode(text, PATH_SEGMENT)
    .to_string()
    .replace('-', "--")
    .replace('_', "__")
}

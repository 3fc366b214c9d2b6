//! Session length selection
//!
//! Three fixed presets or a whole number of minutes between 1 and 60.
//! A `SessionConfig` is built once the duration is picked and stays
//! unchanged until the session is reset.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::models::MoodProfile;

/// ---------------------------------------------------------------------------
/// Limits
/// ---------------------------------------------------------------------------

pub const MIN_CUSTOM_MINUTES: u32 = 1;
pub const MAX_CUSTOM_MINUTES: u32 = 60;
pub const MIN_SESSION: Duration = Duration::from_secs(1);
pub const MAX_SESSION: Duration = Duration::from_secs(MAX_CUSTOM_MINUTES as u64 * 60);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
  #[error("Custom duration must be between 1 and 60 minutes, got {0}")]
  CustomOutOfRange(u32),

  #[error("Session duration must be between 1s and 60m, got {0}ms")]
  OutOfRange(u128),

  #[error("Unrecognized duration: {0}")]
  Unrecognized(String),
}

/// ---------------------------------------------------------------------------
/// Duration Choice
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationChoice {
  ThirtySeconds,
  OneMinute,
  ThreeMinutes,
  CustomMinutes(u32),
}

impl DurationChoice {
  pub const PRESETS: [DurationChoice; 3] = [
    DurationChoice::ThirtySeconds,
    DurationChoice::OneMinute,
    DurationChoice::ThreeMinutes,
  ];

  pub fn label(&self) -> String {
    match self {
      Self::ThirtySeconds => "30s".to_string(),
      Self::OneMinute => "1m".to_string(),
      Self::ThreeMinutes => "3m".to_string(),
      Self::CustomMinutes(m) => format!("{}m", m),
    }
  }

  /// Total session length for this choice
  pub fn resolve(&self) -> Result<Duration, DurationError> {
    match *self {
      Self::ThirtySeconds => Ok(Duration::from_secs(30)),
      Self::OneMinute => Ok(Duration::from_secs(60)),
      Self::ThreeMinutes => Ok(Duration::from_secs(180)),
      Self::CustomMinutes(minutes) => {
        if !(MIN_CUSTOM_MINUTES..=MAX_CUSTOM_MINUTES).contains(&minutes) {
          return Err(DurationError::CustomOutOfRange(minutes));
        }
        Ok(Duration::from_millis(minutes as u64 * 60 * 1000))
      }
    }
  }
}

impl std::str::FromStr for DurationChoice {
  type Err = DurationError;

  /// Accepts `30s`, `60s`, `180s` (or `1m`, `3m`) for presets and `<n>m`
  /// or a bare number of minutes for a custom length.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let value = s.trim().to_ascii_lowercase();
    match value.as_str() {
      "30s" => return Ok(Self::ThirtySeconds),
      "60s" | "1m" => return Ok(Self::OneMinute),
      "180s" | "3m" => return Ok(Self::ThreeMinutes),
      _ => {}
    }

    let minutes = value.strip_suffix('m').unwrap_or(&value);
    let minutes: u32 = minutes
      .parse()
      .map_err(|_| DurationError::Unrecognized(s.to_string()))?;
    let choice = Self::CustomMinutes(minutes);
    choice.resolve()?;
    Ok(choice)
  }
}

/// ---------------------------------------------------------------------------
/// Session Config
/// ---------------------------------------------------------------------------

/// Mood and total length for one session. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionConfig {
  mood: MoodProfile,
  #[serde(rename = "total_ms", serialize_with = "serialize_millis")]
  total: Duration,
}

impl SessionConfig {
  pub fn new(mood: MoodProfile, total: Duration) -> Result<Self, DurationError> {
    if total < MIN_SESSION || total > MAX_SESSION {
      return Err(DurationError::OutOfRange(total.as_millis()));
    }
    Ok(Self { mood, total })
  }

  pub fn from_choice(mood: MoodProfile, choice: DurationChoice) -> Result<Self, DurationError> {
    Self::new(mood, choice.resolve()?)
  }

  pub fn mood(&self) -> &MoodProfile {
    &self.mood
  }

  pub fn total(&self) -> Duration {
    self.total
  }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
  s.serialize_u64(d.as_millis() as u64)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

//! Environment-driven configuration
//!
//! Values come from the process environment, with `.env` loaded by
//! `dotenvy` at start-up. Only the API key is needed for live insights;
//! without it the demo provider is used.

use std::env;
use thiserror::Error;

use crate::audio::DEFAULT_VOLUME;
use crate::llm::{GEMINI_API_BASE, GEMINI_MODEL};

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
  #[error("Invalid value for {key}: {value}")]
  Invalid { key: String, value: String },
}

/// ---------------------------------------------------------------------------
/// Configuration Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct GeminiConfig {
  pub api_key: String,
  pub model: String,
  pub api_base: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
  /// `None` when no API key is set
  pub gemini: Option<GeminiConfig>,
  pub music_enabled: bool,
  pub volume: f32,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      gemini: None,
      music_enabled: false,
      volume: DEFAULT_VOLUME,
    }
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    let api_key = non_empty_var("GEMINI_API_KEY").or_else(|| non_empty_var("API_KEY"));

    let gemini = api_key.map(|api_key| GeminiConfig {
      api_key,
      model: non_empty_var("GEMINI_MODEL").unwrap_or_else(|| GEMINI_MODEL.to_string()),
      api_base: non_empty_var("GEMINI_API_BASE").unwrap_or_else(|| GEMINI_API_BASE.to_string()),
    });

    let music_enabled = match non_empty_var("MINDFUL_MUSIC") {
      Some(value) => parse_flag("MINDFUL_MUSIC", &value)?,
      None => false,
    };

    let volume = match non_empty_var("MINDFUL_VOLUME") {
      Some(value) => parse_volume(&value)?,
      None => DEFAULT_VOLUME,
    };

    Ok(Self {
      gemini,
      music_enabled,
      volume,
    })
  }
}

fn non_empty_var(key: &str) -> Option<String> {
  env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
  match value.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "on" | "yes" => Ok(true),
    "0" | "false" | "off" | "no" => Ok(false),
    _ => Err(ConfigError::Invalid {
      key: key.to_string(),
      value: value.to_string(),
    }),
  }
}

fn parse_volume(value: &str) -> Result<f32, ConfigError> {
  let invalid = || ConfigError::Invalid {
    key: "MINDFUL_VOLUME".to_string(),
    value: value.to_string(),
  };
  let volume: f32 = value.trim().parse().map_err(|_| invalid())?;
  if !(0.0..=1.0).contains(&volume) {
    return Err(invalid());
  }
  Ok(volume)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  const VARS: [&str; 6] = [
    "GEMINI_API_KEY",
    "API_KEY",
    "GEMINI_MODEL",
    "GEMINI_API_BASE",
    "MINDFUL_MUSIC",
    "MINDFUL_VOLUME",
  ];

  fn with_env<F: FnOnce()>(set: &[(&str, &str)], f: F) {
    let vars: Vec<(&str, Option<&str>)> = VARS
      .iter()
      .map(|key| {
        let value = set.iter().find(|(k, _)| k == key).map(|(_, v)| *v);
        (*key, value)
      })
      .collect();
    temp_env::with_vars(vars, f);
  }

  #[test]
  #[serial]
  fn test_defaults_without_key() {
    with_env(&[], || {
      let config = AppConfig::from_env().unwrap();
      assert_eq!(config, AppConfig::default());
    });
  }

  #[test]
  #[serial]
  fn test_gemini_key_with_defaults() {
    with_env(&[("GEMINI_API_KEY", "abc")], || {
      let gemini = AppConfig::from_env().unwrap().gemini.unwrap();
      assert_eq!(gemini.api_key, "abc");
      assert_eq!(gemini.model, GEMINI_MODEL);
      assert_eq!(gemini.api_base, GEMINI_API_BASE);
    });
  }

  #[test]
  #[serial]
  fn test_legacy_api_key_and_overrides() {
    with_env(
      &[
        ("API_KEY", "legacy"),
        ("GEMINI_MODEL", "gemini-2.0-flash"),
        ("GEMINI_API_BASE", "http://localhost:9999"),
      ],
      || {
        let gemini = AppConfig::from_env().unwrap().gemini.unwrap();
        assert_eq!(gemini.api_key, "legacy");
        assert_eq!(gemini.model, "gemini-2.0-flash");
        assert_eq!(gemini.api_base, "http://localhost:9999");
      },
    );
  }

  #[test]
  #[serial]
  fn test_blank_key_means_no_credentials() {
    with_env(&[("GEMINI_API_KEY", "   ")], || {
      assert!(AppConfig::from_env().unwrap().gemini.is_none());
    });
  }

  #[test]
  #[serial]
  fn test_music_and_volume() {
    with_env(&[("MINDFUL_MUSIC", "on"), ("MINDFUL_VOLUME", "0.8")], || {
      let config = AppConfig::from_env().unwrap();
      assert!(config.music_enabled);
      assert_eq!(config.volume, 0.8);
    });
  }

  #[test]
  #[serial]
  fn test_invalid_values_are_rejected() {
    with_env(&[("MINDFUL_MUSIC", "loud")], || {
      assert!(matches!(
        AppConfig::from_env(),
        Err(ConfigError::Invalid { key, .. }) if key == "MINDFUL_MUSIC"
      ));
    });
    with_env(&[("MINDFUL_VOLUME", "1.5")], || {
      assert!(AppConfig::from_env().is_err());
    });
  }
}

//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Recording audio backend
//! - Scriptable insight provider
//! - Mock data factories
//! - Helper assertions

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::audio::{AudioBackend, AudioError};
use crate::config::GeminiConfig;
use crate::events::{EventReceiver, SessionEvent};
use crate::insight::InsightProvider;
use crate::llm::{LlmError, GEMINI_MODEL};
use crate::models::{InsightRecord, MoodType};

/// ---------------------------------------------------------------------------
/// Audio
/// ---------------------------------------------------------------------------

/// Audio backend that counts calls instead of playing anything
#[derive(Debug, Default)]
pub struct RecordingBackend {
  starts: AtomicUsize,
  stops: AtomicUsize,
  fail: bool,
}

impl RecordingBackend {
  /// Backend whose every call reports a device error
  pub fn failing() -> Self {
    Self {
      fail: true,
      ..Self::default()
    }
  }

  pub fn starts(&self) -> usize {
    self.starts.load(Ordering::SeqCst)
  }

  pub fn stops(&self) -> usize {
    self.stops.load(Ordering::SeqCst)
  }

  fn result(&self) -> Result<(), AudioError> {
    if self.fail {
      return Err(AudioError::Device("no output device".to_string()));
    }
    Ok(())
  }
}

impl AudioBackend for RecordingBackend {
  fn start(&self) -> Result<(), AudioError> {
    self.starts.fetch_add(1, Ordering::SeqCst);
    self.result()
  }

  fn stop(&self) -> Result<(), AudioError> {
    self.stops.fetch_add(1, Ordering::SeqCst);
    self.result()
  }

  fn set_gain(&self, _gain: f32) -> Result<(), AudioError> {
    self.result()
  }

  fn set_master_volume(&self, _volume: f32) -> Result<(), AudioError> {
    self.result()
  }
}

/// ---------------------------------------------------------------------------
/// Insight Provider
/// ---------------------------------------------------------------------------

enum StubOutcome {
  Ok(InsightRecord),
  Err(LlmError),
  Panic,
}

/// Provider with a scripted answer and optional latency
pub struct StubProvider {
  outcome: StubOutcome,
  delay: Duration,
  calls: AtomicUsize,
  completed: AtomicUsize,
}

impl StubProvider {
  fn new(outcome: StubOutcome) -> Self {
    Self {
      outcome,
      delay: Duration::ZERO,
      calls: AtomicUsize::new(0),
      completed: AtomicUsize::new(0),
    }
  }

  pub fn ok(insight: InsightRecord) -> Self {
    Self::new(StubOutcome::Ok(insight))
  }

  pub fn failing(error: LlmError) -> Self {
    Self::new(StubOutcome::Err(error))
  }

  /// Provider whose request task panics, so joining it fails
  pub fn panicking() -> Self {
    Self::new(StubOutcome::Panic)
  }

  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }

  /// Requests started
  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  /// Requests that ran to the end of their delay
  pub fn completed(&self) -> usize {
    self.completed.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl InsightProvider for StubProvider {
  async fn request_insight(&self, _mood: MoodType) -> Result<InsightRecord, LlmError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if !self.delay.is_zero() {
      tokio::time::sleep(self.delay).await;
    }
    self.completed.fetch_add(1, Ordering::SeqCst);

    match &self.outcome {
      StubOutcome::Ok(insight) => Ok(insight.clone()),
      StubOutcome::Err(e) => Err(e.clone()),
      StubOutcome::Panic => panic!("stub provider panicked"),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// Create a mock insight record for testing
pub fn mock_insight() -> InsightRecord {
  InsightRecord {
    haiku: "Morning mist rises\nThe pond holds the quiet sky\nOne breath, then the next".to_string(),
    quote: "Breath is the bridge which connects life to consciousness.".to_string(),
    author: "Thich Nhat Hanh".to_string(),
    tip: "Drop your shoulders and let the next exhale be a little longer.".to_string(),
  }
}

/// Gemini settings pointing at a local mock server
pub fn mock_gemini_config(api_base: &str) -> GeminiConfig {
  GeminiConfig {
    api_key: "test-key".to_string(),
    model: GEMINI_MODEL.to_string(),
    api_base: api_base.to_string(),
  }
}

/// A generateContent response carrying `text` as its only part
pub fn gemini_body(text: &str) -> String {
  serde_json::json!({
    "candidates": [{
      "content": {
        "role": "model",
        "parts": [{ "text": text }]
      },
      "finishReason": "STOP"
    }]
  })
  .to_string()
}

/// ---------------------------------------------------------------------------
/// Event Helpers
/// ---------------------------------------------------------------------------

/// Everything queued on the receiver right now
pub fn drain_events(rx: &mut EventReceiver) -> Vec<SessionEvent> {
  let mut events = Vec::new();
  while let Ok(event) = rx.try_recv() {
    events.push(event);
  }
  events
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::events;

  #[test]
  fn test_recording_backend_counts() {
    let backend = RecordingBackend::default();
    backend.start().unwrap();
    backend.stop().unwrap();
    backend.stop().unwrap();
    assert_eq!(backend.starts(), 1);
    assert_eq!(backend.stops(), 2);

    assert!(RecordingBackend::failing().start().is_err());
  }

  #[tokio::test]
  async fn test_stub_provider_counts_calls() {
    let provider = StubProvider::failing(LlmError::MissingApiKey);
    assert!(provider.request_insight(MoodType::Calm).await.is_err());
    assert_eq!(provider.calls(), 1);
    assert_eq!(provider.completed(), 1);
  }

  #[test]
  fn test_drain_events_empties_queue() {
    let (tx, mut rx) = events::channel();
    tx.send(SessionEvent::Countdown { remaining: 3 }).unwrap();
    tx.send(SessionEvent::Countdown { remaining: 2 }).unwrap();
    assert_eq!(drain_events(&mut rx).len(), 2);
    assert!(drain_events(&mut rx).is_empty());
  }

  #[test]
  fn test_gemini_body_shape() {
    let body: serde_json::Value = serde_json::from_str(&gemini_body("hello")).unwrap();
    assert_eq!(body["candidates"][0]["content"]["parts"][0]["text"], "hello");
  }

  #[test]
  fn test_assert_approx_eq_macro() {
    assert_approx_eq!(0.3_f32, 0.3000001_f32, 1e-5);
  }
}

use serde::Serialize;
use std::time::Duration;

/// One labelled segment of a breathing pattern, e.g. an inhale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BreathingPhase {
  pub label: &'static str,
  #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
  pub duration: Duration,
  /// Target scale of the breathing circle at the end of the phase
  pub scale: f32,
  /// Target opacity, 0.0 to 1.0
  pub opacity: f32,
}

impl BreathingPhase {
  pub const fn new(label: &'static str, duration_ms: u64, scale: f32, opacity: f32) -> Self {
    Self {
      label,
      duration: Duration::from_millis(duration_ms),
      scale,
      opacity,
    }
  }
}

/// Ordered, cyclic sequence of phases. After the last phase the pattern
/// starts over at index 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BreathingPattern {
  pub name: &'static str,
  pub description: &'static str,
  pub phases: &'static [BreathingPhase],
}

impl BreathingPattern {
  pub fn len(&self) -> usize {
    self.phases.len()
  }

  pub fn is_empty(&self) -> bool {
    self.phases.is_empty()
  }

  /// Phase at `index`, wrapping around the end of the pattern
  pub fn phase(&self, index: usize) -> Option<&BreathingPhase> {
    if self.phases.is_empty() {
      return None;
    }
    self.phases.get(index % self.phases.len())
  }

  pub fn is_last(&self, index: usize) -> bool {
    index + 1 >= self.phases.len()
  }

  /// Length of one full pass through the pattern
  pub fn cycle_duration(&self) -> Duration {
    self.phases.iter().map(|p| p.duration).sum()
  }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
  s.serialize_u64(d.as_millis() as u64)
}

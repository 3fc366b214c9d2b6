//! Ambient audio
//!
//! Background sound that plays while breathing. Enabling fades the drone in,
//! disabling fades it out and then stops the backend. Every call is
//! idempotent and returns immediately; fades run on the tokio runtime and a
//! newer call always supersedes a fade that is still in flight.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

pub const PLAYING_GAIN: f32 = 0.3;
pub const FADE_IN: Duration = Duration::from_secs(3);
pub const FADE_OUT: Duration = Duration::from_millis(1500);
pub const DEFAULT_VOLUME: f32 = 0.5;
const FADE_STEP: Duration = Duration::from_millis(50);

/// ---------------------------------------------------------------------------
/// Backend
/// ---------------------------------------------------------------------------

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
  #[error("Audio device unavailable: {0}")]
  Device(String),
}

/// Whatever actually produces sound. Errors are logged by the coordinator
/// and never reach the session flow.
pub trait AudioBackend: Send + Sync {
  fn start(&self) -> Result<(), AudioError>;
  fn stop(&self) -> Result<(), AudioError>;
  fn set_gain(&self, gain: f32) -> Result<(), AudioError>;
  fn set_master_volume(&self, volume: f32) -> Result<(), AudioError>;
}

/// Backend that only traces what it would play
#[derive(Debug, Default)]
pub struct SilentBackend;

impl AudioBackend for SilentBackend {
  fn start(&self) -> Result<(), AudioError> {
    trace!("ambient drone started");
    Ok(())
  }

  fn stop(&self) -> Result<(), AudioError> {
    trace!("ambient drone stopped");
    Ok(())
  }

  fn set_gain(&self, gain: f32) -> Result<(), AudioError> {
    trace!(gain, "ambient gain");
    Ok(())
  }

  fn set_master_volume(&self, volume: f32) -> Result<(), AudioError> {
    trace!(volume, "master volume");
    Ok(())
  }
}

/// ---------------------------------------------------------------------------
/// Coordinator
/// ---------------------------------------------------------------------------

#[derive(Debug)]
struct AudioState {
  /// Last requested state
  enabled: bool,
  /// Backend started and not yet stopped (true during a fade-out)
  sounding: bool,
  gain: f32,
  volume: f32,
  /// Bumped on every enable/disable; a fade only applies while it matches
  generation: u64,
  fade: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct AudioCoordinator {
  state: Arc<Mutex<AudioState>>,
  backend: Arc<dyn AudioBackend>,
}

impl std::fmt::Debug for AudioCoordinator {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AudioCoordinator")
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}

impl Default for AudioCoordinator {
  fn default() -> Self {
    Self::new(Arc::new(SilentBackend))
  }
}

impl AudioCoordinator {
  pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
    Self {
      state: Arc::new(Mutex::new(AudioState {
        enabled: false,
        sounding: false,
        gain: 0.0,
        volume: DEFAULT_VOLUME,
        generation: 0,
        fade: None,
      })),
      backend,
    }
  }

  pub fn is_enabled(&self) -> bool {
    self.lock().enabled
  }

  pub fn gain(&self) -> f32 {
    self.lock().gain
  }

  pub fn volume(&self) -> f32 {
    self.lock().volume
  }

  /// Turn ambient sound on or off. Repeating the current value is a no-op.
  pub fn set_enabled(&self, enable: bool) {
    let mut state = self.lock();
    if state.enabled == enable {
      return;
    }

    debug!(enable, "ambient audio");
    state.enabled = enable;
    state.generation += 1;
    if let Some(fade) = state.fade.take() {
      fade.abort();
    }

    if enable && !state.sounding {
      log_failure("start", self.backend.start());
      state.sounding = true;
    }

    let (target, length) = if enable {
      (PLAYING_GAIN, FADE_IN)
    } else {
      (0.0, FADE_OUT)
    };
    let from = state.gain;
    let generation = state.generation;

    match tokio::runtime::Handle::try_current() {
      Ok(handle) => {
        let coordinator = self.clone();
        state.fade = Some(handle.spawn(async move {
          coordinator.run_fade(generation, from, target, length).await;
        }));
      }
      Err(_) => {
        // Outside a runtime there is nothing to ramp on; jump to the end.
        self.apply_gain(&mut state, target);
        if !enable {
          self.stop_backend(&mut state);
        }
      }
    }
  }

  /// Master volume, clamped to 0.0..=1.0
  pub fn set_volume(&self, volume: f32) {
    let volume = volume.clamp(0.0, 1.0);
    let mut state = self.lock();
    state.volume = volume;
    log_failure("set_master_volume", self.backend.set_master_volume(volume));
  }

  async fn run_fade(&self, generation: u64, from: f32, target: f32, length: Duration) {
    let steps = (length.as_millis() / FADE_STEP.as_millis()).max(1) as u32;
    for step in 1..=steps {
      tokio::time::sleep(FADE_STEP).await;
      let mut state = self.lock();
      if state.generation != generation {
        return;
      }
      let progress = step as f32 / steps as f32;
      self.apply_gain(&mut state, from + (target - from) * progress);
    }

    let mut state = self.lock();
    if state.generation != generation {
      return;
    }
    if !state.enabled {
      self.stop_backend(&mut state);
    }
    state.fade = None;
  }

  fn apply_gain(&self, state: &mut AudioState, gain: f32) {
    state.gain = gain;
    log_failure("set_gain", self.backend.set_gain(gain));
  }

  fn stop_backend(&self, state: &mut AudioState) {
    if state.sounding {
      log_failure("stop", self.backend.stop());
      state.sounding = false;
    }
  }

  fn lock(&self) -> MutexGuard<'_, AudioState> {
    self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

fn log_failure(action: &str, result: Result<(), AudioError>) {
  if let Err(e) = result {
    warn!("Audio backend {} failed: {}", action, e);
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::assert_approx_eq;
  use crate::test_utils::RecordingBackend;
  use tokio::time::sleep;

  #[tokio::test(start_paused = true)]
  async fn test_enable_fades_in_to_playing_gain() {
    let backend = Arc::new(RecordingBackend::default());
    let audio = AudioCoordinator::new(backend.clone());

    audio.set_enabled(true);
    assert!(audio.is_enabled());
    assert_eq!(backend.starts(), 1);

    sleep(FADE_IN / 2).await;
    let halfway = audio.gain();
    assert!(halfway > 0.0 && halfway < PLAYING_GAIN, "gain mid-fade was {}", halfway);

    sleep(FADE_IN).await;
    assert_approx_eq!(audio.gain(), PLAYING_GAIN, 1e-6);
  }

  #[tokio::test(start_paused = true)]
  async fn test_repeated_calls_are_no_ops() {
    let backend = Arc::new(RecordingBackend::default());
    let audio = AudioCoordinator::new(backend.clone());

    audio.set_enabled(false);
    audio.set_enabled(false);
    assert_eq!(backend.starts(), 0);
    assert_eq!(backend.stops(), 0);

    audio.set_enabled(true);
    audio.set_enabled(true);
    assert_eq!(backend.starts(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_disable_fades_out_then_stops() {
    let backend = Arc::new(RecordingBackend::default());
    let audio = AudioCoordinator::new(backend.clone());

    audio.set_enabled(true);
    sleep(FADE_IN + FADE_STEP).await;
    audio.set_enabled(false);
    assert!(!audio.is_enabled());
    assert_eq!(backend.stops(), 0, "stop waits for the fade-out");

    sleep(FADE_OUT + FADE_STEP).await;
    assert_eq!(backend.stops(), 1);
    assert_eq!(audio.gain(), 0.0);
  }

  #[tokio::test(start_paused = true)]
  async fn test_reenable_cancels_pending_fade_out() {
    let backend = Arc::new(RecordingBackend::default());
    let audio = AudioCoordinator::new(backend.clone());

    audio.set_enabled(true);
    sleep(FADE_IN + FADE_STEP).await;
    audio.set_enabled(false);
    sleep(FADE_OUT / 3).await;
    audio.set_enabled(true);

    sleep(FADE_OUT * 2).await;
    assert_eq!(backend.stops(), 0, "stale fade-out must not stop the new session's audio");
    assert_eq!(backend.starts(), 1, "backend was still sounding, no restart needed");

    sleep(FADE_IN).await;
    assert_approx_eq!(audio.gain(), PLAYING_GAIN, 1e-6);
  }

  #[test]
  fn test_without_runtime_changes_apply_immediately() {
    let backend = Arc::new(RecordingBackend::default());
    let audio = AudioCoordinator::new(backend.clone());

    audio.set_enabled(true);
    assert_eq!(audio.gain(), PLAYING_GAIN);
    audio.set_enabled(false);
    assert_eq!(audio.gain(), 0.0);
    assert_eq!(backend.stops(), 1);
  }

  #[test]
  fn test_volume_is_clamped() {
    let audio = AudioCoordinator::default();
    audio.set_volume(1.7);
    assert_eq!(audio.volume(), 1.0);
    audio.set_volume(-0.2);
    assert_eq!(audio.volume(), 0.0);
  }

  #[test]
  fn test_backend_errors_are_swallowed() {
    let backend = Arc::new(RecordingBackend::failing());
    let audio = AudioCoordinator::new(backend);
    audio.set_enabled(true);
    audio.set_enabled(false);
    assert!(!audio.is_enabled());
  }
}

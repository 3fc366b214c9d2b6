//! Session orchestrator
//!
//! Sequences a session: Idle -> SelectingDuration -> Breathing ->
//! Generating -> ShowingInsight, with reset back to Idle from anywhere.
//!
//! The insight request is issued the moment breathing begins and runs
//! alongside it. When breathing completes, the Generating state waits for
//! both the prefetched insight and a minimum display time, so the loading
//! state is always visible for at least `MIN_GENERATING_DISPLAY` but adds no
//! provider latency on top of it when the prefetch already finished.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::audio::AudioCoordinator;
use crate::breathing::{run_breathing, BreathingContext, Completion, CompletionReason, FinishSignal};
use crate::catalog::mood_profile;
use crate::duration::{DurationChoice, DurationError, SessionConfig};
use crate::events::{emit, EventSender, SessionEvent};
use crate::insight::{InsightHandle, InsightProvider};
use crate::models::{InsightRecord, MoodProfile, MoodType};

/// Shortest time the Generating state stays on screen
pub const MIN_GENERATING_DISPLAY: Duration = Duration::from_millis(750);

/// ---------------------------------------------------------------------------
/// Session State
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhaseState {
  Idle,
  SelectingDuration,
  Breathing,
  Generating,
  ShowingInsight,
}

impl std::fmt::Display for SessionPhaseState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Idle => write!(f, "idle"),
      Self::SelectingDuration => write!(f, "selecting_duration"),
      Self::Breathing => write!(f, "breathing"),
      Self::Generating => write!(f, "generating"),
      Self::ShowingInsight => write!(f, "showing_insight"),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum SessionError {
  #[error("Cannot {action} while {from}")]
  InvalidTransition {
    from: SessionPhaseState,
    action: &'static str,
  },

  #[error("No mood selected")]
  NoMoodSelected,

  #[error(transparent)]
  Duration(#[from] DurationError),

  #[error("Breathing task failed: {0}")]
  Breathing(String),

  #[error("Insight generation failed: {0}")]
  Insight(String),
}

/// Summary of the breathing part of a session, kept until reset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
  pub mood: MoodType,
  pub requested_ms: u64,
  pub elapsed_ms: u64,
  pub completed_cycles: u32,
  pub reason: CompletionReason,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
}

/// ---------------------------------------------------------------------------
/// Breathing Task Handle
/// ---------------------------------------------------------------------------

struct BreathingHandle {
  task: JoinHandle<Completion>,
  finish: FinishSignal,
}

impl Drop for BreathingHandle {
  fn drop(&mut self) {
    self.task.abort();
  }
}

/// ---------------------------------------------------------------------------
/// Orchestrator
/// ---------------------------------------------------------------------------

pub struct SessionOrchestrator {
  provider: Arc<dyn InsightProvider>,
  audio: AudioCoordinator,
  events: EventSender,
  music: watch::Sender<bool>,

  state: SessionPhaseState,
  mood: Option<MoodProfile>,
  config: Option<SessionConfig>,
  insight: Option<InsightRecord>,
  pending_insight: Option<InsightHandle>,
  breathing: Option<BreathingHandle>,
  report: Option<SessionReport>,
}

impl SessionOrchestrator {
  pub fn new(
    provider: Arc<dyn InsightProvider>,
    audio: AudioCoordinator,
    events: EventSender,
    music_enabled: bool,
  ) -> Self {
    let (music, _) = watch::channel(music_enabled);
    Self {
      provider,
      audio,
      events,
      music,
      state: SessionPhaseState::Idle,
      mood: None,
      config: None,
      insight: None,
      pending_insight: None,
      breathing: None,
      report: None,
    }
  }

  pub fn state(&self) -> SessionPhaseState {
    self.state
  }

  pub fn mood(&self) -> Option<&MoodProfile> {
    self.mood.as_ref()
  }

  pub fn config(&self) -> Option<&SessionConfig> {
    self.config.as_ref()
  }

  pub fn insight(&self) -> Option<&InsightRecord> {
    self.insight.as_ref()
  }

  pub fn report(&self) -> Option<&SessionReport> {
    self.report.as_ref()
  }

  pub fn has_pending_insight(&self) -> bool {
    self.pending_insight.is_some()
  }

  pub fn music_enabled(&self) -> bool {
    *self.music.borrow()
  }

  /// Signal that ends the current breathing loop early. Cloneable, so a
  /// front end can hold it while `complete_breathing` is awaited.
  pub fn finish_signal(&self) -> Option<FinishSignal> {
    self.breathing.as_ref().map(|b| b.finish.clone())
  }

  /// Idle -> SelectingDuration
  pub fn select_mood(&mut self, mood: MoodType) -> Result<(), SessionError> {
    self.expect_state(SessionPhaseState::Idle, "select a mood")?;
    self.mood = Some(mood_profile(mood));
    self.set_state(SessionPhaseState::SelectingDuration);
    Ok(())
  }

  /// SelectingDuration -> Idle
  pub fn back(&mut self) -> Result<(), SessionError> {
    self.expect_state(SessionPhaseState::SelectingDuration, "go back")?;
    self.mood = None;
    self.set_state(SessionPhaseState::Idle);
    Ok(())
  }

  /// SelectingDuration -> Breathing. Starts the insight prefetch and the
  /// breathing loop.
  pub fn select_duration(&mut self, choice: DurationChoice) -> Result<(), SessionError> {
    self.expect_state(SessionPhaseState::SelectingDuration, "select a duration")?;
    let mood = self.mood.ok_or(SessionError::NoMoodSelected)?;
    let config = SessionConfig::from_choice(mood, choice)?;

    info!(mood = %mood.id, duration = %choice.label(), "starting breathing session");
    self.config = Some(config);
    self.set_state(SessionPhaseState::Breathing);

    self.pending_insight = Some(InsightHandle::spawn(self.provider.clone(), mood.id));

    let finish = FinishSignal::default();
    let ctx = BreathingContext {
      config,
      events: self.events.clone(),
      audio: self.audio.clone(),
      music: self.music.subscribe(),
      finish: finish.clone(),
    };
    self.breathing = Some(BreathingHandle {
      task: tokio::spawn(run_breathing(ctx)),
      finish,
    });
    Ok(())
  }

  /// End breathing now, regardless of where in the cycle it is
  pub fn finish_early(&mut self) -> Result<(), SessionError> {
    self.expect_state(SessionPhaseState::Breathing, "finish early")?;
    if let Some(breathing) = &self.breathing {
      breathing.finish.trigger();
    }
    self.audio.set_enabled(false);
    Ok(())
  }

  /// Flip the music preference. Applies immediately while breathing.
  pub fn toggle_music(&mut self) -> bool {
    let enabled = !self.music_enabled();
    self.music.send_replace(enabled);
    if self.state == SessionPhaseState::Breathing {
      self.audio.set_enabled(enabled);
    }
    enabled
  }

  /// Wait for breathing to complete, then run the Generating step.
  ///
  /// Dropping the future while breathing is still running leaves the loop
  /// and its handle in place, so the call can simply be repeated.
  pub async fn complete_breathing(&mut self) -> Result<&InsightRecord, SessionError> {
    self.expect_state(SessionPhaseState::Breathing, "complete breathing")?;
    let joined = match self.breathing.as_mut() {
      Some(breathing) => (&mut breathing.task).await,
      None => {
        error!("Breathing state without a breathing task");
        self.reset();
        return Err(SessionError::Breathing("breathing was never started".to_string()));
      }
    };
    self.breathing = None;
    let completion = match joined {
      Ok(completion) => completion,
      Err(e) => {
        error!("Breathing task failed: {}", e);
        self.reset();
        return Err(SessionError::Breathing(e.to_string()));
      }
    };

    if let Some(config) = &self.config {
      let finished_at = Utc::now();
      let started_at = chrono::Duration::from_std(completion.elapsed)
        .map(|elapsed| finished_at - elapsed)
        .unwrap_or(finished_at);
      self.report = Some(SessionReport {
        mood: config.mood().id,
        requested_ms: config.total().as_millis() as u64,
        elapsed_ms: completion.elapsed.as_millis() as u64,
        completed_cycles: completion.completed_cycles,
        reason: completion.reason,
        started_at,
        finished_at,
      });
    }

    self.generate().await
  }

  /// Breathing -> Generating -> ShowingInsight, or Idle on failure
  async fn generate(&mut self) -> Result<&InsightRecord, SessionError> {
    let Some(mood) = self.mood else {
      self.reset();
      return Err(SessionError::NoMoodSelected);
    };
    self.set_state(SessionPhaseState::Generating);

    let pending = match self.pending_insight.take() {
      Some(handle) => handle,
      None => {
        debug!("no prefetched insight, requesting now");
        InsightHandle::spawn(self.provider.clone(), mood.id)
      }
    };

    let (result, ()) = tokio::join!(pending.wait(), tokio::time::sleep(MIN_GENERATING_DISPLAY));

    match result {
      Ok(insight) => {
        emit(&self.events, SessionEvent::InsightReady(insight.clone()));
        self.set_state(SessionPhaseState::ShowingInsight);
        Ok(&*self.insight.insert(insight))
      }
      Err(e) => {
        error!("Failed to generate insight: {}", e);
        self.reset();
        Err(SessionError::Insight(e.to_string()))
      }
    }
  }

  /// Back to Idle from any state. Cancels breathing and any in-flight
  /// insight request and turns ambient audio off. Safe to call repeatedly.
  pub fn reset(&mut self) {
    self.breathing = None;
    self.pending_insight = None;
    self.mood = None;
    self.config = None;
    self.insight = None;
    self.report = None;
    self.audio.set_enabled(false);
    if self.state != SessionPhaseState::Idle {
      self.set_state(SessionPhaseState::Idle);
    }
  }

  fn expect_state(&self, expected: SessionPhaseState, action: &'static str) -> Result<(), SessionError> {
    if self.state != expected {
      return Err(SessionError::InvalidTransition {
        from: self.state,
        action,
      });
    }
    Ok(())
  }

  fn set_state(&mut self, state: SessionPhaseState) {
    debug!(from = %self.state, to = %state, "session state");
    self.state = state;
    emit(&self.events, SessionEvent::StateChanged { state });
  }
}

impl Drop for SessionOrchestrator {
  fn drop(&mut self) {
    self.audio.set_enabled(false);
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

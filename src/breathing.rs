//! Breathing cycle engine
//!
//! Walks the phases of the active pattern. The mood's own pattern runs for
//! `MIN_MOOD_CYCLES` full passes, after which the session switches to the
//! universal calm pattern for good. Completion is only ever decided at a
//! cycle boundary, so a session never ends halfway through an exhale; the
//! price is a bounded overshoot past the requested length.
//!
//! The state machine is the pure `CycleEngine::advance`. `run_breathing`
//! drives it on the tokio timer alongside the session clock and audio.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::time::{interval_at, sleep, Instant};
use tracing::debug;

use crate::audio::AudioCoordinator;
use crate::catalog::CALM_PATTERN;
use crate::clock::{SessionClock, TICK};
use crate::duration::SessionConfig;
use crate::events::{emit, EventSender, SessionEvent};
use crate::models::{BreathingPattern, BreathingPhase};

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

/// Full passes of the mood pattern before switching to calm
pub const MIN_MOOD_CYCLES: u32 = 2;
/// A cycle boundary with less than this left on the clock ends the session
pub const NEAR_END_THRESHOLD: Duration = Duration::from_secs(5);
/// Ready countdown before breathing starts, one tick per second
pub const READY_TICKS: u32 = 3;

/// ---------------------------------------------------------------------------
/// Cycle State
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivePattern {
  Mood,
  Calm,
}

/// Per-session progress. Starts at zero for every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleState {
  phase_index: usize,
  completed_cycles: u32,
}

impl CycleState {
  pub fn phase_index(&self) -> usize {
    self.phase_index
  }

  pub fn completed_cycles(&self) -> u32 {
    self.completed_cycles
  }

  pub fn active_pattern(&self) -> ActivePattern {
    if self.completed_cycles >= MIN_MOOD_CYCLES {
      ActivePattern::Calm
    } else {
      ActivePattern::Mood
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
  /// Cycle boundary reached close enough to the end of the session
  TimeUp,
  /// The user ended the session
  FinishedEarly,
}

/// Emitted once per session when breathing stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Completion {
  pub reason: CompletionReason,
  pub completed_cycles: u32,
  #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
  pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
  s.serialize_u64(d.as_millis() as u64)
}

/// ---------------------------------------------------------------------------
/// Cycle Engine
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct CycleEngine {
  mood: BreathingPattern,
  calm: BreathingPattern,
  total: Duration,
}

impl CycleEngine {
  pub fn new(config: &SessionConfig) -> Self {
    Self::with_patterns(config.mood().pattern, CALM_PATTERN, config.total())
  }

  pub fn with_patterns(mood: BreathingPattern, calm: BreathingPattern, total: Duration) -> Self {
    Self { mood, calm, total }
  }

  pub fn total(&self) -> Duration {
    self.total
  }

  pub fn pattern(&self, state: &CycleState) -> &BreathingPattern {
    match state.active_pattern() {
      ActivePattern::Mood => &self.mood,
      ActivePattern::Calm => &self.calm,
    }
  }

  pub fn current_phase(&self, state: &CycleState) -> Option<&BreathingPhase> {
    self.pattern(state).phase(state.phase_index)
  }

  /// Step past the current phase.
  ///
  /// At the last phase of the active pattern the cycle count goes up, the
  /// index wraps to 0 and the completion predicate is checked. Anywhere
  /// else only the index moves.
  pub fn advance(&self, state: CycleState, elapsed: Duration) -> (CycleState, Option<Completion>) {
    let pattern = self.pattern(&state);
    if !pattern.is_last(state.phase_index) {
      let next = CycleState {
        phase_index: state.phase_index + 1,
        ..state
      };
      return (next, None);
    }

    let next = CycleState {
      phase_index: 0,
      completed_cycles: state.completed_cycles + 1,
    };
    let completion = self.is_complete(&next, elapsed).then_some(Completion {
      reason: CompletionReason::TimeUp,
      completed_cycles: next.completed_cycles,
      elapsed,
    });
    (next, completion)
  }

  fn is_complete(&self, state: &CycleState, elapsed: Duration) -> bool {
    let remaining = self.total.saturating_sub(elapsed);
    state.completed_cycles >= MIN_MOOD_CYCLES && remaining < NEAR_END_THRESHOLD
  }
}

/// ---------------------------------------------------------------------------
/// Early Finish Signal
/// ---------------------------------------------------------------------------

/// Ends a running breathing loop immediately, regardless of cycle position.
/// Triggering before the loop is waiting still counts.
#[derive(Debug, Clone, Default)]
pub struct FinishSignal(Arc<Notify>);

impl FinishSignal {
  pub fn trigger(&self) {
    self.0.notify_one();
  }

  async fn triggered(&self) {
    self.0.notified().await
  }
}

/// ---------------------------------------------------------------------------
/// Driver
/// ---------------------------------------------------------------------------

pub struct BreathingContext {
  pub config: SessionConfig,
  pub events: EventSender,
  pub audio: AudioCoordinator,
  /// Current music preference, read when breathing starts
  pub music: watch::Receiver<bool>,
  pub finish: FinishSignal,
}

/// Run the Ready countdown and then the breathing loop until the session
/// completes or is finished early. Dropping the future cancels every
/// pending timer.
pub async fn run_breathing(ctx: BreathingContext) -> Completion {
  let BreathingContext {
    config,
    events,
    audio,
    music,
    finish,
  } = ctx;
  let engine = CycleEngine::new(&config);
  let audio = AudioOff(audio);

  for remaining in (1..=READY_TICKS).rev() {
    emit(&events, SessionEvent::Countdown { remaining });
    tokio::select! {
      biased;
      _ = finish.triggered() => {
        let completion = Completion {
          reason: CompletionReason::FinishedEarly,
          completed_cycles: 0,
          elapsed: Duration::ZERO,
        };
        emit(&events, SessionEvent::BreathingComplete(completion));
        return completion;
      }
      _ = sleep(TICK) => {}
    }
  }

  let music_enabled = *music.borrow();
  audio.0.set_enabled(music_enabled);

  let started = Instant::now();
  let mut clock = SessionClock::new(engine.total());
  let mut ticker = interval_at(started + TICK, TICK);
  let mut state = CycleState::default();
  emit_clock(&events, &clock);

  let completion = loop {
    let Some(phase) = engine.current_phase(&state).copied() else {
      break Completion {
        reason: CompletionReason::TimeUp,
        completed_cycles: state.completed_cycles,
        elapsed: started.elapsed(),
      };
    };

    let pattern = engine.pattern(&state);
    emit(
      &events,
      SessionEvent::Phase {
        label: phase.label,
        duration_ms: phase.duration.as_millis() as u64,
        scale: phase.scale,
        opacity: phase.opacity,
        pattern: state.active_pattern(),
        pattern_name: pattern.name,
        cycle: state.completed_cycles,
      },
    );

    let phase_wait = sleep(phase.duration);
    tokio::pin!(phase_wait);
    let finished_early = loop {
      tokio::select! {
        biased;
        _ = finish.triggered() => break true,
        _ = &mut phase_wait => break false,
        _ = ticker.tick(), if clock.is_running() => {
          clock.tick();
          emit_clock(&events, &clock);
        }
      }
    };

    if finished_early {
      break Completion {
        reason: CompletionReason::FinishedEarly,
        completed_cycles: state.completed_cycles,
        elapsed: started.elapsed(),
      };
    }

    let before = state.active_pattern();
    let (next, completion) = engine.advance(state, started.elapsed());
    state = next;

    if state.active_pattern() != before {
      debug!(cycles = state.completed_cycles, "switching to calm pattern");
      emit(
        &events,
        SessionEvent::PatternChanged {
          pattern: state.active_pattern(),
          pattern_name: engine.pattern(&state).name,
        },
      );
    }

    if let Some(completion) = completion {
      break completion;
    }
  };

  clock.cancel();
  drop(audio);
  debug!(?completion, "breathing finished");
  emit(&events, SessionEvent::BreathingComplete(completion));
  completion
}

/// Turns ambient audio off when the driver stops, aborted or not
struct AudioOff(AudioCoordinator);

impl Drop for AudioOff {
  fn drop(&mut self) {
    self.0.set_enabled(false);
  }
}

fn emit_clock(events: &EventSender, clock: &SessionClock) {
  emit(
    events,
    SessionEvent::ClockTick {
      remaining_ms: clock.remaining().as_millis() as u64,
      display: clock.display(),
    },
  );
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

//! Events published to whatever front end is rendering the session

use serde::Serialize;
use tokio::sync::mpsc;

use crate::breathing::{ActivePattern, Completion};
use crate::models::InsightRecord;
use crate::session::SessionPhaseState;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
  StateChanged {
    state: SessionPhaseState,
  },
  /// Ready countdown before the first breath: 3, 2, 1
  Countdown {
    remaining: u32,
  },
  Phase {
    label: &'static str,
    duration_ms: u64,
    scale: f32,
    opacity: f32,
    pattern: ActivePattern,
    pattern_name: &'static str,
    cycle: u32,
  },
  PatternChanged {
    pattern: ActivePattern,
    pattern_name: &'static str,
  },
  ClockTick {
    remaining_ms: u64,
    display: String,
  },
  BreathingComplete(Completion),
  InsightReady(InsightRecord),
}

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
  mpsc::unbounded_channel()
}

/// Send an event; a front end that has gone away is not an error.
pub(crate) fn emit(events: &EventSender, event: SessionEvent) {
  let _ = events.send(event);
}

//! Session clock
//!
//! Whole-session countdown shown next to the breathing circle. The clock is
//! a plain value; the breathing driver owns the interval that ticks it.

use std::time::Duration;

pub const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClock {
  remaining: Duration,
  running: bool,
}

impl SessionClock {
  pub fn new(total: Duration) -> Self {
    Self {
      remaining: total,
      running: !total.is_zero(),
    }
  }

  pub fn remaining(&self) -> Duration {
    self.remaining
  }

  pub fn is_running(&self) -> bool {
    self.running
  }

  /// Take one second off the clock. Floors at zero and stops itself there.
  /// Returns false if the clock was already stopped.
  pub fn tick(&mut self) -> bool {
    if !self.running {
      return false;
    }
    if self.remaining <= TICK {
      self.remaining = Duration::ZERO;
      self.running = false;
    } else {
      self.remaining -= TICK;
    }
    true
  }

  /// Stop immediately; later ticks are ignored.
  pub fn cancel(&mut self) {
    self.running = false;
  }

  pub fn display(&self) -> String {
    format_time(self.remaining)
  }
}

/// Render remaining time as `m:ss`, rounding partial seconds up.
///
/// 125000ms -> "2:05", 59999ms -> "1:00", 0ms -> "0:00".
pub fn format_time(remaining: Duration) -> String {
  let millis = remaining.as_millis();
  let total_seconds = millis.div_ceil(1000);
  let minutes = total_seconds / 60;
  let seconds = total_seconds % 60;
  format!("{}:{:02}", minutes, seconds)
}

//! Terminal front end
//!
//! Runs one session from the command line: the mood and duration come from
//! flags, events are printed as they arrive and Ctrl+C finishes breathing
//! early instead of killing the process.

use clap::Parser;
use std::time::Duration;
use tracing::info;

use crate::audio::AudioCoordinator;
use crate::catalog::MOODS;
use crate::config::AppConfig;
use crate::duration::DurationChoice;
use crate::events::{self, EventReceiver, SessionEvent};
use crate::insight::provider_from_config;
use crate::models::{InsightRecord, MoodType};
use crate::session::{SessionError, SessionOrchestrator, SessionPhaseState};

#[derive(Parser, Debug)]
#[command(name = "mindful-moments", version, about)]
pub struct Args {
  /// How you feel right now: calm, anxious, creative, tired, stressed, angry
  #[arg(short, long)]
  pub mood: Option<MoodType>,

  /// Session length: 30s, 1m, 3m or a number of minutes
  #[arg(short, long, default_value = "1m")]
  pub duration: DurationChoice,

  /// Custom length in minutes (1-60), overrides --duration
  #[arg(long)]
  pub minutes: Option<u32>,

  /// Play ambient sound while breathing
  #[arg(long)]
  pub music: bool,

  /// List the moods and their breathing patterns
  #[arg(long)]
  pub list: bool,
}

impl Args {
  fn duration_choice(&self) -> DurationChoice {
    match self.minutes {
      Some(minutes) => DurationChoice::CustomMinutes(minutes),
      None => self.duration,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Session Runner
/// ---------------------------------------------------------------------------

pub async fn run(args: Args, config: AppConfig) -> Result<(), SessionError> {
  if args.list {
    print!("{}", catalog_listing());
    return Ok(());
  }
  let Some(mood) = args.mood else {
    eprint!("Pick a mood with --mood:\n\n{}", catalog_listing());
    return Err(SessionError::NoMoodSelected);
  };

  let provider = provider_from_config(&config);
  let audio = AudioCoordinator::default();
  audio.set_volume(config.volume);

  let (tx, rx) = events::channel();
  let printer = tokio::spawn(print_events(rx));

  let mut session = SessionOrchestrator::new(provider, audio, tx, args.music || config.music_enabled);
  session.select_mood(mood)?;
  session.select_duration(args.duration_choice())?;

  let ctrl_c = session.finish_signal().map(|finish| {
    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        finish.trigger();
      }
    })
  });

  let result = session.complete_breathing().await.map(|_| ());
  if let Some(task) = ctrl_c {
    task.abort();
  }

  if let Some(report) = session.report() {
    info!(
      mood = %report.mood,
      cycles = report.completed_cycles,
      elapsed_ms = report.elapsed_ms,
      reason = ?report.reason,
      "session finished"
    );
  }

  session.reset();
  drop(session);
  let _ = printer.await;
  result
}

async fn print_events(mut rx: EventReceiver) {
  let mut view = EventView::default();
  while let Some(event) = rx.recv().await {
    if let Some(line) = view.render(&event) {
      println!("{}", line);
    }
  }
}

/// ---------------------------------------------------------------------------
/// Rendering
/// ---------------------------------------------------------------------------

/// Turns session events into terminal lines
#[derive(Debug, Default)]
struct EventView {
  remaining: String,
}

impl EventView {
  fn render(&mut self, event: &SessionEvent) -> Option<String> {
    match event {
      SessionEvent::Countdown { remaining } => Some(format!("准备 (Ready)... {}", remaining)),
      SessionEvent::ClockTick { display, .. } => {
        self.remaining = display.clone();
        None
      }
      SessionEvent::Phase {
        label,
        duration_ms,
        pattern_name,
        ..
      } => Some(format!(
        "{:>5}  {:<8} {:>2}s   {}",
        self.remaining,
        label,
        Duration::from_millis(*duration_ms).as_secs(),
        pattern_name
      )),
      SessionEvent::PatternChanged { pattern_name, .. } => Some(format!("-- {} --", pattern_name)),
      SessionEvent::BreathingComplete(completion) => Some(format!(
        "\n结束 (Done): {} cycles in {}s",
        completion.completed_cycles,
        completion.elapsed.as_secs()
      )),
      SessionEvent::StateChanged {
        state: SessionPhaseState::Generating,
      } => Some("正在生成感悟 (Curating your insight)...".to_string()),
      SessionEvent::StateChanged { .. } => None,
      SessionEvent::InsightReady(insight) => Some(format_insight(insight)),
    }
  }
}

fn format_insight(insight: &InsightRecord) -> String {
  format!(
    "\n{}\n\n\"{}\"\n  - {}\n\n提示 (Tip): {}\n",
    insight.haiku, insight.quote, insight.author, insight.tip
  )
}

fn catalog_listing() -> String {
  let mut out = String::new();
  for profile in MOODS.iter() {
    out.push_str(&format!(
      "{:<9} {:<18} {:>2}s cycle  {}\n",
      profile.id.as_str(),
      profile.pattern.name,
      profile.pattern.cycle_duration().as_secs(),
      profile.pattern.description
    ));
  }
  out
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

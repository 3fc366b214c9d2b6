//! Pattern catalog
//!
//! Static mood profiles and the universal calm pattern every session
//! settles into once the mood pattern has run its minimum cycles.

use crate::models::{BreathingPattern, BreathingPhase, MoodProfile, MoodType};

pub const INHALE: &str = "吸气 (Inhale)";
pub const HOLD: &str = "屏息 (Hold)";
pub const EXHALE: &str = "呼气 (Exhale)";

/// ---------------------------------------------------------------------------
/// Universal Calm Pattern
/// ---------------------------------------------------------------------------

/// 4s in, 6s out
pub const CALM_PATTERN: BreathingPattern = BreathingPattern {
  name: "回归平静 (Calming Down)",
  description: "平稳呼吸",
  phases: &[
    BreathingPhase::new(INHALE, 4000, 2.2, 1.0),
    BreathingPhase::new(EXHALE, 6000, 1.0, 0.6),
  ],
};

/// ---------------------------------------------------------------------------
/// Mood Profiles
/// ---------------------------------------------------------------------------

pub const MOODS: [MoodProfile; 6] = [
  MoodProfile {
    id: MoodType::Calm,
    label: "平静 (Calm)",
    pattern: BreathingPattern {
      name: "共鸣呼吸 (Resonance)",
      description: "平衡身心",
      phases: &[
        BreathingPhase::new(INHALE, 5000, 2.2, 1.0),
        BreathingPhase::new(EXHALE, 5000, 1.0, 0.6),
      ],
    },
  },
  MoodProfile {
    id: MoodType::Anxious,
    label: "焦虑 (Anxious)",
    pattern: BreathingPattern {
      name: "4-7-8 呼吸法",
      description: "缓解焦虑",
      phases: &[
        BreathingPhase::new(INHALE, 4000, 2.2, 1.0),
        BreathingPhase::new(HOLD, 7000, 2.2, 1.0),
        BreathingPhase::new(EXHALE, 8000, 1.0, 0.6),
      ],
    },
  },
  MoodProfile {
    id: MoodType::Creative,
    label: "灵感 (Creative)",
    pattern: BreathingPattern {
      name: "流动呼吸 (Flow)",
      description: "激活思维",
      phases: &[
        BreathingPhase::new(INHALE, 4000, 2.4, 1.0),
        BreathingPhase::new(HOLD, 2000, 2.4, 1.0),
        BreathingPhase::new(EXHALE, 4000, 1.0, 0.6),
        BreathingPhase::new(HOLD, 1000, 1.0, 0.6),
      ],
    },
  },
  MoodProfile {
    id: MoodType::Tired,
    label: "疲惫 (Tired)",
    pattern: BreathingPattern {
      name: "充能呼吸 (Energy)",
      description: "唤醒身体",
      phases: &[
        BreathingPhase::new(INHALE, 6000, 2.5, 1.0),
        BreathingPhase::new(HOLD, 2000, 2.5, 1.0),
        BreathingPhase::new(EXHALE, 4000, 1.0, 0.6),
      ],
    },
  },
  MoodProfile {
    id: MoodType::Stressed,
    label: "压力 (Stressed)",
    pattern: BreathingPattern {
      name: "箱式呼吸 (Box)",
      description: "重获掌控",
      phases: &[
        BreathingPhase::new(INHALE, 4000, 2.2, 1.0),
        BreathingPhase::new(HOLD, 4000, 2.2, 1.0),
        BreathingPhase::new(EXHALE, 4000, 1.0, 0.6),
        BreathingPhase::new(HOLD, 4000, 1.0, 0.6),
      ],
    },
  },
  MoodProfile {
    id: MoodType::Angry,
    label: "愤怒 (Angry)",
    pattern: BreathingPattern {
      name: "释放呼吸 (Release)",
      description: "平息怒火",
      phases: &[
        BreathingPhase::new(INHALE, 4000, 2.4, 1.0),
        BreathingPhase::new(HOLD, 2000, 2.4, 1.0),
        BreathingPhase::new(EXHALE, 8000, 1.0, 0.6),
      ],
    },
  },
];

/// Look up the profile for a mood
pub fn mood_profile(mood: MoodType) -> MoodProfile {
  // MOODS covers every variant
  MOODS
    .iter()
    .find(|m| m.id == mood)
    .copied()
    .unwrap_or(MOODS[0])
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::pattern::BreathingPattern;

/// The closed set of moods a session can be keyed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodType {
  Calm,
  Anxious,
  Tired,
  Creative,
  Stressed,
  Angry,
}

impl MoodType {
  pub const ALL: [MoodType; 6] = [
    MoodType::Calm,
    MoodType::Anxious,
    MoodType::Creative,
    MoodType::Tired,
    MoodType::Stressed,
    MoodType::Angry,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Calm => "calm",
      Self::Anxious => "anxious",
      Self::Tired => "tired",
      Self::Creative => "creative",
      Self::Stressed => "stressed",
      Self::Angry => "angry",
    }
  }
}

impl std::fmt::Display for MoodType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for MoodType {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "calm" => Ok(Self::Calm),
      "anxious" => Ok(Self::Anxious),
      "tired" => Ok(Self::Tired),
      "creative" => Ok(Self::Creative),
      "stressed" => Ok(Self::Stressed),
      "angry" => Ok(Self::Angry),
      _ => Err(format!("Unknown mood: {}", s)),
    }
  }
}

/// A selectable mood and the breathing pattern it prescribes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MoodProfile {
  pub id: MoodType,
  pub label: &'static str,
  pub pattern: BreathingPattern,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_mood_from_str_ignores_case() {
    assert_eq!("Anxious".parse::<MoodType>(), Ok(MoodType::Anxious));
    assert_eq!(" tired ".parse::<MoodType>(), Ok(MoodType::Tired));
  }

  #[test]
  fn test_mood_from_str_rejects_unknown() {
    assert!("sleepy".parse::<MoodType>().is_err());
  }

  #[test]
  fn test_mood_round_trips_through_display() {
    for mood in MoodType::ALL {
      assert_eq!(mood.to_string().parse::<MoodType>(), Ok(mood));
    }
  }
}

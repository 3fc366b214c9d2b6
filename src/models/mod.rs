pub mod insight;
pub mod mood;
pub mod pattern;

pub use insight::InsightRecord;
pub use mood::{MoodProfile, MoodType};
pub use pattern::{BreathingPattern, BreathingPhase};

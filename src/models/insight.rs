use serde::{Deserialize, Serialize};

/// The text shown once breathing ends. Produced once per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightRecord {
  pub haiku: String,
  pub quote: String,
  pub author: String,
  /// A small, actionable mindfulness tip
  pub tip: String,
}

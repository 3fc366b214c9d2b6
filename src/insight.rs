//! Insight provider
//!
//! The one network-bound step of a session. Providers may be slow or fail;
//! `generate_insight` absorbs every failure into a fixed fallback record so
//! a session is never blocked or aborted by insight generation.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::llm::{GeminiClient, LlmError};
use crate::models::{InsightRecord, MoodType};

/// Simulated latency of the demo provider
pub const DEMO_DELAY: Duration = Duration::from_millis(500);
/// Longest any provider may take before the fallback is used
pub const INSIGHT_TIMEOUT: Duration = Duration::from_secs(30);

/// ---------------------------------------------------------------------------
/// Fallback Records
/// ---------------------------------------------------------------------------

/// Shown when no API credentials are configured
pub fn demo_insight() -> InsightRecord {
  InsightRecord {
    haiku: "静坐听雨声\n心随流水去\n自在观浮云".to_string(),
    quote: "心若冰清，天塌不惊。".to_string(),
    author: "古语".to_string(),
    tip: "闭上眼睛，深呼吸三次，感受空气流过鼻尖。".to_string(),
  }
}

/// Shown when the provider call fails
pub fn fallback_insight() -> InsightRecord {
  InsightRecord {
    haiku: "山中有古树\n岁岁叶常青\n此心亦如是".to_string(),
    quote: "万物静观皆自得。".to_string(),
    author: "程颢".to_string(),
    tip: "试着看向窗外，寻找一种绿色的植物，观察它的细节。".to_string(),
  }
}

/// ---------------------------------------------------------------------------
/// Providers
/// ---------------------------------------------------------------------------

#[async_trait]
pub trait InsightProvider: Send + Sync {
  async fn request_insight(&self, mood: MoodType) -> Result<InsightRecord, LlmError>;
}

#[async_trait]
impl InsightProvider for GeminiClient {
  async fn request_insight(&self, mood: MoodType) -> Result<InsightRecord, LlmError> {
    self.generate_insight(mood).await
  }
}

/// Stand-in used when no API key is configured
#[derive(Debug, Clone)]
pub struct DemoProvider {
  delay: Duration,
}

impl Default for DemoProvider {
  fn default() -> Self {
    Self { delay: DEMO_DELAY }
  }
}

#[async_trait]
impl InsightProvider for DemoProvider {
  async fn request_insight(&self, _mood: MoodType) -> Result<InsightRecord, LlmError> {
    tokio::time::sleep(self.delay).await;
    Ok(demo_insight())
  }
}

/// Pick the Gemini client when credentials exist, the demo provider otherwise
pub fn provider_from_config(config: &AppConfig) -> Arc<dyn InsightProvider> {
  let Some(gemini) = config.gemini.as_ref() else {
    warn!("No API key found, using demo insights");
    return Arc::new(DemoProvider::default());
  };

  match GeminiClient::new(gemini) {
    Ok(client) => {
      info!(model = %gemini.model, "using Gemini for insights");
      Arc::new(client)
    }
    Err(e) => {
      warn!("Gemini client unavailable ({}), using demo insights", e);
      Arc::new(DemoProvider::default())
    }
  }
}

/// Ask the provider for an insight, substituting the fallback on failure
/// or after `INSIGHT_TIMEOUT`. Never returns an error.
pub async fn generate_insight(provider: &dyn InsightProvider, mood: MoodType) -> InsightRecord {
  match timeout(INSIGHT_TIMEOUT, provider.request_insight(mood)).await {
    Ok(Ok(insight)) => insight,
    Ok(Err(LlmError::MissingApiKey)) => {
      warn!("Insight provider has no credentials, using demo insight");
      demo_insight()
    }
    Ok(Err(e)) => {
      warn!("Insight generation failed for {}: {}", mood, e);
      fallback_insight()
    }
    Err(_) => {
      warn!("Insight generation for {} timed out after {:?}", mood, INSIGHT_TIMEOUT);
      fallback_insight()
    }
  }
}

/// ---------------------------------------------------------------------------
/// Prefetch Handle
/// ---------------------------------------------------------------------------

/// An insight request running in the background. Dropping the handle
/// cancels the request.
#[derive(Debug)]
pub struct InsightHandle {
  mood: MoodType,
  task: JoinHandle<InsightRecord>,
}

impl InsightHandle {
  pub fn spawn(provider: Arc<dyn InsightProvider>, mood: MoodType) -> Self {
    let task = tokio::spawn(async move { generate_insight(provider.as_ref(), mood).await });
    Self { mood, task }
  }

  pub fn mood(&self) -> MoodType {
    self.mood
  }

  pub fn is_finished(&self) -> bool {
    self.task.is_finished()
  }

  /// Wait for the record. Only fails if the task panicked or was aborted.
  pub async fn wait(mut self) -> Result<InsightRecord, JoinError> {
    (&mut self.task).await
  }
}

impl Drop for InsightHandle {
  fn drop(&mut self) {
    self.task.abort();
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::{mock_insight, StubProvider};
  use tokio::time::Instant;

  #[tokio::test]
  async fn test_success_passes_through() {
    let provider = StubProvider::ok(mock_insight());
    assert_eq!(generate_insight(&provider, MoodType::Calm).await, mock_insight());
  }

  #[tokio::test]
  async fn test_failure_uses_fallback() {
    let provider = StubProvider::failing(LlmError::Request("connection refused".to_string()));
    assert_eq!(generate_insight(&provider, MoodType::Anxious).await, fallback_insight());
  }

  #[tokio::test]
  async fn test_missing_credentials_uses_demo_record() {
    let provider = StubProvider::failing(LlmError::MissingApiKey);
    assert_eq!(generate_insight(&provider, MoodType::Anxious).await, demo_insight());
  }

  #[tokio::test(start_paused = true)]
  async fn test_stalled_provider_times_out_to_fallback() {
    let provider = StubProvider::ok(mock_insight()).with_delay(Duration::from_secs(24 * 3600));
    let start = Instant::now();
    let insight = generate_insight(&provider, MoodType::Stressed).await;
    assert_eq!(insight, fallback_insight());
    assert_eq!(start.elapsed(), INSIGHT_TIMEOUT);
    assert_eq!(provider.completed(), 0);
  }

  #[test]
  fn test_fallbacks_are_complete_and_distinct() {
    for record in [demo_insight(), fallback_insight()] {
      assert!(!record.haiku.is_empty());
      assert!(!record.quote.is_empty());
      assert!(!record.author.is_empty());
      assert!(!record.tip.is_empty());
    }
    assert_ne!(demo_insight(), fallback_insight());
  }

  #[tokio::test(start_paused = true)]
  async fn test_demo_provider_waits_then_answers() {
    let start = Instant::now();
    let insight = generate_insight(&DemoProvider::default(), MoodType::Tired).await;
    assert_eq!(start.elapsed(), DEMO_DELAY);
    assert_eq!(insight, demo_insight());
  }

  #[tokio::test(start_paused = true)]
  async fn test_handle_runs_in_background() {
    let provider = Arc::new(StubProvider::ok(mock_insight()).with_delay(Duration::from_secs(2)));
    let handle = InsightHandle::spawn(provider.clone(), MoodType::Stressed);
    assert_eq!(handle.mood(), MoodType::Stressed);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(handle.is_finished());
    assert_eq!(provider.calls(), 1);

    let start = Instant::now();
    assert_eq!(handle.wait().await.unwrap(), mock_insight());
    assert_eq!(start.elapsed(), Duration::ZERO);
  }

  #[tokio::test(start_paused = true)]
  async fn test_dropping_handle_cancels_request() {
    let provider = Arc::new(StubProvider::ok(mock_insight()).with_delay(Duration::from_secs(2)));
    let handle = InsightHandle::spawn(provider.clone(), MoodType::Calm);
    tokio::task::yield_now().await;
    drop(handle);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(provider.completed(), 0);
  }
}

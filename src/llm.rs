//! LLM integration for insight generation
//!
//! This module handles communication with the Gemini API. Requests ask for
//! JSON constrained by a response schema so the reply maps straight onto an
//! `InsightRecord`.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::GeminiConfig;
use crate::models::{InsightRecord, MoodType};

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const GEMINI_MODEL: &str = "gemini-2.5-flash";
/// Per-request limit covering connect, send and body read
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

const SYSTEM_PROMPT: &str = "You are a Zen master and creative muse. Your goal is to provide comfort, \
inspiration, and grounding. Keep the tone gentle, poetic, and minimalist.";

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug, Clone)]
pub enum LlmError {
  #[error("API key not configured")]
  MissingApiKey,

  #[error("Request failed: {0}")]
  Request(String),

  #[error("API error: {0}")]
  Api(String),

  #[error("Parse error: {0}")]
  Parse(String),
}

/// ---------------------------------------------------------------------------
/// Gemini API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
  system_instruction: Content,
  contents: Vec<Content>,
  generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
  #[serde(skip_serializing_if = "Option::is_none")]
  role: Option<String>,
  #[serde(default)]
  parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
  text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  response_mime_type: String,
  response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
  usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
  content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
  pub prompt_token_count: Option<u32>,
  pub candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
  error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
  message: String,
}

/// Schema the model's JSON reply must follow
fn insight_schema() -> serde_json::Value {
  json!({
    "type": "OBJECT",
    "properties": {
      "haiku": {
        "type": "STRING",
        "description": "A soothing haiku relevant to the user's mood (in Chinese)."
      },
      "quote": {
        "type": "STRING",
        "description": "A famous or philosophical quote (in Chinese)."
      },
      "author": {
        "type": "STRING",
        "description": "The author of the quote."
      },
      "tip": {
        "type": "STRING",
        "description": "A small, actionable mindfulness tip (in Chinese)."
      }
    },
    "required": ["haiku", "quote", "author", "tip"]
  })
}

/// ---------------------------------------------------------------------------
/// Gemini Client
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GeminiClient {
  client: Client,
  api_key: String,
  endpoint: Url,
}

impl GeminiClient {
  pub fn new(config: &GeminiConfig) -> Result<Self, LlmError> {
    if config.api_key.trim().is_empty() {
      return Err(LlmError::MissingApiKey);
    }

    // Without a trailing slash `join` would replace the last path segment
    let base = if config.api_base.ends_with('/') {
      config.api_base.clone()
    } else {
      format!("{}/", config.api_base)
    };
    let endpoint = Url::parse(&base)
      .and_then(|base| base.join(&format!("v1beta/models/{}:generateContent", config.model)))
      .map_err(|e| LlmError::Request(format!("Invalid API base {}: {}", config.api_base, e)))?;

    let client = Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .build()
      .map_err(|e| LlmError::Request(e.to_string()))?;

    Ok(Self {
      client,
      api_key: config.api_key.clone(),
      endpoint,
    })
  }

  pub fn endpoint(&self) -> &Url {
    &self.endpoint
  }

  /// Call Gemini with a system prompt and user message, asking for JSON
  /// matching `schema`. Returns the text of the first candidate.
  pub async fn complete(
    &self,
    system_prompt: &str,
    user_message: &str,
    schema: serde_json::Value,
  ) -> Result<String, LlmError> {
    let request = GenerateRequest {
      system_instruction: Content {
        role: None,
        parts: vec![Part {
          text: Some(system_prompt.to_string()),
        }],
      },
      contents: vec![Content {
        role: Some("user".to_string()),
        parts: vec![Part {
          text: Some(user_message.to_string()),
        }],
      }],
      generation_config: GenerationConfig {
        response_mime_type: "application/json".to_string(),
        response_schema: schema,
      },
    };

    let response = self
      .client
      .post(self.endpoint.clone())
      .header("x-goog-api-key", &self.api_key)
      .header("content-type", "application/json")
      .json(&request)
      .send()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    if !status.is_success() {
      // Try to parse error response
      if let Ok(error_resp) = serde_json::from_str::<GeminiErrorResponse>(&body) {
        return Err(LlmError::Api(error_resp.error.message));
      }
      return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
    }

    let gemini_response: GenerateResponse =
      serde_json::from_str(&body).map_err(|e| LlmError::Parse(e.to_string()))?;

    if let Some(usage) = &gemini_response.usage_metadata {
      debug!(
        prompt_tokens = ?usage.prompt_token_count,
        output_tokens = ?usage.candidates_token_count,
        "gemini usage"
      );
    }

    gemini_response
      .candidates
      .into_iter()
      .filter_map(|c| c.content)
      .flat_map(|c| c.parts)
      .find_map(|p| p.text.filter(|t| !t.trim().is_empty()))
      .ok_or_else(|| LlmError::Parse("Empty response from AI".to_string()))
  }

  /// Ask for a haiku, quote and tip suited to the mood
  pub async fn generate_insight(&self, mood: MoodType) -> Result<InsightRecord, LlmError> {
    let user_message = format!(
      "User is feeling: {}. Generate a soothing insight in Chinese.",
      mood
    );

    let response_text = self
      .complete(SYSTEM_PROMPT, &user_message, insight_schema())
      .await?;

    let json_str = extract_json(&response_text)?;

    serde_json::from_str(&json_str).map_err(|e| LlmError::Parse(format!("{}: {}", e, json_str)))
  }
}

/// Extract JSON from the model's response (handles markdown code blocks)
fn extract_json(text: &str) -> Result<String, LlmError> {
  // Try direct parse first
  if text.trim().starts_with('{') {
    return Ok(text.trim().to_string());
  }

  // Look for JSON in code blocks
  if let Some(start) = text.find("```json") {
    let start = start + 7;
    if let Some(end) = text[start..].find("```") {
      return Ok(text[start..start + end].trim().to_string());
    }
  }

  // Look for plain code blocks
  if let Some(start) = text.find("```") {
    let start = start + 3;
    // Skip language identifier if present
    let content_start = text[start..]
      .find('\n')
      .map(|i| start + i + 1)
      .unwrap_or(start);
    if let Some(end) = text[content_start..].find("```") {
      return Ok(text[content_start..content_start + end].trim().to_string());
    }
  }

  // Last resort: find first { to last }
  if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
    if start < end {
      return Ok(text[start..=end].to_string());
    }
  }

  Err(LlmError::Parse("Could not extract JSON from response".to_string()))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

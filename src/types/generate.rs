//! Payloads for the `generate` endpoint

use crate::types::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Completion request for a single prompt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,

    /// Overrides the system prompt of the model file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Overrides the prompt template of the model file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    /// Context returned by a previous response, for short conversational memory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<i64>>,

    /// Response format; currently only `"json"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Skip template formatting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<bool>,

    /// Base64-encoded images for multimodal models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,

    /// Model parameters such as `temperature`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,

    /// Set by the client: `true` for streaming calls, `false` otherwise
    #[serde(default)]
    pub stream: bool,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_options(mut self, options: serde_json::Value) -> Self {
        self.options = Some(options);
        self
    }
}

/// One generation result; a streaming call yields one per token batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub model: String,

    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,

    pub response: String,

    pub done: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,

    /// Encoded conversation state; present on the final object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<i64>>,

    #[serde(flatten)]
    pub metrics: Metrics,
}

/// Timing and token counts reported with the final object. Durations are in
/// nanoseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_duration: Option<u64>,
}

impl Metrics {
    /// Generated tokens per second, when both counts are known
    pub fn tokens_per_second(&self) -> Option<f64> {
        match (self.eval_count, self.eval_duration) {
            (Some(count), Some(duration)) if duration > 0 => {
                Some(count as f64 / (duration as f64 / 1_000_000_000.0))
            }
            _ => None,
        }
    }
}

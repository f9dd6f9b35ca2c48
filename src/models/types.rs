//! Type definitions for model management
//!
//! Payloads for listing, inspecting, copying, deleting, pulling and
//! pushing models, plus the progress objects streamed by pull and push.

use crate::types::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Information about an installed model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model name (e.g., "llama3.1:8b")
    pub name: String,

    /// Model size in bytes
    pub size: u64,

    /// Last modification time
    #[serde(with = "timestamp")]
    pub modified_at: DateTime<Utc>,

    /// Model digest/hash
    pub digest: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ModelDetails>,
}

/// Detailed model information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDetails {
    /// Model format (e.g., "gguf")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Model family (e.g., "llama", "qwen2")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    /// Parameter size (e.g., "7B", "13B")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_size: Option<String>,

    /// Quantization level (e.g., "Q4_0", "Q4_K_M")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantization_level: Option<String>,
}

/// Response from the `tags` endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelListResponse {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelShowRequest {
    pub name: String,
}

/// Model file contents and metadata from the `show` endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelShowResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modelfile: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ModelDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelCopyRequest {
    pub source: String,
    pub destination: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDeleteRequest {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelPullRequest {
    pub name: String,

    /// Allow insecure connections to the registry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Always `true` on the wire; pulls are streamed
    #[serde(default)]
    pub stream: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelPushRequest {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Always `true` on the wire; pushes are streamed
    #[serde(default)]
    pub stream: bool,
}

macro_rules! named_request {
    ($($ty:ident),*) => {
        $(impl $ty {
            pub fn new(name: impl Into<String>) -> Self {
                Self { name: name.into(), ..Default::default() }
            }
        })*
    };
}

named_request!(ModelShowRequest, ModelDeleteRequest, ModelPullRequest, ModelPushRequest);

impl ModelCopyRequest {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

/// Progress update streamed during pull and push
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressResponse {
    /// Status message
    pub status: String,

    /// Digest of the layer being transferred
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    /// Total bytes to transfer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,

    /// Bytes completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<u64>,
}

impl ProgressResponse {
    /// Completed share of the current layer in `0.0..=1.0`
    pub fn fraction(&self) -> Option<f64> {
        match (self.completed, self.total) {
            (Some(completed), Some(total)) if total > 0 => {
                Some((completed as f64 / total as f64).min(1.0))
            }
            _ => None,
        }
    }

    /// The server reports `"success"` as the last status of a transfer
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

impl ModelInfo {
    /// Format the model size in human-readable format
    pub fn formatted_size(&self) -> String {
        format_size(self.size)
    }

    /// Get a short description of the model
    pub fn description(&self) -> String {
        if let Some(ref details) = self.details {
            let parts: Vec<&str> = [&details.parameter_size, &details.quantization_level]
                .into_iter()
                .filter_map(|p| p.as_deref())
                .collect();

            if !parts.is_empty() {
                return parts.join(" ");
            }
        }

        self.formatted_size()
    }
}

impl fmt::Display for ModelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.formatted_size())
    }
}

impl fmt::Display for ProgressResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.completed, self.total) {
            (Some(completed), Some(total)) => write!(
                f,
                "{} {}/{}",
                self.status,
                format_size(completed),
                format_size(total)
            ),
            _ => write!(f, "{}", self.status),
        }
    }
}

/// Format bytes into human-readable size
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let base: f64 = 1024.0;
    let exponent = (bytes as f64).log(base).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);

    let size = bytes as f64 / base.powi(exponent as i32);

    format!("{:.2} {}", size, UNITS[exponent])
}

//! ollamakit - async client for a local Ollama-compatible inference server
//!
//! Covers text generation, chat, model management and embeddings. Long
//! running operations (generate, chat, pull, push) can be consumed as
//! newline-delimited JSON streams that decode objects as bytes arrive.
//!
//! # Architecture
//!
//! - **request**: endpoint table and request construction
//! - **client**: unary calls and typed operations
//! - **streaming**: NDJSON line buffer and cancelable stream executor
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use ollamakit::{GenerateRequest, OllamaClient};
//!
//! # async fn run() -> ollamakit::Result<()> {
//! let client = OllamaClient::new("127.0.0.1:11434")?;
//! let mut stream = client.generate_stream(&GenerateRequest::new("llama3", "Hello"))?;
//! while let Some(chunk) = stream.next().await {
//!     print!("{}", chunk?.response);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod endpoint;
pub mod errors;
pub mod models;
pub mod request;
pub mod streaming;
pub mod types;

// Re-export commonly used types
pub use client::OllamaClient;
pub use config::{ClientConfig, DEFAULT_HOST};
pub use endpoint::Endpoint;
pub use errors::{ClientError, Result};
pub use models::{
    ModelCopyRequest, ModelDeleteRequest, ModelInfo, ModelListResponse, ModelPullRequest,
    ModelPushRequest, ModelShowRequest, ModelShowResponse, ProgressResponse,
};
pub use streaming::{CancelHandle, NdjsonStream};
pub use types::{
    ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse, GenerateRequest,
    GenerateResponse, Message, Role,
};

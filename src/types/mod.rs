//! Type definitions module
//!
//! Request and response payloads for generation, chat and embeddings.

pub mod chat;
pub mod embeddings;
pub mod generate;
pub mod timestamp;

// Re-export commonly used types
pub use chat::{ChatRequest, ChatResponse, Message, Role};
pub use embeddings::{EmbeddingRequest, EmbeddingResponse};
pub use generate::{GenerateRequest, GenerateResponse, Metrics};

//! Model management module
//!
//! Payloads for the model endpoints:
//! - Listing installed models
//! - Showing model details
//! - Copying and deleting models
//! - Pulling and pushing models, with streamed progress

pub mod types;

// Re-export key types for convenience
pub use types::{
    format_size, ModelCopyRequest, ModelDeleteRequest, ModelDetails, ModelInfo,
    ModelListResponse, ModelPullRequest, ModelPushRequest, ModelShowRequest, ModelShowResponse,
    ProgressResponse,
};

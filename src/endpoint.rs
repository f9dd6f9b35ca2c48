//! Fixed endpoint table of the server API

use reqwest::Method;
use std::fmt;

/// One API operation: path segment, HTTP method, and whether the server
/// can answer it with an NDJSON stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Generate,
    Chat,
    Tags,
    Show,
    Copy,
    Delete,
    Pull,
    Push,
    Embeddings,
}

impl Endpoint {
    pub const ALL: [Endpoint; 9] = [
        Endpoint::Generate,
        Endpoint::Chat,
        Endpoint::Tags,
        Endpoint::Show,
        Endpoint::Copy,
        Endpoint::Delete,
        Endpoint::Pull,
        Endpoint::Push,
        Endpoint::Embeddings,
    ];

    /// Path segment appended to the API prefix
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Generate => "generate",
            Endpoint::Chat => "chat",
            Endpoint::Tags => "tags",
            Endpoint::Show => "show",
            Endpoint::Copy => "copy",
            Endpoint::Delete => "delete",
            Endpoint::Pull => "pull",
            Endpoint::Push => "push",
            Endpoint::Embeddings => "embeddings",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Endpoint::Tags => Method::GET,
            Endpoint::Delete => Method::DELETE,
            _ => Method::POST,
        }
    }

    pub fn supports_streaming(&self) -> bool {
        matches!(
            self,
            Endpoint::Generate | Endpoint::Chat | Endpoint::Pull | Endpoint::Push
        )
    }

    /// Endpoints whose success carries no body worth decoding
    pub fn is_success_only(&self) -> bool {
        matches!(self, Endpoint::Copy | Endpoint::Delete)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method(), self.path())
    }
}

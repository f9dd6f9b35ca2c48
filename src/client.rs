//! Ollama API client
//!
//! Provides every endpoint of the server API over HTTP/1.1 via reqwest:
//! - Unary calls: one JSON body in, one JSON body out
//! - Streaming calls: NDJSON bodies surfaced as [`NdjsonStream`]
//! - Success is status 200 only; every other status is `BadServerResponse`

use crate::config::{ClientConfig, DEFAULT_HOST};
use crate::endpoint::Endpoint;
use crate::errors::{bad_server_response, ClientError, Result};
use crate::models::{
    ModelCopyRequest, ModelDeleteRequest, ModelListResponse, ModelPullRequest, ModelPushRequest,
    ModelShowRequest, ModelShowResponse, ProgressResponse,
};
use crate::request::RequestBuilder;
use crate::streaming::NdjsonStream;
use crate::types::{
    ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse, GenerateRequest,
    GenerateResponse,
};
use reqwest::{Client, Request, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Client for one inference server
///
/// Cloning is cheap; clones share the underlying connection pool and
/// nothing else.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: Client,
    requests: RequestBuilder,
}

impl OllamaClient {
    /// Create client for a `host:port` string
    ///
    /// Fails with `InvalidHost` if the host does not form a valid URL.
    pub fn new(host: &str) -> Result<Self> {
        Self::from_config(&ClientConfig::default().with_host(host))
    }

    /// Create client for `127.0.0.1:8080`
    pub fn local() -> Result<Self> {
        Self::new(DEFAULT_HOST)
    }

    /// Create client from configuration
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ClientError::TransportError)?;

        Self::with_http_client(&config.host, http)
    }

    /// Create client on top of a caller-configured transport
    pub fn with_http_client(host: &str, http: Client) -> Result<Self> {
        let base_url = crate::config::base_url(host)?;
        tracing::debug!(%base_url, "created Ollama client");

        Ok(Self {
            http,
            requests: RequestBuilder::new(base_url),
        })
    }

    /// Base URL including the API prefix
    pub fn base_url(&self) -> &Url {
        self.requests.base_url()
    }

    // Generate

    pub async fn generate(&self, payload: &GenerateRequest) -> Result<GenerateResponse> {
        let body = GenerateRequest {
            stream: false,
            ..payload.clone()
        };
        self.call(Endpoint::Generate, &body).await
    }

    pub fn generate_stream(&self, payload: &GenerateRequest) -> Result<NdjsonStream<GenerateResponse>> {
        let body = GenerateRequest {
            stream: true,
            ..payload.clone()
        };
        self.stream(Endpoint::Generate, &body)
    }

    // Chat

    pub async fn chat(&self, payload: &ChatRequest) -> Result<ChatResponse> {
        let body = ChatRequest {
            stream: false,
            ..payload.clone()
        };
        self.call(Endpoint::Chat, &body).await
    }

    pub fn chat_stream(&self, payload: &ChatRequest) -> Result<NdjsonStream<ChatResponse>> {
        let body = ChatRequest {
            stream: true,
            ..payload.clone()
        };
        self.stream(Endpoint::Chat, &body)
    }

    // Models

    /// List installed models
    pub async fn model_list(&self) -> Result<ModelListResponse> {
        let request = self.requests.build_empty(&self.http, Endpoint::Tags)?;
        let response = self.send(request).await?;
        decode_body(response).await
    }

    pub async fn model_show(&self, payload: &ModelShowRequest) -> Result<ModelShowResponse> {
        self.call(Endpoint::Show, payload).await
    }

    /// Copy a model; success carries no content
    pub async fn model_copy(&self, payload: &ModelCopyRequest) -> Result<()> {
        self.call_no_content(Endpoint::Copy, payload).await
    }

    /// Delete a model; success carries no content
    pub async fn model_delete(&self, payload: &ModelDeleteRequest) -> Result<()> {
        self.call_no_content(Endpoint::Delete, payload).await
    }

    /// Download a model, streaming progress objects
    pub fn model_pull(&self, payload: &ModelPullRequest) -> Result<NdjsonStream<ProgressResponse>> {
        let body = ModelPullRequest {
            stream: true,
            ..payload.clone()
        };
        self.stream(Endpoint::Pull, &body)
    }

    /// Upload a model, streaming progress objects
    pub fn model_push(&self, payload: &ModelPushRequest) -> Result<NdjsonStream<ProgressResponse>> {
        let body = ModelPushRequest {
            stream: true,
            ..payload.clone()
        };
        self.stream(Endpoint::Push, &body)
    }

    // Embeddings

    pub async fn embeddings(&self, payload: &EmbeddingRequest) -> Result<EmbeddingResponse> {
        self.call(Endpoint::Embeddings, payload).await
    }

    // Executors

    /// Unary round trip decoding one JSON object
    async fn call<P, R>(&self, endpoint: Endpoint, payload: &P) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = self.requests.build(&self.http, endpoint, payload)?;
        let response = self.send(request).await?;
        decode_body(response).await
    }

    /// Unary round trip where status 200 alone is success
    async fn call_no_content<P: Serialize + ?Sized>(&self, endpoint: Endpoint, payload: &P) -> Result<()> {
        debug_assert!(endpoint.is_success_only());
        let request = self.requests.build(&self.http, endpoint, payload)?;
        self.send(request).await?;
        Ok(())
    }

    /// Lazy NDJSON stream; nothing is sent until the first poll
    fn stream<P, R>(&self, endpoint: Endpoint, payload: &P) -> Result<NdjsonStream<R>>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug_assert!(endpoint.supports_streaming());
        let request = self.requests.build(&self.http, endpoint, payload)?;
        Ok(NdjsonStream::new(self.http.clone(), request))
    }

    /// Send a request and check the status
    async fn send(&self, request: Request) -> Result<Response> {
        let method = request.method().clone();
        let url = request.url().clone();
        tracing::debug!(%method, %url, "issuing request");

        let response = self.http.execute(request).await?;
        check_status(response).await
    }
}

/// Pass through status 200; anything else becomes `BadServerResponse`
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(response);
    }

    tracing::warn!(%status, url = %response.url(), "unexpected status");
    Err(bad_server_response(response).await)
}

/// Read the whole body and decode it as one JSON object
async fn decode_body<R: DeserializeOwned>(response: Response) -> Result<R> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::DecodeError)
}

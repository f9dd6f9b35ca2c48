//! Request construction
//!
//! Turns an endpoint and a payload into a transport request. Pure: nothing
//! is sent here.

use crate::endpoint::Endpoint;
use crate::errors::{ClientError, Result};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Request, Url};
use serde::Serialize;

/// Content type sent with every request
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Builds requests against a fixed base URL
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: Url,
}

impl RequestBuilder {
    /// `base_url` must end with the API prefix and a trailing slash
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for an endpoint
    pub fn url(&self, endpoint: Endpoint) -> Result<Url> {
        self.base_url
            .join(endpoint.path())
            .map_err(|e| ClientError::InvalidHost {
                host: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    /// Build a request carrying a JSON body
    pub fn build<P: Serialize + ?Sized>(
        &self,
        http: &Client,
        endpoint: Endpoint,
        payload: &P,
    ) -> Result<Request> {
        let body = serde_json::to_vec(payload).map_err(ClientError::EncodeError)?;
        self.build_raw(http, endpoint, Some(body))
    }

    /// Build a request with no body (e.g. listing tags)
    pub fn build_empty(&self, http: &Client, endpoint: Endpoint) -> Result<Request> {
        self.build_raw(http, endpoint, None)
    }

    fn build_raw(&self, http: &Client, endpoint: Endpoint, body: Option<Vec<u8>>) -> Result<Request> {
        let url = self.url(endpoint)?;
        let mut builder = http
            .request(endpoint.method(), url)
            .header(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

        if let Some(body) = body {
            builder = builder.body(body);
        }

        builder.build().map_err(ClientError::TransportError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::base_url;
    use reqwest::Method;
    use serde_json::json;

    fn builder() -> RequestBuilder {
        RequestBuilder::new(base_url("127.0.0.1:8080").unwrap())
    }

    #[test]
    fn test_url_for_every_endpoint() {
        let builder = builder();
        for endpoint in Endpoint::ALL {
            let url = builder.url(endpoint).unwrap();
            assert_eq!(
                url.as_str(),
                format!("http://127.0.0.1:8080/api/{}", endpoint.path())
            );
        }
    }

    #[test]
    fn test_build_sets_method_header_and_body() {
        let http = Client::new();
        let payload = json!({"model": "llama3", "prompt": "hi"});

        for endpoint in Endpoint::ALL {
            let request = builder().build(&http, endpoint, &payload).unwrap();

            assert_eq!(request.method(), endpoint.method());
            assert_eq!(
                request.headers().get(CONTENT_TYPE).unwrap(),
                "application/json; charset=utf-8"
            );

            let body = request.body().and_then(|b| b.as_bytes()).unwrap();
            let decoded: serde_json::Value = serde_json::from_slice(body).unwrap();
            assert_eq!(decoded, payload);
        }
    }

    #[test]
    fn test_build_empty() {
        let request = builder().build_empty(&Client::new(), Endpoint::Tags).unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.url().as_str(), "http://127.0.0.1:8080/api/tags");
        assert!(request.headers().contains_key(CONTENT_TYPE));
        assert!(request.body().is_none());
    }
}

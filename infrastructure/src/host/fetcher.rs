//! HTTP client behind the `fetch` capability.

use luaext_application::{FetchRequest, FetchResponse, HostError};
use reqwest::Method;
use std::time::Duration;
use tracing::debug;

/// Upper bound for one request, connect to last byte.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, HostError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("luaext/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HostError::Request(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, HostError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| HostError::Request(format!("invalid method: {}", request.method)))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| HostError::Request(format!("{}: {}", request.url, e)))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| HostError::Request(format!("{}: {}", request.url, e)))?
            .to_vec();

        debug!(url = %request.url, status, "Fetched");
        Ok(FetchResponse {
            status,
            content_type,
            body,
        })
    }
}

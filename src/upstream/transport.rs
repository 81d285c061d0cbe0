//! `reqwest`-backed [`Transport`].

use async_trait::async_trait;
use reqwest::{header, Client};

use super::{FetchError, FetchRequest, Transport, UpstreamResponse};

/// Production transport over a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with a default client (no global timeout).
    pub fn new() -> Self {
        Self::default()
    }
}

/// Map a client error onto the transport-independent kinds.
fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(err.to_string())
    } else if let Some(status) = err.status() {
        FetchError::Status(status.as_u16())
    } else {
        FetchError::Network(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: FetchRequest<'_>) -> Result<UpstreamResponse, FetchError> {
        let mut builder = self.client.get(request.url);

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(agent) = request.user_agent {
            builder = builder.header(header::USER_AGENT, agent);
        }

        let response = builder
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(classify)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // The request timeout also covers reading the body.
        let body = response.bytes().await.map_err(classify)?;

        Ok(UpstreamResponse {
            status,
            content_type,
            body: body.to_vec(),
        })
    }
}

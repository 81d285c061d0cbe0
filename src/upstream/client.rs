//! Endpoint-aware client for the JioSaavn API.

use std::sync::Arc;
use std::time::Duration;

use super::retry::{fetch_with_retry, RetryPolicy};
use super::{Endpoint, FetchError, FetchRequest, Transport, UpstreamResponse};
use crate::config::Config;

/// Builds upstream URLs and applies the right fetch policy per endpoint.
#[derive(Clone)]
pub struct SaavnClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    retry_policy: RetryPolicy,
    single_shot_timeout: Duration,
}

impl SaavnClient {
    /// Create a client for `base_url`.
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        retry_policy: RetryPolicy,
        single_shot_timeout: Duration,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            transport,
            base_url,
            retry_policy,
            single_shot_timeout,
        }
    }

    /// Create a client from the application configuration.
    pub fn from_config(config: &Config, transport: Arc<dyn Transport>) -> Self {
        Self::new(
            transport,
            config.upstream_base_url.as_str(),
            config.retry_policy,
            config.single_shot_timeout,
        )
    }

    /// Upstream base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full upstream URL for `query` on `endpoint`.
    pub fn endpoint_url(&self, endpoint: Endpoint, query: &str) -> String {
        let mut url = format!(
            "{}{}?query={}",
            self.base_url,
            endpoint.path(),
            urlencoding::encode(query)
        );
        if endpoint.wants_lyrics() {
            url.push_str("&lyrics=true");
        }
        url
    }

    /// Fetch `query` from `endpoint`.
    ///
    /// Search and song go through [`fetch_with_retry`]; the other endpoints
    /// get a single attempt with a fixed timeout.
    pub async fn fetch(
        &self,
        endpoint: Endpoint,
        query: &str,
    ) -> Result<UpstreamResponse, FetchError> {
        let url = self.endpoint_url(endpoint, query);

        if endpoint.is_retrying() {
            return fetch_with_retry(self.transport.as_ref(), &url, &self.retry_policy).await;
        }

        tracing::debug!(
            %endpoint,
            timeout_ms = self.single_shot_timeout.as_millis() as u64,
            "Sending upstream request"
        );
        self.transport
            .get(FetchRequest {
                url: &url,
                timeout: Some(self.single_shot_timeout),
                user_agent: None,
            })
            .await
    }
}

impl std::fmt::Debug for SaavnClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaavnClient")
            .field("base_url", &self.base_url)
            .field("retry_policy", &self.retry_policy)
            .field("single_shot_timeout", &self.single_shot_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::testing::MockTransport;

    fn client(transport: Arc<MockTransport>) -> SaavnClient {
        SaavnClient::new(
            transport,
            "http://upstream.test/",
            RetryPolicy {
                max_retries: 3,
                initial_timeout: Duration::from_millis(50),
                ..RetryPolicy::default()
            },
            Duration::from_secs(10),
        )
    }

    #[test]
    fn test_endpoint_urls() {
        let client = client(Arc::new(MockTransport::new()));

        assert_eq!(
            client.endpoint_url(Endpoint::Search, "tum hi ho"),
            "http://upstream.test/result/?query=tum%20hi%20ho"
        );
        assert_eq!(
            client.endpoint_url(Endpoint::Song, "https://www.jiosaavn.com/song/x"),
            "http://upstream.test/song/?query=https%3A%2F%2Fwww.jiosaavn.com%2Fsong%2Fx&lyrics=true"
        );
        assert_eq!(
            client.endpoint_url(Endpoint::Playlist, "a&b"),
            "http://upstream.test/playlist/?query=a%26b&lyrics=true"
        );
        assert_eq!(
            client.endpoint_url(Endpoint::Album, "x"),
            "http://upstream.test/album/?query=x&lyrics=true"
        );
        assert_eq!(
            client.endpoint_url(Endpoint::Lyrics, "x"),
            "http://upstream.test/lyrics/?query=x"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_shot_endpoint_does_not_retry_timeouts() {
        let transport = Arc::new(MockTransport::new().always_timeout());
        let client = client(transport.clone());

        let err = client.fetch(Endpoint::Lyrics, "x").await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(transport.call_count(), 1);
        assert_eq!(transport.timeouts(), vec![Some(Duration::from_secs(10))]);
        assert_eq!(transport.calls()[0].user_agent, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrying_endpoint_retries_timeouts() {
        let transport = Arc::new(MockTransport::new().then_timeout().then_json("{}"));
        let client = client(transport.clone());

        client.fetch(Endpoint::Song, "x").await.unwrap();

        assert_eq!(transport.call_count(), 2);
    }
}

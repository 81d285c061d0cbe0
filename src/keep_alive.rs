//! Keeps the upstream host from falling asleep.
//!
//! The upstream idles out after roughly fifteen minutes without traffic, and
//! the next request then pays for a cold start. Pinging the base URL on a
//! shorter interval avoids that.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::scheduler::{JobResult, SchedulerJob};
use crate::upstream::{FetchRequest, Transport};

/// Best-effort GET of the upstream base URL.
pub struct KeepAliveJob {
    transport: Arc<dyn Transport>,
    url: String,
    interval: Duration,
}

impl KeepAliveJob {
    /// Ping `<base_url>/` every `interval`.
    pub fn new(transport: Arc<dyn Transport>, base_url: &str, interval: Duration) -> Self {
        Self {
            transport,
            url: format!("{}/", base_url.trim_end_matches('/')),
            interval,
        }
    }

    /// URL that gets pinged.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one ping. Failures are logged and never returned.
    pub async fn ping(&self) {
        tracing::info!(url = %self.url, "Pinging upstream to prevent cold start");

        let request = FetchRequest {
            url: &self.url,
            timeout: None,
            user_agent: None,
        };

        match self.transport.get(request).await {
            Ok(response) => {
                tracing::info!(status = response.status, "Cold start prevention successful");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cold start prevention failed");
            }
        }
    }
}

#[async_trait]
impl SchedulerJob for KeepAliveJob {
    fn name(&self) -> &'static str {
        "KeepAlive"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn execute(&self) -> JobResult {
        self.ping().await;
        Ok(())
    }
}

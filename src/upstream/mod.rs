//! Access to the unofficial JioSaavn API.
//!
//! Fetching goes through the [`Transport`] trait so that errors arrive as an
//! explicit [`FetchError`] kind rather than a client-specific error, and so
//! that tests can script the upstream.

mod client;
mod retry;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

pub use client::SaavnClient;
pub use retry::{fetch_with_retry, RetryPolicy};
pub use transport::HttpTransport;

/// User-Agent sent on retried requests.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// A single GET issued to the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    /// `None` leaves the transport default in place.
    pub timeout: Option<Duration>,
    pub user_agent: Option<&'a str>,
}

/// A successful (2xx) upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Why an upstream fetch failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Connecting or reading the response exceeded the timeout.
    #[error("{0}")]
    Timeout(String),

    /// The upstream answered with a non-2xx status.
    #[error("Request failed with status code {0}")]
    Status(u16),

    /// DNS, connection, TLS or body errors.
    #[error("{0}")]
    Network(String),
}

impl FetchError {
    /// Whether waiting and trying again could help.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Issues GET requests against the upstream.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one GET. Non-2xx statuses are reported as [`FetchError::Status`].
    async fn get(&self, request: FetchRequest<'_>) -> Result<UpstreamResponse, FetchError>;
}

/// Upstream routes exposed by the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Search,
    Song,
    Playlist,
    Album,
    Lyrics,
}

impl Endpoint {
    /// Name used in the missing-parameter message.
    pub fn name(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Song => "song",
            Self::Playlist => "playlist",
            Self::Album => "album",
            Self::Lyrics => "lyrics",
        }
    }

    /// Path on the upstream, relative to the base URL.
    pub fn path(self) -> &'static str {
        match self {
            Self::Search => "/result/",
            Self::Song => "/song/",
            Self::Playlist => "/playlist/",
            Self::Album => "/album/",
            Self::Lyrics => "/lyrics/",
        }
    }

    /// Whether the upstream should also include lyrics.
    pub fn wants_lyrics(self) -> bool {
        matches!(self, Self::Song | Self::Playlist | Self::Album)
    }

    /// Search and song absorb upstream cold starts; the rest get one shot.
    pub fn is_retrying(self) -> bool {
        matches!(self, Self::Search | Self::Song)
    }

    /// Generic message returned when the fetch fails.
    pub fn failure_message(self) -> &'static str {
        match self {
            Self::Search => "Failed to fetch data from JioSaavn API",
            Self::Song => "Failed to fetch song data from JioSaavn API",
            Self::Playlist => "Failed to fetch playlist data from JioSaavn API",
            Self::Album => "Failed to fetch album data from JioSaavn API",
            Self::Lyrics => "Failed to fetch lyrics from JioSaavn API",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

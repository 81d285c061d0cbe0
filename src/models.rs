//! Shared application types.

use serde::{Deserialize, Serialize};

use crate::upstream::SaavnClient;

/// State shared by all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub upstream: SaavnClient,
}

/// The `?query=` parameter accepted by every proxy route.
#[derive(Debug, Default, Deserialize)]
pub struct ProxyQuery {
    pub query: Option<String>,
}

/// A search hit reduced to what a player needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimplifiedSong {
    pub name: String,
    pub artist: String,
    pub album: String,
    /// Cover art URL, or empty.
    pub image: String,
    /// Never empty.
    pub song_url: String,
}

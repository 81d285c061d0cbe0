//! Score backend - a thin proxy in front of an unofficial JioSaavn API.
//!
//! Search and song lookups ride out upstream cold starts with escalating
//! timeouts and capped exponential backoff; playlist, album and lyrics
//! lookups get a single bounded attempt. A background job pings the upstream
//! so it stays awake.

pub mod api;
pub mod config;
pub mod error;
pub mod keep_alive;
pub mod models;
pub mod normalize;
pub mod rate_limit;
pub mod scheduler;
pub mod upstream;

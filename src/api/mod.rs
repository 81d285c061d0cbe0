//! HTTP API.

pub mod health;
pub mod search;

//! GitHub REST adapter
//!
//! Implements the code-host client port over the v3 JSON API. Rate limits
//! and transport failures surface as the opaque upstream error; no retry
//! or backoff happens here.

pub mod client;
pub mod types;

pub use client::GithubClient;

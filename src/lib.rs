//! TimeWarp: location- and era-aware storytelling over a streaming relay.
//!
//! A caller supplies a place and a historical era; the relay builds a prompt,
//! opens a streaming chat-completion request against the configured
//! provider, and forwards decoded text deltas as they arrive.
//!
//! # Modules
//!
//! - [`story`]: request types, the `data:` frame decoder, and the streaming relay
//! - [`prompt`] / [`era`]: prompt templates and the era catalogue
//! - [`geo`]: edge → device → default location fallback chain
//! - [`capsule`] / [`db`]: capped store of saved narratives in SQLite
//! - [`settings`] / [`provider`]: user settings and the provider/model tables
//! - [`server`] / [`routes`]: axum HTTP surface
//! - [`config`]: configuration from TOML files and environment variables

pub mod capsule;
pub mod config;
pub mod db;
pub mod era;
pub mod geo;
pub mod prompt;
pub mod provider;
pub mod routes;
pub mod server;
pub mod settings;
pub mod story;

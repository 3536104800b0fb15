//! Shared core for Stratagem services: the resilient completion client that
//! wraps the upstream chat-completion endpoint, the best-effort JSON repair
//! stage, and the structured API error shape served to clients.

pub mod client;
pub mod error;
pub mod repair;
pub mod transport;
pub mod types;

pub use client::CompletionClient;
pub use error::CompletionError;
pub use types::{ChatMessage, CompletionRequest, RetryPolicy, StrategyDocument};

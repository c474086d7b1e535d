//! Error types for the live-sync layer
//!
//! Only the realtime channel surfaces errors to the caller, and only at
//! construction time; cache and navigation misses are encoded in return
//! values, and runtime channel failures are handled internally by the
//! reconnect machinery.

use thiserror::Error;

// == Channel Error Enum ==
/// Errors surfaced by the realtime channel.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The configured endpoint is not a websocket URL
    #[error("invalid websocket url: {0}")]
    InvalidUrl(String),
}

// == Result Type Alias ==
/// Convenience Result type for the live-sync layer.
pub type Result<T> = std::result::Result<T, ChannelError>;

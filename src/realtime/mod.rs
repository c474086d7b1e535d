//! Realtime Module
//!
//! Resilient push channel for server-sent file-system change events:
//! connection state machine, exponential-backoff reconnect, heartbeat
//! and listener fan-out.

mod backoff;
mod channel;
mod event;

// Re-export public types
pub use backoff::ReconnectPolicy;
pub use channel::{
    ChannelConfig, ConnectionStatus, ListenerId, RealtimeChannel, HEARTBEAT_INTERVAL, WILDCARD,
};
pub use event::{ClientMessage, FileSystemEvent, FileSystemEventKind};

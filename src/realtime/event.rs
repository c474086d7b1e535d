//! Realtime Wire Types
//!
//! JSON frames exchanged with the push endpoint. Server frames carry a
//! file-system change event; client frames either set the watched
//! folder or send a heartbeat ping.

use serde::{Deserialize, Serialize};

// == Event Kind ==
/// Kind of change reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileSystemEventKind {
    Upload,
    Delete,
    Create,
    Move,
    Rename,
    /// Heartbeat reply
    Pong,
}

impl FileSystemEventKind {
    /// Wire name of the kind, used as the listener registration key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Delete => "delete",
            Self::Create => "create",
            Self::Move => "move",
            Self::Rename => "rename",
            Self::Pong => "pong",
        }
    }
}

// == File System Event ==
/// A server-pushed change notification. Transient: consumed once by
/// listeners, never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSystemEvent {
    #[serde(rename = "type")]
    pub kind: FileSystemEventKind,
    /// Folder the change applies to, when the event is folder-scoped
    #[serde(rename = "folderId", default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<i64>,
    pub message: String,
    /// Event-specific payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Server timestamp (Unix milliseconds)
    pub timestamp: i64,
}

// == Client Message ==
/// Frames sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Declares which folder the client is currently browsing, so the
    /// server can scope its notifications.
    SetFolder {
        #[serde(rename = "folderId")]
        folder_id: Option<i64>,
    },
    /// Heartbeat keep-alive.
    Ping,
}

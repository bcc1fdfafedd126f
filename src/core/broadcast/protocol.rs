//! WebSocket message envelope
//!
//! Every frame is a JSON object tagged by `type`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message sent from a client
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Keepalive
    Ping,
    /// Ask for a fresh snapshot
    Snapshot {
        #[serde(rename = "requestId", default)]
        request_id: Option<String>,
    },
    /// Command forwarded to the bridge
    Command {
        #[serde(rename = "requestId")]
        request_id: String,
        command: String,
        #[serde(default)]
        params: Value,
    },
}

/// Message sent to a client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection acknowledgement
    Connected {
        #[serde(rename = "clientId")]
        client_id: String,
        timestamp: i64,
    },
    /// Current subscription-relevant state
    Snapshot {
        #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        data: Value,
    },
    /// Relayed real-time update
    Update { data: Value, timestamp: i64 },
    /// Answer to a command
    CommandResult {
        #[serde(rename = "requestId")]
        request_id: String,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Pong { timestamp: i64 },
    Error { code: String, message: String },
}

impl ServerMessage {
    /// Wrap a raw payload from the update source. JSON payloads are
    /// embedded as-is, anything else as a string.
    pub fn update(payload: &str) -> Self {
        let data = serde_json::from_str(payload)
            .unwrap_or_else(|_| Value::String(payload.to_string()));
        ServerMessage::Update {
            data,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

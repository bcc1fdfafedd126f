//! Real-time update fan-out over WebSocket
//!
//! Updates published on the store's update channel are relayed to every
//! connected client. Client commands go to the Telegram-client bridge.

pub mod bridge;
pub mod hub;
pub mod protocol;


pub use bridge::{BridgeClient, DisabledBridge, HttpBridge, bridge_from_config};
pub use hub::{BroadcastStats, ClientId, ClientInfo, UpdateBroadcaster};
pub use protocol::{ClientMessage, ServerMessage};

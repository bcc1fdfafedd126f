//! Connected WebSocket clients and fan-out

use super::bridge::BridgeClient;
use super::protocol::{ClientMessage, ServerMessage};
use crate::storage::StorageLayer;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outbound frames buffered per client before new ones are dropped
pub const CLIENT_BUFFER_SIZE: usize = 256;

/// Identifier of one WebSocket connection
pub type ClientId = Uuid;

#[derive(Debug)]
struct ClientHandle {
    subject: String,
    connected_at: DateTime<Utc>,
    sender: mpsc::Sender<String>,
}

/// Public view of a connected client
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub id: ClientId,
    pub subject: String,
    pub connected_at: DateTime<Utc>,
}

/// Broadcaster counters
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastStats {
    pub connected_clients: usize,
    pub messages_broadcast: u64,
    pub frames_dropped: u64,
}

/// Fans update messages out to every connected client.
///
/// Each client owns a bounded queue drained by its socket task. A full
/// queue drops the frame for that client only; a closed queue removes
/// the client.
#[derive(Debug)]
pub struct UpdateBroadcaster {
    clients: DashMap<ClientId, ClientHandle>,
    bridge: Arc<dyn BridgeClient>,
    broadcast_count: AtomicU64,
    dropped: AtomicU64,
}

impl UpdateBroadcaster {
    pub fn new(bridge: Arc<dyn BridgeClient>) -> Self {
        Self {
            clients: DashMap::new(),
            bridge,
            broadcast_count: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn bridge(&self) -> &Arc<dyn BridgeClient> {
        &self.bridge
    }

    /// Register an authenticated client.
    ///
    /// The returned queue already holds the connection acknowledgement.
    /// The current snapshot follows once the bridge answers, so a slow
    /// bridge never delays the WebSocket upgrade.
    pub fn connect(self: &Arc<Self>, subject: &str) -> (ClientId, mpsc::Receiver<String>) {
        let id = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel(CLIENT_BUFFER_SIZE);

        let connected = ServerMessage::Connected {
            client_id: id.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        };
        if let Some(frame) = encode(&connected) {
            let _ = sender.try_send(frame);
        }

        self.clients.insert(
            id,
            ClientHandle {
                subject: subject.to_string(),
                connected_at: Utc::now(),
                sender,
            },
        );
        info!(
            "WebSocket client {} connected as {} ({} total)",
            id,
            subject,
            self.clients.len()
        );

        let hub = Arc::clone(self);
        tokio::spawn(async move {
            let snapshot = hub.snapshot_message(None).await;
            hub.send_to(&id, &snapshot);
        });
        (id, receiver)
    }

    pub fn disconnect(&self, id: &ClientId) -> bool {
        let removed = self.clients.remove(id).is_some();
        if removed {
            info!(
                "WebSocket client {} disconnected ({} remaining)",
                id,
                self.clients.len()
            );
        }
        removed
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn clients(&self) -> Vec<ClientInfo> {
        let mut clients: Vec<ClientInfo> = self
            .clients
            .iter()
            .map(|entry| ClientInfo {
                id: *entry.key(),
                subject: entry.subject.clone(),
                connected_at: entry.connected_at,
            })
            .collect();
        clients.sort_by_key(|c| c.connected_at);
        clients
    }

    /// Send a message to every client, returning how many accepted it
    pub fn broadcast(&self, message: &ServerMessage) -> usize {
        let Some(frame) = encode(message) else {
            return 0;
        };
        self.broadcast_count.fetch_add(1, Ordering::Relaxed);

        let mut delivered = 0;
        let mut closed = Vec::new();
        for entry in self.clients.iter() {
            match entry.sender.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    debug!("Client {} is lagging, dropping frame", entry.key());
                }
                Err(TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }

        // Removal happens after iteration so no shard lock is held twice
        for id in closed {
            self.disconnect(&id);
        }
        delivered
    }

    /// Relay a raw update payload
    pub fn broadcast_update(&self, payload: &str) -> usize {
        self.broadcast(&ServerMessage::update(payload))
    }

    /// Queue a message for one client
    pub fn send_to(&self, id: &ClientId, message: &ServerMessage) -> bool {
        let Some(frame) = encode(message) else {
            return false;
        };
        match self.clients.get(id) {
            Some(client) => client.sender.try_send(frame).is_ok(),
            None => false,
        }
    }

    /// Answer a client frame in the background, queueing the reply for
    /// that client so slow bridge commands never hold up its socket
    pub fn dispatch(self: &Arc<Self>, id: ClientId, text: String) -> JoinHandle<()> {
        let hub = Arc::clone(self);
        tokio::spawn(async move {
            let reply = hub.handle_client_message(&text).await;
            if !hub.send_to(&id, &reply) {
                debug!("Client {} gone before its reply was ready", id);
            }
        })
    }

    /// Answer one inbound text frame
    pub async fn handle_client_message(&self, text: &str) -> ServerMessage {
        let message: ClientMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                debug!("Rejected client frame: {}", e);
                return ServerMessage::error("INVALID_MESSAGE", format!("invalid message: {}", e));
            }
        };

        match message {
            ClientMessage::Ping => ServerMessage::Pong {
                timestamp: Utc::now().timestamp_millis(),
            },
            ClientMessage::Snapshot { request_id } => self.snapshot_message(request_id).await,
            ClientMessage::Command {
                request_id,
                command,
                params,
            } => match self.bridge.send_command(&command, params).await {
                Ok(data) => ServerMessage::CommandResult {
                    request_id,
                    success: true,
                    data: Some(data),
                    error: None,
                },
                Err(e) => {
                    warn!("Command {} failed: {}", command, e);
                    ServerMessage::CommandResult {
                        request_id,
                        success: false,
                        data: None,
                        error: Some(e.to_string()),
                    }
                }
            },
        }
    }

    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            connected_clients: self.clients.len(),
            messages_broadcast: self.broadcast_count.load(Ordering::Relaxed),
            frames_dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    /// Forward every message published on `channel` to all clients.
    ///
    /// The task ends when the subscription stream ends.
    pub async fn spawn_relay(
        self: &Arc<Self>,
        storage: &StorageLayer,
        channel: &str,
    ) -> Result<JoinHandle<()>> {
        let mut updates = storage.store().subscribe(channel).await?;
        info!("Relaying updates from channel {}", channel);

        let broadcaster = Arc::clone(self);
        let channel = channel.to_string();
        Ok(tokio::spawn(async move {
            while let Some(payload) = updates.next().await {
                let delivered = broadcaster.broadcast_update(&payload);
                debug!("Update on {} delivered to {} clients", channel, delivered);
            }
            warn!("Update channel {} closed", channel);
        }))
    }

    async fn snapshot_message(&self, request_id: Option<String>) -> ServerMessage {
        match self.bridge.snapshot().await {
            Ok(data) => ServerMessage::Snapshot { request_id, data },
            Err(e) => {
                warn!("Snapshot unavailable: {}", e);
                ServerMessage::error("SNAPSHOT_UNAVAILABLE", e.to_string())
            }
        }
    }
}

fn encode(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!("Failed to encode WebSocket message: {}", e);
            None
        }
    }
}

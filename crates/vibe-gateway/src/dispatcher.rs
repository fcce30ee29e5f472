use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast, mpsc};
use uuid::Uuid;

use vibe_types::events::GatewayEvent;

/// Tracks which users hold a live connection and routes events to them.
///
/// One connection per user: a reconnect overwrites the previous mapping, so
/// the newest connection always wins.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Broadcast channel for events every connected client receives
    broadcast_tx: broadcast::Sender<GatewayEvent>,

    /// user_id -> (conn_id, targeted sender)
    connections: RwLock<HashMap<Uuid, (Uuid, mpsc::UnboundedSender<GatewayEvent>)>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                connections: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to broadcast events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast an event to all connected clients.
    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Record a connection for a user, replacing any previous one, and
    /// announce the updated online set to every connected client.
    /// Returns the new connection id and the targeted event receiver.
    pub async fn register(&self, user_id: Uuid) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .connections
            .write()
            .await
            .insert(user_id, (conn_id, tx));
        self.broadcast_online_users().await;
        (conn_id, rx)
    }

    /// Remove the entry owned by `conn_id` and re-announce the online set.
    /// The disconnect only carries the connection id, so this is a reverse
    /// lookup; a stale disconnect after the same user already reconnected
    /// finds nothing and leaves the mapping untouched.
    pub async fn disconnect(&self, conn_id: Uuid) {
        self.inner
            .connections
            .write()
            .await
            .retain(|_, (cid, _)| *cid != conn_id);
        self.broadcast_online_users().await;
    }

    /// Connection id currently held by `user_id`, if any. Pure lookup.
    pub async fn connection_id(&self, user_id: Uuid) -> Option<Uuid> {
        self.inner
            .connections
            .read()
            .await
            .get(&user_id)
            .map(|(cid, _)| *cid)
    }

    /// Snapshot of currently connected user ids.
    pub async fn online_users(&self) -> Vec<Uuid> {
        self.inner.connections.read().await.keys().copied().collect()
    }

    async fn broadcast_online_users(&self) {
        let users = self.online_users().await;
        self.broadcast(GatewayEvent::GetOnlineUsers(users));
    }

    /// Send a targeted event to a specific user. Fire-and-forget: an offline
    /// user or a closed channel is silently ignored.
    pub async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) {
        let connections = self.inner.connections.read().await;
        if let Some((_, tx)) = connections.get(&user_id) {
            let _ = tx.send(event);
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibe_types::models::ChatMessage;

    fn message_event(body: &str) -> GatewayEvent {
        GatewayEvent::NewMessage(ChatMessage {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            receiver_id: Uuid::new_v4(),
            message: body.into(),
            created_at: chrono::Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_register_and_disconnect() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();

        let (conn_id, _rx) = dispatcher.register(user).await;
        assert_eq!(dispatcher.connection_id(user).await, Some(conn_id));
        assert_eq!(dispatcher.online_users().await, vec![user]);

        dispatcher.disconnect(conn_id).await;
        assert_eq!(dispatcher.connection_id(user).await, None);
        assert!(dispatcher.online_users().await.is_empty());
    }

    #[tokio::test]
    async fn test_reconnect_overwrites_and_stale_disconnect_is_noop() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();

        let (old_conn, _old_rx) = dispatcher.register(user).await;
        let (new_conn, _new_rx) = dispatcher.register(user).await;
        assert_ne!(old_conn, new_conn);
        assert_eq!(dispatcher.connection_id(user).await, Some(new_conn));

        // the old connection's disconnect arrives late and must not evict
        // the new mapping
        dispatcher.disconnect(old_conn).await;
        assert_eq!(dispatcher.connection_id(user).await, Some(new_conn));

        dispatcher.disconnect(new_conn).await;
        assert_eq!(dispatcher.connection_id(user).await, None);
    }

    #[tokio::test]
    async fn test_send_to_connected_user() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();
        let (_conn_id, mut rx) = dispatcher.register(user).await;

        dispatcher.send_to_user(user, message_event("hi")).await;

        match rx.try_recv().unwrap() {
            GatewayEvent::NewMessage(msg) => assert_eq!(msg.message, "hi"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_to_offline_user_is_silent() {
        let dispatcher = Dispatcher::new();
        // no registration at all; must not panic or error
        dispatcher
            .send_to_user(Uuid::new_v4(), message_event("dropped"))
            .await;

        // a closed receiver is equally silent
        let user = Uuid::new_v4();
        let (_conn_id, rx) = dispatcher.register(user).await;
        drop(rx);
        dispatcher.send_to_user(user, message_event("dropped")).await;
    }

    #[tokio::test]
    async fn test_connect_and_disconnect_announce_online_set() {
        let dispatcher = Dispatcher::new();
        let mut events = dispatcher.subscribe();

        let user = Uuid::new_v4();
        let (conn_id, _rx) = dispatcher.register(user).await;

        match events.recv().await.unwrap() {
            GatewayEvent::GetOnlineUsers(users) => assert_eq!(users, vec![user]),
            other => panic!("unexpected event: {:?}", other),
        }

        dispatcher.disconnect(conn_id).await;

        match events.recv().await.unwrap() {
            GatewayEvent::GetOnlineUsers(users) => assert!(users.is_empty()),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}

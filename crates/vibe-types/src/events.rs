use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ChatMessage, UserSummary};

/// Events pushed to clients over the WebSocket gateway.
///
/// Delivery is fire-and-forget: a disconnected client never sees the event
/// and is expected to catch up on its next full fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum GatewayEvent {
    /// The full set of currently connected user ids. Re-sent to everyone on
    /// each connect and disconnect.
    GetOnlineUsers(Vec<Uuid>),

    /// A direct message was stored and the receiver holds a live connection.
    NewMessage(ChatMessage),

    /// Someone liked or disliked the recipient's post.
    Notification(Notification),
}

/// A like/dislike notification. Exists only in flight, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub user_id: Uuid,
    pub user_details: UserSummary,
    pub post_id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Dislike,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_tags() {
        let event = GatewayEvent::GetOnlineUsers(vec![Uuid::nil()]);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "getOnlineUsers");
        assert_eq!(json["data"][0], Uuid::nil().to_string());
    }

    #[test]
    fn test_notification_payload_shape() {
        let event = GatewayEvent::Notification(Notification {
            kind: NotificationKind::Like,
            user_id: Uuid::nil(),
            user_details: UserSummary {
                id: Uuid::nil(),
                username: "khirod".into(),
                profile_picture: None,
            },
            post_id: Uuid::nil(),
            message: "Your post was liked".into(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "notification");
        assert_eq!(json["data"]["type"], "like");
        assert_eq!(json["data"]["userDetails"]["username"], "khirod");
        assert_eq!(json["data"]["message"], "Your post was liked");
    }
}

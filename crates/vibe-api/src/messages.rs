use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use vibe_types::api::{Claims, MessagesResponse, SendMessageRequest, SendMessageResponse};
use vibe_types::events::GatewayEvent;
use vibe_types::models::ChatMessage;

use crate::auth::AppState;
use crate::convert;
use crate::error::{ApiError, ApiResult};

pub async fn send_message(
    State(state): State<AppState>,
    Path(receiver_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let body = req.text_message.trim().to_string();
    if body.is_empty() {
        return Err(ApiError::BadRequest("Message text is required".into()));
    }

    let sender_id = claims.sub;
    let message_id = Uuid::new_v4();

    // Run blocking DB work off the async runtime
    let db = state.clone();
    let stored_body = body.clone();
    let conversation_id = tokio::task::spawn_blocking(move || {
        let sid = sender_id.to_string();
        let rid = receiver_id.to_string();

        // Establish the conversation if not started yet
        let conversation_id = match db.db.find_conversation(&sid, &rid)? {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                db.db.create_conversation(&id, &sid, &rid)?;
                id
            }
        };

        db.db.insert_message(
            &message_id.to_string(),
            &conversation_id,
            &sid,
            &rid,
            &stored_body,
        )?;

        Ok::<_, anyhow::Error>(conversation_id)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        anyhow::anyhow!("spawn_blocking join error: {}", e)
    })??;

    let new_message = ChatMessage {
        id: message_id,
        conversation_id: convert::parse_uuid(&conversation_id, "conversation_id"),
        sender_id,
        receiver_id,
        message: body,
        created_at: chrono::Utc::now(),
    };

    // Push to the receiver if they hold a live connection; otherwise the
    // event is dropped and they catch up on their next fetch
    state
        .dispatcher
        .send_to_user(receiver_id, GatewayEvent::NewMessage(new_message.clone()))
        .await;

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            success: true,
            new_message,
        }),
    ))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(other_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<MessagesResponse>> {
    let me = claims.sub.to_string();
    let other = other_id.to_string();

    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || {
        let Some(conversation_id) = db.db.find_conversation(&me, &other)? else {
            return Ok::<_, anyhow::Error>(vec![]);
        };
        db.db.get_conversation_messages(&conversation_id)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        anyhow::anyhow!("spawn_blocking join error: {}", e)
    })??;

    let messages = rows.into_iter().map(convert::message_from_row).collect();

    Ok(Json(MessagesResponse {
        success: true,
        messages,
    }))
}

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use vibe_types::api::{AddPostRequest, Claims};
use vibe_types::events::{GatewayEvent, Notification, NotificationKind};
use vibe_types::models::UserSummary;

use crate::auth::AppState;
use crate::convert;
use crate::error::{ApiError, ApiResult};

pub async fn add_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddPostRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.caption.trim().is_empty() {
        return Err(ApiError::BadRequest("Caption required".into()));
    }

    let post_id = Uuid::new_v4();
    state.db.insert_post(
        &post_id.to_string(),
        &claims.sub.to_string(),
        &req.caption,
        req.image_url.as_deref(),
    )?;

    let row = state
        .db
        .get_post(&post_id.to_string())?
        .ok_or_else(|| anyhow::anyhow!("post vanished right after insert: {}", post_id))?;
    let post = convert::hydrate_posts(&state.db, vec![row])?.remove(0);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "New post added",
            "post": post
        })),
    ))
}

pub async fn get_all_posts(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let posts = convert::hydrate_posts(&state.db, state.db.get_all_posts()?)?;

    Ok(Json(json!({ "success": true, "posts": posts })))
}

pub async fn get_user_posts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let rows = state.db.get_posts_by_author(&claims.sub.to_string())?;
    let posts = convert::hydrate_posts(&state.db, rows)?;

    Ok(Json(json!({ "success": true, "posts": posts })))
}

pub async fn like_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    set_like(&state, post_id, &claims, true).await
}

pub async fn dislike_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    set_like(&state, post_id, &claims, false).await
}

/// Shared like/dislike path: idempotent set mutation, then a realtime
/// notification to the author. Self-likes never notify.
async fn set_like(
    state: &AppState,
    post_id: Uuid,
    claims: &Claims,
    liked: bool,
) -> ApiResult<Json<serde_json::Value>> {
    let post = state
        .db
        .get_post(&post_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("Post not found!".into()))?;

    let actor_id = claims.sub.to_string();
    if liked {
        state.db.add_like(&post.id, &actor_id)?;
    } else {
        state.db.remove_like(&post.id, &actor_id)?;
    }

    let author_id = convert::parse_uuid(&post.author_id, "author_id");
    if author_id != claims.sub {
        let user_details = state
            .db
            .get_user_by_id(&actor_id)?
            .map(|row| convert::summary_from_user(&row))
            .unwrap_or_else(|| UserSummary {
                id: claims.sub,
                username: claims.username.clone(),
                profile_picture: None,
            });

        let (kind, message) = if liked {
            (NotificationKind::Like, "Your post was liked")
        } else {
            (NotificationKind::Dislike, "Your post was disliked")
        };

        // Fire-and-forget: an offline author simply misses the event
        state
            .dispatcher
            .send_to_user(
                author_id,
                GatewayEvent::Notification(Notification {
                    kind,
                    user_id: claims.sub,
                    user_details,
                    post_id,
                    message: message.into(),
                }),
            )
            .await;
    }

    let message = if liked { "Post liked" } else { "Post disliked" };
    Ok(Json(json!({ "success": true, "message": message })))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let post = state
        .db
        .get_post(&post_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("Post not found!".into()))?;

    if post.author_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden("Unauthorized".into()));
    }

    state.db.delete_post(&post.id)?;

    Ok(Json(json!({
        "success": true,
        "message": "Post deleted successfully"
    })))
}

pub async fn bookmark_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let post = state
        .db
        .get_post(&post_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("Post not found!".into()))?;

    let saved = state.db.toggle_bookmark(&claims.sub.to_string(), &post.id)?;

    let (kind, message) = if saved {
        ("saved", "Post bookmarked")
    } else {
        ("unsaved", "Post removed from bookmarks")
    };

    Ok(Json(json!({
        "success": true,
        "type": kind,
        "message": message
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::sync::mpsc::error::TryRecvError;

    use vibe_db::Database;
    use vibe_gateway::dispatcher::Dispatcher;

    use crate::auth::AppStateInner;

    fn test_state() -> AppState {
        Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: "test-secret".into(),
            dispatcher: Dispatcher::new(),
        })
    }

    fn add_user(state: &AppState, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        state
            .db
            .create_user(
                &id.to_string(),
                name,
                &format!("{}@example.com", name),
                "hash",
            )
            .unwrap();
        id
    }

    fn add_post_row(state: &AppState, author: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        state
            .db
            .insert_post(&id.to_string(), &author.to_string(), "caption", None)
            .unwrap();
        id
    }

    fn claims_for(user_id: Uuid, username: &str) -> Claims {
        Claims {
            sub: user_id,
            username: username.into(),
            exp: usize::MAX,
        }
    }

    #[tokio::test]
    async fn test_like_notifies_connected_author() {
        let state = test_state();
        let author = add_user(&state, "divya");
        let actor = add_user(&state, "khirod");
        let post_id = add_post_row(&state, author);

        let (_conn_id, mut rx) = state.dispatcher.register(author).await;

        like_post(State(state.clone()), Path(post_id), Extension(claims_for(actor, "khirod")))
            .await
            .unwrap();

        match rx.try_recv().unwrap() {
            GatewayEvent::Notification(n) => {
                assert_eq!(n.kind, NotificationKind::Like);
                assert_eq!(n.user_id, actor);
                assert_eq!(n.post_id, post_id);
                assert_eq!(n.user_details.username, "khirod");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_self_like_never_notifies() {
        let state = test_state();
        let author = add_user(&state, "divya");
        let post_id = add_post_row(&state, author);

        let (_conn_id, mut rx) = state.dispatcher.register(author).await;

        like_post(State(state.clone()), Path(post_id), Extension(claims_for(author, "divya")))
            .await
            .unwrap();

        assert_eq!(
            state.db.get_post_likes(&post_id.to_string()).unwrap().len(),
            1
        );
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_like_while_author_offline() {
        let state = test_state();
        let author = add_user(&state, "divya");
        let actor = add_user(&state, "khirod");
        let post_id = add_post_row(&state, author);

        // author holds no connection: the like lands, the event is dropped
        like_post(State(state.clone()), Path(post_id), Extension(claims_for(actor, "khirod")))
            .await
            .unwrap();

        assert_eq!(
            state.db.get_post_likes(&post_id.to_string()).unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_double_like_is_idempotent() {
        let state = test_state();
        let author = add_user(&state, "divya");
        let actor = add_user(&state, "khirod");
        let post_id = add_post_row(&state, author);

        for _ in 0..2 {
            like_post(State(state.clone()), Path(post_id), Extension(claims_for(actor, "khirod")))
                .await
                .unwrap();
        }
        assert_eq!(
            state.db.get_post_likes(&post_id.to_string()).unwrap().len(),
            1
        );

        for _ in 0..2 {
            dislike_post(State(state.clone()), Path(post_id), Extension(claims_for(actor, "khirod")))
                .await
                .unwrap();
        }
        assert!(state.db.get_post_likes(&post_id.to_string()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_like_missing_post_is_404() {
        let state = test_state();
        let actor = add_user(&state, "khirod");

        let err = like_post(
            State(state.clone()),
            Path(Uuid::new_v4()),
            Extension(claims_for(actor, "khirod")),
        )
        .await
        .err().unwrap();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_requires_ownership() {
        let state = test_state();
        let author = add_user(&state, "divya");
        let other = add_user(&state, "khirod");
        let post_id = add_post_row(&state, author);

        let err = delete_post(
            State(state.clone()),
            Path(post_id),
            Extension(claims_for(other, "khirod")),
        )
        .await
        .err().unwrap();
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);

        delete_post(
            State(state.clone()),
            Path(post_id),
            Extension(claims_for(author, "divya")),
        )
        .await
        .unwrap();
        assert!(state.db.get_post(&post_id.to_string()).unwrap().is_none());
    }
}

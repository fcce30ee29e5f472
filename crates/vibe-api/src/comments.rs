use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use vibe_types::api::{AddCommentRequest, Claims};
use vibe_types::models::Comment;

use crate::auth::AppState;
use crate::convert;
use crate::error::{ApiError, ApiResult};

pub async fn add_comment(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.text.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Comment not found, please write comment first".into(),
        ));
    }

    if state.db.get_post(&post_id.to_string())?.is_none() {
        return Err(ApiError::NotFound("Post not found!".into()));
    }

    let comment_id = Uuid::new_v4();
    state.db.insert_comment(
        &comment_id.to_string(),
        &post_id.to_string(),
        &claims.sub.to_string(),
        &req.text,
    )?;

    let row = state
        .db
        .get_comment(&comment_id.to_string())?
        .ok_or_else(|| anyhow::anyhow!("comment vanished right after insert: {}", comment_id))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Comment added",
            "comment": convert::comment_from_row(row)
        })),
    ))
}

pub async fn get_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let comments: Vec<Comment> = state
        .db
        .get_comments_for_post(&post_id.to_string())?
        .into_iter()
        .map(convert::comment_from_row)
        .collect();

    Ok(Json(json!({ "success": true, "comments": comments })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

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

    fn claims_for(user_id: Uuid, username: &str) -> Claims {
        Claims {
            sub: user_id,
            username: username.into(),
            exp: usize::MAX,
        }
    }

    #[tokio::test]
    async fn test_comment_requires_text_and_post() {
        let state = test_state();
        let user = Uuid::new_v4();
        state
            .db
            .create_user(&user.to_string(), "khirod", "k@example.com", "hash")
            .unwrap();

        let err = add_comment(
            State(state.clone()),
            Path(Uuid::new_v4()),
            Extension(claims_for(user, "khirod")),
            Json(AddCommentRequest { text: "  ".into() }),
        )
        .await
        .err().unwrap();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err = add_comment(
            State(state.clone()),
            Path(Uuid::new_v4()),
            Extension(claims_for(user, "khirod")),
            Json(AddCommentRequest { text: "nice".into() }),
        )
        .await
        .err().unwrap();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_comment_carries_author_summary() {
        let state = test_state();
        let user = Uuid::new_v4();
        state
            .db
            .create_user(&user.to_string(), "khirod", "k@example.com", "hash")
            .unwrap();
        let post_id = Uuid::new_v4();
        state
            .db
            .insert_post(&post_id.to_string(), &user.to_string(), "caption", None)
            .unwrap();

        add_comment(
            State(state.clone()),
            Path(post_id),
            Extension(claims_for(user, "khirod")),
            Json(AddCommentRequest { text: "nice".into() }),
        )
        .await
        .unwrap();

        let rows = state
            .db
            .get_comments_for_post(&post_id.to_string())
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].author_username, "khirod");
        assert_eq!(rows[0].text, "nice");
    }
}

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use vibe_types::api::{Claims, EditProfileRequest};
use vibe_types::models::UserSummary;

use crate::auth::AppState;
use crate::convert;
use crate::error::{ApiError, ApiResult};

pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .db
        .get_user_by_id(&user_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("User profile not found!".into()))?;

    let profile = convert::user_profile(&state.db, &user)?;

    Ok(Json(json!({ "success": true, "user": profile })))
}

pub async fn edit_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<EditProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_id = claims.sub.to_string();

    state.db.update_profile(
        &user_id,
        req.bio.as_deref(),
        req.gender.as_deref(),
        req.profile_picture.as_deref(),
    )?;

    let user = state
        .db
        .get_user_by_id(&user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found!".into()))?;
    let profile = convert::user_profile(&state.db, &user)?;

    Ok(Json(json!({
        "success": true,
        "message": format!("{}'s profile updated", profile.username),
        "user": profile
    })))
}

pub async fn get_suggested_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let rows = state.db.get_suggested_users(&claims.sub.to_string())?;
    let users: Vec<UserSummary> = rows.iter().map(convert::summary_from_user).collect();

    Ok(Json(json!({ "success": true, "users": users })))
}

pub async fn follow_or_unfollow(
    State(state): State<AppState>,
    Path(target_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    if claims.sub == target_id {
        return Err(ApiError::BadRequest(
            "You cannot follow/unfollow yourself!".into(),
        ));
    }

    let target = target_id.to_string();
    if state.db.get_user_by_id(&target)?.is_none() {
        return Err(ApiError::BadRequest("User not found".into()));
    }

    let me = claims.sub.to_string();
    let message = if state.db.is_following(&me, &target)? {
        state.db.remove_follow(&me, &target)?;
        "Unfollowed successfully"
    } else {
        state.db.add_follow(&me, &target)?;
        "Followed successfully"
    };

    Ok(Json(json!({ "success": true, "message": message })))
}

//! Conversions from vibe-db row types to the public API models.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use vibe_db::Database;
use vibe_db::models::{CommentRow, MessageRow, PostRow, UserRow};
use vibe_types::models::{ChatMessage, Comment, Post, UserProfile, UserSummary};

/// Parse an id column, falling back to the nil uuid on corrupt data.
pub fn parse_uuid(raw: &str, field: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", field, raw, e);
        Uuid::default()
    })
}

pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without
            // timezone. Parse as naive UTC and convert.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

pub fn summary_from_user(row: &UserRow) -> UserSummary {
    UserSummary {
        id: parse_uuid(&row.id, "user id"),
        username: row.username.clone(),
        profile_picture: row.profile_picture.clone(),
    }
}

pub fn message_from_row(row: MessageRow) -> ChatMessage {
    ChatMessage {
        id: parse_uuid(&row.id, "message id"),
        conversation_id: parse_uuid(&row.conversation_id, "conversation_id"),
        sender_id: parse_uuid(&row.sender_id, "sender_id"),
        receiver_id: parse_uuid(&row.receiver_id, "receiver_id"),
        message: row.body,
        created_at: parse_timestamp(&row.created_at),
    }
}

pub fn comment_from_row(row: CommentRow) -> Comment {
    Comment {
        id: parse_uuid(&row.id, "comment id"),
        post_id: parse_uuid(&row.post_id, "post_id"),
        author: UserSummary {
            id: parse_uuid(&row.author_id, "author_id"),
            username: row.author_username,
            profile_picture: row.author_profile_picture,
        },
        text: row.text,
        created_at: parse_timestamp(&row.created_at),
    }
}

fn post_from_row(row: PostRow, likes: Vec<Uuid>, comments: Vec<Comment>) -> Post {
    Post {
        id: parse_uuid(&row.id, "post id"),
        author: UserSummary {
            id: parse_uuid(&row.author_id, "author_id"),
            username: row.author_username,
            profile_picture: row.author_profile_picture,
        },
        caption: row.caption,
        image_url: row.image_url,
        likes,
        comments,
        created_at: parse_timestamp(&row.created_at),
    }
}

/// Attach likes and comments to a page of post rows with two batch queries
/// instead of one pair per post.
pub fn hydrate_posts(db: &Database, rows: Vec<PostRow>) -> anyhow::Result<Vec<Post>> {
    let post_ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();

    let mut likes_map: HashMap<String, Vec<Uuid>> = HashMap::new();
    for like in db.get_likes_for_posts(&post_ids)? {
        likes_map
            .entry(like.post_id)
            .or_default()
            .push(parse_uuid(&like.user_id, "like user_id"));
    }

    let mut comments_map: HashMap<String, Vec<Comment>> = HashMap::new();
    for row in db.get_comments_for_posts(&post_ids)? {
        comments_map
            .entry(row.post_id.clone())
            .or_default()
            .push(comment_from_row(row));
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let likes = likes_map.remove(&row.id).unwrap_or_default();
            let comments = comments_map.remove(&row.id).unwrap_or_default();
            post_from_row(row, likes, comments)
        })
        .collect())
}

/// Full profile payload: the user plus their posts and bookmarks, hydrated.
pub fn user_profile(db: &Database, user: &UserRow) -> anyhow::Result<UserProfile> {
    let posts = hydrate_posts(db, db.get_posts_by_author(&user.id)?)?;
    let bookmarks = hydrate_posts(db, db.get_posts_bookmarked_by(&user.id)?)?;

    let followers = db
        .get_followers(&user.id)?
        .iter()
        .map(|id| parse_uuid(id, "follower id"))
        .collect();
    let following = db
        .get_following(&user.id)?
        .iter()
        .map(|id| parse_uuid(id, "followee id"))
        .collect();

    Ok(UserProfile {
        id: parse_uuid(&user.id, "user id"),
        username: user.username.clone(),
        email: user.email.clone(),
        bio: user.bio.clone(),
        gender: user.gender.clone(),
        profile_picture: user.profile_picture.clone(),
        followers,
        following,
        posts,
        bookmarks,
    })
}

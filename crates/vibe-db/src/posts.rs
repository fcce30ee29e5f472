use anyhow::Result;
use rusqlite::Connection;

use crate::models::{CommentRow, LikeRow, PostRow};
use crate::{Database, OptionalExt};

const POST_SELECT: &str =
    "SELECT p.id, p.author_id, u.username, u.profile_picture, p.caption, p.image_url, p.created_at
     FROM posts p
     LEFT JOIN users u ON p.author_id = u.id";

impl Database {
    pub fn insert_post(
        &self,
        id: &str,
        author_id: &str,
        caption: &str,
        image_url: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, author_id, caption, image_url) VALUES (?1, ?2, ?3, ?4)",
                (id, author_id, caption, image_url),
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE p.id = ?1", POST_SELECT);
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], map_post_row).optional()?;
            Ok(row)
        })
    }

    pub fn get_all_posts(&self) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} ORDER BY p.created_at DESC, p.rowid DESC", POST_SELECT);
            query_posts(conn, &sql, rusqlite::params![])
        })
    }

    pub fn get_posts_by_author(&self, author_id: &str) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE p.author_id = ?1 ORDER BY p.created_at DESC, p.rowid DESC",
                POST_SELECT
            );
            query_posts(conn, &sql, [author_id])
        })
    }

    pub fn get_posts_bookmarked_by(&self, user_id: &str) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} JOIN bookmarks b ON b.post_id = p.id
                 WHERE b.user_id = ?1 ORDER BY b.created_at DESC",
                POST_SELECT
            );
            query_posts(conn, &sql, [user_id])
        })
    }

    /// Removes the post together with its comments, likes and bookmarks.
    pub fn delete_post(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM comments WHERE post_id = ?1", [id])?;
            conn.execute("DELETE FROM post_likes WHERE post_id = ?1", [id])?;
            conn.execute("DELETE FROM bookmarks WHERE post_id = ?1", [id])?;
            conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Likes --

    /// Idempotent set-add. Returns true if the like was newly inserted.
    pub fn add_like(&self, post_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO post_likes (post_id, user_id) VALUES (?1, ?2)",
                (post_id, user_id),
            )?;
            Ok(changed > 0)
        })
    }

    /// Idempotent set-remove. Returns true if a like was actually removed.
    pub fn remove_like(&self, post_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
                (post_id, user_id),
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_post_likes(&self, post_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT user_id FROM post_likes WHERE post_id = ?1")?;
            let ids = stmt
                .query_map([post_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    /// Batch-fetch likes for a set of post IDs.
    pub fn get_likes_for_posts(&self, post_ids: &[String]) -> Result<Vec<LikeRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=post_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT post_id, user_id FROM post_likes WHERE post_id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = post_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(LikeRow {
                        post_id: row.get(0)?,
                        user_id: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Bookmarks --

    /// Toggle a bookmark. Returns true if the post is now bookmarked.
    pub fn toggle_bookmark(&self, user_id: &str, post_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM bookmarks WHERE user_id = ?1 AND post_id = ?2",
                (user_id, post_id),
            )?;
            if removed > 0 {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO bookmarks (user_id, post_id) VALUES (?1, ?2)",
                (user_id, post_id),
            )?;
            Ok(true)
        })
    }

    // -- Comments --

    pub fn insert_comment(&self, id: &str, post_id: &str, author_id: &str, text: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, author_id, text) VALUES (?1, ?2, ?3, ?4)",
                (id, post_id, author_id, text),
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE c.id = ?1", COMMENT_SELECT);
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], map_comment_row).optional()?;
            Ok(row)
        })
    }

    pub fn get_comments_for_post(&self, post_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE c.post_id = ?1 ORDER BY c.created_at, c.rowid",
                COMMENT_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([post_id], map_comment_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch comments for a set of post IDs.
    pub fn get_comments_for_posts(&self, post_ids: &[String]) -> Result<Vec<CommentRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=post_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "{} WHERE c.post_id IN ({}) ORDER BY c.created_at, c.rowid",
                COMMENT_SELECT,
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = post_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), map_comment_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

const COMMENT_SELECT: &str =
    "SELECT c.id, c.post_id, c.author_id, u.username, u.profile_picture, c.text, c.created_at
     FROM comments c
     LEFT JOIN users u ON c.author_id = u.id";

fn query_posts<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<PostRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map_post_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_post_row(row: &rusqlite::Row<'_>) -> std::result::Result<PostRow, rusqlite::Error> {
    Ok(PostRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_username: row
            .get::<_, Option<String>>(2)?
            .unwrap_or_else(|| "unknown".to_string()),
        author_profile_picture: row.get(3)?,
        caption: row.get(4)?,
        image_url: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_comment_row(row: &rusqlite::Row<'_>) -> std::result::Result<CommentRow, rusqlite::Error> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        author_username: row
            .get::<_, Option<String>>(3)?
            .unwrap_or_else(|| "unknown".to_string()),
        author_profile_picture: row.get(4)?,
        text: row.get(5)?,
        created_at: row.get(6)?,
    })
}

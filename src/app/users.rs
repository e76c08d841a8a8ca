use anyhow::Result;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::user::{
    ProfileUpdate, User, UserCounts, DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL,
};
use crate::infra::db::Db;

pub(crate) const USER_COLUMNS: &str =
    "id, username, email, image_url, header_image_url, bio, location, created_at";

#[derive(Clone)]
pub struct UserService {
    db: Db,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(User::from_row))
    }

    pub async fn counts(&self, user_id: Uuid) -> Result<UserCounts> {
        let row = sqlx::query(
            "SELECT \
                (SELECT COUNT(*) FROM messages WHERE user_id = $1) AS messages, \
                (SELECT COUNT(*) FROM follows WHERE followee_id = $1) AS followers, \
                (SELECT COUNT(*) FROM follows WHERE follower_id = $1) AS following, \
                (SELECT COUNT(*) FROM likes WHERE user_id = $1) AS likes",
        )
        .bind(user_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(UserCounts {
            messages: row.get("messages"),
            followers: row.get("followers"),
            following: row.get("following"),
            likes: row.get("likes"),
        })
    }

    /// Lists users newest first, optionally filtered by a case-insensitive
    /// username substring.
    pub async fn list_users(
        &self,
        search: Option<&str>,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<User>> {
        let pattern = match search.map(str::trim).filter(|query| !query.is_empty()) {
            Some(query) => format!("%{}%", escape_like_pattern(query)),
            None => "%".to_string(),
        };

        let rows = match cursor {
            Some((created_at, user_id)) => {
                sqlx::query(&format!(
                    "SELECT {USER_COLUMNS} FROM users \
                     WHERE username ILIKE $1 ESCAPE '\\' \
                       AND (created_at < $2 OR (created_at = $2 AND id < $3)) \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $4"
                ))
                .bind(&pattern)
                .bind(created_at)
                .bind(user_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {USER_COLUMNS} FROM users \
                     WHERE username ILIKE $1 ESCAPE '\\' \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $2"
                ))
                .bind(&pattern)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        Ok(rows.iter().map(User::from_row).collect())
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>> {
        let image_url = non_empty_or(update.image_url, DEFAULT_IMAGE_URL);
        let header_image_url = non_empty_or(update.header_image_url, DEFAULT_HEADER_IMAGE_URL);

        let row = sqlx::query(&format!(
            "UPDATE users \
             SET username = $2, email = $3, image_url = $4, header_image_url = $5, \
                 bio = $6, location = $7 \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(update.username)
        .bind(update.email)
        .bind(image_url)
        .bind(header_image_url)
        .bind(update.bio.filter(|bio| !bio.trim().is_empty()))
        .bind(update.location.filter(|location| !location.trim().is_empty()))
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(User::from_row))
    }

    /// Deletes the account; messages, follows and likes go with it through
    /// `ON DELETE CASCADE`.
    pub async fn delete_account(&self, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn non_empty_or(value: String, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value
    }
}

fn escape_like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like_pattern("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like_pattern("plain"), "plain");
    }

    #[test]
    fn blank_image_falls_back() {
        assert_eq!(non_empty_or("  ".into(), DEFAULT_IMAGE_URL), DEFAULT_IMAGE_URL);
        assert_eq!(non_empty_or("http://x/y.png".into(), DEFAULT_IMAGE_URL), "http://x/y.png");
    }
}

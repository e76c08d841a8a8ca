use anyhow::{anyhow, Result};
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::engagement::LikeToggle;
use crate::domain::message::Message;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct EngagementService {
    db: Db,
}

impl EngagementService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Removes the like when present, adds it otherwise.
    pub async fn toggle_like(&self, user_id: Uuid, message_id: Uuid) -> Result<LikeToggle> {
        let mut tx = self.db.pool().begin().await?;

        let removed = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND message_id = $2")
            .bind(user_id)
            .bind(message_id)
            .execute(&mut *tx)
            .await?;

        if removed.rows_affected() > 0 {
            tx.commit().await?;
            return Ok(LikeToggle::Unliked);
        }

        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM messages WHERE id = $1 FOR SHARE")
                .bind(message_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            tx.rollback().await?;
            return Err(anyhow!("message not found"));
        }

        sqlx::query(
            "INSERT INTO likes (user_id, message_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(message_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(LikeToggle::Liked)
    }

    pub async fn has_liked(&self, user_id: Uuid, message_id: Uuid) -> Result<bool> {
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM likes WHERE user_id = $1 AND message_id = $2)",
        )
        .bind(user_id)
        .bind(message_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(found)
    }

    /// Ids among `message_ids` that the user has liked.
    pub async fn liked_among(&self, user_id: Uuid, message_ids: &[Uuid]) -> Result<Vec<Uuid>> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT message_id FROM likes WHERE user_id = $1 AND message_id = ANY($2)",
        )
        .bind(user_id)
        .bind(message_ids)
        .fetch_all(self.db.pool())
        .await?;
        Ok(ids)
    }

    /// Messages the user liked, most recently liked first.
    pub async fn list_liked_messages(
        &self,
        user_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<(Message, OffsetDateTime)>> {
        let rows = match cursor {
            Some((liked_at, message_id)) => {
                sqlx::query(
                    "SELECT m.id, m.text, m.timestamp, m.user_id, u.username, u.image_url, \
                            l.created_at AS liked_at \
                     FROM likes l \
                     JOIN messages m ON m.id = l.message_id \
                     JOIN users u ON u.id = m.user_id \
                     WHERE l.user_id = $1 \
                       AND (l.created_at < $2 OR (l.created_at = $2 AND l.message_id < $3)) \
                     ORDER BY l.created_at DESC, l.message_id DESC \
                     LIMIT $4",
                )
                .bind(user_id)
                .bind(liked_at)
                .bind(message_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT m.id, m.text, m.timestamp, m.user_id, u.username, u.image_url, \
                            l.created_at AS liked_at \
                     FROM likes l \
                     JOIN messages m ON m.id = l.message_id \
                     JOIN users u ON u.id = m.user_id \
                     WHERE l.user_id = $1 \
                     ORDER BY l.created_at DESC, l.message_id DESC \
                     LIMIT $2",
                )
                .bind(user_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        let items = rows
            .iter()
            .map(|row| (Message::from_row(row), row.get("liked_at")))
            .collect();

        Ok(items)
    }
}

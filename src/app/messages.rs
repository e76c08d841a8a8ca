use anyhow::Result;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::message::Message;
use crate::infra::db::Db;

const MESSAGE_SELECT: &str = "SELECT m.id, m.text, m.timestamp, m.user_id, u.username, u.image_url \
     FROM messages m \
     JOIN users u ON u.id = m.user_id";

#[derive(Clone)]
pub struct MessageService {
    db: Db,
}

impl MessageService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create_message(&self, user_id: Uuid, text: &str) -> Result<Message> {
        let row = sqlx::query(
            "WITH inserted AS ( \
                INSERT INTO messages (text, user_id) VALUES ($1, $2) \
                RETURNING id, text, timestamp, user_id \
             ) \
             SELECT m.*, u.username, u.image_url \
             FROM inserted m \
             JOIN users u ON u.id = m.user_id",
        )
        .bind(text)
        .bind(user_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(Message::from_row(&row))
    }

    pub async fn get_message(&self, message_id: Uuid) -> Result<Option<Message>> {
        let row = sqlx::query(&format!("{MESSAGE_SELECT} WHERE m.id = $1"))
            .bind(message_id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(Message::from_row))
    }

    /// Deletes the message only when `owner_id` wrote it. Its likes go with it.
    pub async fn delete_message(&self, message_id: Uuid, owner_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1 AND user_id = $2")
            .bind(message_id)
            .bind(owner_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_user_messages(
        &self,
        user_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<Message>> {
        self.list_where("m.user_id = $1", user_id, cursor, limit).await
    }

    /// Messages written by the user or anyone they follow, newest first.
    pub async fn home_feed(
        &self,
        user_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<Message>> {
        self.list_where(
            "(m.user_id = $1 OR m.user_id IN ( \
                SELECT followee_id FROM follows WHERE follower_id = $1 \
             ))",
            user_id,
            cursor,
            limit,
        )
        .await
    }

    async fn list_where(
        &self,
        filter: &str,
        user_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<Message>> {
        let rows = match cursor {
            Some((timestamp, message_id)) => {
                sqlx::query(&format!(
                    "{MESSAGE_SELECT} \
                     WHERE {filter} \
                       AND (m.timestamp < $2 OR (m.timestamp = $2 AND m.id < $3)) \
                     ORDER BY m.timestamp DESC, m.id DESC \
                     LIMIT $4"
                ))
                .bind(user_id)
                .bind(timestamp)
                .bind(message_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "{MESSAGE_SELECT} \
                     WHERE {filter} \
                     ORDER BY m.timestamp DESC, m.id DESC \
                     LIMIT $2"
                ))
                .bind(user_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        Ok(rows.iter().map(Message::from_row).collect())
    }
}

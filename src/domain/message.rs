use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

pub const MAX_MESSAGE_LEN: usize = 140;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub user_id: Uuid,
    pub username: String,
    pub user_image_url: String,
}

impl Message {
    /// Maps a row selected with the author's `username` and `image_url` joined in.
    pub(crate) fn from_row(row: &PgRow) -> Self {
        Self {
            id: row.get("id"),
            text: row.get("text"),
            timestamp: row.get("timestamp"),
            user_id: row.get("user_id"),
            username: row.get("username"),
            user_image_url: row.get("image_url"),
        }
    }
}

use anyhow::{anyhow, Result};
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::social_graph::{FollowEdge, RelationshipStatus};
use crate::domain::user::User;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct SocialService {
    db: Db,
}

/// Which end of the follow edge to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Following,
    Followers,
}

impl SocialService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Adds the edge `follower -> followee`. Returns `false` when it already
    /// existed. Errors when the followee does not exist or is the follower.
    pub async fn follow(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool> {
        if follower_id == followee_id {
            return Err(anyhow!("cannot follow yourself"));
        }

        let mut tx = self.db.pool().begin().await?;

        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR SHARE")
            .bind(followee_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            tx.rollback().await?;
            return Err(anyhow!("user not found"));
        }

        let result = sqlx::query(
            "INSERT INTO follows (follower_id, followee_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(follower_id)
        .bind(followee_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn unfollow(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2",
        )
        .bind(follower_id)
        .bind(followee_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// True iff `user_id` follows `other_id`.
    pub async fn is_following(&self, user_id: Uuid, other_id: Uuid) -> Result<bool> {
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE follower_id = $1 AND followee_id = $2)",
        )
        .bind(user_id)
        .bind(other_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(found)
    }

    /// True iff `other_id` follows `user_id`.
    pub async fn is_followed_by(&self, user_id: Uuid, other_id: Uuid) -> Result<bool> {
        self.is_following(other_id, user_id).await
    }

    pub async fn relationship_status(
        &self,
        viewer_id: Uuid,
        other_id: Uuid,
    ) -> Result<RelationshipStatus> {
        let row = sqlx::query(
            "SELECT \
                EXISTS (SELECT 1 FROM follows WHERE follower_id = $1 AND followee_id = $2) AS is_following, \
                EXISTS (SELECT 1 FROM follows WHERE follower_id = $2 AND followee_id = $1) AS is_followed_by",
        )
        .bind(viewer_id)
        .bind(other_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(RelationshipStatus {
            is_following: row.get("is_following"),
            is_followed_by: row.get("is_followed_by"),
        })
    }

    pub async fn list_following(
        &self,
        user_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<FollowEdge>> {
        self.list_edges(Direction::Following, user_id, cursor, limit).await
    }

    pub async fn list_followers(
        &self,
        user_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<FollowEdge>> {
        self.list_edges(Direction::Followers, user_id, cursor, limit).await
    }

    async fn list_edges(
        &self,
        direction: Direction,
        user_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<FollowEdge>> {
        // `anchor` is the listed user's column, `other` the column we page over.
        let (anchor, other) = match direction {
            Direction::Following => ("follower_id", "followee_id"),
            Direction::Followers => ("followee_id", "follower_id"),
        };
        let select = format!(
            "SELECT u.id, u.username, u.email, u.image_url, u.header_image_url, u.bio, \
                    u.location, u.created_at, f.created_at AS followed_at \
             FROM follows f \
             JOIN users u ON u.id = f.{other} \
             WHERE f.{anchor} = $1"
        );

        let rows = match cursor {
            Some((followed_at, other_id)) => {
                sqlx::query(&format!(
                    "{select} \
                       AND (f.created_at < $2 OR (f.created_at = $2 AND f.{other} < $3)) \
                     ORDER BY f.created_at DESC, f.{other} DESC \
                     LIMIT $4"
                ))
                .bind(user_id)
                .bind(followed_at)
                .bind(other_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "{select} \
                     ORDER BY f.created_at DESC, f.{other} DESC \
                     LIMIT $2"
                ))
                .bind(user_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        let items = rows
            .iter()
            .map(|row| FollowEdge {
                user: User::from_row(row).into(),
                followed_at: row.get("followed_at"),
            })
            .collect();

        Ok(items)
    }
}

use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::user::PublicUser;

/// A user on the other end of a follow edge, with the time the edge was made.
#[derive(Debug, Clone, Serialize)]
pub struct FollowEdge {
    pub user: PublicUser,
    #[serde(with = "time::serde::rfc3339")]
    pub followed_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RelationshipStatus {
    pub is_following: bool,
    pub is_followed_by: bool,
}

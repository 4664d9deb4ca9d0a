use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use validator::Validate;

use super::{comment::CommentResponse, topic::Topic};

/// Derived state of a post at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostStatus {
    Live,
    Expired,
}

/// A titled, time-bounded message tagged with one or more topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub message: String,
    pub topics: BTreeSet<Topic>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Post {
    /// `Live` strictly before the expiry instant, `Expired` from it onwards.
    pub fn status_at(&self, now: DateTime<Utc>) -> PostStatus {
        if now < self.expires_at {
            PostStatus::Live
        } else {
            PostStatus::Expired
        }
    }

    pub fn has_topic(&self, topic: Topic) -> bool {
        self.topics.contains(&topic)
    }
}

/// A validated post ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub owner_id: i64,
    pub title: String,
    pub message: String,
    pub topics: BTreeSet<Topic>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// DTO for creating a new post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(
        min = 1,
        max = 150,
        message = "Title length must be between 1 and 150 chars"
    ))]
    pub title: String,

    #[validate(length(
        min = 1,
        max = 1000,
        message = "Message length must be between 1 and 1000 chars"
    ))]
    pub message: String,

    /// Topic ids; checked against the catalog by the post store.
    pub topics: Vec<String>,

    #[serde(deserialize_with = "deserialize_expiry")]
    pub expiry_date: DateTime<Utc>,
}

/// Accepts RFC 3339 timestamps, and offset-less ones which are read as UTC.
fn deserialize_expiry<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;

    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| D::Error::custom(format!("invalid expiry_date '{}': {}", raw, e)))
}

/// Optional filter on the live/expired state of listed posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Live,
    Expired,
}

impl StatusFilter {
    pub fn matches(&self, status: PostStatus) -> bool {
        matches!(
            (self, status),
            (StatusFilter::Live, PostStatus::Live) | (StatusFilter::Expired, PostStatus::Expired)
        )
    }
}

/// Which end of the rating-count ranking to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interest {
    Highest,
    Lowest,
}

/// Query parameters for listing a topic's posts.
#[derive(Debug, Default, Deserialize)]
pub struct PostListParams {
    pub status: Option<StatusFilter>,
    pub interest: Option<Interest>,
}

/// DTO for displaying a post with its engagement.
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: i64,
    pub title: String,
    pub topics: BTreeSet<Topic>,
    pub date_created: DateTime<Utc>,
    pub message: String,
    pub expiry_date: DateTime<Utc>,
    pub status: PostStatus,
    pub author_username: String,
    pub likes: i64,
    pub dislikes: i64,
    pub comments: Vec<CommentResponse>,
}

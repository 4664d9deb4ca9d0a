use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Free-text feedback on a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub body: String,
    /// Time left until the post expired when the comment was written.
    pub remaining: TimeDelta,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub user_id: i64,
    pub body: String,
    pub remaining: TimeDelta,
    pub created_at: DateTime<Utc>,
}

/// DTO for creating a new comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(
        min = 1,
        max = 256,
        message = "Comment must be between 1 and 256 characters"
    ))]
    pub comment: String,
}

/// DTO for displaying a comment with author info.
#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub post_id: i64,
    pub username: String,
    pub comment: String,
    pub remaining_secs: i64,
    pub created_at: DateTime<Utc>,
}

impl CommentResponse {
    pub fn new(comment: Comment, username: String) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            username,
            comment: comment.body,
            remaining_secs: comment.remaining.num_seconds(),
            created_at: comment.created_at,
        }
    }
}

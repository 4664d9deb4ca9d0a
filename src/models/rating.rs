use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Value of a rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingValue {
    #[serde(alias = "LIKE")]
    Like,
    #[serde(alias = "DISLIKE")]
    Dislike,
}

impl RatingValue {
    /// Representation in the `ratings.value` column.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            RatingValue::Like => "LIKE",
            RatingValue::Dislike => "DISLIKE",
        }
    }
}

impl fmt::Display for RatingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

impl FromStr for RatingValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LIKE" => Ok(RatingValue::Like),
            "DISLIKE" => Ok(RatingValue::Dislike),
            other => Err(format!("unknown rating value '{}'", other)),
        }
    }
}

/// A like/dislike cast on a post by a user other than its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rating {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub value: RatingValue,
    /// Time that was left until the post expired when the rating was cast.
    /// Frozen at creation.
    pub remaining: TimeDelta,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRating {
    pub post_id: i64,
    pub user_id: i64,
    pub value: RatingValue,
    pub remaining: TimeDelta,
    pub created_at: DateTime<Utc>,
}

/// Like/dislike counts of a single post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatingTally {
    pub likes: i64,
    pub dislikes: i64,
}

impl RatingTally {
    pub fn total(&self) -> i64 {
        self.likes + self.dislikes
    }
}

/// DTO for casting a rating.
#[derive(Debug, Deserialize)]
pub struct CreateRatingRequest {
    pub rating: RatingValue,
}

/// DTO for displaying a rating with author info.
#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub id: i64,
    pub post_id: i64,
    pub username: String,
    pub rating: RatingValue,
    pub remaining_secs: i64,
    pub created_at: DateTime<Utc>,
}

impl RatingResponse {
    pub fn new(rating: Rating, username: String) -> Self {
        Self {
            id: rating.id,
            post_id: rating.post_id,
            username,
            rating: rating.value,
            remaining_secs: rating.remaining.num_seconds(),
            created_at: rating.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_accepts_both_spellings() {
        let lower: CreateRatingRequest = serde_json::from_str(r#"{"rating":"like"}"#).unwrap();
        let upper: CreateRatingRequest = serde_json::from_str(r#"{"rating":"DISLIKE"}"#).unwrap();

        assert_eq!(lower.rating, RatingValue::Like);
        assert_eq!(upper.rating, RatingValue::Dislike);
        assert!(serde_json::from_str::<CreateRatingRequest>(r#"{"rating":"meh"}"#).is_err());
    }

    #[test]
    fn tally_total_sums_both_values() {
        let tally = RatingTally { likes: 3, dislikes: 2 };
        assert_eq!(tally.total(), 5);
    }
}

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};

use super::posts::PostStore;
use crate::{
    error::{AppError, ValidationReason},
    models::{
        comment::{Comment, NewComment},
        post::PostStatus,
        rating::{NewRating, Rating, RatingTally, RatingValue},
    },
    store::EngagementRepository,
};

/// Time left until `expires_at`, cut to whole microseconds so the value
/// handed back matches what storage keeps.
fn remaining_until(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<TimeDelta, AppError> {
    (expires_at - now)
        .num_microseconds()
        .map(TimeDelta::microseconds)
        .ok_or_else(|| AppError::InternalServerError("remaining time out of range".to_string()))
}

/// Ratings and comments recorded against posts.
///
/// Both kinds of entry freeze the time that was left until the post's expiry
/// at the moment they are recorded. The frozen value is never recomputed.
#[derive(Clone)]
pub struct EngagementLedger {
    posts: PostStore,
    repo: Arc<dyn EngagementRepository>,
}

impl EngagementLedger {
    pub fn new(posts: PostStore, repo: Arc<dyn EngagementRepository>) -> Self {
        Self { posts, repo }
    }

    /// Casts `user_id`'s rating on a post.
    ///
    /// Checks run in a fixed order and the first failure wins:
    /// 1. the post exists
    /// 2. the user is not the owner
    /// 3. the post is still live at `now`
    /// 4. the user has not rated the post yet
    pub async fn add_rating(
        &self,
        post_id: i64,
        user_id: i64,
        value: RatingValue,
        now: DateTime<Utc>,
    ) -> Result<Rating, AppError> {
        let post = self.posts.get(post_id).await?;

        if user_id == post.owner_id {
            tracing::debug!(post_id, user_id, "rejected self-rating");
            return Err(AppError::Validation(ValidationReason::SelfRating));
        }

        if PostStore::status_of(&post, now) == PostStatus::Expired {
            tracing::debug!(post_id, user_id, "rejected rating on expired post");
            return Err(AppError::Validation(ValidationReason::Expired));
        }

        if self.repo.find_rating(post_id, user_id).await?.is_some() {
            tracing::debug!(post_id, user_id, "rejected duplicate rating");
            return Err(AppError::Validation(ValidationReason::DuplicateRating));
        }

        // The repository re-checks uniqueness atomically, so a concurrent cast
        // that slipped past the lookup above still fails as a duplicate.
        let rating = self
            .repo
            .insert_rating(NewRating {
                post_id,
                user_id,
                value,
                remaining: remaining_until(post.expires_at, now)?,
                created_at: now.trunc_subsecs(6),
            })
            .await?;

        tracing::info!(post_id, user_id, value = %value, "rating recorded");
        Ok(rating)
    }

    /// Adds a comment. Any user, the owner included, may comment any number
    /// of times while the post is live.
    pub async fn add_comment(
        &self,
        post_id: i64,
        user_id: i64,
        text: String,
        now: DateTime<Utc>,
    ) -> Result<Comment, AppError> {
        let post = self.posts.get(post_id).await?;

        if PostStore::status_of(&post, now) == PostStatus::Expired {
            tracing::debug!(post_id, user_id, "rejected comment on expired post");
            return Err(AppError::Validation(ValidationReason::Expired));
        }

        let comment = self
            .repo
            .insert_comment(NewComment {
                post_id,
                user_id,
                body: text,
                remaining: remaining_until(post.expires_at, now)?,
                created_at: now.trunc_subsecs(6),
            })
            .await?;

        tracing::info!(post_id, user_id, comment_id = comment.id, "comment recorded");
        Ok(comment)
    }

    pub async fn ratings_for(&self, post_id: i64) -> Result<Vec<Rating>, AppError> {
        self.repo.ratings_for(post_id).await
    }

    pub async fn comments_for(&self, post_id: i64) -> Result<Vec<Comment>, AppError> {
        self.repo.comments_for(post_id).await
    }

    pub async fn count_by_value(&self, post_id: i64, value: RatingValue) -> Result<i64, AppError> {
        self.repo.count_ratings(post_id, value).await
    }

    pub async fn tally(&self, post_id: i64) -> Result<RatingTally, AppError> {
        let tallies = self.tallies(&[post_id]).await?;
        Ok(tallies.get(&post_id).copied().unwrap_or_default())
    }

    /// Like/dislike counts for a batch of posts in a single storage call.
    /// Posts nobody rated are absent from the map.
    pub async fn tallies(&self, post_ids: &[i64]) -> Result<HashMap<i64, RatingTally>, AppError> {
        self.repo.rating_tallies(post_ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::post::Post, store::MemoryStore};
    use chrono::TimeDelta;

    const OWNER: i64 = 1;
    const BOB: i64 = 2;
    const CAROL: i64 = 3;

    struct Fixture {
        ledger: EngagementLedger,
        post: Post,
        t0: DateTime<Utc>,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let posts = PostStore::new(store.clone());
        let ledger = EngagementLedger::new(posts.clone(), store);
        let t0 = Utc::now();
        let post = posts
            .create(
                "P".to_string(),
                "message".to_string(),
                &["tech".to_string()],
                OWNER,
                t0 + TimeDelta::hours(1),
                t0,
            )
            .await
            .unwrap();
        Fixture { ledger, post, t0 }
    }

    #[tokio::test]
    async fn rating_lifecycle_follows_rule_order() {
        let Fixture { ledger, post, t0 } = fixture().await;

        let rating = ledger
            .add_rating(post.id, BOB, RatingValue::Like, t0 + TimeDelta::minutes(10))
            .await
            .unwrap();
        assert_eq!(rating.remaining, TimeDelta::minutes(50));

        let err = ledger
            .add_rating(post.id, BOB, RatingValue::Dislike, t0 + TimeDelta::minutes(20))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), Some(ValidationReason::DuplicateRating));

        let err = ledger
            .add_rating(post.id, OWNER, RatingValue::Like, t0 + TimeDelta::minutes(15))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), Some(ValidationReason::SelfRating));

        let err = ledger
            .add_rating(post.id, CAROL, RatingValue::Like, t0 + TimeDelta::minutes(61))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), Some(ValidationReason::Expired));
    }

    #[tokio::test]
    async fn self_rating_is_reported_before_expiry() {
        let Fixture { ledger, post, t0 } = fixture().await;

        let err = ledger
            .add_rating(post.id, OWNER, RatingValue::Like, t0 + TimeDelta::hours(2))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), Some(ValidationReason::SelfRating));
    }

    #[tokio::test]
    async fn rating_at_exact_expiry_is_rejected() {
        let Fixture { ledger, post, .. } = fixture().await;

        let err = ledger
            .add_rating(post.id, BOB, RatingValue::Like, post.expires_at)
            .await
            .unwrap_err();
        assert_eq!(err.reason(), Some(ValidationReason::Expired));

        let rating = ledger
            .add_rating(
                post.id,
                BOB,
                RatingValue::Like,
                post.expires_at - TimeDelta::milliseconds(1),
            )
            .await
            .unwrap();
        assert_eq!(rating.remaining, TimeDelta::milliseconds(1));
    }

    #[tokio::test]
    async fn unknown_post_is_not_found() {
        let Fixture { ledger, t0, .. } = fixture().await;

        let err = ledger
            .add_rating(999, BOB, RatingValue::Like, t0)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = ledger
            .add_comment(999, BOB, "hi".to_string(), t0)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn owner_may_comment_repeatedly_while_live() {
        let Fixture { ledger, post, t0 } = fixture().await;

        for minutes in [5, 6] {
            let at = t0 + TimeDelta::minutes(minutes);
            let comment = ledger
                .add_comment(post.id, OWNER, "update".to_string(), at)
                .await
                .unwrap();
            assert_eq!(comment.remaining, TimeDelta::minutes(60 - minutes));
        }

        let err = ledger
            .add_comment(post.id, BOB, "late".to_string(), t0 + TimeDelta::hours(1))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), Some(ValidationReason::Expired));

        assert_eq!(ledger.comments_for(post.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn frozen_remaining_survives_later_reads() {
        let Fixture { ledger, post, t0 } = fixture().await;

        ledger
            .add_rating(post.id, BOB, RatingValue::Dislike, t0 + TimeDelta::minutes(30))
            .await
            .unwrap();
        ledger
            .add_comment(post.id, CAROL, "hm".to_string(), t0 + TimeDelta::minutes(45))
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let ratings = ledger.ratings_for(post.id).await.unwrap();
        let comments = ledger.comments_for(post.id).await.unwrap();
        assert_eq!(ratings[0].remaining, TimeDelta::minutes(30));
        assert_eq!(comments[0].remaining, TimeDelta::minutes(15));
    }

    #[tokio::test]
    async fn tally_counts_each_value() {
        let Fixture { ledger, post, t0 } = fixture().await;

        for (user, value) in [
            (2, RatingValue::Like),
            (3, RatingValue::Like),
            (4, RatingValue::Dislike),
        ] {
            ledger.add_rating(post.id, user, value, t0).await.unwrap();
        }

        let tally = ledger.tally(post.id).await.unwrap();
        assert_eq!(tally, RatingTally { likes: 2, dislikes: 1 });
        assert_eq!(
            ledger.count_by_value(post.id, RatingValue::Dislike).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn remaining_is_kept_at_microsecond_precision() {
        let Fixture { ledger, post, t0 } = fixture().await;
        let at = t0 + TimeDelta::nanoseconds(1_234_567_891);

        let rating = ledger
            .add_rating(post.id, BOB, RatingValue::Like, at)
            .await
            .unwrap();
        let comment = ledger
            .add_comment(post.id, CAROL, "precise".to_string(), at)
            .await
            .unwrap();

        let expected = TimeDelta::microseconds((post.expires_at - at).num_microseconds().unwrap());
        assert_eq!(rating.remaining, expected);
        assert_eq!(comment.remaining, expected);
        assert_eq!(rating.remaining.subsec_nanos() % 1_000, 0);
        assert_eq!(rating.created_at.timestamp_subsec_nanos() % 1_000, 0);

        let stored = ledger.ratings_for(post.id).await.unwrap();
        assert_eq!(stored[0].remaining, rating.remaining);
        assert_eq!(stored[0].created_at, rating.created_at);
    }

    #[tokio::test]
    async fn concurrent_duplicate_ratings_yield_one_success() {
        let Fixture { ledger, post, t0 } = fixture().await;
        let post_id = post.id;

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move {
                    ledger
                        .add_rating(post_id, BOB, RatingValue::Like, t0 + TimeDelta::minutes(1))
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(err) => assert_eq!(err.reason(), Some(ValidationReason::DuplicateRating)),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(ledger.ratings_for(post_id).await.unwrap().len(), 1);
    }
}

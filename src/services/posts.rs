use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, ValidationReason},
    models::{
        post::{NewPost, Post, PostStatus},
        topic::Topic,
    },
    store::PostRepository,
};

/// Creates and looks up posts.
#[derive(Clone)]
pub struct PostStore {
    repo: Arc<dyn PostRepository>,
}

impl PostStore {
    pub fn new(repo: Arc<dyn PostRepository>) -> Self {
        Self { repo }
    }

    /// Creates a post owned by `owner_id`, stamped with `now` as creation time.
    ///
    /// Checks, in order: expiry strictly after `now`, at least one topic,
    /// every topic id in the catalog.
    pub async fn create(
        &self,
        title: String,
        message: String,
        topic_ids: &[String],
        owner_id: i64,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Post, AppError> {
        if expires_at <= now {
            tracing::debug!(owner_id, %expires_at, %now, "rejected post with past expiry");
            return Err(AppError::Validation(ValidationReason::PastExpiry));
        }
        if topic_ids.is_empty() {
            tracing::debug!(owner_id, "rejected post without topics");
            return Err(AppError::Validation(ValidationReason::MissingTopic));
        }
        let topics = topic_ids
            .iter()
            .map(|id| id.parse::<Topic>())
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(|_| {
                tracing::debug!(owner_id, ?topic_ids, "rejected post with unknown topic");
                AppError::Validation(ValidationReason::InvalidTopic)
            })?;

        let post = self
            .repo
            .insert_post(NewPost {
                owner_id,
                title,
                message,
                topics,
                created_at: now,
                expires_at,
            })
            .await?;

        tracing::info!(post_id = post.id, owner_id, "post created");
        Ok(post)
    }

    pub async fn get(&self, post_id: i64) -> Result<Post, AppError> {
        self.repo
            .find_post(post_id)
            .await?
            .ok_or(AppError::NotFound("Post not found".to_string()))
    }

    /// Every post tagged with `topic`, any status.
    pub async fn list_by_topic(&self, topic: Topic) -> Result<Vec<Post>, AppError> {
        self.repo.posts_by_topic(topic).await
    }

    pub fn status_of(post: &Post, now: DateTime<Utc>) -> PostStatus {
        post.status_at(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeDelta;

    fn store() -> PostStore {
        PostStore::new(Arc::new(MemoryStore::new()))
    }

    fn topics(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn create_stamps_creation_time_and_topics() {
        let posts = store();
        let now = Utc::now();

        let post = posts
            .create(
                "Title".to_string(),
                "Body".to_string(),
                &topics(&["tech", "health", "tech"]),
                1,
                now + TimeDelta::hours(1),
                now,
            )
            .await
            .unwrap();

        assert_eq!(post.created_at, now);
        assert_eq!(post.topics, BTreeSet::from([Topic::Health, Topic::Tech]));
        assert_eq!(posts.get(post.id).await.unwrap(), post);
    }

    #[tokio::test]
    async fn create_rejects_expiry_not_in_future() {
        let posts = store();
        let now = Utc::now();

        for expiry in [now, now - TimeDelta::seconds(1)] {
            let err = posts
                .create("t".into(), "m".into(), &topics(&["tech"]), 1, expiry, now)
                .await
                .unwrap_err();
            assert_eq!(err.reason(), Some(ValidationReason::PastExpiry));
        }
    }

    #[tokio::test]
    async fn create_rejects_missing_or_unknown_topics() {
        let posts = store();
        let now = Utc::now();
        let expiry = now + TimeDelta::hours(1);

        let err = posts
            .create("t".into(), "m".into(), &[], 1, expiry, now)
            .await
            .unwrap_err();
        assert_eq!(err.reason(), Some(ValidationReason::MissingTopic));

        let err = posts
            .create("t".into(), "m".into(), &topics(&["tech", "music"]), 1, expiry, now)
            .await
            .unwrap_err();
        assert_eq!(err.reason(), Some(ValidationReason::InvalidTopic));
    }

    #[tokio::test]
    async fn get_unknown_post_is_not_found() {
        let err = store().get(42).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_by_topic_includes_expired_posts() {
        let posts = store();
        let now = Utc::now();
        let sport_only = topics(&["sport"]);
        let tech_only = topics(&["tech"]);
        let short = posts
            .create("a".into(), "m".into(), &sport_only, 1, now + TimeDelta::seconds(1), now)
            .await
            .unwrap();
        posts
            .create("b".into(), "m".into(), &tech_only, 1, now + TimeDelta::hours(1), now)
            .await
            .unwrap();

        let sport = posts.list_by_topic(Topic::Sport).await.unwrap();
        assert_eq!(sport, vec![short.clone()]);
        assert_eq!(
            PostStore::status_of(&short, now + TimeDelta::minutes(1)),
            PostStatus::Expired
        );
    }
}

use chrono::{DateTime, Utc};

use super::{posts::PostStore, ranking::InterestRanker};
use crate::{
    error::AppError,
    models::{
        post::{Interest, Post, StatusFilter},
        topic::Topic,
    },
};

/// Answers filtered topic listings.
#[derive(Clone)]
pub struct PostQueryEngine {
    posts: PostStore,
    ranker: InterestRanker,
}

impl PostQueryEngine {
    pub fn new(posts: PostStore, ranker: InterestRanker) -> Self {
        Self { posts, ranker }
    }

    /// Lists a topic's posts.
    ///
    /// The status filter is applied first; the interest filter then reduces the
    /// survivors to at most one post, so "highest live" only ranks live posts.
    pub async fn query(
        &self,
        topic: Topic,
        status: Option<StatusFilter>,
        interest: Option<Interest>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Post>, AppError> {
        let mut posts = self.posts.list_by_topic(topic).await?;

        if let Some(filter) = status {
            posts.retain(|post| filter.matches(PostStore::status_of(post, now)));
        }

        match interest {
            Some(direction) => Ok(self
                .ranker
                .extreme_by_rating_count(&posts, direction)
                .await?
                .into_iter()
                .collect()),
            None => Ok(posts),
        }
    }
}

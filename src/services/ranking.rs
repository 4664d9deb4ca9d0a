use crate::{
    error::AppError,
    models::{
        post::{Interest, Post},
        rating::RatingTally,
    },
};

use super::engagement::EngagementLedger;

/// Picks the most or least rated post out of a candidate set.
#[derive(Clone)]
pub struct InterestRanker {
    ledger: EngagementLedger,
}

impl InterestRanker {
    pub fn new(ledger: EngagementLedger) -> Self {
        Self { ledger }
    }

    /// Returns the post with the highest or lowest total rating count.
    ///
    /// Ties go to the earliest created post (then lowest id). An empty input
    /// yields `None`. Counts for the whole candidate set come from one
    /// storage call.
    pub async fn extreme_by_rating_count(
        &self,
        posts: &[Post],
        direction: Interest,
    ) -> Result<Option<Post>, AppError> {
        if posts.is_empty() {
            return Ok(None);
        }

        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        let tallies = self.ledger.tallies(&ids).await?;

        let mut candidates: Vec<&Post> = posts.iter().collect();
        candidates.sort_by_key(|p| (p.created_at, p.id));

        let mut best: Option<(&Post, i64)> = None;
        for post in candidates {
            let count = tallies.get(&post.id).map(RatingTally::total).unwrap_or(0);
            let replaces = match best {
                None => true,
                Some((_, best_count)) => match direction {
                    Interest::Highest => count > best_count,
                    Interest::Lowest => count < best_count,
                },
            };
            if replaces {
                best = Some((post, count));
            }
        }

        Ok(best.map(|(post, _)| post.clone()))
    }
}

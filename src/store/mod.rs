// src/store/mod.rs

//! Storage seams used by the services.
//!
//! Two backends implement every trait: [`MemoryStore`] and [`PgStore`].

use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        comment::{Comment, NewComment},
        post::{NewPost, Post},
        rating::{NewRating, Rating, RatingTally, RatingValue},
        topic::Topic,
        user::User,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Persists the post together with its topic associations.
    async fn insert_post(&self, post: NewPost) -> Result<Post, AppError>;

    async fn find_post(&self, id: i64) -> Result<Option<Post>, AppError>;

    /// All posts tagged with `topic`, oldest first.
    async fn posts_by_topic(&self, topic: Topic) -> Result<Vec<Post>, AppError>;
}

#[async_trait]
pub trait EngagementRepository: Send + Sync {
    /// Inserts a rating.
    ///
    /// Must reject a second rating for the same (post, user) pair with
    /// `ValidationReason::DuplicateRating`, atomically with respect to other writers.
    async fn insert_rating(&self, rating: NewRating) -> Result<Rating, AppError>;

    async fn find_rating(&self, post_id: i64, user_id: i64) -> Result<Option<Rating>, AppError>;

    async fn ratings_for(&self, post_id: i64) -> Result<Vec<Rating>, AppError>;

    async fn count_ratings(&self, post_id: i64, value: RatingValue) -> Result<i64, AppError>;

    /// Like/dislike counts for many posts in one round trip.
    /// Posts without ratings may be absent from the map.
    async fn rating_tallies(
        &self,
        post_ids: &[i64],
    ) -> Result<HashMap<i64, RatingTally>, AppError>;

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment, AppError>;

    async fn comments_for(&self, post_id: i64) -> Result<Vec<Comment>, AppError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `AppError::Conflict` when the username is taken.
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<User, AppError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Resolves user ids to usernames. Unknown ids are left out.
    async fn usernames(&self, ids: &[i64]) -> Result<HashMap<i64, String>, AppError>;
}

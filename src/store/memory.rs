use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{EngagementRepository, PostRepository, UserRepository};
use crate::{
    error::{AppError, ValidationReason},
    models::{
        comment::{Comment, NewComment},
        post::{NewPost, Post},
        rating::{NewRating, Rating, RatingTally, RatingValue},
        topic::Topic,
        user::User,
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    posts: Vec<Post>,
    ratings: Vec<Rating>,
    comments: Vec<Comment>,
}

/// Process-local store. Ids are assigned sequentially from 1.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn insert_post(&self, post: NewPost) -> Result<Post, AppError> {
        let mut tables = self.tables.write().await;
        let post = Post {
            id: tables.posts.len() as i64 + 1,
            owner_id: post.owner_id,
            title: post.title,
            message: post.message,
            topics: post.topics,
            created_at: post.created_at,
            expires_at: post.expires_at,
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn find_post(&self, id: i64) -> Result<Option<Post>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn posts_by_topic(&self, topic: Topic) -> Result<Vec<Post>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .filter(|p| p.has_topic(topic))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EngagementRepository for MemoryStore {
    async fn insert_rating(&self, rating: NewRating) -> Result<Rating, AppError> {
        // Check and insert under one write guard so concurrent casts by the
        // same user cannot both pass.
        let mut tables = self.tables.write().await;
        if tables
            .ratings
            .iter()
            .any(|r| r.post_id == rating.post_id && r.user_id == rating.user_id)
        {
            return Err(AppError::Validation(ValidationReason::DuplicateRating));
        }

        let rating = Rating {
            id: tables.ratings.len() as i64 + 1,
            post_id: rating.post_id,
            user_id: rating.user_id,
            value: rating.value,
            remaining: rating.remaining,
            created_at: rating.created_at,
        };
        tables.ratings.push(rating.clone());
        Ok(rating)
    }

    async fn find_rating(&self, post_id: i64, user_id: i64) -> Result<Option<Rating>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .ratings
            .iter()
            .find(|r| r.post_id == post_id && r.user_id == user_id)
            .cloned())
    }

    async fn ratings_for(&self, post_id: i64) -> Result<Vec<Rating>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .ratings
            .iter()
            .filter(|r| r.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn count_ratings(&self, post_id: i64, value: RatingValue) -> Result<i64, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .ratings
            .iter()
            .filter(|r| r.post_id == post_id && r.value == value)
            .count() as i64)
    }

    async fn rating_tallies(
        &self,
        post_ids: &[i64],
    ) -> Result<HashMap<i64, RatingTally>, AppError> {
        let tables = self.tables.read().await;
        let mut tallies: HashMap<i64, RatingTally> = HashMap::new();
        for rating in tables.ratings.iter().filter(|r| post_ids.contains(&r.post_id)) {
            let tally = tallies.entry(rating.post_id).or_default();
            match rating.value {
                RatingValue::Like => tally.likes += 1,
                RatingValue::Dislike => tally.dislikes += 1,
            }
        }
        Ok(tallies)
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment, AppError> {
        let mut tables = self.tables.write().await;
        let comment = Comment {
            id: tables.comments.len() as i64 + 1,
            post_id: comment.post_id,
            user_id: comment.user_id,
            body: comment.body,
            remaining: comment.remaining,
            created_at: comment.created_at,
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn comments_for(&self, post_id: i64) -> Result<Vec<Comment>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.username == username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                username
            )));
        }

        let user = User {
            id: tables.users.len() as i64 + 1,
            username: username.to_string(),
            password: password_hash.to_string(),
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn usernames(&self, ids: &[i64]) -> Result<HashMap<i64, String>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .map(|u| (u.id, u.username.clone()))
            .collect())
    }
}

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use sqlx::{FromRow, PgPool};

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

/// Postgres-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Helper struct for fetching posts with their aggregated topics.
#[derive(FromRow)]
struct PostRow {
    id: i64,
    owner_id: i64,
    title: String,
    message: String,
    topics: Vec<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<PostRow> for Post {
    type Error = AppError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        let topics = row
            .topics
            .iter()
            .map(|t| {
                t.parse::<Topic>().map_err(|_| {
                    AppError::InternalServerError(format!("unknown topic '{}' in database", t))
                })
            })
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(Post {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            message: row.message,
            topics,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

#[derive(FromRow)]
struct RatingRow {
    id: i64,
    post_id: i64,
    user_id: i64,
    value: String,
    remaining_us: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<RatingRow> for Rating {
    type Error = AppError;

    fn try_from(row: RatingRow) -> Result<Self, Self::Error> {
        Ok(Rating {
            id: row.id,
            post_id: row.post_id,
            user_id: row.user_id,
            value: row.value.parse().map_err(AppError::InternalServerError)?,
            remaining: TimeDelta::microseconds(row.remaining_us),
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct CommentRow {
    id: i64,
    post_id: i64,
    user_id: i64,
    body: String,
    remaining_us: i64,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            post_id: row.post_id,
            user_id: row.user_id,
            body: row.body,
            remaining: TimeDelta::microseconds(row.remaining_us),
            created_at: row.created_at,
        }
    }
}

const POST_COLUMNS: &str = r#"
    p.id, p.owner_id, p.title, p.message, p.created_at, p.expires_at,
    ARRAY(
        SELECT pt.topic::TEXT FROM post_topics pt
        WHERE pt.post_id = p.id
        ORDER BY pt.topic
    ) AS topics
"#;

/// Postgres keeps microseconds, so durations are stored at that precision.
fn to_micros(remaining: TimeDelta) -> Result<i64, AppError> {
    remaining
        .num_microseconds()
        .ok_or_else(|| AppError::InternalServerError("duration out of range".to_string()))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

#[async_trait]
impl PostRepository for PgStore {
    async fn insert_post(&self, post: NewPost) -> Result<Post, AppError> {
        let mut tx = self.pool.begin().await?;

        let (id, created_at, expires_at): (i64, DateTime<Utc>, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO posts (owner_id, title, message, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, created_at, expires_at
            "#,
        )
        .bind(post.owner_id)
        .bind(&post.title)
        .bind(&post.message)
        .bind(post.created_at)
        .bind(post.expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create post: {:?}", e);
            AppError::from(e)
        })?;

        for topic in &post.topics {
            sqlx::query("INSERT INTO post_topics (post_id, topic) VALUES ($1, $2)")
                .bind(id)
                .bind(topic.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(Post {
            id,
            owner_id: post.owner_id,
            title: post.title,
            message: post.message,
            topics: post.topics,
            created_at,
            expires_at,
        })
    }

    async fn find_post(&self, id: i64) -> Result<Option<Post>, AppError> {
        let sql = format!("SELECT {} FROM posts p WHERE p.id = $1", POST_COLUMNS);
        sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Post::try_from)
            .transpose()
    }

    async fn posts_by_topic(&self, topic: Topic) -> Result<Vec<Post>, AppError> {
        let sql = format!(
            r#"
            SELECT {} FROM posts p
            WHERE EXISTS (
                SELECT 1 FROM post_topics t WHERE t.post_id = p.id AND t.topic = $1
            )
            ORDER BY p.created_at ASC, p.id ASC
            "#,
            POST_COLUMNS
        );
        sqlx::query_as::<_, PostRow>(&sql)
            .bind(topic.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list posts: {:?}", e);
                AppError::from(e)
            })?
            .into_iter()
            .map(Post::try_from)
            .collect()
    }
}

#[async_trait]
impl EngagementRepository for PgStore {
    async fn insert_rating(&self, rating: NewRating) -> Result<Rating, AppError> {
        // UNIQUE (post_id, user_id) settles races between concurrent casts.
        let row = sqlx::query_as::<_, RatingRow>(
            r#"
            INSERT INTO ratings (post_id, user_id, value, remaining_us, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, post_id, user_id, value, remaining_us, created_at
            "#,
        )
        .bind(rating.post_id)
        .bind(rating.user_id)
        .bind(rating.value.as_db_str())
        .bind(to_micros(rating.remaining)?)
        .bind(rating.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::Validation(ValidationReason::DuplicateRating);
            }
            tracing::error!("Failed to create rating: {:?}", e);
            AppError::from(e)
        })?;

        Rating::try_from(row)
    }

    async fn find_rating(&self, post_id: i64, user_id: i64) -> Result<Option<Rating>, AppError> {
        sqlx::query_as::<_, RatingRow>(
            r#"
            SELECT id, post_id, user_id, value, remaining_us, created_at
            FROM ratings
            WHERE post_id = $1 AND user_id = $2
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Rating::try_from)
        .transpose()
    }

    async fn ratings_for(&self, post_id: i64) -> Result<Vec<Rating>, AppError> {
        sqlx::query_as::<_, RatingRow>(
            r#"
            SELECT id, post_id, user_id, value, remaining_us, created_at
            FROM ratings
            WHERE post_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Rating::try_from)
        .collect()
    }

    async fn count_ratings(&self, post_id: i64, value: RatingValue) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM ratings WHERE post_id = $1 AND value = $2")
                .bind(post_id)
                .bind(value.as_db_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn rating_tallies(
        &self,
        post_ids: &[i64],
    ) -> Result<HashMap<i64, RatingTally>, AppError> {
        let rows: Vec<(i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT
                post_id,
                COUNT(*) FILTER (WHERE value = 'LIKE') AS likes,
                COUNT(*) FILTER (WHERE value = 'DISLIKE') AS dislikes
            FROM ratings
            WHERE post_id = ANY($1)
            GROUP BY post_id
            "#,
        )
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(post_id, likes, dislikes)| (post_id, RatingTally { likes, dislikes }))
            .collect())
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment, AppError> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            INSERT INTO comments (post_id, user_id, body, remaining_us, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, post_id, user_id, body, remaining_us, created_at
            "#,
        )
        .bind(comment.post_id)
        .bind(comment.user_id)
        .bind(&comment.body)
        .bind(to_micros(comment.remaining)?)
        .bind(comment.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create comment: {:?}", e);
            AppError::from(e)
        })?;

        Ok(Comment::from(row))
    }

    async fn comments_for(&self, post_id: i64) -> Result<Vec<Comment>, AppError> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, post_id, user_id, body, remaining_us, created_at
            FROM comments
            WHERE post_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password)
            VALUES ($1, $2)
            RETURNING id, username, password, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Username '{}' already exists", username))
            } else {
                tracing::error!("Failed to register user: {:?}", e);
                AppError::from(e)
            }
        })
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn usernames(&self, ids: &[i64]) -> Result<HashMap<i64, String>, AppError> {
        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, username FROM users WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().collect())
    }
}

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use validator::Validate;

use super::topic::parse_topic;
use crate::{
    error::AppError,
    models::{
        comment::CommentResponse,
        post::{CreatePostRequest, Post, PostListParams, PostResponse},
    },
    services::{EngagementLedger, PostQueryEngine, PostStore},
    store::UserRepository,
    utils::{clock::Clock, jwt::Claims},
};

/// Builds the public view of posts: status at `now`, like/dislike counts,
/// comments and usernames.
pub async fn render_posts(
    ledger: &EngagementLedger,
    users: &dyn UserRepository,
    posts: Vec<Post>,
    now: DateTime<Utc>,
) -> Result<Vec<PostResponse>, AppError> {
    let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
    let tallies = ledger.tallies(&ids).await?;

    let mut rendered = Vec::with_capacity(posts.len());
    let mut user_ids = Vec::new();
    for post in posts {
        let tally = tallies.get(&post.id).copied().unwrap_or_default();
        let comments = ledger.comments_for(post.id).await?;
        user_ids.push(post.owner_id);
        user_ids.extend(comments.iter().map(|c| c.user_id));
        rendered.push((post, tally, comments));
    }

    user_ids.sort_unstable();
    user_ids.dedup();
    let names = users.usernames(&user_ids).await?;
    let name_of = |id: i64| names.get(&id).cloned().unwrap_or_default();

    Ok(rendered
        .into_iter()
        .map(|(post, tally, comments)| PostResponse {
            id: post.id,
            status: post.status_at(now),
            author_username: name_of(post.owner_id),
            title: post.title,
            topics: post.topics,
            date_created: post.created_at,
            message: post.message,
            expiry_date: post.expires_at,
            likes: tally.likes,
            dislikes: tally.dislikes,
            comments: comments
                .into_iter()
                .map(|c| {
                    let username = name_of(c.user_id);
                    CommentResponse::new(c, username)
                })
                .collect(),
        })
        .collect())
}

/// List a topic's posts.
/// Optional filters: `status=live|expired`, `interest=highest|lowest`.
pub async fn list_posts(
    State(queries): State<PostQueryEngine>,
    State(ledger): State<EngagementLedger>,
    State(users): State<Arc<dyn UserRepository>>,
    State(clock): State<Arc<dyn Clock>>,
    Path(topic): Path<String>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let topic = parse_topic(&topic)?;
    let now = clock.now();

    let posts = queries
        .query(topic, params.status, params.interest, now)
        .await?;

    Ok(Json(render_posts(&ledger, users.as_ref(), posts, now).await?))
}

/// Create a new post owned by the caller.
pub async fn create_post(
    State(posts): State<PostStore>,
    State(ledger): State<EngagementLedger>,
    State(users): State<Arc<dyn UserRepository>>,
    State(clock): State<Arc<dyn Clock>>,
    Extension(claims): Extension<Claims>,
    Path(topic): Path<String>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    parse_topic(&topic)?;
    payload.validate()?;
    let user_id = claims.user_id()?;
    let now = clock.now();

    let post = posts
        .create(
            payload.title,
            payload.message,
            &payload.topics,
            user_id,
            payload.expiry_date,
            now,
        )
        .await?;

    let mut rendered = render_posts(&ledger, users.as_ref(), vec![post], now).await?;
    let body = rendered
        .pop()
        .ok_or_else(|| AppError::InternalServerError("created post vanished".to_string()))?;

    Ok((StatusCode::CREATED, Json(body)))
}

/// Get a single post within a topic.
pub async fn get_post(
    State(posts): State<PostStore>,
    State(ledger): State<EngagementLedger>,
    State(users): State<Arc<dyn UserRepository>>,
    State(clock): State<Arc<dyn Clock>>,
    Path((topic, post_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let topic = parse_topic(&topic)?;
    let post = posts.get(post_id).await?;
    if !post.has_topic(topic) {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    let mut rendered = render_posts(&ledger, users.as_ref(), vec![post], clock.now()).await?;
    let body = rendered
        .pop()
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    Ok(Json(body))
}

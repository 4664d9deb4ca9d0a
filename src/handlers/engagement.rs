use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use super::topic::parse_topic;
use crate::{
    error::AppError,
    models::{
        comment::{CommentResponse, CreateCommentRequest},
        rating::{CreateRatingRequest, RatingResponse},
    },
    services::EngagementLedger,
    store::UserRepository,
    utils::{clock::Clock, jwt::Claims},
};

/// Cast a like/dislike on a post.
pub async fn create_rating(
    State(ledger): State<EngagementLedger>,
    State(clock): State<Arc<dyn Clock>>,
    Extension(claims): Extension<Claims>,
    Path((topic, post_id)): Path<(String, i64)>,
    Json(payload): Json<CreateRatingRequest>,
) -> Result<impl IntoResponse, AppError> {
    parse_topic(&topic)?;
    let user_id = claims.user_id()?;

    let rating = ledger
        .add_rating(post_id, user_id, payload.rating, clock.now())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RatingResponse::new(rating, claims.username)),
    ))
}

/// List all ratings of a post.
pub async fn list_ratings(
    State(ledger): State<EngagementLedger>,
    State(users): State<Arc<dyn UserRepository>>,
    Path((topic, post_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, AppError> {
    parse_topic(&topic)?;

    let ratings = ledger.ratings_for(post_id).await?;
    let ids: Vec<i64> = ratings.iter().map(|r| r.user_id).collect();
    let names = users.usernames(&ids).await?;

    let body: Vec<RatingResponse> = ratings
        .into_iter()
        .map(|r| {
            let username = names.get(&r.user_id).cloned().unwrap_or_default();
            RatingResponse::new(r, username)
        })
        .collect();

    Ok(Json(body))
}

/// Comment on a post.
pub async fn create_comment(
    State(ledger): State<EngagementLedger>,
    State(clock): State<Arc<dyn Clock>>,
    Extension(claims): Extension<Claims>,
    Path((topic, post_id)): Path<(String, i64)>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    parse_topic(&topic)?;
    payload.validate()?;
    let user_id = claims.user_id()?;

    let comment = ledger
        .add_comment(post_id, user_id, payload.comment, clock.now())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse::new(comment, claims.username)),
    ))
}

/// List all comments of a post, oldest first.
pub async fn list_comments(
    State(ledger): State<EngagementLedger>,
    State(users): State<Arc<dyn UserRepository>>,
    Path((topic, post_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, AppError> {
    parse_topic(&topic)?;

    let comments = ledger.comments_for(post_id).await?;
    let ids: Vec<i64> = comments.iter().map(|c| c.user_id).collect();
    let names = users.usernames(&ids).await?;

    let body: Vec<CommentResponse> = comments
        .into_iter()
        .map(|c| {
            let username = names.get(&c.user_id).cloned().unwrap_or_default();
            CommentResponse::new(c, username)
        })
        .collect();

    Ok(Json(body))
}

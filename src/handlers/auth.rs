// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{CreateUserRequest, LoginRequest},
    store::UserRepository,
    utils::{
        blacklist::TokenBlacklist,
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt, unix_now},
    },
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(users): State<Arc<dyn UserRepository>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;
    let user = users.insert_user(&payload.username, &hashed_password).await?;

    tracing::info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user and returns a JWT token.
pub async fn login(
    State(users): State<Arc<dyn UserRepository>>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = users
        .find_by_username(&payload.username)
        .await?
        .ok_or(AppError::AuthError("Invalid username or password".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError(
            "Invalid username or password".to_string(),
        ));
    }

    let token = sign_jwt(
        user.id,
        &user.username,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
    })))
}

/// Exchanges a valid token for a fresh one. The presented token is revoked.
pub async fn refresh(
    State(config): State<Config>,
    State(blacklist): State<TokenBlacklist>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let token = sign_jwt(
        user_id,
        &claims.username,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;
    blacklist.revoke(&claims.jti, claims.exp, unix_now()?).await;

    tracing::info!(user_id, "token refreshed");
    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
    })))
}

/// Revokes the presented token for the rest of its lifetime.
pub async fn revoke(
    State(blacklist): State<TokenBlacklist>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    blacklist.revoke(&claims.jti, claims.exp, unix_now()?).await;
    Ok(StatusCode::NO_CONTENT)
}

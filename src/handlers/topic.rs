use axum::{Json, extract::Path, response::IntoResponse};

use crate::{
    error::AppError,
    models::topic::{Topic, TopicCatalog, TopicResponse},
};

/// Resolves a topic path segment, 404 when it is outside the catalog.
pub fn parse_topic(raw: &str) -> Result<Topic, AppError> {
    raw.parse::<Topic>()
        .map_err(|_| AppError::NotFound(format!("Topic '{}' not found", raw)))
}

/// List the fixed topics.
pub async fn list_topics() -> impl IntoResponse {
    let topics: Vec<TopicResponse> = TopicCatalog::list()
        .iter()
        .copied()
        .map(TopicResponse::from)
        .collect();
    Json(topics)
}

/// Get a single topic.
pub async fn get_topic(Path(topic): Path<String>) -> Result<impl IntoResponse, AppError> {
    let topic = parse_topic(&topic)?;
    Ok(Json(TopicResponse::from(topic)))
}

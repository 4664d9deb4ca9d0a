// src/models/topic.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the fixed categories a post can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Politics,
    Health,
    Sport,
    Tech,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Politics => "politics",
            Topic::Health => "health",
            Topic::Sport => "sport",
            Topic::Tech => "tech",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TopicCatalog::list()
            .iter()
            .copied()
            .find(|topic| topic.as_str() == s)
            .ok_or(())
    }
}

/// Read-only lookup over the closed topic set.
pub struct TopicCatalog;

impl TopicCatalog {
    const TOPICS: [Topic; 4] = [Topic::Politics, Topic::Health, Topic::Sport, Topic::Tech];

    pub fn is_valid(topic_id: &str) -> bool {
        topic_id.parse::<Topic>().is_ok()
    }

    /// All topics, in catalog order.
    pub fn list() -> &'static [Topic] {
        &Self::TOPICS
    }
}

/// DTO for displaying a topic.
#[derive(Debug, Serialize)]
pub struct TopicResponse {
    pub title: Topic,
    pub posts: String,
}

impl From<Topic> for TopicResponse {
    fn from(topic: Topic) -> Self {
        Self {
            title: topic,
            posts: format!("/api/topics/{}/posts", topic),
        }
    }
}

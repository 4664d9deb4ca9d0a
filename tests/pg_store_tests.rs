// tests/pg_store_tests.rs
//
// Runs against a live Postgres when DATABASE_URL is set; otherwise each test
// returns early.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use sqlx::postgres::PgPoolOptions;
use topic_board::{
    error::ValidationReason,
    models::{
        post::Post,
        rating::{NewRating, RatingValue},
        topic::Topic,
    },
    services::{EngagementLedger, PostStore},
    store::{EngagementRepository, PgStore, PostRepository, UserRepository},
};

async fn pg_store() -> Option<Arc<PgStore>> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    Some(Arc::new(PgStore::new(pool)))
}

async fn new_user(store: &PgStore) -> i64 {
    let username = format!("pg_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    store
        .insert_user(&username, "not-a-real-hash")
        .await
        .expect("Failed to insert user")
        .id
}

async fn new_post(posts: &PostStore, owner_id: i64, topics: &[&str], now: DateTime<Utc>) -> Post {
    let topics: Vec<String> = topics.iter().map(|t| t.to_string()).collect();
    posts
        .create(
            "Stored post".to_string(),
            "Lives in Postgres.".to_string(),
            &topics,
            owner_id,
            now + TimeDelta::hours(1),
            now,
        )
        .await
        .expect("Failed to create post")
}

#[tokio::test]
async fn duplicate_rating_insert_is_rejected() {
    let Some(store) = pg_store().await else {
        return;
    };
    let posts = PostStore::new(store.clone());
    let owner = new_user(&store).await;
    let rater = new_user(&store).await;
    let now = Utc::now();
    let post = new_post(&posts, owner, &["sport"], now).await;

    let rating = || NewRating {
        post_id: post.id,
        user_id: rater,
        value: RatingValue::Like,
        remaining: TimeDelta::minutes(30),
        created_at: now,
    };

    store.insert_rating(rating()).await.unwrap();
    let err = store.insert_rating(rating()).await.unwrap_err();
    assert_eq!(err.reason(), Some(ValidationReason::DuplicateRating));
    assert_eq!(store.ratings_for(post.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_ratings_yield_one_success() {
    let Some(store) = pg_store().await else {
        return;
    };
    let posts = PostStore::new(store.clone());
    let ledger = EngagementLedger::new(posts.clone(), store.clone());
    let owner = new_user(&store).await;
    let rater = new_user(&store).await;
    let now = Utc::now();
    let post_id = new_post(&posts, owner, &["politics"], now).await.id;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                ledger
                    .add_rating(post_id, rater, RatingValue::Dislike, now + TimeDelta::minutes(1))
                    .await
            })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => assert_eq!(err.reason(), Some(ValidationReason::DuplicateRating)),
        }
    }

    assert_eq!(successes, 1);
    let tally = ledger.tally(post_id).await.unwrap();
    assert_eq!((tally.likes, tally.dislikes), (0, 1));
}

#[tokio::test]
async fn posts_by_topic_returns_every_topic() {
    let Some(store) = pg_store().await else {
        return;
    };
    let posts = PostStore::new(store.clone());
    let owner = new_user(&store).await;
    let created = new_post(&posts, owner, &["tech", "health"], Utc::now()).await;

    let listed = store.posts_by_topic(Topic::Tech).await.unwrap();
    let found = listed
        .into_iter()
        .find(|p| p.id == created.id)
        .expect("post missing from its topic");

    assert_eq!(found.topics, BTreeSet::from([Topic::Health, Topic::Tech]));
    assert_eq!(found, created);
    assert_eq!(store.find_post(created.id).await.unwrap(), Some(created));
}

#[tokio::test]
async fn recorded_remaining_matches_stored_value() {
    let Some(store) = pg_store().await else {
        return;
    };
    let posts = PostStore::new(store.clone());
    let ledger = EngagementLedger::new(posts.clone(), store.clone());
    let owner = new_user(&store).await;
    let rater = new_user(&store).await;
    let t0 = Utc::now();
    let post = new_post(&posts, owner, &["health"], t0).await;

    // Sub-microsecond part on purpose.
    let at = t0 + TimeDelta::nanoseconds(987_654_321);
    let rating = ledger
        .add_rating(post.id, rater, RatingValue::Like, at)
        .await
        .unwrap();
    let comment = ledger
        .add_comment(post.id, owner, "still here".to_string(), at)
        .await
        .unwrap();

    let stored_rating = store.find_rating(post.id, rater).await.unwrap().unwrap();
    let stored_comment = ledger.comments_for(post.id).await.unwrap().remove(0);

    assert_eq!(stored_rating.remaining, rating.remaining);
    assert_eq!(stored_rating.created_at, rating.created_at);
    assert_eq!(stored_comment.remaining, comment.remaining);
    assert_eq!(stored_comment.created_at, comment.created_at);
}

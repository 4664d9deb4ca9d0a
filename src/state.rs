use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    services::{EngagementLedger, InterestRanker, PostQueryEngine, PostStore},
    store::{EngagementRepository, PostRepository, UserRepository},
    utils::{blacklist::TokenBlacklist, clock::Clock},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub clock: Arc<dyn Clock>,
    pub users: Arc<dyn UserRepository>,
    pub posts: PostStore,
    pub ledger: EngagementLedger,
    pub queries: PostQueryEngine,
    pub blacklist: TokenBlacklist,
}

impl AppState {
    /// Wires the services on top of a single storage backend.
    pub fn new<S>(config: Config, store: Arc<S>, clock: Arc<dyn Clock>) -> Self
    where
        S: PostRepository + EngagementRepository + UserRepository + 'static,
    {
        let posts = PostStore::new(store.clone());
        let ledger = EngagementLedger::new(posts.clone(), store.clone());
        let queries = PostQueryEngine::new(posts.clone(), InterestRanker::new(ledger.clone()));

        Self {
            config,
            clock,
            users: store,
            posts,
            ledger,
            queries,
            blacklist: TokenBlacklist::new(),
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for PostStore {
    fn from_ref(state: &AppState) -> Self {
        state.posts.clone()
    }
}

impl FromRef<AppState> for EngagementLedger {
    fn from_ref(state: &AppState) -> Self {
        state.ledger.clone()
    }
}

impl FromRef<AppState> for PostQueryEngine {
    fn from_ref(state: &AppState) -> Self {
        state.queries.clone()
    }
}

impl FromRef<AppState> for Arc<dyn UserRepository> {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}

impl FromRef<AppState> for Arc<dyn Clock> {
    fn from_ref(state: &AppState) -> Self {
        state.clock.clone()
    }
}

impl FromRef<AppState> for TokenBlacklist {
    fn from_ref(state: &AppState) -> Self {
        state.blacklist.clone()
    }
}

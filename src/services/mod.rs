// src/services/mod.rs

//! Post lifecycle and engagement rules.
//!
//! Every time-dependent operation takes `now` from the caller.

pub mod engagement;
pub mod posts;
pub mod query;
pub mod ranking;

pub use engagement::EngagementLedger;
pub use posts::PostStore;
pub use query::PostQueryEngine;
pub use ranking::InterestRanker;

// src/handlers/mod.rs

pub mod auth;
pub mod engagement;
pub mod posts;
pub mod topic;

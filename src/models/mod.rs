// src/models/mod.rs

pub mod comment;
pub mod post;
pub mod rating;
pub mod topic;
pub mod user;

// src/utils/mod.rs

pub mod blacklist;
pub mod clock;
pub mod hash;
pub mod jwt;

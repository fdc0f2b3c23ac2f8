// src/lib.rs

//! News ingestion library.
//!
//! Polls RSS/Atom feeds into deduplicated article records and scrapes
//! article bodies with per-site extraction rules.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

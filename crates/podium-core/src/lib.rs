//! Core domain logic for Podium: rubric definitions, sheet-backed storage,
//! the evaluation cache, and the aggregation engine behind the leaderboard.
//!
//! The HTTP surface lives in `podium-server`; nothing in this crate knows
//! about routes or status codes.

pub mod cache;
pub mod config;
pub mod engine;
pub mod errors;
pub mod model;
pub mod rubric;
pub mod service;
pub mod sheet;
pub mod store;
pub mod users;

pub use model::{EvaluationRecord, LeaderboardRow, ScoreMap, UserRecord};
pub use service::JudgingService;

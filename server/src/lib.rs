#[macro_use]
extern crate rocket;

use chrono::{DateTime, Utc};

pub mod db;
pub mod entrypoints;
pub mod error;
pub mod github_pull;
pub mod leaderboard;
pub mod scan;
pub mod sync;

/// Program-wide settings the pipeline gates on. Contributions merged
/// before `start_date` are never taken in.
#[derive(Debug, Clone)]
pub struct ProgramConfig {
    pub start_date: DateTime<Utc>,
}

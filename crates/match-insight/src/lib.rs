//! Weighted match-analysis caching and aggregation for job search workspaces.

pub mod analysis;
pub mod config;
pub mod error;
pub mod telemetry;

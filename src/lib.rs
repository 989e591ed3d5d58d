//! Student Analytics Dashboard backend.
//!
//! Serves student records and class-level statistics over HTTP, with
//! narrative insights produced by a pluggable text generator.

pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
pub mod data;
pub mod database;
pub mod error;
pub mod insights;
pub mod models;

pub use analytics::{summarize, AnalyticsConfig, StatisticsAggregator};
pub use models::{PerformanceMetrics, StudentRecord, SummaryStatistics};

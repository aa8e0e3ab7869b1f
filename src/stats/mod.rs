//! Publisher statistics

pub mod metrics;

pub use metrics::PublisherStats;

//! WHIP client implementation
//!
//! Provides client-side WHIP for:
//! - Publishing local capture to a WHIP ingest endpoint
//! - Terminating the server-side session resource

pub mod config;
pub mod publisher;
pub mod whip;

pub use config::PublisherConfig;
pub use publisher::{Broadcaster, PublishEvent};
pub use whip::{WhipAnswer, WhipClient};

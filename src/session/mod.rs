//! Publish session state
//!
//! Tracks the lifecycle of a publish attempt and owns the resources it
//! acquires.

pub mod resources;
pub mod state;

pub use resources::PublishSession;
pub use state::{PublishState, PublishStatus};

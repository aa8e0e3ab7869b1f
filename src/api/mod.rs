//! School backend REST client
//!
//! Only the calls needed to open a live lesson are typed here; everything
//! else goes through the generic JSON helpers on `ApiClient`.

pub mod client;
pub mod types;

pub use client::{ApiClient, ApiConfig, DEFAULT_API_BASE_URL};
pub use types::{StartLiveResponse, WhipEndpoint};

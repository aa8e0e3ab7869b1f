//! Peer connection seam
//!
//! The publisher drives negotiation through these traits; `rtc` implements
//! them on the `webrtc` crate.

pub mod rtc;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::media::LocalTrack;

pub use rtc::{RtcPeer, RtcTransport, RtcTransportConfig};

/// Creates peer connections
#[async_trait]
pub trait PeerFactory: Send + Sync {
    /// Create a fresh, unnegotiated connection.
    async fn create(&self) -> Result<Arc<dyn PeerSession>>;
}

/// One outbound peer connection
#[async_trait]
pub trait PeerSession: Send + Sync {
    /// Attach a capture track as outbound media.
    async fn add_track(&self, track: &LocalTrack) -> Result<()>;

    /// Generate an SDP offer, set it as the local description and return the
    /// SDP text to send to the ingest endpoint.
    async fn create_offer(&self) -> Result<String>;

    /// Apply the ingest endpoint's SDP answer as the remote description.
    async fn apply_answer(&self, sdp: &str) -> Result<()>;

    /// Tracks currently attached to outbound senders
    fn senders(&self) -> Vec<LocalTrack>;

    /// Stop the senders' tracks, then close the connection.
    ///
    /// Must not block and must be idempotent.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

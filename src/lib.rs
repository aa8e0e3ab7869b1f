//! WHIP broadcast publisher
//!
//! Captures local audio/video, negotiates a WebRTC peer connection and
//! publishes it to a media server with the WebRTC-HTTP Ingestion Protocol:
//!
//! ```text
//! Broadcaster                  WHIP endpoint
//!   |                                |
//!   |  getUserMedia -> tracks        |
//!   |  addTrack / createOffer        |
//!   |--- POST (application/sdp) ---->|
//!   |<-- 2xx + SDP answer -----------|
//!   |  setRemoteDescription          |
//!   |                                |
//!   |       [Publishing]             |
//! ```
//!
//! Every exit path (stop, failure, cancellation, drop) runs the same release
//! routine, so camera/microphone tracks and peer connections never outlive
//! the publish session that acquired them.

pub mod api;
pub mod client;
pub mod error;
pub mod media;
pub mod peer;
pub mod session;
pub mod stats;

pub use client::{Broadcaster, PublishEvent, PublisherConfig, WhipClient};
pub use error::{Error, Locale, Result};
pub use media::{MediaCapture, MediaConstraints, MediaDevices, PreviewSurface};
pub use peer::{PeerFactory, PeerSession};
pub use session::{PublishState, PublishStatus};

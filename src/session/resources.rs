//! Resources held by one publish session
//!
//! `PublishSession` is the only owner of the capture and the peer
//! connection. `release` is the single teardown routine every exit path goes
//! through; each step is guarded, so it is safe on a partially built session
//! and safe to repeat.

use std::sync::Arc;
use std::time::Instant;

use url::Url;

use crate::media::MediaCapture;
use crate::peer::PeerSession;

#[derive(Default)]
pub struct PublishSession {
    capture: Option<Arc<MediaCapture>>,
    peer: Option<Arc<dyn PeerSession>>,
    resource_url: Option<Url>,
    published_at: Option<Instant>,
}

impl PublishSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_capture(&mut self, capture: MediaCapture) {
        self.capture = Some(Arc::new(capture));
    }

    pub fn set_peer(&mut self, peer: Arc<dyn PeerSession>) {
        self.peer = Some(peer);
    }

    /// Record a successful publish
    pub fn mark_published(&mut self, resource_url: Option<Url>) {
        self.resource_url = resource_url;
        self.published_at = Some(Instant::now());
    }

    pub fn capture(&self) -> Option<Arc<MediaCapture>> {
        self.capture.clone()
    }

    pub fn peer(&self) -> Option<Arc<dyn PeerSession>> {
        self.peer.clone()
    }

    /// WHIP session resource (from the `Location` header)
    pub fn resource_url(&self) -> Option<&Url> {
        self.resource_url.as_ref()
    }

    pub fn published_at(&self) -> Option<Instant> {
        self.published_at
    }

    pub fn is_empty(&self) -> bool {
        self.capture.is_none() && self.peer.is_none()
    }

    /// Release everything the session holds.
    ///
    /// Order: sender tracks, peer connection, capture tracks. Returns the
    /// WHIP resource URL if the session had published.
    pub fn release(&mut self) -> Option<Url> {
        if let Some(peer) = self.peer.take() {
            for track in peer.senders() {
                track.stop();
            }
            peer.close();
        }

        if let Some(capture) = self.capture.take() {
            capture.stop();
        }

        self.published_at = None;
        self.resource_url.take()
    }
}

impl Drop for PublishSession {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for PublishSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishSession")
            .field("capture", &self.capture)
            .field("peer", &self.peer.as_ref().map(|p| !p.is_closed()))
            .field("resource_url", &self.resource_url)
            .finish()
    }
}

//! Media capture handles and the platform capture seam

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use super::track::{LocalTrack, TrackKind};
use crate::error::Result;

static NEXT_CAPTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Which kinds of media to capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl MediaConstraints {
    pub fn audio_video() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }

    pub fn audio_only() -> Self {
        Self {
            audio: true,
            video: false,
        }
    }

    pub fn wants(&self, kind: TrackKind) -> bool {
        match kind {
            TrackKind::Audio => self.audio,
            TrackKind::Video => self.video,
        }
    }
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self::audio_video()
    }
}

/// A live capture composed of one or more tracks
///
/// The capture exclusively owns its device access: dropping it stops every
/// track.
#[derive(Debug)]
pub struct MediaCapture {
    id: String,
    tracks: Vec<LocalTrack>,
}

impl MediaCapture {
    /// Allocate a stream ID for tracks that will belong to a new capture.
    pub fn next_stream_id() -> String {
        format!("capture-{}", NEXT_CAPTURE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn new(id: String, tracks: Vec<LocalTrack>) -> Self {
        Self { id, tracks }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[LocalTrack] {
        &self.tracks
    }

    pub fn track(&self, kind: TrackKind) -> Option<&LocalTrack> {
        self.tracks.iter().find(|t| t.kind() == kind)
    }

    /// Number of tracks that have not been stopped
    pub fn live_tracks(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_live()).count()
    }

    /// Stop every component track. Idempotent.
    pub fn stop(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

impl Drop for MediaCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Platform media capture (camera/microphone)
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquire a capture satisfying `constraints`.
    ///
    /// Fails with `Error::MediaAccess` when permission is denied or no
    /// matching device exists.
    async fn get_user_media(&self, constraints: MediaConstraints) -> Result<MediaCapture>;
}

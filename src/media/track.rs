//! Local media tracks
//!
//! A `LocalTrack` is one component (audio or video) of a capture. It wraps
//! the `webrtc` sample track that is attached to the peer connection and a
//! stop flag that sample producers watch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

use crate::error::{Error, Result};

static NEXT_TRACK_ID: AtomicU64 = AtomicU64::new(1);

/// Track media kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Audio => "audio",
            TrackKind::Video => "video",
        }
    }

    /// Default codec capability used when a track of this kind is created
    pub fn default_codec(&self) -> RTCRtpCodecCapability {
        match self {
            TrackKind::Audio => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                sdp_fmtp_line: String::new(),
                rtcp_feedback: vec![],
            },
            TrackKind::Video => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                channels: 0,
                sdp_fmtp_line: String::new(),
                rtcp_feedback: vec![],
            },
        }
    }
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

struct TrackInner {
    id: String,
    kind: TrackKind,
    rtc: Arc<TrackLocalStaticSample>,
    stopped: watch::Sender<bool>,
}

/// Handle to a local capture track
///
/// Cloning is cheap; all clones share the same stop flag.
#[derive(Clone)]
pub struct LocalTrack {
    inner: Arc<TrackInner>,
}

impl LocalTrack {
    /// Create a live track with the default codec for `kind`.
    pub fn new(kind: TrackKind, stream_id: &str) -> Self {
        Self::with_codec(kind, stream_id, kind.default_codec())
    }

    pub fn with_codec(kind: TrackKind, stream_id: &str, codec: RTCRtpCodecCapability) -> Self {
        let id = format!(
            "{}-{}",
            kind.as_str(),
            NEXT_TRACK_ID.fetch_add(1, Ordering::Relaxed)
        );
        let rtc = Arc::new(TrackLocalStaticSample::new(
            codec,
            id.clone(),
            stream_id.to_owned(),
        ));
        let (stopped, _) = watch::channel(false);

        Self {
            inner: Arc::new(TrackInner {
                id,
                kind,
                rtc,
                stopped,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    /// The `webrtc` track attached to a peer connection
    pub fn rtc(&self) -> Arc<TrackLocalStaticSample> {
        Arc::clone(&self.inner.rtc)
    }

    /// Stop the track. Idempotent.
    pub fn stop(&self) {
        if !self.inner.stopped.send_replace(true) {
            tracing::debug!(track = %self.inner.id, kind = %self.inner.kind, "Track stopped");
        }
    }

    pub fn is_live(&self) -> bool {
        !*self.inner.stopped.borrow()
    }

    /// Resolves once the track has been stopped.
    pub async fn stopped(&self) {
        let mut rx = self.inner.stopped.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    /// Write one media sample. Samples written after stop are dropped.
    pub async fn write_sample(&self, sample: &Sample) -> Result<()> {
        if !self.is_live() {
            return Ok(());
        }
        self.inner
            .rtc
            .write_sample(sample)
            .await
            .map_err(|e| Error::MediaAccess(format!("Failed to write {} sample: {}", self.kind(), e)))
    }
}

impl std::fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTrack")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("live", &self.is_live())
            .finish()
    }
}

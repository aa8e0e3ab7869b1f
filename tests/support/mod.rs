//! Test doubles: scripted capture devices, recording peers and preview, and
//! a stub WHIP endpoint on loopback.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, post};
use axum::Router;
use parking_lot::Mutex;
use tokio::sync::Notify;

use whip_rs::media::{
    LocalTrack, MediaCapture, MediaConstraints, MediaDevices, PreviewOptions, PreviewSurface,
    TrackKind,
};
use whip_rs::{Broadcaster, Error, PeerFactory, PeerSession, PublishState, Result};

pub const ANSWER_SDP: &str = "v=0\r\no=- 1 1 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n";
pub const OFFER_SDP: &str = "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n";

/// Capture devices that grant or deny access and remember every track
#[derive(Default)]
pub struct MockDevices {
    deny: AtomicBool,
    tracks: Mutex<Vec<LocalTrack>>,
}

impl MockDevices {
    pub fn granting() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn denying() -> Arc<Self> {
        let devices = Self::default();
        devices.deny.store(true, Ordering::SeqCst);
        Arc::new(devices)
    }

    pub fn tracks(&self) -> Vec<LocalTrack> {
        self.tracks.lock().clone()
    }

    pub fn live_tracks(&self) -> usize {
        self.tracks.lock().iter().filter(|t| t.is_live()).count()
    }

    pub fn captures(&self) -> usize {
        self.tracks.lock().len() / 2
    }
}

#[async_trait]
impl MediaDevices for MockDevices {
    async fn get_user_media(&self, constraints: MediaConstraints) -> Result<MediaCapture> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(Error::MediaAccess("Permission denied".into()));
        }
        assert!(constraints.audio && constraints.video);

        let id = MediaCapture::next_stream_id();
        let tracks = vec![
            LocalTrack::new(TrackKind::Audio, &id),
            LocalTrack::new(TrackKind::Video, &id),
        ];
        self.tracks.lock().extend(tracks.iter().cloned());
        Ok(MediaCapture::new(id, tracks))
    }
}

/// Peer that records negotiation calls
#[derive(Default)]
pub struct MockPeer {
    pub tracks: Mutex<Vec<LocalTrack>>,
    pub remote_sdp: Mutex<Option<String>>,
    closed: AtomicBool,
    fail_offer: bool,
    fail_answer: bool,
}

impl MockPeer {
    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PeerSession for MockPeer {
    async fn add_track(&self, track: &LocalTrack) -> Result<()> {
        self.tracks.lock().push(track.clone());
        Ok(())
    }

    async fn create_offer(&self) -> Result<String> {
        if self.fail_offer {
            return Err(Error::Negotiation("Failed to create offer".into()));
        }
        Ok(OFFER_SDP.to_string())
    }

    async fn apply_answer(&self, sdp: &str) -> Result<()> {
        if self.fail_answer {
            return Err(Error::Negotiation("Failed to set remote description".into()));
        }
        *self.remote_sdp.lock() = Some(sdp.to_string());
        Ok(())
    }

    fn senders(&self) -> Vec<LocalTrack> {
        self.tracks.lock().clone()
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            for track in self.tracks.lock().iter() {
                track.stop();
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed()
    }
}

/// Factory handing out `MockPeer`s and keeping them for inspection
#[derive(Default)]
pub struct MockPeers {
    pub peers: Mutex<Vec<Arc<MockPeer>>>,
    fail_offer: bool,
    fail_answer: bool,
}

impl MockPeers {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_offer() -> Arc<Self> {
        Arc::new(Self {
            fail_offer: true,
            ..Default::default()
        })
    }

    pub fn failing_answer() -> Arc<Self> {
        Arc::new(Self {
            fail_answer: true,
            ..Default::default()
        })
    }

    pub fn created(&self) -> usize {
        self.peers.lock().len()
    }

    pub fn last(&self) -> Arc<MockPeer> {
        Arc::clone(self.peers.lock().last().expect("no peer created"))
    }

    pub fn open_peers(&self) -> usize {
        self.peers.lock().iter().filter(|p| !p.closed()).count()
    }
}

#[async_trait]
impl PeerFactory for MockPeers {
    async fn create(&self) -> Result<Arc<dyn PeerSession>> {
        let peer = Arc::new(MockPeer {
            fail_offer: self.fail_offer,
            fail_answer: self.fail_answer,
            ..Default::default()
        });
        self.peers.lock().push(Arc::clone(&peer));
        Ok(peer)
    }
}

/// Preview that records what is attached
#[derive(Default)]
pub struct RecordingPreview {
    pub attached: Mutex<Option<(String, Vec<String>, PreviewOptions)>>,
    pub clears: AtomicUsize,
}

impl RecordingPreview {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn capture_id(&self) -> Option<String> {
        self.attached.lock().as_ref().map(|(id, _, _)| id.clone())
    }
}

impl PreviewSurface for RecordingPreview {
    fn attach(&self, capture: &MediaCapture, options: PreviewOptions) {
        let ids = capture.tracks().iter().map(|t| t.id().to_string()).collect();
        *self.attached.lock() = Some((capture.id().to_string(), ids, options));
    }

    fn clear(&self) {
        *self.attached.lock() = None;
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

/// Preview that reads the publisher state while attaching
#[derive(Default)]
pub struct StatusPreview {
    pub broadcaster: Mutex<Weak<Broadcaster>>,
    pub seen: Mutex<Option<PublishState>>,
}

impl PreviewSurface for StatusPreview {
    fn attach(&self, _capture: &MediaCapture, _options: PreviewOptions) {
        let broadcaster = self.broadcaster.lock().upgrade();
        if let Some(broadcaster) = broadcaster {
            *self.seen.lock() = Some(broadcaster.status().state);
        }
    }

    fn clear(&self) {}
}

/// How the stub WHIP endpoint answers
#[derive(Clone, Copy)]
pub enum Reply {
    Answer,
    Status(u16),
}

pub struct WhipStub {
    pub url: String,
    pub offers: Mutex<Vec<String>>,
    pub content_types: Mutex<Vec<String>>,
    pub deletes: AtomicUsize,
    /// Notified when an offer arrives
    pub received: Notify,
    /// When set, responses wait for `release`
    hold: AtomicBool,
    release: Notify,
    reply: Mutex<Reply>,
}

impl WhipStub {
    pub fn hold(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    pub fn reply(&self, reply: Reply) {
        *self.reply.lock() = reply;
    }
}

async fn whip_post(
    State(stub): State<Arc<WhipStub>>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, HeaderMap, String) {
    stub.offers.lock().push(body);
    if let Some(ct) = headers.get("content-type").and_then(|v| v.to_str().ok()) {
        stub.content_types.lock().push(ct.to_string());
    }
    stub.received.notify_one();

    if stub.hold.load(Ordering::SeqCst) {
        stub.release.notified().await;
    }

    let reply = *stub.reply.lock();
    match reply {
        Reply::Answer => {
            let mut headers = HeaderMap::new();
            headers.insert("location", "/whip/session/1".parse().unwrap());
            (StatusCode::CREATED, headers, ANSWER_SDP.to_string())
        }
        Reply::Status(code) => (
            StatusCode::from_u16(code).unwrap(),
            HeaderMap::new(),
            String::new(),
        ),
    }
}

async fn whip_delete(State(stub): State<Arc<WhipStub>>) -> StatusCode {
    stub.deletes.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

pub async fn whip_stub(reply: Reply) -> Arc<WhipStub> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let stub = Arc::new(WhipStub {
        url: format!("http://{}/whip/live", addr),
        offers: Mutex::default(),
        content_types: Mutex::default(),
        deletes: AtomicUsize::new(0),
        received: Notify::new(),
        hold: AtomicBool::new(false),
        release: Notify::new(),
        reply: Mutex::new(reply),
    });

    let app = Router::new()
        .route("/whip/live", post(whip_post))
        .route("/whip/session/1", delete(whip_delete))
        .with_state(Arc::clone(&stub));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    stub
}

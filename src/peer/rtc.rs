//! `webrtc` crate peer connections
//!
//! WHIP has no trickle ICE in its basic form, so the offer is only returned
//! once ICE gathering completes (or the gathering timeout expires, in which
//! case whatever candidates were gathered are sent).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::TrackLocal;

use super::{PeerFactory, PeerSession};
use crate::error::{Error, Result};
use crate::media::LocalTrack;

/// Peer connection configuration
#[derive(Debug, Clone)]
pub struct RtcTransportConfig {
    /// STUN server URLs
    pub ice_servers: Vec<String>,

    /// Upper bound on waiting for ICE gathering before sending the offer
    pub gathering_timeout: Duration,
}

impl Default for RtcTransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec!["stun:stun.l.google.com:19302".to_string()],
            gathering_timeout: Duration::from_secs(5),
        }
    }
}

impl RtcTransportConfig {
    /// Host candidates only
    pub fn without_stun(mut self) -> Self {
        self.ice_servers.clear();
        self
    }

    pub fn ice_server(mut self, url: impl Into<String>) -> Self {
        self.ice_servers.push(url.into());
        self
    }

    pub fn gathering_timeout(mut self, timeout: Duration) -> Self {
        self.gathering_timeout = timeout;
        self
    }
}

/// Factory for `webrtc` peer connections
pub struct RtcTransport {
    api: API,
    config: RtcTransportConfig,
}

impl RtcTransport {
    pub fn new(config: RtcTransportConfig) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| Error::negotiation("Failed to register codecs", e))?;

        let registry = register_default_interceptors(Registry::new(), &mut media_engine)
            .map_err(|e| Error::negotiation("Failed to register interceptors", e))?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        Ok(Self { api, config })
    }

    pub fn config(&self) -> &RtcTransportConfig {
        &self.config
    }
}

#[async_trait]
impl PeerFactory for RtcTransport {
    async fn create(&self) -> Result<Arc<dyn PeerSession>> {
        let ice_servers = if self.config.ice_servers.is_empty() {
            vec![]
        } else {
            vec![RTCIceServer {
                urls: self.config.ice_servers.clone(),
                ..Default::default()
            }]
        };
        let rtc_config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        let pc = self
            .api
            .new_peer_connection(rtc_config)
            .await
            .map_err(|e| Error::negotiation("Failed to create peer connection", e))?;

        Ok(Arc::new(RtcPeer::new(
            Arc::new(pc),
            self.config.gathering_timeout,
        )))
    }
}

/// Outbound `webrtc` peer connection
pub struct RtcPeer {
    pc: Arc<RTCPeerConnection>,
    senders: Mutex<Vec<(Arc<RTCRtpSender>, LocalTrack)>>,
    closed: AtomicBool,
    gathering_timeout: Duration,
    /// Runtime the connection was created on, used to close it from
    /// threads outside any runtime
    runtime: Option<Handle>,
}

impl RtcPeer {
    pub fn new(pc: Arc<RTCPeerConnection>, gathering_timeout: Duration) -> Self {
        Self {
            pc,
            senders: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            gathering_timeout,
            runtime: Handle::try_current().ok(),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Negotiation("Peer connection is closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PeerSession for RtcPeer {
    async fn add_track(&self, track: &LocalTrack) -> Result<()> {
        self.ensure_open()?;

        let sender = self
            .pc
            .add_track(track.rtc() as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .map_err(|e| Error::negotiation("Failed to add track", e))?;

        // Drain RTCP so interceptors (NACK, reports) keep running
        let rtcp_sender = Arc::clone(&sender);
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while rtcp_sender.read(&mut buf).await.is_ok() {}
        });

        tracing::debug!(track = track.id(), kind = %track.kind(), "Track attached");
        self.senders.lock().push((sender, track.clone()));
        Ok(())
    }

    async fn create_offer(&self) -> Result<String> {
        self.ensure_open()?;

        let offer = self
            .pc
            .create_offer(None)
            .await
            .map_err(|e| Error::negotiation("Failed to create offer", e))?;

        let mut gathering = self.pc.gathering_complete_promise().await;

        self.pc
            .set_local_description(offer)
            .await
            .map_err(|e| Error::negotiation("Failed to set local description", e))?;

        if tokio::time::timeout(self.gathering_timeout, gathering.recv())
            .await
            .is_err()
        {
            tracing::warn!(
                timeout_ms = self.gathering_timeout.as_millis() as u64,
                "ICE gathering incomplete, sending partial offer"
            );
        }

        let local = self
            .pc
            .local_description()
            .await
            .ok_or_else(|| Error::Negotiation("No local description after offer".into()))?;

        Ok(local.sdp)
    }

    async fn apply_answer(&self, sdp: &str) -> Result<()> {
        self.ensure_open()?;

        let answer = RTCSessionDescription::answer(sdp.to_owned())
            .map_err(|e| Error::negotiation("Failed to parse answer", e))?;

        self.pc
            .set_remote_description(answer)
            .await
            .map_err(|e| Error::negotiation("Failed to set remote description", e))
    }

    fn senders(&self) -> Vec<LocalTrack> {
        self.senders.lock().iter().map(|(_, t)| t.clone()).collect()
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let senders = std::mem::take(&mut *self.senders.lock());
        for (_, track) in &senders {
            track.stop();
        }

        let pc = Arc::clone(&self.pc);
        match Handle::try_current().ok().or_else(|| self.runtime.clone()) {
            Some(handle) => {
                handle.spawn(async move {
                    for (sender, _) in senders {
                        let _ = sender.stop().await;
                    }
                    if let Err(e) = pc.close().await {
                        tracing::warn!(error = %e, "Failed to close peer connection");
                    }
                });
            }
            None => {
                tracing::warn!("No runtime available, peer connection close skipped");
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for RtcPeer {
    fn drop(&mut self) {
        self.close();
    }
}

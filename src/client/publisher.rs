//! WHIP broadcast publisher
//!
//! High-level API for publishing the local camera/microphone to a WHIP
//! ingest endpoint.
//!
//! Each `start()` attempt carries a generation number. `stop()` (and drop)
//! bump the generation and release the session immediately; an attempt that
//! wakes up from a suspension point and finds its generation superseded
//! releases whatever it still holds and resolves to `Error::Aborted`.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use url::Url;

use crate::error::{Error, ErrorKind, Result};
use crate::media::{MediaDevices, PreviewSurface};
use crate::peer::PeerFactory;
use crate::session::{PublishSession, PublishState, PublishStatus};
use crate::stats::PublisherStats;

use super::config::PublisherConfig;
use super::whip::WhipClient;

/// Events from the publisher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishEvent {
    /// Session state changed
    StateChanged(PublishState),

    /// Answer applied, media is flowing
    Published { resource_url: Option<String> },

    /// Attempt failed; resources have been released
    Failed { kind: ErrorKind, message: String },

    /// Session stopped by the host
    Stopped,
}

struct Inner {
    state: PublishState,
    last_error: Option<String>,
    generation: u64,
    session: PublishSession,
    stats: PublisherStats,
}

/// WHIP broadcast publisher
///
/// At most one session is active at a time. Share it behind an `Arc` when
/// `stop()` must be callable while `start()` is pending; dropping the last
/// handle tears the session down.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use whip_rs::media::{FileDevices, NoPreview};
/// use whip_rs::peer::{RtcTransport, RtcTransportConfig};
/// use whip_rs::{Broadcaster, PublisherConfig};
///
/// # async fn example() -> whip_rs::Result<()> {
/// let devices = FileDevices::new().video("camera.ivf").audio("mic.ogg");
/// let transport = RtcTransport::new(RtcTransportConfig::default())?;
///
/// let (broadcaster, mut events) = Broadcaster::new(
///     PublisherConfig::default(),
///     Arc::new(devices),
///     Arc::new(transport),
///     Arc::new(NoPreview),
/// )?;
///
/// tokio::spawn(async move {
///     while let Some(event) = events.recv().await {
///         println!("Event: {:?}", event);
///     }
/// });
///
/// broadcaster.start("https://ingest.example.com/whip/live").await?;
/// broadcaster.stop();
/// # Ok(())
/// # }
/// ```
pub struct Broadcaster {
    config: PublisherConfig,
    devices: Arc<dyn MediaDevices>,
    peers: Arc<dyn PeerFactory>,
    preview: Arc<dyn PreviewSurface>,
    whip: WhipClient,
    event_tx: mpsc::Sender<PublishEvent>,
    inner: Mutex<Inner>,
}

impl Broadcaster {
    /// Create a new publisher.
    ///
    /// Returns the publisher and a receiver for events.
    pub fn new(
        config: PublisherConfig,
        devices: Arc<dyn MediaDevices>,
        peers: Arc<dyn PeerFactory>,
        preview: Arc<dyn PreviewSurface>,
    ) -> Result<(Self, mpsc::Receiver<PublishEvent>)> {
        let whip = WhipClient::new(config.bearer_token.clone(), config.request_timeout)?;
        let (tx, rx) = mpsc::channel(config.event_capacity);

        let broadcaster = Self {
            config,
            devices,
            peers,
            preview,
            whip,
            event_tx: tx,
            inner: Mutex::new(Inner {
                state: PublishState::Idle,
                last_error: None,
                generation: 0,
                session: PublishSession::new(),
                stats: PublisherStats::new(),
            }),
        };

        Ok((broadcaster, rx))
    }

    /// Capture local media and publish it to `ingest_url`.
    ///
    /// On any failure the session is fully released and the publisher
    /// returns to `Idle`, ready for another attempt.
    pub async fn start(&self, ingest_url: &str) -> Result<()> {
        let url = self.config.validate_ingest_url(ingest_url)?;

        let generation = {
            let mut inner = self.inner.lock();
            if inner.state.is_busy() {
                return Err(Error::AlreadyPublishing);
            }
            inner.generation += 1;
            inner.last_error = None;
            inner.stats.record_attempt();
            self.transition(&mut inner, PublishState::AcquiringMedia);
            inner.generation
        };

        tracing::info!(generation = generation, url = %url, "Starting broadcast");

        let mut guard = AttemptGuard {
            broadcaster: self,
            generation,
            armed: true,
        };
        let result = self.negotiate(generation, &url).await;
        guard.armed = false;

        result.map_err(|err| self.fail(generation, err))
    }

    async fn negotiate(&self, generation: u64, url: &Url) -> Result<()> {
        let capture = self.devices.get_user_media(self.config.constraints).await?;
        let tracks = capture.tracks().to_vec();
        {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                capture.stop();
                return Err(Error::Aborted);
            }
            inner.session.set_capture(capture);
            self.transition(&mut inner, PublishState::Negotiating);
        }
        tracing::debug!(generation = generation, tracks = tracks.len(), "Media acquired");

        let peer = self.peers.create().await?;
        {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                peer.close();
                return Err(Error::Aborted);
            }
            inner.session.set_peer(Arc::clone(&peer));
        }

        for track in &tracks {
            peer.add_track(track).await?;
            self.ensure_current(generation)?;
        }

        let offer = peer.create_offer().await?;
        self.ensure_current(generation)?;

        // Once answered, the server holds a session resource for this offer
        let answer = self.whip.publish(url, &offer).await?;
        if let Err(e) = self.ensure_current(generation) {
            self.abandon(answer.location);
            return Err(e);
        }

        if let Err(e) = peer.apply_answer(&answer.sdp).await {
            self.abandon(answer.location);
            return Err(e);
        }

        let capture = {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                drop(inner);
                self.abandon(answer.location);
                return Err(Error::Aborted);
            }
            inner.session.mark_published(answer.location.clone());
            inner.stats.record_success();
            self.transition(&mut inner, PublishState::Publishing);
            inner.session.capture()
        };

        if let Some(capture) = capture {
            self.preview.attach(&capture, self.config.preview);
            // stop() may have cleared the surface before the attach landed
            if self.ensure_current(generation).is_err() {
                self.preview.clear();
            }
        }

        tracing::info!(
            generation = generation,
            resource = ?answer.location.as_ref().map(Url::as_str),
            "Broadcast publishing"
        );
        self.emit(PublishEvent::Published {
            resource_url: answer.location.map(String::from),
        });
        Ok(())
    }

    /// Stop publishing and release camera, microphone and connection.
    ///
    /// Idempotent and synchronous; an in-flight `start()` is aborted.
    pub fn stop(&self) {
        if self.teardown(None) {
            tracing::info!("Broadcast stopped");
            self.emit(PublishEvent::Stopped);
        }
    }

    pub fn status(&self) -> PublishStatus {
        let inner = self.inner.lock();
        PublishStatus {
            state: inner.state,
            last_error: inner.last_error.clone(),
        }
    }

    pub fn state(&self) -> PublishState {
        self.inner.lock().state
    }

    pub fn is_publishing(&self) -> bool {
        self.state() == PublishState::Publishing
    }

    /// WHIP session resource of the current broadcast
    pub fn resource_url(&self) -> Option<Url> {
        self.inner.lock().session.resource_url().cloned()
    }

    pub fn stats(&self) -> PublisherStats {
        self.inner.lock().stats.clone()
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    fn ensure_current(&self, generation: u64) -> Result<()> {
        if self.inner.lock().generation != generation {
            return Err(Error::Aborted);
        }
        Ok(())
    }

    /// Record a failed attempt and release its session.
    fn fail(&self, generation: u64, err: Error) -> Error {
        let message = err.user_message(self.config.locale);
        {
            let mut inner = self.inner.lock();
            if inner.generation != generation || matches!(err, Error::Aborted) {
                // stop() won the race and already released everything
                inner.stats.record_aborted();
                tracing::debug!(generation = generation, error = %err, "Publish attempt superseded");
                return Error::Aborted;
            }

            inner.stats.record_failure(err.kind());
            self.transition(&mut inner, PublishState::Error);
            inner.session.release();
            inner.last_error = Some(message.clone());
            self.transition(&mut inner, PublishState::Idle);
        }
        self.preview.clear();

        tracing::warn!(generation = generation, error = %err, "Broadcast failed");
        self.emit(PublishEvent::Failed {
            kind: err.kind(),
            message,
        });
        err
    }

    /// Release the session if `generation` (or any, when None) is current.
    ///
    /// Returns whether there was anything to release.
    fn teardown(&self, generation: Option<u64>) -> bool {
        let resource = {
            let mut inner = self.inner.lock();
            if generation.is_some_and(|g| g != inner.generation) {
                return false;
            }
            inner.generation += 1;

            if inner.state == PublishState::Idle && inner.session.is_empty() {
                return false;
            }

            let resource = inner.session.release();
            // A cancelled attempt is counted as aborted by its guard
            if generation.is_none() {
                inner.stats.record_stop();
            }
            self.transition(&mut inner, PublishState::Idle);
            resource
        };
        self.preview.clear();

        if let Some(resource) = resource.filter(|_| self.config.terminate_on_stop) {
            self.spawn_terminate(resource);
        }
        true
    }

    /// Delete a resource the server created for an attempt that did not
    /// reach `Publishing`.
    fn abandon(&self, resource: Option<Url>) {
        if let Some(resource) = resource.filter(|_| self.config.terminate_on_stop) {
            tracing::debug!(url = %resource, "Deleting WHIP resource of abandoned attempt");
            self.spawn_terminate(resource);
        }
    }

    fn spawn_terminate(&self, resource: Url) {
        let whip = self.whip.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = whip.terminate(&resource).await {
                        tracing::warn!(url = %resource, error = %e, "Failed to delete WHIP resource");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(url = %resource, "No runtime available, WHIP resource not deleted");
            }
        }
    }

    fn transition(&self, inner: &mut Inner, next: PublishState) {
        if inner.state == next {
            return;
        }
        if !inner.state.can_transition_to(next) {
            tracing::warn!(from = %inner.state, to = %next, "Unexpected state transition");
        }
        tracing::debug!(from = %inner.state, to = %next, "State transition");
        inner.state = next;
        self.emit(PublishEvent::StateChanged(next));
    }

    fn emit(&self, event: PublishEvent) {
        // Never block the caller; a full or closed channel drops the event
        let _ = self.event_tx.try_send(event);
    }
}

impl Drop for Broadcaster {
    fn drop(&mut self) {
        if self.teardown(None) {
            tracing::debug!("Broadcaster dropped, session released");
        }
    }
}

/// Releases the attempt's session if the `start()` future is dropped
/// before it resolves.
struct AttemptGuard<'a> {
    broadcaster: &'a Broadcaster,
    generation: u64,
    armed: bool,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if self.armed && self.broadcaster.teardown(Some(self.generation)) {
            self.broadcaster.inner.lock().stats.record_aborted();
            tracing::debug!(generation = self.generation, "Publish attempt cancelled");
        }
    }
}

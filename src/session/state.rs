//! Publish state machine
//!
//! ```text
//! Idle -> AcquiringMedia -> Negotiating -> Publishing
//!   ^          |                 |             |
//!   |          +------> Error <--+-------------+
//!   |                     |                    |
//!   +---------------------+------ stop() ------+
//! ```
//!
//! `Error` is transient: resources are released and the session rests in
//! `Idle` with the failure recorded in `PublishStatus::last_error`.

/// Publish session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishState {
    /// No session; initial and resting state
    #[default]
    Idle,
    /// Waiting for camera/microphone
    AcquiringMedia,
    /// Peer connection and WHIP exchange in progress
    Negotiating,
    /// Answer applied, media flowing
    Publishing,
    /// Failure observed, release in progress
    Error,
}

impl PublishState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishState::Idle => "idle",
            PublishState::AcquiringMedia => "acquiring_media",
            PublishState::Negotiating => "negotiating",
            PublishState::Publishing => "publishing",
            PublishState::Error => "error",
        }
    }

    /// Whether a session currently occupies the publisher
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            PublishState::AcquiringMedia | PublishState::Negotiating | PublishState::Publishing
        )
    }

    pub fn can_transition_to(&self, next: PublishState) -> bool {
        use PublishState::*;

        match (*self, next) {
            (Idle, AcquiringMedia) => true,
            (AcquiringMedia, Negotiating) => true,
            (Negotiating, Publishing) => true,
            (AcquiringMedia | Negotiating | Publishing, Error) => true,
            (_, Idle) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for PublishState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the publisher's status
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishStatus {
    pub state: PublishState,

    /// Message of the most recent failure, cleared by the next start
    pub last_error: Option<String>,
}

impl PublishStatus {
    pub fn is_publishing(&self) -> bool {
        self.state == PublishState::Publishing
    }
}

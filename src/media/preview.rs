//! Local preview surface

use super::capture::MediaCapture;

/// How the preview renders the capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewOptions {
    pub muted: bool,
    pub autoplay: bool,
    pub controls: bool,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            muted: true,
            autoplay: true,
            controls: false,
        }
    }
}

/// UI-level video target the host assigns the capture to
///
/// Written only by the publisher: `attach` after a successful publish and
/// `clear` on every release. Neither is called with the publisher's state
/// locked, so implementations may query the `Broadcaster`.
pub trait PreviewSurface: Send + Sync {
    fn attach(&self, capture: &MediaCapture, options: PreviewOptions);

    fn clear(&self);
}

/// Preview that renders nothing, for headless publishers
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPreview;

impl PreviewSurface for NoPreview {
    fn attach(&self, _capture: &MediaCapture, _options: PreviewOptions) {}

    fn clear(&self) {}
}

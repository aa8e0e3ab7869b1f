//! Local media capture
//!
//! This module provides:
//! - `LocalTrack` audio/video tracks with an idempotent stop
//! - `MediaCapture`, the exclusively-owned capture handle
//! - The `MediaDevices` and `PreviewSurface` platform seams
//! - `FileDevices`, a file-backed capture source

pub mod capture;
pub mod file;
pub mod preview;
pub mod track;

pub use capture::{MediaCapture, MediaConstraints, MediaDevices};
pub use file::FileDevices;
pub use preview::{NoPreview, PreviewOptions, PreviewSurface};
pub use track::{LocalTrack, TrackKind};

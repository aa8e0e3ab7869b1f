//! File-backed capture devices
//!
//! Stands in for a camera/microphone by replaying an IVF (VP8) file as the
//! video track and an Ogg (Opus) file as the audio track, paced in real time.
//! Pump tasks exit as soon as their track is stopped.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use webrtc::media::io::ivf_reader::IVFReader;
use webrtc::media::io::ogg_reader::OggReader;
use webrtc::media::Sample;

use super::capture::{MediaCapture, MediaConstraints, MediaDevices};
use super::track::{LocalTrack, TrackKind};
use crate::error::{Error, Result};

/// Opus page pacing used by most encoders
const OGG_PAGE_DURATION: Duration = Duration::from_millis(20);

const OPUS_SAMPLE_RATE: u64 = 48000;

/// Fallback when frame timestamps give no usable pacing
const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Bounds of a plausible gap between two video frames
const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);
const MAX_FRAME_INTERVAL: Duration = Duration::from_secs(1);

/// Capture devices backed by media files
#[derive(Debug, Clone, Default)]
pub struct FileDevices {
    video: Option<PathBuf>,
    audio: Option<PathBuf>,
}

impl FileDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an IVF (VP8) file as the camera
    pub fn video(mut self, path: impl Into<PathBuf>) -> Self {
        self.video = Some(path.into());
        self
    }

    /// Use an Ogg (Opus) file as the microphone
    pub fn audio(mut self, path: impl Into<PathBuf>) -> Self {
        self.audio = Some(path.into());
        self
    }
}

type FileReader = BufReader<File>;

fn open(path: &Path, kind: TrackKind) -> Result<FileReader> {
    let file = File::open(path).map_err(|e| {
        Error::MediaAccess(format!("{} device {}: {}", kind, path.display(), e))
    })?;
    Ok(BufReader::new(file))
}

fn device(path: Option<&PathBuf>, kind: TrackKind) -> Result<&Path> {
    path.map(PathBuf::as_path)
        .ok_or_else(|| Error::MediaAccess(format!("No {} capture device", kind)))
}

#[async_trait]
impl MediaDevices for FileDevices {
    async fn get_user_media(&self, constraints: MediaConstraints) -> Result<MediaCapture> {
        if !constraints.audio && !constraints.video {
            return Err(Error::MediaAccess("No media kinds requested".into()));
        }

        // Open everything before spawning, so a missing file leaks nothing
        let video = if constraints.video {
            let path = device(self.video.as_ref(), TrackKind::Video)?;
            let (reader, header) = IVFReader::new(open(path, TrackKind::Video)?)
                .map_err(|e| Error::MediaAccess(format!("Invalid IVF file: {}", e)))?;

            let timebase = (header.timebase_numerator, header.timebase_denominator);
            Some((reader, timebase))
        } else {
            None
        };

        let audio = if constraints.audio {
            let path = device(self.audio.as_ref(), TrackKind::Audio)?;
            let (reader, _header) = OggReader::new(open(path, TrackKind::Audio)?, true)
                .map_err(|e| Error::MediaAccess(format!("Invalid Ogg file: {}", e)))?;
            Some(reader)
        } else {
            None
        };

        let stream_id = MediaCapture::next_stream_id();
        let mut tracks = Vec::with_capacity(2);

        if let Some(reader) = audio {
            let track = LocalTrack::new(TrackKind::Audio, &stream_id);
            tokio::spawn(pump_ogg(track.clone(), reader));
            tracks.push(track);
        }

        if let Some((reader, timebase)) = video {
            let track = LocalTrack::new(TrackKind::Video, &stream_id);
            tokio::spawn(pump_ivf(track.clone(), reader, timebase));
            tracks.push(track);
        }

        tracing::debug!(capture = %stream_id, tracks = tracks.len(), "File capture opened");
        Ok(MediaCapture::new(stream_id, tracks))
    }
}

/// Gap of `ticks` IVF timestamp units, each `numerator / denominator`
/// seconds long. Out-of-range gaps fall back to `DEFAULT_FRAME_INTERVAL`.
fn frame_interval((numerator, denominator): (u32, u32), ticks: u64) -> Duration {
    if numerator == 0 || denominator == 0 || ticks == 0 {
        return DEFAULT_FRAME_INTERVAL;
    }
    let nanos =
        u128::from(ticks) * u128::from(numerator) * 1_000_000_000 / u128::from(denominator);
    let interval = Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX));

    if (MIN_FRAME_INTERVAL..=MAX_FRAME_INTERVAL).contains(&interval) {
        interval
    } else {
        DEFAULT_FRAME_INTERVAL
    }
}

/// Playback duration of the samples between two Ogg granule positions.
///
/// `None` for pages where no packet ends (granule position of all ones).
fn page_duration(granule: u64, last_granule: u64) -> Option<Duration> {
    if granule == u64::MAX {
        return None;
    }
    let samples = granule.saturating_sub(last_granule);
    let nanos = samples.saturating_mul(1_000_000_000) / OPUS_SAMPLE_RATE;
    Some(Duration::from_nanos(nanos))
}

/// Frames are paced by the gap to the previous frame's timestamp.
async fn pump_ivf(track: LocalTrack, mut reader: IVFReader<FileReader>, timebase: (u32, u32)) {
    let mut last_timestamp: Option<u64> = None;

    while track.is_live() {
        let (frame, header) = match reader.parse_next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(track = track.id(), error = %e, "Video file exhausted");
                break;
            }
        };

        let ticks = last_timestamp.map_or(0, |last| header.timestamp.saturating_sub(last));
        last_timestamp = Some(header.timestamp);
        let interval = frame_interval(timebase, ticks);

        tokio::select! {
            _ = track.stopped() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        let sample = Sample {
            data: frame.freeze(),
            duration: interval,
            ..Default::default()
        };
        if let Err(e) = track.write_sample(&sample).await {
            tracing::warn!(track = track.id(), error = %e, "Video pump stopped");
            break;
        }
    }
}

async fn pump_ogg(track: LocalTrack, mut reader: OggReader<FileReader>) {
    let mut ticker = tokio::time::interval(OGG_PAGE_DURATION);
    let mut last_granule: u64 = 0;

    loop {
        tokio::select! {
            _ = track.stopped() => break,
            _ = ticker.tick() => {}
        }

        let (page, header) = match reader.parse_next_page() {
            Ok(page) => page,
            Err(e) => {
                tracing::debug!(track = track.id(), error = %e, "Audio file exhausted");
                break;
            }
        };

        let duration = match page_duration(header.granule_position, last_granule) {
            Some(duration) => duration,
            None => {
                tracing::trace!(track = track.id(), "Skipping Ogg page without packet end");
                continue;
            }
        };
        last_granule = header.granule_position;

        let sample = Sample {
            data: page.freeze(),
            duration,
            ..Default::default()
        };
        if let Err(e) = track.write_sample(&sample).await {
            tracing::warn!(track = track.id(), error = %e, "Audio pump stopped");
            break;
        }
    }
}

// src/interface.rs
//
// Capability seams for the black-box collaborators of an analysis run.
// The run is constructed with explicit (possibly absent) implementations
// instead of probing for model availability at call sites.

use crate::types::{Frame, RawDetection, TrackOutput};
use anyhow::Result;
use image::RgbImage;

/// Sequential source of decoded frames for one video.
pub trait FrameSource {
    fn fps(&self) -> f64;

    /// Frame count reported by the container (may be 0 if unknown).
    fn total_frames(&self) -> u64;

    /// Next frame in increasing frame-number order, or `None` at end of stream.
    /// An error here is a stream-level failure and aborts the run.
    fn read_frame(&mut self) -> Result<Option<Frame>>;
}

/// Object detector, called once per processed frame.
pub trait DetectionSource {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>>;
}

/// Multi-object tracker. Owns identity continuity across calls.
pub trait TrackSource {
    fn update(&mut self, detections: &[RawDetection], frame: &Frame) -> Result<Vec<TrackOutput>>;

    /// Drop all identity state before a new video.
    fn reset(&mut self) {}
}

/// Maps a cropped player region to a reference colour.
///
/// The returned channels must be in the same order as the named palette
/// in `color_analysis` (B, G, R).
pub trait ColorClassifier {
    fn classify(&self, region: &RgbImage) -> Result<[u8; 3]>;
}

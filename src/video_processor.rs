// src/video_processor.rs
//
// Input discovery and recorded-annotation replay.
//
// An annotation file is JSON describing one video: its frame rate, frame
// size, and per-frame detector and tracker outputs. Optionally each frame
// names an image under `frames_dir` for colour analysis.
//
// {
//   "fps": 30.0, "width": 1280, "height": 720,
//   "frames_dir": "game1_frames",
//   "frames": [
//     { "frame_number": 0, "image": "000000.jpg",
//       "detections": [ { "label": "player", "bbox": [x1,y1,x2,y2], "score": 0.91 } ],
//       "tracks": [ { "bbox": [x1,y1,x2,y2], "track_id": 4 } ] }
//   ]
// }

use crate::interface::{DetectionSource, FrameSource, TrackSource};
use crate::types::{Config, Frame, RawDetection, TrackOutput, VideoAnalysis};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub struct VideoProcessor {
    config: Config,
}

impl VideoProcessor {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn find_annotation_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.config.video.input_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            let is_json = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("json"))
                .unwrap_or(false);
            if is_json && entry.file_type().is_file() {
                files.push(path.to_path_buf());
            }
        }

        info!("Found {} annotation files", files.len());
        Ok(files)
    }

    pub fn output_path(&self, input_path: &Path) -> PathBuf {
        PathBuf::from(&self.config.video.output_dir)
            .join(format!("{}_analysis.json", video_name(input_path)))
    }

    pub fn write_analysis(&self, input_path: &Path, analysis: &VideoAnalysis) -> Result<PathBuf> {
        fs::create_dir_all(&self.config.video.output_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                self.config.video.output_dir
            )
        })?;
        let output_path = self.output_path(input_path);
        let json = serde_json::to_string_pretty(analysis)?;
        fs::write(&output_path, json)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        info!("Results saved to: {}", output_path.display());
        Ok(output_path)
    }
}

/// File stem used as the video's name in ids and output files.
pub fn video_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string())
}

// ============================================================================
// ANNOTATION FORMAT
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct AnnotationFile {
    fps: f64,
    #[serde(default)]
    width: usize,
    #[serde(default)]
    height: usize,
    #[serde(default)]
    total_frames: Option<u64>,
    #[serde(default)]
    frames_dir: Option<PathBuf>,
    #[serde(default)]
    frames: Vec<AnnotatedFrame>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnnotatedFrame {
    frame_number: u64,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    detections: Vec<AnnotatedDetection>,
    #[serde(default)]
    tracks: Vec<TrackOutput>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnnotatedDetection {
    label: String,
    bbox: [f32; 4],
    #[serde(default = "default_score")]
    score: f32,
}

fn default_score() -> f32 {
    1.0
}

// ============================================================================
// REPLAY
// ============================================================================

/// A parsed annotation file, ready to be split into the three replay sources.
pub struct ReplayVideo {
    pub source: ReplayFrameSource,
    pub detector: ReplayDetector,
    pub tracker: ReplayTracker,
}

impl ReplayVideo {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening annotations: {}", path.display());
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read annotations {}", path.display()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_json(&contents, base_dir)
            .with_context(|| format!("Invalid annotations in {}", path.display()))
    }

    /// Parse annotations; relative `frames_dir` paths resolve against `base_dir`.
    pub fn from_json(contents: &str, base_dir: &Path) -> Result<Self> {
        let mut file: AnnotationFile = serde_json::from_str(contents)?;
        if !(file.fps.is_finite() && file.fps > 0.0) {
            bail!("fps must be positive, got {}", file.fps);
        }

        file.frames.sort_by_key(|f| f.frame_number);
        if let Some(pair) = file
            .frames
            .windows(2)
            .find(|w| w[0].frame_number == w[1].frame_number)
        {
            bail!("Duplicate frame number {}", pair[0].frame_number);
        }

        let total_frames = file.total_frames.unwrap_or_else(|| {
            file.frames
                .last()
                .map(|f| f.frame_number + 1)
                .unwrap_or(0)
        });
        let frames_dir = file.frames_dir.as_ref().map(|dir| base_dir.join(dir));

        info!(
            "Replay: {}x{} @ {:.2} FPS, {} annotated frames of {}",
            file.width,
            file.height,
            file.fps,
            file.frames.len(),
            total_frames
        );

        let mut detections = HashMap::new();
        let mut tracks = HashMap::new();
        let mut frames = Vec::with_capacity(file.frames.len());
        for annotated in file.frames {
            detections.insert(
                annotated.frame_number,
                annotated
                    .detections
                    .into_iter()
                    .map(|d| RawDetection {
                        label: d.label,
                        bbox: d.bbox,
                        score: d.score,
                    })
                    .collect::<Vec<_>>(),
            );
            tracks.insert(annotated.frame_number, annotated.tracks);
            frames.push((annotated.frame_number, annotated.image));
        }

        Ok(Self {
            source: ReplayFrameSource {
                fps: file.fps,
                total_frames,
                width: file.width,
                height: file.height,
                frames_dir,
                frames,
                next: 0,
            },
            detector: ReplayDetector { detections },
            tracker: ReplayTracker { tracks },
        })
    }
}

pub struct ReplayFrameSource {
    fps: f64,
    total_frames: u64,
    width: usize,
    height: usize,
    frames_dir: Option<PathBuf>,
    frames: Vec<(u64, Option<String>)>,
    next: usize,
}

impl ReplayFrameSource {
    fn load_pixels(&self, frame: &mut Frame, image: &str) {
        let path = match &self.frames_dir {
            Some(dir) => dir.join(image),
            None => PathBuf::from(image),
        };
        match image::open(&path) {
            Ok(img) => {
                let rgb = img.to_rgb8();
                frame.width = rgb.width() as usize;
                frame.height = rgb.height() as usize;
                frame.data = rgb.into_raw();
            }
            Err(e) => {
                warn!(
                    "Could not load frame image {}: {} (colour analysis skipped)",
                    path.display(),
                    e
                );
            }
        }
    }
}

impl FrameSource for ReplayFrameSource {
    fn fps(&self) -> f64 {
        self.fps
    }

    fn total_frames(&self) -> u64 {
        self.total_frames
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let Some((frame_number, image)) = self.frames.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;

        let mut frame = Frame::blank(*frame_number, *frame_number as f64 / self.fps);
        frame.width = self.width;
        frame.height = self.height;
        if let Some(image) = image.clone() {
            self.load_pixels(&mut frame, &image);
        }
        Ok(Some(frame))
    }
}

/// Replays recorded detections by frame number.
pub struct ReplayDetector {
    detections: HashMap<u64, Vec<RawDetection>>,
}

impl DetectionSource for ReplayDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        Ok(self
            .detections
            .get(&frame.frame_number)
            .cloned()
            .unwrap_or_default())
    }
}

/// Replays recorded track outputs by frame number.
pub struct ReplayTracker {
    tracks: HashMap<u64, Vec<TrackOutput>>,
}

impl TrackSource for ReplayTracker {
    fn update(&mut self, detections: &[RawDetection], frame: &Frame) -> Result<Vec<TrackOutput>> {
        let tracks = self
            .tracks
            .get(&frame.frame_number)
            .cloned()
            .unwrap_or_default();
        debug!(
            "Frame {}: {} detections, {} recorded tracks",
            frame.frame_number,
            detections.len(),
            tracks.len()
        );
        Ok(tracks)
    }
}

// ============================================================================
// TESTS
// ============================================================================

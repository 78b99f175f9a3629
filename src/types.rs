// src/types.rs

use serde::{Deserialize, Serialize};

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub segmentation: SegmentationConfig,
    pub association: AssociationConfig,
    pub formation: FormationConfig,
    pub video: VideoConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Ball displacement (px) below which a frame counts as "no movement"
    pub movement_threshold: f32,
    /// A play cannot close before this many seconds have elapsed
    pub min_play_duration: f64,
    /// A play closes once its duration exceeds this many seconds
    pub max_play_duration: f64,
    pub min_players_to_start: usize,
    /// The play may close when player_count drops below this
    pub min_players_to_end: usize,
    /// Ball must be still for more than fps * stationary_seconds frames
    pub stationary_seconds: f64,
    /// Known ball positions required before a play type is inferred
    pub min_ball_positions: usize,
    pub pass_vertical_span: f32,
    pub run_displacement: f32,
    /// Minimum players in a frame before it is scanned for a pile-up
    pub cluster_min_players: usize,
    pub close_pair_distance: f32,
    pub cluster_pair_count: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            movement_threshold: 50.0,
            min_play_duration: 2.0,
            max_play_duration: 30.0,
            min_players_to_start: 6,
            min_players_to_end: 4,
            stationary_seconds: 2.0,
            min_ball_positions: 3,
            pass_vertical_span: 100.0,
            run_displacement: 200.0,
            cluster_min_players: 4,
            close_pair_distance: 100.0,
            cluster_pair_count: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationConfig {
    /// A track is assigned only when its IoU with the detection exceeds this
    pub iou_threshold: f32,
    pub player_label: String,
    pub ball_label: String,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.5,
            player_label: "player".to_string(),
            ball_label: "ball".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormationConfig {
    /// Formation is only classified for frames with at least this many players
    pub min_players: usize,
    /// Colour groups smaller than this are ignored
    pub min_group_size: usize,
    /// Groups of at least this size get a named formation instead of a head count
    pub full_unit_size: usize,
    pub offensive_line_front: usize,
    pub defense_front: usize,
    pub defense_mid: usize,
    pub prevent_back: usize,
}

impl Default for FormationConfig {
    fn default() -> Self {
        Self {
            min_players: 6,
            min_group_size: 3,
            full_unit_size: 7,
            offensive_line_front: 5,
            defense_front: 3,
            defense_mid: 3,
            prevent_back: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub input_dir: String,
    pub output_dir: String,
    /// Only every Nth frame is processed when per-frame output is off
    pub segmentation_frame_skip: u64,
    pub progress_log_interval_secs: f64,
    pub analyze_frames: bool,
    pub detect_plays: bool,
    pub track_players: bool,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            input_dir: "input".to_string(),
            output_dir: "output".to_string(),
            segmentation_frame_skip: 5,
            progress_log_interval_secs: 5.0,
            analyze_frames: true,
            detect_plays: true,
            track_players: true,
        }
    }
}

impl VideoConfig {
    pub fn options(&self) -> AnalysisOptions {
        AnalysisOptions {
            analyze_frames: self.analyze_frames,
            detect_plays: self.detect_plays,
            track_players: self.track_players,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// What a single analysis run should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Keep every FrameSignal in the result (disables frame skipping)
    pub analyze_frames: bool,
    pub detect_plays: bool,
    pub track_players: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            analyze_frames: true,
            detect_plays: true,
            track_players: true,
        }
    }
}

// ============================================================================
// FRAMES AND DETECTIONS
// ============================================================================

/// One decoded video frame. `data` is packed RGB, row-major.
#[derive(Debug, Clone)]
pub struct Frame {
    pub frame_number: u64,
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    /// Seconds from the start of the video
    pub timestamp: f64,
}

impl Frame {
    /// A frame that carries metadata only (no pixel buffer).
    pub fn blank(frame_number: u64, timestamp: f64) -> Self {
        Self {
            frame_number,
            data: Vec::new(),
            width: 0,
            height: 0,
            timestamp,
        }
    }

    pub fn has_pixels(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() >= self.width * self.height * 3
    }
}

pub fn bbox_center(bbox: &[f32; 4]) -> (f32, f32) {
    ((bbox[0] + bbox[2]) * 0.5, (bbox[1] + bbox[3]) * 0.5)
}

pub fn bbox_area(bbox: &[f32; 4]) -> f32 {
    (bbox[2] - bbox[0]).max(0.0) * (bbox[3] - bbox[1]).max(0.0)
}

pub fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Detector output for one object on one frame. Carries no identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub label: String,
    pub bbox: [f32; 4], // [x1, y1, x2, y2] pixels
    pub score: f32,
}

impl RawDetection {
    pub fn new(label: &str, bbox: [f32; 4], score: f32) -> Self {
        Self {
            label: label.to_string(),
            bbox,
            score,
        }
    }
}

/// Tracker output for one frame. `track_id` is owned by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackOutput {
    pub bbox: [f32; 4],
    pub track_id: i64,
}

/// Sentinel for an object with no persistent identity.
pub const UNTRACKED: i64 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociatedObject {
    /// Tracker identity, or UNTRACKED (-1)
    pub track_id: i64,
    pub label: String,
    pub bbox: [f32; 4],
    pub score: f32,
    pub team_color: Option<String>,
}

impl AssociatedObject {
    pub fn center(&self) -> (f32, f32) {
        bbox_center(&self.bbox)
    }
}

// ============================================================================
// SIGNALS AND PLAYS
// ============================================================================

/// Per-frame summary consumed by the play segmenter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSignal {
    pub frame_number: u64,
    pub timestamp: f64,
    pub player_count: usize,
    pub ball_detected: bool,
    pub ball_position: Option<(f32, f32)>,
    pub formation: Option<String>,
    pub objects: Vec<AssociatedObject>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayType {
    #[serde(rename = "pass")]
    Pass,
    #[serde(rename = "run")]
    Run,
    #[serde(rename = "short play")]
    ShortPlay,
    #[serde(rename = "unknown")]
    Unknown,
}

impl PlayType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Run => "run",
            Self::ShortPlay => "short play",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaySegment {
    pub play_id: u32,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub start_frame: u64,
    pub end_frame: u64,
    /// Player count on the closing frame
    pub player_count: usize,
    pub play_type: PlayType,
    pub key_events: Vec<String>,
}

/// Result of analysing one video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoAnalysis {
    pub video_id: String,
    pub duration: f64,
    pub total_frames: u64,
    pub fps: f64,
    pub plays: Vec<PlaySegment>,
    pub frame_analyses: Option<Vec<FrameSignal>>,
    /// Wall-clock seconds spent on the run
    pub processing_time: f64,
}

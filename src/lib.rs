// src/lib.rs
//
// Frame analysis and play segmentation for annotated football video.

pub mod analysis;
pub mod color_analysis;
pub mod config;
pub mod interface;
pub mod pipeline;
pub mod types;
pub mod video_processor;

pub use analysis::{
    analyze_play, segment_plays, DetectionTrackAssociator, FormationClassifier,
    FrameSignalExtractor, PlaySegmenter,
};
pub use color_analysis::MeanColorClassifier;
pub use interface::{ColorClassifier, DetectionSource, FrameSource, TrackSource};
pub use pipeline::{RunMetrics, VideoAnalyzer};
pub use types::{
    AnalysisOptions, AssociatedObject, Config, Frame, FrameSignal, PlaySegment, PlayType,
    RawDetection, TrackOutput, VideoAnalysis,
};

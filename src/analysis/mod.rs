// src/analysis/mod.rs
//
// Frame analysis and play segmentation.
//
// Signal flow:
//   Detections + Track outputs → track_association → frame_signal ─→ play_segmenter → PlaySegment
//                                                        └─ formation

pub mod formation;
pub mod frame_signal;
pub mod play_segmenter;
pub mod track_association;

pub use formation::{FormationClassifier, GroupFormation, PlayerPosition, UNKNOWN_FORMATION};
pub use frame_signal::FrameSignalExtractor;
pub use play_segmenter::{analyze_play, segment_plays, PlaySegmenter, SegmenterState};
pub use track_association::{iou, DetectionTrackAssociator};

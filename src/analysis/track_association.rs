// src/analysis/track_association.rs
//
// Associates each raw detection with a tracker identity by bbox overlap and
// resolves team colour for player detections.
//
// The tracker owns identity: this module never invents or rewrites a
// track_id, it only picks the best-overlapping tracker box. Team colour is
// sticky per track_id: the first colour resolved for an identity wins for
// the rest of the run.

use crate::color_analysis::{crop_region, nearest_named_color};
use crate::interface::ColorClassifier;
use crate::types::{
    bbox_area, AssociatedObject, AssociationConfig, Frame, RawDetection, TrackOutput, UNTRACKED,
};
use std::collections::HashMap;
use tracing::debug;

// ============================================================================
// IoU COMPUTATION
// ============================================================================

/// Intersection-over-union of two `[x1, y1, x2, y2]` boxes.
/// Disjoint or zero-area boxes yield 0.
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = bbox_area(&[x1, y1, x2, y2]);
    if inter <= 0.0 {
        return 0.0;
    }

    let union = bbox_area(a) + bbox_area(b) - inter;

    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

// ============================================================================
// ASSOCIATOR
// ============================================================================

/// Per-run associator. Holds the sticky `track_id -> colour` cache, so each
/// analysis run must own its own instance.
pub struct DetectionTrackAssociator {
    config: AssociationConfig,
    color_cache: HashMap<i64, String>,
    color_failures: u64,
}

impl DetectionTrackAssociator {
    pub fn new(config: AssociationConfig) -> Self {
        Self {
            config,
            color_cache: HashMap::new(),
            color_failures: 0,
        }
    }

    /// Produce one AssociatedObject per detection, in detection order.
    pub fn associate(
        &mut self,
        detections: &[RawDetection],
        tracks: &[TrackOutput],
        frame: &Frame,
        classifier: Option<&dyn ColorClassifier>,
    ) -> Vec<AssociatedObject> {
        detections
            .iter()
            .map(|det| {
                let track_id = self.match_track(det, tracks);
                let team_color = match classifier {
                    Some(c) if det.label == self.config.player_label => {
                        self.resolve_team_color(det, track_id, frame, c)
                    }
                    _ => None,
                };
                AssociatedObject {
                    track_id,
                    label: det.label.clone(),
                    bbox: det.bbox,
                    score: det.score,
                    team_color,
                }
            })
            .collect()
    }

    /// Highest-IoU tracker box above the threshold; first one wins ties.
    pub fn match_track(&self, det: &RawDetection, tracks: &[TrackOutput]) -> i64 {
        let mut best_id = UNTRACKED;
        let mut best_iou = self.config.iou_threshold;

        for track in tracks {
            let score = iou(&det.bbox, &track.bbox);
            if score > best_iou {
                best_iou = score;
                best_id = track.track_id;
            }
        }

        best_id
    }

    fn resolve_team_color(
        &mut self,
        det: &RawDetection,
        track_id: i64,
        frame: &Frame,
        classifier: &dyn ColorClassifier,
    ) -> Option<String> {
        let Some(region) = crop_region(frame, &det.bbox) else {
            debug!(
                "Frame {}: empty crop for player bbox {:?}, skipping colour",
                frame.frame_number, det.bbox
            );
            return None;
        };

        let raw = match classifier.classify(&region) {
            Ok(raw) => raw,
            Err(e) => {
                self.color_failures += 1;
                debug!(
                    "Frame {}: colour detection failed for player: {}",
                    frame.frame_number, e
                );
                return None;
            }
        };
        let color = nearest_named_color(raw).to_string();

        if track_id == UNTRACKED {
            return Some(color);
        }

        let sticky = self
            .color_cache
            .entry(track_id)
            .or_insert_with(|| color.clone());
        if *sticky != color {
            debug!(
                "Track {}: observed {} but keeping first colour {}",
                track_id, color, sticky
            );
        }
        Some(sticky.clone())
    }

    pub fn cached_color(&self, track_id: i64) -> Option<&str> {
        self.color_cache.get(&track_id).map(String::as_str)
    }

    pub fn cached_track_count(&self) -> usize {
        self.color_cache.len()
    }

    pub fn color_failures(&self) -> u64 {
        self.color_failures
    }

    pub fn reset(&mut self) {
        self.color_cache.clear();
        self.color_failures = 0;
    }
}

// ============================================================================
// TESTS
// ============================================================================

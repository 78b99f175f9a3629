// src/pipeline/metrics.rs
//
// Per-run counters and timing. One instance per analysis run.

use crate::types::FrameSignal;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct RunMetrics {
    pub frames_read: u64,
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub frames_with_players: u64,
    pub frames_with_ball: u64,
    pub frames_with_formation: u64,
    pub detection_failures: u64,
    pub tracking_failures: u64,
    pub color_failures: u64,
    pub plays_detected: u64,
    pub plays_discarded: u64,
    pub started_at: Instant,
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            frames_read: 0,
            frames_processed: 0,
            frames_skipped: 0,
            frames_with_players: 0,
            frames_with_ball: 0,
            frames_with_formation: 0,
            detection_failures: 0,
            tracking_failures: 0,
            color_failures: 0,
            plays_detected: 0,
            plays_discarded: 0,
            started_at: Instant::now(),
        }
    }

    pub fn record_signal(&mut self, signal: &FrameSignal) {
        self.frames_processed += 1;
        if signal.player_count > 0 {
            self.frames_with_players += 1;
        }
        if signal.ball_detected {
            self.frames_with_ball += 1;
        }
        if signal.formation.is_some() {
            self.frames_with_formation += 1;
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    /// Processed frames per wall-clock second.
    pub fn fps(&self) -> f64 {
        let secs = self.elapsed_secs();
        if secs > 0.0 {
            self.frames_processed as f64 / secs
        } else {
            0.0
        }
    }

    pub fn log_summary(&self, video_id: &str) {
        let processed = self.frames_processed.max(1) as f64;
        info!("Run summary for {}:", video_id);
        info!(
            "  Frames: {} read, {} processed, {} skipped",
            self.frames_read, self.frames_processed, self.frames_skipped
        );
        info!(
            "  Ball visible: {} ({:.1}%)",
            self.frames_with_ball,
            100.0 * self.frames_with_ball as f64 / processed
        );
        info!("  Frames with formation: {}", self.frames_with_formation);
        info!("  Plays detected: {}", self.plays_detected);
        if self.plays_discarded > 0 {
            info!("  Open play discarded at end of stream");
        }
        if self.detection_failures > 0 || self.tracking_failures > 0 {
            warn!(
                "  Degraded frames: {} detection failures, {} tracking failures",
                self.detection_failures, self.tracking_failures
            );
        }
        if self.color_failures > 0 {
            warn!("  Colour classification failures: {}", self.color_failures);
        }
        info!("  Processing speed: {:.1} FPS", self.fps());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_signal_counts() {
        let mut metrics = RunMetrics::new();
        let mut signal = FrameSignal {
            frame_number: 0,
            timestamp: 0.0,
            player_count: 7,
            ball_detected: true,
            ball_position: Some((1.0, 2.0)),
            formation: Some("unknown formation".to_string()),
            objects: Vec::new(),
        };
        metrics.record_signal(&signal);

        signal.player_count = 0;
        signal.ball_detected = false;
        signal.ball_position = None;
        signal.formation = None;
        metrics.record_signal(&signal);

        assert_eq!(metrics.frames_processed, 2);
        assert_eq!(metrics.frames_with_players, 1);
        assert_eq!(metrics.frames_with_ball, 1);
        assert_eq!(metrics.frames_with_formation, 1);
    }
}

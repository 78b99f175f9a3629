// src/analysis/play_segmenter.rs
//
// Turns the ordered stream of FrameSignals into bounded plays.
//
// Two states per video:
//   IDLE    → IN_PLAY  when player_count reaches min_players_to_start
//   IN_PLAY → IDLE     once min_play_duration has elapsed AND one of
//                        - ball stationary for more than fps * stationary_seconds frames
//                        - player_count below min_players_to_end
//                        - duration above max_play_duration
//
// Frames must arrive in increasing frame order; nothing is sorted here.
// A play still open when the stream ends is dropped, never emitted: a play
// only counts once a closing condition has been observed.
//
// When the ball is missing on a frame the no-movement counter is left
// untouched (neither incremented nor reset). Long ball dropouts therefore
// delay the stationary-ball close; the other two conditions still apply.
// The ball reference is taken from the opening frame and only advances on
// frames where it and the current position are both known.

use crate::types::{distance, FrameSignal, PlaySegment, PlayType, SegmentationConfig};
use tracing::{debug, warn};

pub const EVENT_SNAP: &str = "snap";
pub const EVENT_PASS: &str = "pass";
pub const EVENT_HANDOFF: &str = "handoff";
pub const EVENT_TACKLE: &str = "tackle";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    Idle,
    InPlay,
}

impl SegmenterState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::InPlay => "IN_PLAY",
        }
    }
}

// ============================================================================
// SEGMENTER
// ============================================================================

/// Per-run play segmentation state. The play-id counter lives here, so each
/// analysis run needs its own instance.
pub struct PlaySegmenter {
    config: SegmentationConfig,
    player_label: String,
    fps: f64,
    state: SegmenterState,
    play_start_frame: u64,
    play_start_time: f64,
    last_ball_position: Option<(f32, f32)>,
    frames_without_ball_movement: u32,
    buffered_frames: Vec<FrameSignal>,
    next_play_id: u32,
    last_frame_number: Option<u64>,
}

impl PlaySegmenter {
    pub fn new(config: SegmentationConfig, fps: f64) -> Self {
        Self {
            config,
            player_label: "player".to_string(),
            fps,
            state: SegmenterState::Idle,
            play_start_frame: 0,
            play_start_time: 0.0,
            last_ball_position: None,
            frames_without_ball_movement: 0,
            buffered_frames: Vec::new(),
            next_play_id: 1,
            last_frame_number: None,
        }
    }

    pub fn with_player_label(mut self, label: &str) -> Self {
        self.player_label = label.to_string();
        self
    }

    pub fn state(&self) -> SegmenterState {
        self.state
    }

    pub fn is_in_play(&self) -> bool {
        self.state == SegmenterState::InPlay
    }

    pub fn frames_without_ball_movement(&self) -> u32 {
        self.frames_without_ball_movement
    }

    pub fn plays_emitted(&self) -> u32 {
        self.next_play_id - 1
    }

    /// Feed the next frame. Returns a play when this frame closes one.
    pub fn update(&mut self, frame: &FrameSignal) -> Option<PlaySegment> {
        if let Some(last) = self.last_frame_number {
            if frame.frame_number <= last {
                warn!(
                    "Frame {} arrived after frame {}; segmenter expects increasing order",
                    frame.frame_number, last
                );
            }
        }
        self.last_frame_number = Some(frame.frame_number);

        match self.state {
            SegmenterState::Idle => {
                if frame.player_count >= self.config.min_players_to_start {
                    self.open_play(frame);
                }
                None
            }
            SegmenterState::InPlay => self.advance_play(frame),
        }
    }

    /// End of stream. An open play is discarded; returns true if one was.
    pub fn finish(&mut self) -> bool {
        if self.state != SegmenterState::InPlay {
            return false;
        }
        debug!(
            "Stream ended during play {} (started frame {}, {} frames buffered); discarding",
            self.next_play_id,
            self.play_start_frame,
            self.buffered_frames.len()
        );
        self.reset_play();
        true
    }

    fn open_play(&mut self, frame: &FrameSignal) {
        let from = self.state;
        self.state = SegmenterState::InPlay;
        self.play_start_frame = frame.frame_number;
        self.play_start_time = frame.timestamp;
        self.last_ball_position = frame.ball_position;
        self.frames_without_ball_movement = 0;
        self.buffered_frames.clear();
        self.buffered_frames.push(frame.clone());
        debug!(
            "Play {} started at frame {} ({} players): {} → {}",
            self.next_play_id,
            frame.frame_number,
            frame.player_count,
            from.as_str(),
            self.state.as_str()
        );
    }

    fn advance_play(&mut self, frame: &FrameSignal) -> Option<PlaySegment> {
        let cfg = &self.config;
        self.buffered_frames.push(frame.clone());

        // The reference only moves when both positions are known, so a play
        // that opens without a ball never counts toward the stationary close
        if let (Some(pos), Some(last)) = (frame.ball_position, self.last_ball_position) {
            if distance(pos, last) < cfg.movement_threshold {
                self.frames_without_ball_movement += 1;
            } else {
                self.frames_without_ball_movement = 0;
            }
            self.last_ball_position = Some(pos);
        }

        let duration = frame.timestamp - self.play_start_time;
        if duration < cfg.min_play_duration {
            return None;
        }

        let ball_stationary =
            self.frames_without_ball_movement as f64 > self.fps * cfg.stationary_seconds;
        let players_dispersed = frame.player_count < cfg.min_players_to_end;
        let too_long = duration > cfg.max_play_duration;

        if !(ball_stationary || players_dispersed || too_long) {
            return None;
        }

        let (play_type, key_events) =
            analyze_play(&self.buffered_frames, cfg, &self.player_label);
        let play = PlaySegment {
            play_id: self.next_play_id,
            start_time: self.play_start_time,
            end_time: frame.timestamp,
            duration,
            start_frame: self.play_start_frame,
            end_frame: frame.frame_number,
            player_count: frame.player_count,
            play_type,
            key_events,
        };
        debug!(
            "Play {} ended at frame {}, type: {}, duration: {:.2}s (stationary={}, dispersed={}, max={})",
            play.play_id,
            play.end_frame,
            play.play_type.as_str(),
            play.duration,
            ball_stationary,
            players_dispersed,
            too_long
        );

        self.next_play_id += 1;
        self.reset_play();
        debug!("Segmenter back to {}", self.state.as_str());
        Some(play)
    }

    fn reset_play(&mut self) {
        self.state = SegmenterState::Idle;
        self.last_ball_position = None;
        self.frames_without_ball_movement = 0;
        self.buffered_frames.clear();
    }
}

/// Run a whole ordered stream through a fresh segmenter.
pub fn segment_plays(
    frames: &[FrameSignal],
    config: &SegmentationConfig,
    fps: f64,
) -> Vec<PlaySegment> {
    let mut segmenter = PlaySegmenter::new(config.clone(), fps);
    let plays: Vec<PlaySegment> = frames.iter().filter_map(|f| segmenter.update(f)).collect();
    segmenter.finish();
    plays
}

// ============================================================================
// PLAY TYPE AND KEY EVENTS
// ============================================================================

/// Infer the play type and key events from a closed play's frame window.
pub fn analyze_play(
    frames: &[FrameSignal],
    cfg: &SegmentationConfig,
    player_label: &str,
) -> (PlayType, Vec<String>) {
    let mut events: Vec<String> = Vec::new();
    if frames.is_empty() {
        return (PlayType::Unknown, events);
    }

    let play_type = classify_ball_movement(frames, cfg);
    match play_type {
        PlayType::Pass => push_event(&mut events, EVENT_PASS.to_string()),
        PlayType::Run => push_event(&mut events, EVENT_HANDOFF.to_string()),
        PlayType::ShortPlay | PlayType::Unknown => {}
    }

    let first = &frames[0];
    if first.player_count >= cfg.min_players_to_start {
        events.insert(0, EVENT_SNAP.to_string());
    }

    // The closing frame is not scanned for a pile-up
    let scanned = &frames[..frames.len() - 1];
    if scanned
        .iter()
        .any(|f| is_player_cluster(f, cfg, player_label))
    {
        push_event(&mut events, EVENT_TACKLE.to_string());
    }

    if let Some(formation) = first.formation.as_deref() {
        if formation != super::formation::UNKNOWN_FORMATION {
            push_event(&mut events, format!("formation: {}", formation));
        }
    }

    (play_type, events)
}

fn classify_ball_movement(frames: &[FrameSignal], cfg: &SegmentationConfig) -> PlayType {
    let positions: Vec<(f32, f32)> = frames.iter().filter_map(|f| f.ball_position).collect();
    if positions.len() < cfg.min_ball_positions.max(1) {
        return PlayType::Unknown;
    }

    let start = positions[0];
    let end = positions[positions.len() - 1];
    let displacement = distance(start, end);

    // Screen y grows downward: the "highest" ball point is the smallest y
    let top = positions.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
    let bottom = positions.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
    let vertical_span = bottom - top;

    if vertical_span > cfg.pass_vertical_span {
        PlayType::Pass
    } else if displacement > cfg.run_displacement {
        PlayType::Run
    } else {
        PlayType::ShortPlay
    }
}

/// True when enough player pairs in this frame are within close_pair_distance.
fn is_player_cluster(frame: &FrameSignal, cfg: &SegmentationConfig, player_label: &str) -> bool {
    let centers: Vec<(f32, f32)> = frame
        .objects
        .iter()
        .filter(|o| o.label == player_label)
        .map(|o| o.center())
        .collect();
    if centers.len() < cfg.cluster_min_players {
        return false;
    }

    let mut close_pairs = 0;
    for i in 0..centers.len() {
        for j in (i + 1)..centers.len() {
            if distance(centers[i], centers[j]) < cfg.close_pair_distance {
                close_pairs += 1;
                if close_pairs >= cfg.cluster_pair_count {
                    return true;
                }
            }
        }
    }
    false
}

fn push_event(events: &mut Vec<String>, event: String) {
    if !events.contains(&event) {
        events.push(event);
    }
}

// ============================================================================
// TESTS
// ============================================================================

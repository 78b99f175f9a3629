// src/pipeline/orchestrator.rs
//
// Drives one analysis run per video:
//
//   FrameSource → DetectionSource → TrackSource → DetectionTrackAssociator
//               → FrameSignalExtractor → PlaySegmenter → VideoAnalysis
//
// Collaborators are optional. A missing detector yields empty frames and a
// missing tracker yields untracked objects; neither is an error. Per-frame
// detector or tracker failures degrade that frame only. A failing frame
// source aborts the run.

use super::metrics::RunMetrics;
use crate::analysis::{DetectionTrackAssociator, FrameSignalExtractor, PlaySegmenter};
use crate::interface::{ColorClassifier, DetectionSource, FrameSource, TrackSource};
use crate::types::{AnalysisOptions, Config, Frame, FrameSignal, VideoAnalysis};
use anyhow::{bail, Context, Result};
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct VideoAnalyzer {
    config: Config,
    detector: Option<Box<dyn DetectionSource>>,
    tracker: Option<Box<dyn TrackSource>>,
    color_classifier: Option<Box<dyn ColorClassifier>>,
    last_metrics: Option<RunMetrics>,
}

impl VideoAnalyzer {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            detector: None,
            tracker: None,
            color_classifier: None,
            last_metrics: None,
        }
    }

    pub fn with_detector(mut self, detector: Box<dyn DetectionSource>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn with_tracker(mut self, tracker: Box<dyn TrackSource>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn with_color_classifier(mut self, classifier: Box<dyn ColorClassifier>) -> Self {
        self.color_classifier = Some(classifier);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Metrics of the most recent completed run.
    pub fn last_metrics(&self) -> Option<&RunMetrics> {
        self.last_metrics.as_ref()
    }

    /// Analyse one video end to end.
    ///
    /// Association and segmentation state is created fresh for every call,
    /// so nothing (colour cache, play ids, ball history) leaks between videos.
    pub fn analyze(
        &mut self,
        video_name: &str,
        source: &mut dyn FrameSource,
        options: AnalysisOptions,
    ) -> Result<VideoAnalysis> {
        let fps = source.fps();
        if !(fps.is_finite() && fps > 0.0) {
            bail!("Invalid frame rate {} for {}", fps, video_name);
        }
        let reported_frames = source.total_frames();

        info!(
            "Analysing {}: {} frames @ {:.2} fps (frames={}, plays={}, tracking={})",
            video_name,
            reported_frames,
            fps,
            options.analyze_frames,
            options.detect_plays,
            options.track_players
        );

        if self.detector.is_none() {
            warn!("No detector configured: every frame will be empty");
        }
        if options.track_players {
            match self.tracker.as_deref_mut() {
                Some(tracker) => tracker.reset(),
                None => debug!("No tracker configured: objects stay untracked"),
            }
        }

        // Play segmentation only needs a coarse sampling
        let frame_skip = if options.analyze_frames {
            1
        } else {
            self.config.video.segmentation_frame_skip.max(1)
        };
        let progress_interval = self.config.video.progress_log_interval_secs;

        let mut run = AnalysisRun::new(&self.config, fps);
        let mut plays = Vec::new();
        let mut frame_analyses = Vec::new();
        let mut last_progress = Instant::now();

        while let Some(frame) = source
            .read_frame()
            .with_context(|| format!("Failed to read frame from {}", video_name))?
        {
            run.metrics.frames_read += 1;

            if frame.frame_number % frame_skip != 0 {
                run.metrics.frames_skipped += 1;
                continue;
            }

            if last_progress.elapsed().as_secs_f64() >= progress_interval {
                log_progress(frame.frame_number, reported_frames, &run.metrics);
                last_progress = Instant::now();
            }

            let tracker = if options.track_players {
                self.tracker.as_deref_mut()
            } else {
                None
            };
            let signal = run.process_frame(
                &frame,
                self.detector.as_deref_mut(),
                tracker,
                self.color_classifier.as_deref(),
            );

            if options.detect_plays {
                if let Some(play) = run.segmenter.update(&signal) {
                    info!(
                        "Play {} ({}): {:.1}s → {:.1}s, {} players, events [{}]",
                        play.play_id,
                        play.play_type.as_str(),
                        play.start_time,
                        play.end_time,
                        play.player_count,
                        play.key_events.join(", ")
                    );
                    plays.push(play);
                }
            }

            if options.analyze_frames {
                frame_analyses.push(signal);
            }
        }

        if run.segmenter.finish() {
            run.metrics.plays_discarded += 1;
        }
        run.metrics.color_failures = run.associator.color_failures();
        run.metrics.plays_detected = plays.len() as u64;

        let total_frames = if reported_frames > 0 {
            reported_frames
        } else {
            run.metrics.frames_read
        };
        let video_id = format!("{}_{}", video_name, chrono::Utc::now().timestamp());
        run.metrics.log_summary(&video_id);

        let analysis = VideoAnalysis {
            video_id,
            duration: total_frames as f64 / fps,
            total_frames,
            fps,
            plays,
            frame_analyses: if options.analyze_frames {
                Some(frame_analyses)
            } else {
                None
            },
            processing_time: run.metrics.elapsed_secs(),
        };

        self.last_metrics = Some(run.metrics);
        Ok(analysis)
    }
}

fn log_progress(frame_number: u64, total_frames: u64, metrics: &RunMetrics) {
    if total_frames > 0 {
        info!(
            "Progress: {:.1}% ({}/{}) @ {:.1} FPS",
            100.0 * frame_number as f64 / total_frames as f64,
            frame_number,
            total_frames,
            metrics.fps()
        );
    } else {
        info!("Progress: frame {} @ {:.1} FPS", frame_number, metrics.fps());
    }
}

/// Per-video state. Dropped at the end of `VideoAnalyzer::analyze`.
struct AnalysisRun {
    associator: DetectionTrackAssociator,
    extractor: FrameSignalExtractor,
    segmenter: PlaySegmenter,
    metrics: RunMetrics,
}

impl AnalysisRun {
    fn new(config: &Config, fps: f64) -> Self {
        Self {
            associator: DetectionTrackAssociator::new(config.association.clone()),
            extractor: FrameSignalExtractor::new(&config.association, config.formation.clone()),
            segmenter: PlaySegmenter::new(config.segmentation.clone(), fps)
                .with_player_label(&config.association.player_label),
            metrics: RunMetrics::new(),
        }
    }

    fn process_frame(
        &mut self,
        frame: &Frame,
        detector: Option<&mut (dyn DetectionSource + 'static)>,
        tracker: Option<&mut (dyn TrackSource + 'static)>,
        classifier: Option<&dyn ColorClassifier>,
    ) -> FrameSignal {
        let objects = match detector {
            None => Vec::new(),
            Some(detector) => match detector.detect(frame) {
                Ok(detections) => {
                    let tracks = match tracker {
                        Some(tracker) => match tracker.update(&detections, frame) {
                            Ok(tracks) => tracks,
                            Err(e) => {
                                warn!("Tracking failed on frame {}: {:#}", frame.frame_number, e);
                                self.metrics.tracking_failures += 1;
                                Vec::new()
                            }
                        },
                        None => Vec::new(),
                    };
                    self.associator
                        .associate(&detections, &tracks, frame, classifier)
                }
                Err(e) => {
                    warn!("Detection failed on frame {}: {:#}", frame.frame_number, e);
                    self.metrics.detection_failures += 1;
                    Vec::new()
                }
            },
        };

        let signal = self
            .extractor
            .extract(frame.frame_number, frame.timestamp, objects);
        self.metrics.record_signal(&signal);
        signal
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_analysis::MeanColorClassifier;
    use crate::types::{PlayType, RawDetection, TrackOutput, UNTRACKED};
    use anyhow::anyhow;

    const FPS: f64 = 30.0;

    struct VecSource {
        frames: Vec<Frame>,
        next: usize,
        fail_at: Option<usize>,
        fps: f64,
    }

    impl VecSource {
        fn new(count: u64) -> Self {
            Self {
                frames: (0..count)
                    .map(|n| Frame::blank(n, n as f64 / FPS))
                    .collect(),
                next: 0,
                fail_at: None,
                fps: FPS,
            }
        }
    }

    impl FrameSource for VecSource {
        fn fps(&self) -> f64 {
            self.fps
        }

        fn total_frames(&self) -> u64 {
            self.frames.len() as u64
        }

        fn read_frame(&mut self) -> Result<Option<Frame>> {
            if self.fail_at == Some(self.next) {
                return Err(anyhow!("corrupt packet"));
            }
            let frame = self.frames.get(self.next).cloned();
            self.next += 1;
            Ok(frame)
        }
    }

    /// Emits `players(frame_number)` player boxes in a row plus a
    /// stationary ball, failing on the listed frames.
    struct ScriptedDetector {
        players: fn(u64) -> usize,
        fail_on: Vec<u64>,
    }

    impl DetectionSource for ScriptedDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
            if self.fail_on.contains(&frame.frame_number) {
                return Err(anyhow!("inference error"));
            }
            let mut dets: Vec<RawDetection> = (0..(self.players)(frame.frame_number))
                .map(|i| {
                    let x = 300.0 * i as f32;
                    RawDetection::new("player", [x, 100.0, x + 40.0, 180.0], 0.9)
                })
                .collect();
            dets.push(RawDetection::new("ball", [500.0, 500.0, 510.0, 510.0], 0.8));
            Ok(dets)
        }
    }

    /// Gives each player box the id of its position in the list.
    #[derive(Default)]
    struct EchoTracker {
        resets: std::rc::Rc<std::cell::Cell<u32>>,
    }

    impl TrackSource for EchoTracker {
        fn update(&mut self, detections: &[RawDetection], _: &Frame) -> Result<Vec<TrackOutput>> {
            Ok(detections
                .iter()
                .filter(|d| d.label == "player")
                .enumerate()
                .map(|(i, d)| TrackOutput {
                    bbox: d.bbox,
                    track_id: i as i64 + 1,
                })
                .collect())
        }

        fn reset(&mut self) {
            self.resets.set(self.resets.get() + 1);
        }
    }

    struct FailingTracker;

    impl TrackSource for FailingTracker {
        fn update(&mut self, _: &[RawDetection], _: &Frame) -> Result<Vec<TrackOutput>> {
            Err(anyhow!("tracker lost state"))
        }
    }

    /// A single player box in the top-left corner of every frame.
    struct OnePlayer;

    impl DetectionSource for OnePlayer {
        fn detect(&mut self, _: &Frame) -> Result<Vec<RawDetection>> {
            Ok(vec![RawDetection::new("player", [10.0, 10.0, 50.0, 50.0], 0.9)])
        }
    }

    /// Red frames before `switch_at`, blue frames from then on.
    fn painted_source(count: u64, switch_at: u64) -> VecSource {
        let mut source = VecSource::new(count);
        for frame in &mut source.frames {
            let rgb = if frame.frame_number < switch_at {
                [220, 20, 20]
            } else {
                [20, 20, 220]
            };
            frame.width = 80;
            frame.height = 60;
            frame.data = rgb.repeat(80 * 60);
        }
        source
    }

    // 8 players on frames 10..=70, 2 players otherwise
    fn one_play(n: u64) -> usize {
        if (10..=70).contains(&n) {
            8
        } else {
            2
        }
    }

    fn analyzer(fail_on: Vec<u64>) -> VideoAnalyzer {
        VideoAnalyzer::new(Config::default())
            .with_detector(Box::new(ScriptedDetector {
                players: one_play,
                fail_on,
            }))
            .with_tracker(Box::new(EchoTracker::default()))
    }

    #[test]
    fn test_end_to_end_single_play() {
        let mut analyzer = analyzer(Vec::new());
        let mut source = VecSource::new(100);
        let result = analyzer
            .analyze("game", &mut source, AnalysisOptions::default())
            .unwrap();

        assert!(result.video_id.starts_with("game_"));
        assert_eq!(result.total_frames, 100);
        assert!((result.duration - 100.0 / FPS).abs() < 1e-9);
        assert_eq!(result.plays.len(), 1);

        let play = &result.plays[0];
        assert_eq!(play.play_id, 1);
        assert_eq!(play.start_frame, 10);
        assert_eq!(play.end_frame, 71);
        assert_eq!(play.play_type, PlayType::ShortPlay);

        let frames = result.frame_analyses.as_ref().unwrap();
        assert_eq!(frames.len(), 100);
        assert_eq!(frames[20].player_count, 8);
        assert!(frames[20].objects.iter().any(|o| o.track_id == 8));
        // Ball boxes never overlap player tracks
        assert!(frames[20]
            .objects
            .iter()
            .filter(|o| o.label == "ball")
            .all(|o| o.track_id == UNTRACKED));

        let metrics = analyzer.last_metrics().unwrap();
        assert_eq!(metrics.frames_read, 100);
        assert_eq!(metrics.frames_processed, 100);
        assert_eq!(metrics.plays_detected, 1);
    }

    #[test]
    fn test_without_detector_frames_are_empty() {
        let mut analyzer = VideoAnalyzer::new(Config::default());
        let mut source = VecSource::new(50);
        let result = analyzer
            .analyze("empty", &mut source, AnalysisOptions::default())
            .unwrap();

        assert!(result.plays.is_empty());
        let frames = result.frame_analyses.unwrap();
        assert_eq!(frames.len(), 50);
        assert!(frames.iter().all(|f| f.player_count == 0 && !f.ball_detected));
    }

    #[test]
    fn test_detection_failure_degrades_single_frame() {
        let mut analyzer = analyzer(vec![5, 40]);
        let mut source = VecSource::new(100);
        let result = analyzer
            .analyze("flaky", &mut source, AnalysisOptions::default())
            .unwrap();

        let frames = result.frame_analyses.unwrap();
        assert_eq!(frames.len(), 100);
        assert_eq!(frames[40].player_count, 0);
        assert_eq!(frames[41].player_count, 8);
        assert_eq!(analyzer.last_metrics().unwrap().detection_failures, 2);
    }

    #[test]
    fn test_tracking_failure_leaves_objects_untracked() {
        let mut analyzer = VideoAnalyzer::new(Config::default())
            .with_detector(Box::new(ScriptedDetector {
                players: one_play,
                fail_on: Vec::new(),
            }))
            .with_tracker(Box::new(FailingTracker));
        let mut source = VecSource::new(20);
        let result = analyzer
            .analyze("lost", &mut source, AnalysisOptions::default())
            .unwrap();

        let frames = result.frame_analyses.unwrap();
        assert_eq!(frames[15].player_count, 8);
        assert!(frames[15].objects.iter().all(|o| o.track_id == UNTRACKED));
        assert_eq!(analyzer.last_metrics().unwrap().tracking_failures, 20);
    }

    #[test]
    fn test_tracking_disabled_skips_tracker() {
        let mut analyzer = analyzer(Vec::new());
        let mut source = VecSource::new(20);
        let options = AnalysisOptions {
            track_players: false,
            ..AnalysisOptions::default()
        };
        let result = analyzer.analyze("untracked", &mut source, options).unwrap();
        let frames = result.frame_analyses.unwrap();
        assert!(frames
            .iter()
            .flat_map(|f| f.objects.iter())
            .all(|o| o.track_id == UNTRACKED));
    }

    #[test]
    fn test_segmentation_only_samples_frames() {
        let mut analyzer = analyzer(Vec::new());
        let mut source = VecSource::new(100);
        let options = AnalysisOptions {
            analyze_frames: false,
            ..AnalysisOptions::default()
        };
        let result = analyzer.analyze("sampled", &mut source, options).unwrap();

        assert!(result.frame_analyses.is_none());
        let metrics = analyzer.last_metrics().unwrap();
        assert_eq!(metrics.frames_read, 100);
        assert_eq!(metrics.frames_processed, 20);
        assert_eq!(metrics.frames_skipped, 80);
        // Sampled frames still open the play at the first crowded frame
        assert_eq!(result.plays.len(), 1);
        assert_eq!(result.plays[0].start_frame, 10);
    }

    #[test]
    fn test_play_detection_disabled() {
        let mut analyzer = analyzer(Vec::new());
        let mut source = VecSource::new(100);
        let options = AnalysisOptions {
            detect_plays: false,
            ..AnalysisOptions::default()
        };
        let result = analyzer.analyze("frames", &mut source, options).unwrap();
        assert!(result.plays.is_empty());
        assert_eq!(result.frame_analyses.unwrap().len(), 100);
    }

    #[test]
    fn test_read_error_aborts_run() {
        let mut analyzer = analyzer(Vec::new());
        let mut source = VecSource::new(100);
        source.fail_at = Some(30);
        let err = analyzer
            .analyze("broken", &mut source, AnalysisOptions::default())
            .unwrap_err();
        assert!(format!("{:#}", err).contains("broken"));
        assert!(analyzer.last_metrics().is_none());
    }

    #[test]
    fn test_invalid_fps_is_rejected() {
        let mut analyzer = analyzer(Vec::new());
        let mut source = VecSource::new(10);
        source.fps = 0.0;
        assert!(analyzer
            .analyze("nofps", &mut source, AnalysisOptions::default())
            .is_err());
    }

    #[test]
    fn test_team_colour_sticks_to_track() {
        let mut analyzer = VideoAnalyzer::new(Config::default())
            .with_detector(Box::new(OnePlayer))
            .with_tracker(Box::new(EchoTracker::default()))
            .with_color_classifier(Box::new(MeanColorClassifier::default()));

        let mut source = painted_source(10, 3);
        let result = analyzer
            .analyze("colours", &mut source, AnalysisOptions::default())
            .unwrap();
        let frames = result.frame_analyses.unwrap();
        assert_eq!(frames.len(), 10);
        for frame in &frames {
            assert_eq!(frame.objects[0].track_id, 1);
            assert_eq!(frame.objects[0].team_color.as_deref(), Some("red"));
        }

        // Untracked players are coloured frame by frame
        let options = AnalysisOptions {
            track_players: false,
            ..AnalysisOptions::default()
        };
        let mut source = painted_source(10, 3);
        let result = analyzer.analyze("colours", &mut source, options).unwrap();
        let frames = result.frame_analyses.unwrap();
        assert_eq!(frames[0].objects[0].team_color.as_deref(), Some("red"));
        assert_eq!(frames[9].objects[0].team_color.as_deref(), Some("blue"));
        assert_eq!(analyzer.last_metrics().unwrap().color_failures, 0);
    }

    #[test]
    fn test_runs_are_independent() {
        let resets = std::rc::Rc::new(std::cell::Cell::new(0));
        let mut analyzer = VideoAnalyzer::new(Config::default())
            .with_detector(Box::new(ScriptedDetector {
                players: one_play,
                fail_on: Vec::new(),
            }))
            .with_tracker(Box::new(EchoTracker {
                resets: resets.clone(),
            }));

        for name in ["first", "second"] {
            let mut source = VecSource::new(100);
            let result = analyzer
                .analyze(name, &mut source, AnalysisOptions::default())
                .unwrap();
            assert_eq!(result.plays.len(), 1);
            assert_eq!(result.plays[0].play_id, 1);
        }
        assert_eq!(resets.get(), 2);
    }
}

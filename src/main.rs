// src/main.rs

use anyhow::Result;
use play_detection::types::Config;
use play_detection::video_processor::{video_name, ReplayVideo, VideoProcessor};
use play_detection::{MeanColorClassifier, VideoAnalysis, VideoAnalyzer};
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "config.yaml";

fn main() -> Result<()> {
    let config_path = std::env::args().nth(1);
    let config = match &config_path {
        Some(path) => Config::load(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => Config::load(DEFAULT_CONFIG)?,
        None => Config::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("play_detection={}", config.logging.level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🏈 Play Detection Starting");
    match &config_path {
        Some(path) => info!("✓ Configuration loaded from {}", path),
        None => info!("✓ Configuration loaded"),
    }
    info!(
        "Segmentation: movement={:.1}px, duration={:.1}-{:.1}s, players start/end={}/{}",
        config.segmentation.movement_threshold,
        config.segmentation.min_play_duration,
        config.segmentation.max_play_duration,
        config.segmentation.min_players_to_start,
        config.segmentation.min_players_to_end
    );

    let processor = VideoProcessor::new(config.clone());
    let annotation_files = processor.find_annotation_files()?;

    if annotation_files.is_empty() {
        error!("No annotation files found in {}", config.video.input_dir);
        return Ok(());
    }

    let mut succeeded = 0usize;
    for (idx, path) in annotation_files.iter().enumerate() {
        info!(
            "\n========================================\nProcessing video {}/{}: {}\n========================================",
            idx + 1,
            annotation_files.len(),
            path.display()
        );

        match process_video(&config, &processor, path) {
            Ok(analysis) => {
                succeeded += 1;
                print_video_stats(&analysis);
            }
            Err(e) => error!("Failed to process {}: {:#}", path.display(), e),
        }
    }

    info!(
        "✓ Done: {}/{} videos analysed",
        succeeded,
        annotation_files.len()
    );
    Ok(())
}

fn process_video(config: &Config, processor: &VideoProcessor, path: &Path) -> Result<VideoAnalysis> {
    let replay = ReplayVideo::open(path)?;
    let mut source = replay.source;

    let mut analyzer = VideoAnalyzer::new(config.clone())
        .with_detector(Box::new(replay.detector))
        .with_tracker(Box::new(replay.tracker))
        .with_color_classifier(Box::new(MeanColorClassifier::default()));

    let analysis = analyzer.analyze(&video_name(path), &mut source, config.video.options())?;
    processor.write_analysis(path, &analysis)?;
    Ok(analysis)
}

fn print_video_stats(analysis: &VideoAnalysis) {
    info!("\n╔════════════════════════════════════════════════╗");
    info!("║ VIDEO: {}", analysis.video_id);
    info!("╠════════════════════════════════════════════════╣");
    info!(
        "║ Duration: {:.1}s ({} frames @ {:.2} fps)",
        analysis.duration, analysis.total_frames, analysis.fps
    );
    info!("║ Plays detected: {}", analysis.plays.len());
    for play in &analysis.plays {
        info!(
            "║   #{} {:<10} {:>6.1}s → {:>6.1}s ({:.1}s)",
            play.play_id,
            play.play_type.as_str(),
            play.start_time,
            play.end_time,
            play.duration
        );
    }
    if analysis.plays.is_empty() {
        warn!("║ No plays found");
    }
    info!("║ Processing time: {:.2}s", analysis.processing_time);
    info!("╚════════════════════════════════════════════════╝");
}

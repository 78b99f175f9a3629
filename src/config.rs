// src/config.rs

use crate::types::Config;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to an empty mapping
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let seg = &self.segmentation;
        if seg.movement_threshold <= 0.0 {
            bail!("segmentation.movement_threshold must be positive");
        }
        if seg.min_play_duration < 0.0 || seg.max_play_duration < 0.0 {
            bail!("segmentation play durations must be non-negative");
        }
        if seg.min_play_duration > seg.max_play_duration {
            bail!(
                "segmentation.min_play_duration ({}) exceeds max_play_duration ({})",
                seg.min_play_duration,
                seg.max_play_duration
            );
        }
        if seg.min_players_to_end > seg.min_players_to_start {
            bail!("segmentation.min_players_to_end cannot exceed min_players_to_start");
        }
        if seg.stationary_seconds < 0.0 {
            bail!("segmentation.stationary_seconds must be non-negative");
        }

        let iou = self.association.iou_threshold;
        if !(0.0..1.0).contains(&iou) {
            bail!("association.iou_threshold must be in [0, 1), got {}", iou);
        }

        let formation = &self.formation;
        if formation.full_unit_size < formation.min_group_size {
            bail!("formation.full_unit_size cannot be smaller than min_group_size");
        }

        if self.video.segmentation_frame_skip == 0 {
            bail!("video.segmentation_frame_skip must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "segmentation:\n  movement_threshold: 25.0\nvideo:\n  input_dir: clips\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.segmentation.movement_threshold, 25.0);
        assert_eq!(config.segmentation.min_players_to_start, 6);
        assert_eq!(config.segmentation.max_play_duration, 30.0);
        assert_eq!(config.association.iou_threshold, 0.5);
        assert_eq!(config.video.input_dir, "clips");
        assert_eq!(config.video.segmentation_frame_skip, 5);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.segmentation.close_pair_distance, 100.0);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_rejects_inverted_durations() {
        let yaml = "segmentation:\n  min_play_duration: 10.0\n  max_play_duration: 5.0\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_rejects_bad_iou_threshold() {
        let yaml = "association:\n  iou_threshold: 1.5\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_rejects_zero_frame_skip() {
        let yaml = "video:\n  segmentation_frame_skip: 0\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(Config::load("/nonexistent/play_detection/config.yaml").is_err());
    }
}

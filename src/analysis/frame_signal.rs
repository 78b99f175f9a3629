// src/analysis/frame_signal.rs
//
// Per-frame transform from associated objects to the compact signal record
// the play segmenter consumes. Holds no cross-frame state.

use super::formation::{FormationClassifier, PlayerPosition};
use crate::types::{AssociatedObject, AssociationConfig, FormationConfig, FrameSignal};

pub struct FrameSignalExtractor {
    player_label: String,
    ball_label: String,
    min_formation_players: usize,
    formation: FormationClassifier,
}

impl FrameSignalExtractor {
    pub fn new(association: &AssociationConfig, formation: FormationConfig) -> Self {
        Self {
            player_label: association.player_label.clone(),
            ball_label: association.ball_label.clone(),
            min_formation_players: formation.min_players,
            formation: FormationClassifier::new(formation),
        }
    }

    pub fn extract(
        &self,
        frame_number: u64,
        timestamp: f64,
        objects: Vec<AssociatedObject>,
    ) -> FrameSignal {
        let players: Vec<PlayerPosition> = objects
            .iter()
            .filter(|o| o.label == self.player_label)
            .map(|o| {
                let (x, y) = o.center();
                PlayerPosition {
                    x,
                    y,
                    team_color: o.team_color.clone(),
                }
            })
            .collect();
        let player_count = players.len();

        // Multiple ball detections are not deduplicated: first one wins
        let ball_position = objects
            .iter()
            .find(|o| o.label == self.ball_label)
            .map(AssociatedObject::center);

        let formation = if player_count >= self.min_formation_players {
            Some(self.formation.classify(&players))
        } else {
            None
        };

        FrameSignal {
            frame_number,
            timestamp,
            player_count,
            ball_detected: ball_position.is_some(),
            ball_position,
            formation,
            objects,
        }
    }
}

// src/analysis/formation.rs
//
// Coarse per-frame formation labels from player positions and team colours.
//
// Players are grouped by team colour. Each of the two largest groups is split
// into three equal vertical bands (front / mid / back, screen y grows
// downward) and labelled from its band counts.

use crate::color_analysis::UNKNOWN_COLOR;
use crate::types::FormationConfig;
use std::fmt;

pub const UNKNOWN_FORMATION: &str = "unknown formation";

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerPosition {
    pub x: f32,
    pub y: f32,
    pub team_color: Option<String>,
}

impl PlayerPosition {
    pub fn new(x: f32, y: f32, team_color: Option<&str>) -> Self {
        Self {
            x,
            y,
            team_color: team_color.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupFormation {
    OffensiveLine,
    FourThreeDefense,
    PreventDefense,
    Balanced,
    /// Too few players for a named formation; carries the head count
    Players(usize),
}

impl fmt::Display for GroupFormation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OffensiveLine => write!(f, "offensive line"),
            Self::FourThreeDefense => write!(f, "4-3 defense"),
            Self::PreventDefense => write!(f, "prevent defense"),
            Self::Balanced => write!(f, "balanced"),
            Self::Players(n) => write!(f, "{} players", n),
        }
    }
}

/// Member counts per vertical band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BandCounts {
    pub front: usize,
    pub mid: usize,
    pub back: usize,
}

impl BandCounts {
    /// Split the vertical span of `ys` into three equal bands.
    pub fn from_positions(ys: &[f32]) -> Self {
        if ys.is_empty() {
            return Self::default();
        }
        let min_y = ys.iter().copied().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let third = if max_y > min_y {
            (max_y - min_y) / 3.0
        } else {
            1.0
        };

        let mut counts = Self::default();
        for &y in ys {
            if y < min_y + third {
                counts.front += 1;
            } else if y < min_y + 2.0 * third {
                counts.mid += 1;
            } else {
                counts.back += 1;
            }
        }
        counts
    }
}

pub struct FormationClassifier {
    config: FormationConfig,
}

impl FormationClassifier {
    pub fn new(config: FormationConfig) -> Self {
        Self { config }
    }

    /// Comma-joined `"<colour>: <formation>"` labels, or `"unknown formation"`.
    pub fn classify(&self, players: &[PlayerPosition]) -> String {
        // Colour groups in order of first appearance
        let mut groups: Vec<(&str, Vec<f32>)> = Vec::new();
        for player in players {
            let color = player.team_color.as_deref().unwrap_or(UNKNOWN_COLOR);
            match groups.iter_mut().find(|(c, _)| *c == color) {
                Some((_, ys)) => ys.push(player.y),
                None => groups.push((color, vec![player.y])),
            }
        }

        let mut candidates: Vec<&(&str, Vec<f32>)> =
            groups.iter().filter(|(c, _)| *c != UNKNOWN_COLOR).collect();
        if candidates.len() < 2 {
            if let Some(unknown) = groups.iter().find(|(c, _)| *c == UNKNOWN_COLOR) {
                candidates.push(unknown);
            }
        }
        if candidates.len() < 2 {
            return UNKNOWN_FORMATION.to_string();
        }

        // Stable: equal-size groups keep first-appearance order
        candidates.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

        let labels: Vec<String> = candidates
            .iter()
            .take(2)
            .filter(|(_, ys)| ys.len() >= self.config.min_group_size)
            .map(|(color, ys)| format!("{}: {}", color, self.classify_group(ys)))
            .collect();

        if labels.is_empty() {
            UNKNOWN_FORMATION.to_string()
        } else {
            labels.join(", ")
        }
    }

    pub fn classify_group(&self, ys: &[f32]) -> GroupFormation {
        let cfg = &self.config;
        if ys.len() < cfg.full_unit_size {
            return GroupFormation::Players(ys.len());
        }

        let mut sorted = ys.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let bands = BandCounts::from_positions(&sorted);

        if bands.front >= cfg.offensive_line_front {
            GroupFormation::OffensiveLine
        } else if bands.front >= cfg.defense_front && bands.mid >= cfg.defense_mid {
            GroupFormation::FourThreeDefense
        } else if bands.back >= cfg.prevent_back {
            GroupFormation::PreventDefense
        } else {
            GroupFormation::Balanced
        }
    }
}

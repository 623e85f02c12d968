use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::betting::Street;
use crate::error::{EngineError, EngineResult};
use crate::ranges::Position;

// ---------------------------------------------------------------------------
// Opponent profiles
// ---------------------------------------------------------------------------

/// Statistical description of an opponent archetype. Percentages are on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerProfile {
    pub vpip: f64,
    pub aggression: f64,
    pub fold_flop: f64,
    pub fold_turn: f64,
    pub fold_river: f64,
    pub barrel_turn: f64,
    pub barrel_river: f64,
}

impl Default for PlayerProfile {
    fn default() -> Self {
        PlayerProfile {
            vpip: 25.0,
            aggression: 2.5,
            fold_flop: 40.0,
            fold_turn: 50.0,
            fold_river: 60.0,
            barrel_turn: 45.0,
            barrel_river: 30.0,
        }
    }
}

impl PlayerProfile {
    pub fn validate(&self) -> EngineResult<()> {
        let pct_fields = [
            ("vpip", self.vpip),
            ("fold_flop", self.fold_flop),
            ("fold_turn", self.fold_turn),
            ("fold_river", self.fold_river),
            ("barrel_turn", self.barrel_turn),
            ("barrel_river", self.barrel_river),
        ];
        for (name, value) in pct_fields {
            if !(0.0..=100.0).contains(&value) {
                return Err(EngineError::InvalidValue(format!(
                    "{} must be between 0 and 100, got {}",
                    name, value
                )));
            }
        }
        if !self.aggression.is_finite() || self.aggression < 0.0 {
            return Err(EngineError::InvalidValue(format!(
                "aggression must be a non-negative number, got {}",
                self.aggression
            )));
        }
        Ok(())
    }

    /// Rolls whether this player voluntarily enters the pot.
    pub fn participates<R: Rng>(&self, rng: &mut R) -> bool {
        rng.gen::<f64>() < self.vpip / 100.0
    }

    /// Aggression on the scale consumed by the decision models.
    pub fn aggression_factor(&self) -> f64 {
        self.aggression / 100.0
    }

    /// Fold probability for a postflop street as a fraction. Preflop has none.
    pub fn fold_rate(&self, street: Street) -> f64 {
        let pct = match street {
            Street::Preflop => 0.0,
            Street::Flop => self.fold_flop,
            Street::Turn => self.fold_turn,
            Street::River => self.fold_river,
        };
        pct / 100.0
    }
}

impl fmt::Display for PlayerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VPIP {:.0} | AGG {:.1} | fold {:.0}/{:.0}/{:.0} | barrel {:.0}/{:.0}",
            self.vpip,
            self.aggression,
            self.fold_flop,
            self.fold_turn,
            self.fold_river,
            self.barrel_turn,
            self.barrel_river,
        )
    }
}

/// A named opponent whose profile depends on the seat being simulated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionalPlayer {
    pub name: String,
    #[serde(default)]
    pub profiles: HashMap<Position, PlayerProfile>,
    #[serde(default)]
    pub default_profile: PlayerProfile,
}

impl PositionalPlayer {
    pub fn new(name: impl Into<String>, profiles: HashMap<Position, PlayerProfile>) -> Self {
        PositionalPlayer {
            name: name.into(),
            profiles,
            default_profile: PlayerProfile::default(),
        }
    }

    /// Same profile in every position.
    pub fn uniform(name: impl Into<String>, profile: PlayerProfile) -> Self {
        PositionalPlayer {
            name: name.into(),
            profiles: HashMap::new(),
            default_profile: profile,
        }
    }

    pub fn profile_for(&self, position: Position) -> &PlayerProfile {
        self.profiles
            .get(&position)
            .unwrap_or(&self.default_profile)
    }

    pub fn validate(&self) -> EngineResult<()> {
        self.default_profile.validate()?;
        self.profiles.values().try_for_each(PlayerProfile::validate)
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Player: {}", self.name)];
        let mut seats: Vec<_> = self.profiles.iter().collect();
        seats.sort_by_key(|(pos, _)| **pos);
        for (pos, profile) in seats {
            lines.push(format!("  {}: {}", pos, profile));
        }
        lines.push(format!("  default: {}", self.default_profile));
        lines.join("\n")
    }
}

#[derive(Debug, Deserialize)]
struct RosterFile {
    opponents: Vec<PositionalPlayer>,
}

/// Loads `{ "opponents": [ ... ] }` from a JSON file.
pub fn load_roster(path: &Path) -> EngineResult<Vec<PositionalPlayer>> {
    let text = std::fs::read_to_string(path)?;
    let roster: RosterFile = serde_json::from_str(&text)?;
    for player in &roster.opponents {
        player.validate()?;
    }
    Ok(roster.opponents)
}

pub fn tight_profile() -> PlayerProfile {
    PlayerProfile {
        vpip: 18.0,
        aggression: 2.0,
        fold_flop: 55.0,
        fold_turn: 65.0,
        fold_river: 70.0,
        barrel_turn: 30.0,
        barrel_river: 20.0,
    }
}

pub fn loose_profile() -> PlayerProfile {
    PlayerProfile {
        vpip: 35.0,
        aggression: 3.5,
        fold_flop: 30.0,
        fold_turn: 40.0,
        fold_river: 45.0,
        barrel_turn: 55.0,
        barrel_river: 40.0,
    }
}

/// Six archetypes, enough to fill every opponent count the run controller asks for.
pub fn default_roster() -> Vec<PositionalPlayer> {
    let late_seats = |profile: PlayerProfile| -> HashMap<Position, PlayerProfile> {
        [Position::Btn, Position::Sb, Position::Bb]
            .into_iter()
            .map(|pos| (pos, profile.clone()))
            .collect()
    };

    vec![
        PositionalPlayer::new("Villain-Tight", late_seats(tight_profile())),
        PositionalPlayer::new("Villain-Loose", late_seats(loose_profile())),
        PositionalPlayer::uniform("Reg", PlayerProfile::default()),
        PositionalPlayer::uniform(
            "Nit",
            PlayerProfile {
                vpip: 12.0,
                aggression: 1.5,
                fold_flop: 60.0,
                fold_turn: 70.0,
                fold_river: 75.0,
                barrel_turn: 25.0,
                barrel_river: 15.0,
            },
        ),
        PositionalPlayer::uniform(
            "Station",
            PlayerProfile {
                vpip: 45.0,
                aggression: 1.0,
                fold_flop: 20.0,
                fold_turn: 25.0,
                fold_river: 30.0,
                barrel_turn: 20.0,
                barrel_river: 10.0,
            },
        ),
        PositionalPlayer::uniform(
            "Maniac",
            PlayerProfile {
                vpip: 60.0,
                aggression: 5.0,
                fold_flop: 25.0,
                fold_turn: 30.0,
                fold_river: 35.0,
                barrel_turn: 70.0,
                barrel_river: 55.0,
            },
        ),
    ]
}

// ---------------------------------------------------------------------------
// Hero strategy
// ---------------------------------------------------------------------------

/// Scalars applied to hero's own bet sizing, river bluffing and river bluff-catching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeroStrategy {
    pub aggression: f64,
    pub bluff_freq: f64,
    pub call_down: f64,
}

impl Default for HeroStrategy {
    fn default() -> Self {
        HeroStrategy::BASELINE
    }
}

impl HeroStrategy {
    pub const PASSIVE: HeroStrategy = HeroStrategy {
        aggression: 0.7,
        bluff_freq: 0.6,
        call_down: 1.0,
    };

    pub const BASELINE: HeroStrategy = HeroStrategy {
        aggression: 1.0,
        bluff_freq: 1.0,
        call_down: 1.0,
    };

    pub const AGGRESSIVE: HeroStrategy = HeroStrategy {
        aggression: 1.3,
        bluff_freq: 1.4,
        call_down: 1.0,
    };

    pub fn presets() -> [(&'static str, HeroStrategy); 3] {
        [
            ("PASSIVE", HeroStrategy::PASSIVE),
            ("BASELINE", HeroStrategy::BASELINE),
            ("AGGRESSIVE", HeroStrategy::AGGRESSIVE),
        ]
    }
}

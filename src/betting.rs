use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::board::BoardTexture;
use crate::cards::Card;
use crate::error::{EngineError, EngineResult};
use crate::hand_evaluator::Evaluator;

// ---------------------------------------------------------------------------
// Streets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
}

pub const POSTFLOP_STREETS: [Street; 3] = [Street::Flop, Street::Turn, Street::River];

impl Street {
    pub fn as_str(&self) -> &'static str {
        match self {
            Street::Preflop => "preflop",
            Street::Flop => "flop",
            Street::Turn => "turn",
            Street::River => "river",
        }
    }

    /// Community cards visible once this street is dealt.
    pub fn board_len(&self) -> usize {
        match self {
            Street::Preflop => 0,
            Street::Flop => 3,
            Street::Turn => 4,
            Street::River => 5,
        }
    }
}

impl fmt::Display for Street {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Street {
    type Err = EngineError;

    fn from_str(s: &str) -> EngineResult<Street> {
        match s.trim().to_lowercase().as_str() {
            "preflop" => Ok(Street::Preflop),
            "flop" => Ok(Street::Flop),
            "turn" => Ok(Street::Turn),
            "river" => Ok(Street::River),
            _ => Err(EngineError::UnknownStreet(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Hand strength buckets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandStrength {
    Air = 0,
    WeakPair = 1,
    TopPair = 2,
    TwoPairPlus = 3,
}

impl HandStrength {
    /// Buckets an evaluator rank (lower is stronger).
    pub fn from_rank(rank: u16) -> HandStrength {
        match rank {
            0..=1600 => HandStrength::TwoPairPlus,
            1601..=3000 => HandStrength::TopPair,
            3001..=4500 => HandStrength::WeakPair,
            _ => HandStrength::Air,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for HandStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandStrength::Air => "air",
            HandStrength::WeakPair => "weak pair",
            HandStrength::TopPair => "top pair",
            HandStrength::TwoPairPlus => "two pair+",
        };
        write!(f, "{}", name)
    }
}

pub fn hand_strength<E: Evaluator>(
    evaluator: &E,
    hand: &[Card],
    board: &[Card],
) -> EngineResult<HandStrength> {
    Ok(HandStrength::from_rank(evaluator.evaluate(board, hand)?))
}

// ---------------------------------------------------------------------------
// Pot arithmetic
// ---------------------------------------------------------------------------

/// Break-even call frequency for a bet into `pot`.
pub fn pot_odds(pot: f64, bet: f64) -> f64 {
    bet / (pot + bet).max(1e-6)
}

/// Hero's bet for a street: a fraction of the pot shaped by texture and aggression,
/// clamped to [0.20, 0.90] of the pot and to what hero has behind.
pub fn street_bet_size(
    street: Street,
    pot: f64,
    texture: BoardTexture,
    aggression: f64,
    stack: f64,
) -> EngineResult<f64> {
    let mut fraction = match street {
        Street::Flop => 0.33,
        Street::Turn => 0.50,
        Street::River => 0.66,
        Street::Preflop => return Err(EngineError::UnknownStreet(street.to_string())),
    };

    fraction += match texture {
        BoardTexture::Wet => 0.10,
        BoardTexture::Dry => -0.05,
        BoardTexture::Semi => 0.0,
    };

    fraction *= 0.8 + aggression * 0.4;
    let fraction = fraction.clamp(0.2, 0.9);

    Ok((pot * fraction).min(stack.max(0.0)))
}

// ---------------------------------------------------------------------------
// Opponent call oracle
// ---------------------------------------------------------------------------

/// Everything an opponent sees when facing hero's bet.
#[derive(Debug, Clone, Copy)]
pub struct CallSpot {
    pub street: Street,
    /// Pot including the bet being faced.
    pub pot: f64,
    pub bet: f64,
    pub texture: BoardTexture,
    pub pressure: u32,
    pub aggression: f64,
}

/// Estimated chance an opponent in `strength` thinks it is ahead at `spot`.
pub fn estimated_win_prob(strength: HandStrength, spot: &CallSpot) -> EngineResult<f64> {
    let mut win_prob = match strength {
        HandStrength::TwoPairPlus => 0.85,
        HandStrength::TopPair => 0.55,
        HandStrength::WeakPair => 0.32,
        HandStrength::Air => 0.08,
    };

    win_prob += spot.aggression * 0.12;
    win_prob -= spot.pressure as f64 * 0.06;

    win_prob += match spot.texture {
        BoardTexture::Wet => 0.06,
        BoardTexture::Dry => -0.03,
        BoardTexture::Semi => 0.0,
    };

    win_prob += match spot.street {
        Street::Flop => 0.05,
        Street::Turn => 0.0,
        Street::River => -0.08,
        Street::Preflop => return Err(EngineError::UnknownStreet(spot.street.to_string())),
    };

    Ok(win_prob.clamp(0.02, 0.95))
}

/// Whether an opponent holding `hand` calls hero's bet.
///
/// Air on the flop floats 10% of the time regardless of price; otherwise the opponent
/// calls when its estimated win probability covers the pot odds.
pub fn opponent_calls<E: Evaluator, R: Rng>(
    evaluator: &E,
    hand: &[Card],
    board: &[Card],
    spot: &CallSpot,
    rng: &mut R,
) -> EngineResult<bool> {
    let strength = hand_strength(evaluator, hand, board)?;
    let win_prob = estimated_win_prob(strength, spot)?;

    if strength == HandStrength::Air && spot.street == Street::Flop && rng.gen::<f64>() < 0.10 {
        return Ok(true);
    }

    Ok(win_prob >= pot_odds(spot.pot, spot.bet))
}

// ---------------------------------------------------------------------------
// Hero continuation oracle
// ---------------------------------------------------------------------------

/// Fold rate hero needs from the table before continuing with air.
pub fn required_fold_rate(
    street: Street,
    pressure: u32,
    texture: BoardTexture,
) -> EngineResult<f64> {
    let base = match street {
        Street::Flop => 0.25,
        Street::Turn => 0.35,
        Street::River => 0.50,
        Street::Preflop => return Err(EngineError::UnknownStreet(street.to_string())),
    };
    let texture_penalty = match texture {
        BoardTexture::Wet => 0.15,
        BoardTexture::Semi => 0.07,
        BoardTexture::Dry => 0.0,
    };
    Ok(base + pressure as f64 * 0.10 + texture_penalty)
}

pub fn hero_should_continue(
    street: Street,
    pressure: u32,
    opponent_fold_rate: f64,
    texture: BoardTexture,
) -> EngineResult<bool> {
    Ok(opponent_fold_rate >= required_fold_rate(street, pressure, texture)?)
}

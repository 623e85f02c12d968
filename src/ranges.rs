use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cards::{Card, Rank, ALL_SUITS};
use crate::error::{EngineError, EngineResult};
use crate::profile::PlayerProfile;

pub type Combo = (Card, Card);

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    Utg,
    Mp,
    Co,
    Btn,
    Sb,
    Bb,
}

pub const ALL_POSITIONS: [Position; 6] = [
    Position::Utg,
    Position::Mp,
    Position::Co,
    Position::Btn,
    Position::Sb,
    Position::Bb,
];

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Utg => "UTG",
            Position::Mp => "MP",
            Position::Co => "CO",
            Position::Btn => "BTN",
            Position::Sb => "SB",
            Position::Bb => "BB",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Position {
    type Err = EngineError;

    fn from_str(s: &str) -> EngineResult<Position> {
        match s.trim().to_uppercase().as_str() {
            "UTG" => Ok(Position::Utg),
            "MP" => Ok(Position::Mp),
            "CO" => Ok(Position::Co),
            "BTN" => Ok(Position::Btn),
            "SB" => Ok(Position::Sb),
            "BB" => Ok(Position::Bb),
            _ => Err(EngineError::UnknownPosition(s.to_string())),
        }
    }
}

// Strongest first; a narrower range keeps a prefix of its position's list.
const UTG_ORDER: &[&str] = &[
    "AA", "KK", "QQ", "JJ", "TT", "AKs", "AQs", "AJs", "KQs", "AKo", "99", "88", "AQo",
];

const MP_ORDER: &[&str] = &[
    "AA", "KK", "QQ", "JJ", "TT", "99", "88", "AKs", "AQs", "AJs", "ATs", "KQs", "AKo", "AQo",
    "AJo", "KQo", "77", "66",
];

const CO_ORDER: &[&str] = &[
    "AA", "KK", "QQ", "JJ", "TT", "99", "88", "77", "66", "55", "AKs", "AQs", "AJs", "ATs", "A9s",
    "KQs", "KJs", "QJs", "AKo", "AQo", "AJo", "KQo", "QJo",
];

const BTN_ORDER: &[&str] = &[
    "AA", "KK", "QQ", "JJ", "TT", "99", "88", "77", "66", "55", "44", "33", "22", "AKs", "AQs",
    "AJs", "ATs", "A9s", "A8s", "A7s", "KQs", "KJs", "KTs", "QJs", "QTs", "JTs", "T9s", "98s",
    "AKo", "AQo", "AJo", "ATo", "KQo", "KJo", "QJo", "JTo",
];

const SB_ORDER: &[&str] = &[
    "AA", "KK", "QQ", "JJ", "TT", "99", "88", "77", "66", "55", "44", "AKs", "AQs", "AJs", "ATs",
    "A9s", "KQs", "KJs", "QJs", "AKo", "AQo", "AJo", "KQo", "QJo", "JTo",
];

const BB_ORDER: &[&str] = &[
    "AA", "KK", "QQ", "JJ", "TT", "99", "88", "77", "66", "55", "44", "33", "22", "AKs", "AQs",
    "AJs", "ATs", "A9s", "A8s", "A7s", "KQs", "KJs", "KTs", "QJs", "QTs", "JTs", "T9s", "98s",
    "87s", "76s", "AKo", "AQo", "AJo", "ATo", "KQo", "KJo", "QJo", "JTo",
];

pub fn positional_hand_order(position: Position) -> &'static [&'static str] {
    match position {
        Position::Utg => UTG_ORDER,
        Position::Mp => MP_ORDER,
        Position::Co => CO_ORDER,
        Position::Btn => BTN_ORDER,
        Position::Sb => SB_ORDER,
        Position::Bb => BB_ORDER,
    }
}

// ---------------------------------------------------------------------------
// Starting hand labels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    Pair,
    Suited,
    Offsuit,
}

/// A preflop hand class such as `AA`, `AKs` or `AKo`. `high >= low` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StartingHandLabel {
    pub high: Rank,
    pub low: Rank,
    pub kind: LabelKind,
}

impl StartingHandLabel {
    pub fn combo_count(&self) -> usize {
        match self.kind {
            LabelKind::Pair => 6,
            LabelKind::Suited => 4,
            LabelKind::Offsuit => 12,
        }
    }
}

impl FromStr for StartingHandLabel {
    type Err = EngineError;

    fn from_str(s: &str) -> EngineResult<StartingHandLabel> {
        let notation = s.trim();
        let invalid = || EngineError::InvalidHandNotation(notation.to_string());
        let chars: Vec<char> = notation.chars().collect();
        if chars.len() < 2 || chars.len() > 3 {
            return Err(invalid());
        }
        let r1 = Rank::from_char(chars[0]).map_err(|_| invalid())?;
        let r2 = Rank::from_char(chars[1]).map_err(|_| invalid())?;
        let (high, low) = if r1 >= r2 { (r1, r2) } else { (r2, r1) };

        let kind = match (chars.get(2).map(|c| c.to_ascii_lowercase()), high == low) {
            (None, true) => LabelKind::Pair,
            (Some('s'), false) => LabelKind::Suited,
            (Some('o'), false) => LabelKind::Offsuit,
            _ => return Err(invalid()),
        };
        Ok(StartingHandLabel { high, low, kind })
    }
}

impl fmt::Display for StartingHandLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.kind {
            LabelKind::Pair => "",
            LabelKind::Suited => "s",
            LabelKind::Offsuit => "o",
        };
        write!(f, "{}{}{}", self.high.to_char(), self.low.to_char(), suffix)
    }
}

impl TryFrom<String> for StartingHandLabel {
    type Error = EngineError;

    fn try_from(s: String) -> EngineResult<StartingHandLabel> {
        s.parse()
    }
}

impl From<StartingHandLabel> for String {
    fn from(label: StartingHandLabel) -> String {
        label.to_string()
    }
}

/// Every concrete two-card combination of a label, in a fixed suit order.
pub fn expand_label(label: &StartingHandLabel) -> Vec<Combo> {
    let (r1, r2) = (label.high, label.low);
    match label.kind {
        LabelKind::Pair => {
            let mut combos = Vec::with_capacity(6);
            for i in 0..ALL_SUITS.len() {
                for j in (i + 1)..ALL_SUITS.len() {
                    combos.push((Card::new(r1, ALL_SUITS[i]), Card::new(r2, ALL_SUITS[j])));
                }
            }
            combos
        }
        LabelKind::Suited => ALL_SUITS
            .iter()
            .map(|&s| (Card::new(r1, s), Card::new(r2, s)))
            .collect(),
        LabelKind::Offsuit => {
            let mut combos = Vec::with_capacity(12);
            for &s1 in &ALL_SUITS {
                for &s2 in &ALL_SUITS {
                    if s1 != s2 {
                        combos.push((Card::new(r1, s1), Card::new(r2, s2)));
                    }
                }
            }
            combos
        }
    }
}

pub fn filter_dead(combos: &[Combo], dead: &HashSet<Card>) -> Vec<Combo> {
    combos
        .iter()
        .filter(|(c1, c2)| !dead.contains(c1) && !dead.contains(c2))
        .copied()
        .collect()
}

/// Memoises label expansion. Owned by the run controller and lent to each trial.
#[derive(Debug, Default)]
pub struct ComboCache {
    combos: HashMap<StartingHandLabel, Vec<Combo>>,
}

impl ComboCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn combos(&mut self, label: &StartingHandLabel) -> &[Combo] {
        self.combos
            .entry(*label)
            .or_insert_with(|| expand_label(label))
    }

    pub fn len(&self) -> usize {
        self.combos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combos.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Weighted ranges
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct WeightedRange {
    entries: Vec<(StartingHandLabel, f64)>,
}

impl WeightedRange {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StartingHandLabel, f64)> + '_ {
        self.entries.iter().map(|(label, w)| (label, *w))
    }

    pub fn labels(&self) -> Vec<StartingHandLabel> {
        self.entries.iter().map(|(label, _)| *label).collect()
    }

    pub fn weight(&self, label: &StartingHandLabel) -> Option<f64> {
        self.iter().find(|(l, _)| *l == label).map(|(_, w)| w)
    }
}

/// Range of `profile` at `position`: the strongest `max(1, len * vpip / 100)` labels of the
/// position's order, each weighted by a linear 1.0 -> 0.5 decay times a [0.9, 1.1] jitter.
pub fn build_weighted_range<R: Rng>(
    profile: &PlayerProfile,
    position: Position,
    rng: &mut R,
) -> EngineResult<WeightedRange> {
    let ordered = positional_hand_order(position);
    let participation = profile.vpip.clamp(0.0, 100.0);
    let take_n = ((ordered.len() as f64 * participation / 100.0) as usize).clamp(1, ordered.len());

    let mut range = WeightedRange::default();
    for (i, notation) in ordered[..take_n].iter().enumerate() {
        let label: StartingHandLabel = notation.parse()?;
        let strength_factor = 1.0 - (i as f64 / take_n as f64) * 0.5;
        let noise = rng.gen_range(0.9..=1.1);
        range.entries.push((label, strength_factor * noise));
    }
    Ok(range)
}

/// Draws one live combination from the range, weighting each combination by its label's
/// weight. `None` when every combination is blocked by a dead card.
pub fn sample_combo<R: Rng>(
    range: &WeightedRange,
    dead: &HashSet<Card>,
    cache: &mut ComboCache,
    rng: &mut R,
) -> Option<Combo> {
    let mut combos: Vec<Combo> = Vec::new();
    let mut weights: Vec<f64> = Vec::new();

    for (label, weight) in range.iter() {
        let live = filter_dead(cache.combos(label), dead);
        weights.extend(std::iter::repeat(weight).take(live.len()));
        combos.extend(live);
    }

    weighted_choice(&combos, &weights, rng).copied()
}

pub fn weighted_choice<'a, T, R: Rng>(
    items: &'a [T],
    weights: &[f64],
    rng: &mut R,
) -> Option<&'a T> {
    if items.is_empty() || items.len() != weights.len() {
        return None;
    }
    let dist = WeightedIndex::new(weights).ok()?;
    items.get(dist.sample(rng))
}

pub fn total_combos(labels: &[StartingHandLabel]) -> usize {
    labels.iter().map(|l| l.combo_count()).sum()
}

pub fn range_pct(labels: &[StartingHandLabel]) -> f64 {
    total_combos(labels) as f64 / 1326.0 * 100.0
}

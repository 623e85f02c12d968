use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use itertools::Itertools;
use once_cell::sync::Lazy;

use crate::cards::Card;
use crate::error::{EngineError, EngineResult};

/// Number of distinct 5-card hand classes; also the weakest possible rank.
pub const DISTINCT_HANDS: u16 = 7462;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HandCategory {
    HighCard = 0,
    OnePair = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    FourOfAKind = 7,
    StraightFlush = 8,
    RoyalFlush = 9,
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandCategory::HighCard => write!(f, "High Card"),
            HandCategory::OnePair => write!(f, "One Pair"),
            HandCategory::TwoPair => write!(f, "Two Pair"),
            HandCategory::ThreeOfAKind => write!(f, "Three of a Kind"),
            HandCategory::Straight => write!(f, "Straight"),
            HandCategory::Flush => write!(f, "Flush"),
            HandCategory::FullHouse => write!(f, "Full House"),
            HandCategory::FourOfAKind => write!(f, "Four of a Kind"),
            HandCategory::StraightFlush => write!(f, "Straight Flush"),
            HandCategory::RoyalFlush => write!(f, "Royal Flush"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HandResult {
    pub category: HandCategory,
    pub kickers: Vec<u8>,
}

impl HandResult {
    pub fn new(category: HandCategory, kickers: Vec<u8>) -> Self {
        HandResult { category, kickers }
    }

    /// Position on the 1..=7462 scale, 1 being a royal flush.
    pub fn strength_rank(&self) -> EngineResult<u16> {
        let category = match self.category {
            HandCategory::RoyalFlush => HandCategory::StraightFlush,
            other => other,
        };
        RANK_TABLE
            .get(&(category, self.kickers.clone()))
            .copied()
            .ok_or_else(|| EngineError::UnrankedHand(format!("{} {:?}", self.category, self.kickers)))
    }
}

impl fmt::Display for HandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.category)
    }
}

impl PartialEq for HandResult {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HandResult {}

impl PartialOrd for HandResult {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HandResult {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.category.cmp(&other.category) {
            Ordering::Equal => self.kickers.cmp(&other.kickers),
            ord => ord,
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluator boundary
// ---------------------------------------------------------------------------

/// Ranks a two-card hand on a board. Lower values are stronger hands.
pub trait Evaluator {
    fn evaluate(&self, board: &[Card], hand: &[Card]) -> EngineResult<u16>;
}

/// Best-five-of-N evaluator projecting onto the 1..=7462 distinct-hand scale.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankEvaluator;

impl Evaluator for RankEvaluator {
    fn evaluate(&self, board: &[Card], hand: &[Card]) -> EngineResult<u16> {
        evaluate_hand(hand, board)?.strength_rank()
    }
}

// ---------------------------------------------------------------------------
// Rank table
// ---------------------------------------------------------------------------

static RANK_TABLE: Lazy<HashMap<(HandCategory, Vec<u8>), u16>> = Lazy::new(build_rank_table);

fn build_rank_table() -> HashMap<(HandCategory, Vec<u8>), u16> {
    let descending: Vec<u8> = (2..=14u8).rev().collect();
    let mut classes: Vec<(HandCategory, Vec<u8>)> = Vec::with_capacity(DISTINCT_HANDS as usize);

    for high in (5..=14u8).rev() {
        classes.push((HandCategory::StraightFlush, vec![high]));
    }
    for &quad in &descending {
        for &kicker in descending.iter().filter(|&&k| k != quad) {
            classes.push((HandCategory::FourOfAKind, vec![quad, kicker]));
        }
    }
    for &trip in &descending {
        for &pair in descending.iter().filter(|&&p| p != trip) {
            classes.push((HandCategory::FullHouse, vec![trip, pair]));
        }
    }
    for combo in descending.iter().copied().combinations(5) {
        if is_straight(&combo).is_none() {
            classes.push((HandCategory::Flush, combo));
        }
    }
    for high in (5..=14u8).rev() {
        classes.push((HandCategory::Straight, vec![high]));
    }
    for &trip in &descending {
        for kicks in descending.iter().copied().filter(|&k| k != trip).combinations(2) {
            let mut kickers = vec![trip];
            kickers.extend(kicks);
            classes.push((HandCategory::ThreeOfAKind, kickers));
        }
    }
    for pairs in descending.iter().copied().combinations(2) {
        for &kicker in descending.iter().filter(|&&k| !pairs.contains(&k)) {
            classes.push((HandCategory::TwoPair, vec![pairs[0], pairs[1], kicker]));
        }
    }
    for &pair in &descending {
        for kicks in descending.iter().copied().filter(|&k| k != pair).combinations(3) {
            let mut kickers = vec![pair];
            kickers.extend(kicks);
            classes.push((HandCategory::OnePair, kickers));
        }
    }
    for combo in descending.iter().copied().combinations(5) {
        if is_straight(&combo).is_none() {
            classes.push((HandCategory::HighCard, combo));
        }
    }

    classes
        .into_iter()
        .zip(1u16..)
        .collect()
}

// ---------------------------------------------------------------------------
// Five-card evaluation
// ---------------------------------------------------------------------------

fn is_flush(cards: &[Card]) -> bool {
    cards.windows(2).all(|w| w[0].suit == w[1].suit)
}

fn is_straight(values: &[u8]) -> Option<u8> {
    let unique: Vec<u8> = values
        .iter()
        .copied()
        .collect::<BTreeSet<u8>>()
        .into_iter()
        .rev()
        .collect();

    if unique.len() != 5 {
        return None;
    }
    if unique[0] - unique[4] == 4 {
        return Some(unique[0]);
    }
    // Wheel: A-5-4-3-2
    if unique == [14, 5, 4, 3, 2] {
        return Some(5);
    }
    None
}

fn evaluate_five(cards: &[Card; 5]) -> HandResult {
    let mut values: Vec<u8> = cards.iter().map(|c| c.value()).collect();
    values.sort_unstable_by(|a, b| b.cmp(a));

    let flush = is_flush(cards);
    let straight_high = is_straight(&values);

    let mut counts = [0u8; 15];
    for &v in &values {
        counts[v as usize] += 1;
    }

    if let (true, Some(high)) = (flush, straight_high) {
        if high == 14 {
            return HandResult::new(HandCategory::RoyalFlush, vec![14]);
        }
        return HandResult::new(HandCategory::StraightFlush, vec![high]);
    }

    // (count, value) sorted by count desc, then value desc
    let mut freq: Vec<(u8, u8)> = (2..=14u8)
        .rev()
        .filter(|&v| counts[v as usize] > 0)
        .map(|v| (counts[v as usize], v))
        .collect();
    freq.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));

    let kickers_without = |excluded: &[u8]| -> Vec<u8> {
        values
            .iter()
            .copied()
            .filter(|v| !excluded.contains(v))
            .collect()
    };

    if freq[0].0 == 4 {
        let quad = freq[0].1;
        let mut kickers = vec![quad];
        kickers.extend(kickers_without(&[quad]));
        return HandResult::new(HandCategory::FourOfAKind, kickers);
    }

    if freq[0].0 == 3 && freq[1].0 == 2 {
        return HandResult::new(HandCategory::FullHouse, vec![freq[0].1, freq[1].1]);
    }

    if flush {
        return HandResult::new(HandCategory::Flush, values.clone());
    }

    if let Some(high) = straight_high {
        return HandResult::new(HandCategory::Straight, vec![high]);
    }

    if freq[0].0 == 3 {
        let trip = freq[0].1;
        let mut kickers = vec![trip];
        kickers.extend(kickers_without(&[trip]));
        return HandResult::new(HandCategory::ThreeOfAKind, kickers);
    }

    let pairs: Vec<u8> = freq.iter().filter(|f| f.0 == 2).map(|f| f.1).collect();

    if pairs.len() == 2 {
        let mut kickers = pairs.clone();
        kickers.extend(kickers_without(&pairs));
        return HandResult::new(HandCategory::TwoPair, kickers);
    }

    if pairs.len() == 1 {
        let mut kickers = vec![pairs[0]];
        kickers.extend(kickers_without(&pairs));
        return HandResult::new(HandCategory::OnePair, kickers);
    }

    HandResult::new(HandCategory::HighCard, values)
}

/// Best five-card hand out of hole cards plus board (5 to 7 cards total).
pub fn evaluate_hand(hole_cards: &[Card], board: &[Card]) -> EngineResult<HandResult> {
    let mut all_cards: Vec<Card> = Vec::with_capacity(hole_cards.len() + board.len());
    all_cards.extend_from_slice(hole_cards);
    all_cards.extend_from_slice(board);

    if all_cards.len() < 5 {
        return Err(EngineError::NotEnoughCards {
            need: 5,
            got: all_cards.len(),
        });
    }

    all_cards
        .iter()
        .combinations(5)
        .map(|combo| evaluate_five(&[*combo[0], *combo[1], *combo[2], *combo[3], *combo[4]]))
        .max()
        .ok_or(EngineError::NotEnoughCards { need: 5, got: 0 })
}

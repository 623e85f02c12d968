use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cards::{Card, Suit};
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardTexture {
    Dry,
    Semi,
    Wet,
}

impl BoardTexture {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardTexture::Dry => "dry",
            BoardTexture::Semi => "semi",
            BoardTexture::Wet => "wet",
        }
    }
}

impl fmt::Display for BoardTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BoardTexture {
    type Err = EngineError;

    fn from_str(s: &str) -> EngineResult<BoardTexture> {
        match s.trim().to_lowercase().as_str() {
            "dry" => Ok(BoardTexture::Dry),
            "semi" => Ok(BoardTexture::Semi),
            "wet" => Ok(BoardTexture::Wet),
            _ => Err(EngineError::UnknownTexture(s.to_string())),
        }
    }
}

fn max_suit_count(board: &[Card]) -> usize {
    let mut suit_counts: HashMap<Suit, usize> = HashMap::new();
    for card in board {
        *suit_counts.entry(card.suit).or_insert(0) += 1;
    }
    suit_counts.values().copied().max().unwrap_or(0)
}

fn rank_span(board: &[Card]) -> u8 {
    let values = board.iter().map(|c| c.value());
    match (values.clone().max(), values.min()) {
        (Some(hi), Some(lo)) => hi - lo,
        _ => 0,
    }
}

/// Draw density of the revealed cards. Fewer than three cards is always dry.
///
/// Wet: three or more cards of one suit, or every rank within a span of four.
/// Semi: a two-tone board, or a rank span of at most six.
pub fn classify_texture(board: &[Card]) -> BoardTexture {
    if board.len() < 3 {
        return BoardTexture::Dry;
    }

    let max_suit = max_suit_count(board);
    let span = rank_span(board);

    if max_suit >= 3 || span <= 4 {
        BoardTexture::Wet
    } else if max_suit == 2 || span <= 6 {
        BoardTexture::Semi
    } else {
        BoardTexture::Dry
    }
}

/// Short human-readable board description, e.g. `two-tone paired K-high`.
pub fn describe_board(board: &[Card]) -> String {
    if board.is_empty() {
        return "no board".to_string();
    }

    let max_suit = max_suit_count(board);
    let mut parts = Vec::new();
    if max_suit >= 3 {
        parts.push("monotone".to_string());
    } else if max_suit == 2 {
        parts.push("two-tone".to_string());
    } else {
        parts.push("rainbow".to_string());
    }

    let mut rank_counts: HashMap<u8, usize> = HashMap::new();
    for card in board {
        *rank_counts.entry(card.value()).or_insert(0) += 1;
    }
    if rank_counts.values().any(|&n| n >= 2) {
        parts.push("paired".to_string());
    }

    if let Some(high) = board.iter().max_by_key(|c| c.rank) {
        parts.push(format!("{}-high", high.rank.to_char()));
    }
    parts.push(format!("({})", classify_texture(board)));
    parts.join(" ")
}

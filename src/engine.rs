//! Single-hand simulation: preflop entry, three postflop betting rounds, and either an
//! early finish or a showdown.
//!
//! Chips are counted in big blinds. Hero always posts the big blind and always leads
//! the betting on every postflop street.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::betting::{
    hand_strength, hero_should_continue, opponent_calls, street_bet_size, CallSpot, HandStrength,
    Street,
};
use crate::board::classify_texture;
use crate::cards::{assert_unique_cards, Card, Deck};
use crate::error::{EngineError, EngineResult};
use crate::hand_evaluator::Evaluator;
use crate::profile::{HeroStrategy, PlayerProfile, PositionalPlayer};
use crate::ranges::{build_weighted_range, sample_combo, ComboCache, Position};

pub const SMALL_BLIND: f64 = 0.5;
pub const BIG_BLIND: f64 = 1.0;
pub const STARTING_STACK: f64 = 100.0;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialOutcome {
    Win,
    Loss,
    Tie,
    WinNoShowdown,
    LossNoShowdown,
}

impl TrialOutcome {
    pub fn is_showdown(self) -> bool {
        matches!(self, TrialOutcome::Win | TrialOutcome::Loss | TrialOutcome::Tie)
    }
}

impl fmt::Display for TrialOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrialOutcome::Win => "win",
            TrialOutcome::Loss => "loss",
            TrialOutcome::Tie => "tie",
            TrialOutcome::WinNoShowdown => "win_noshowdown",
            TrialOutcome::LossNoShowdown => "loss_noshowdown",
        };
        write!(f, "{}", s)
    }
}

/// Result of one simulated hand. `ended_on` is `None` for showdowns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandOutcome {
    pub outcome: TrialOutcome,
    pub ended_on: Option<Street>,
    pub net_bb: f64,
}

/// Compares hero against every remaining opponent. Lower ranks are stronger.
pub fn resolve_showdown(
    hero_rank: u16,
    opponent_ranks: &[u16],
    pot: f64,
    hero_invested: f64,
) -> HandOutcome {
    let mut tie = false;
    for &rank in opponent_ranks {
        match rank.cmp(&hero_rank) {
            Ordering::Less => {
                return HandOutcome {
                    outcome: TrialOutcome::Loss,
                    ended_on: None,
                    net_bb: -hero_invested,
                }
            }
            Ordering::Equal => tie = true,
            Ordering::Greater => {}
        }
    }

    let (outcome, net_bb) = if tie {
        (TrialOutcome::Tie, pot / 2.0 - hero_invested)
    } else {
        (TrialOutcome::Win, pot - hero_invested)
    };
    HandOutcome {
        outcome,
        ended_on: None,
        net_bb,
    }
}

// ---------------------------------------------------------------------------
// Configuration of a hand
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationMode {
    /// Full betting model with folds.
    #[default]
    Play,
    /// Every participant reaches showdown; pure equity.
    Showdown,
}

/// One opponent seat dealt into each hand.
#[derive(Debug, Clone, Copy)]
pub struct Seat<'a> {
    pub player: &'a PositionalPlayer,
    pub position: Position,
}

impl<'a> Seat<'a> {
    pub fn profile(&self) -> &'a PlayerProfile {
        self.player.profile_for(self.position)
    }
}

/// Counts how often dealt seats voluntarily entered the pot. A seat skipped for lack of
/// live combinations has not entered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParticipationTracker {
    pub seats: u64,
    pub entered: u64,
}

impl ParticipationTracker {
    pub fn rate(&self) -> f64 {
        if self.seats == 0 {
            0.0
        } else {
            self.entered as f64 / self.seats as f64
        }
    }
}

/// Opponent still contesting the pot in the current hand.
#[derive(Debug, Clone)]
pub struct ActiveOpponent<'a> {
    pub hand: [Card; 2],
    pub profile: &'a PlayerProfile,
    /// Set once the opponent has called on the turn or river.
    pub committed: bool,
}

#[derive(Debug, Clone, Copy)]
struct RiverProfile {
    value_bet_thin: f64,
    bluff_freq: f64,
    call_down: f64,
}

const HEADS_UP_RIVER: RiverProfile = RiverProfile {
    value_bet_thin: 0.55,
    bluff_freq: 0.25,
    call_down: 0.60,
};

const MULTIWAY_RIVER: RiverProfile = RiverProfile {
    value_bet_thin: 0.25,
    bluff_freq: 0.08,
    call_down: 0.30,
};

// ---------------------------------------------------------------------------
// Hand state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    PreflopSelect,
    Flop,
    Turn,
    River,
    Showdown,
}

impl From<Street> for Phase {
    fn from(street: Street) -> Phase {
        match street {
            Street::Preflop => Phase::PreflopSelect,
            Street::Flop => Phase::Flop,
            Street::Turn => Phase::Turn,
            Street::River => Phase::River,
        }
    }
}

#[derive(Debug)]
struct HandState<'a> {
    phase: Phase,
    deck: Deck,
    board: Vec<Card>,
    active: Vec<ActiveOpponent<'a>>,
    pot: f64,
    hero_invested: f64,
    hero_stack: f64,
    pressure: u32,
}

impl<'a> HandState<'a> {
    fn enter(&mut self, phase: Phase) {
        debug_assert!(phase > self.phase, "{:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn deal_to(&mut self, street: Street) -> EngineResult<()> {
        let missing = street.board_len().saturating_sub(self.board.len());
        let dealt = self.deck.deal(missing)?;
        self.board.extend(dealt);
        Ok(())
    }

    fn hero_puts_in(&mut self, amount: f64) {
        self.hero_invested += amount;
        self.hero_stack -= amount;
        self.pot += amount;
    }

    /// Mean fold rate of the remaining opponents for `street`.
    fn table_fold_rate(&self, street: Street) -> f64 {
        let total: f64 = self.active.iter().map(|o| o.profile.fold_rate(street)).sum();
        let rate = total / self.active.len().max(1) as f64;
        if street == Street::Flop {
            rate.clamp(0.25, 0.55)
        } else {
            rate
        }
    }

    fn early_win(&self, street: Street) -> HandOutcome {
        HandOutcome {
            outcome: TrialOutcome::WinNoShowdown,
            ended_on: Some(street),
            net_bb: self.pot - self.hero_invested,
        }
    }

    fn early_loss(&self, street: Street) -> HandOutcome {
        HandOutcome {
            outcome: TrialOutcome::LossNoShowdown,
            ended_on: Some(street),
            net_bb: -self.hero_invested,
        }
    }
}

fn air_continue_rate(street: Street, heads_up: bool) -> f64 {
    match (street, heads_up) {
        (Street::Flop, true) => 0.80,
        (Street::Flop, false) => 0.55,
        (Street::Turn, true) => 0.70,
        _ => 0.45,
    }
}

fn forced_showdown_prob(strength: HandStrength, pot: f64, hero_stack: f64) -> f64 {
    let base = match strength {
        HandStrength::Air => 0.05,
        HandStrength::WeakPair => 0.15,
        HandStrength::TopPair => 0.35,
        HandStrength::TwoPairPlus => 0.65,
    };
    let pot_pressure = pot / (pot + hero_stack).max(1.0);
    (base + 0.4 * pot_pressure).min(0.85)
}

fn opponent_river_bet_prob(
    strength: HandStrength,
    profile: &PlayerProfile,
    heads_up: bool,
    river: &RiverProfile,
) -> f64 {
    let aggression = 0.5 + profile.aggression_factor();
    let strong = strength >= HandStrength::TopPair;
    if heads_up {
        let value = if strong { 0.65 } else { 0.20 };
        value + 0.35 * aggression
    } else {
        let value = if strong { 0.70 } else { 0.0 };
        value + river.bluff_freq * aggression
    }
}

fn hero_river_call_prob(strength: HandStrength) -> f64 {
    match strength {
        HandStrength::TwoPairPlus => 0.75,
        HandStrength::TopPair => 0.55,
        HandStrength::WeakPair => 0.35,
        HandStrength::Air => 0.0,
    }
}

fn heads_up_equity_estimate(strength: HandStrength) -> f64 {
    match strength {
        HandStrength::Air => 0.05,
        HandStrength::WeakPair => 0.25,
        HandStrength::TopPair => 0.55,
        HandStrength::TwoPairPlus => 0.80,
    }
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

pub struct HandSimulator<'a, E: Evaluator> {
    evaluator: &'a E,
    hero: [Card; 2],
    board: &'a [Card],
    seats: &'a [Seat<'a>],
    strategy: HeroStrategy,
    mode: SimulationMode,
}

impl<'a, E: Evaluator> HandSimulator<'a, E> {
    pub fn new(evaluator: &'a E, hero: [Card; 2], board: &'a [Card], seats: &'a [Seat<'a>]) -> Self {
        HandSimulator {
            evaluator,
            hero,
            board,
            seats,
            strategy: HeroStrategy::default(),
            mode: SimulationMode::Play,
        }
    }

    pub fn with_strategy(mut self, strategy: HeroStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_mode(mut self, mode: SimulationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Plays one hand to completion.
    pub fn simulate<R: Rng>(
        &self,
        rng: &mut R,
        cache: &mut ComboCache,
        tracker: &mut ParticipationTracker,
    ) -> EngineResult<HandOutcome> {
        let mut state = self.select_opponents(rng, cache, tracker)?;
        if state.active.is_empty() {
            return Ok(state.early_win(Street::Preflop));
        }
        state.deck.shuffle(rng);

        let outcome = match self.mode {
            SimulationMode::Showdown => {
                state.pot += BIG_BLIND * state.active.len() as f64;
                state.deal_to(Street::River)?;
                self.showdown(&mut state)?
            }
            SimulationMode::Play => self.play(&mut state, rng)?,
        };

        log::debug!(
            "{} ({:?}) net {:+.2}bb",
            outcome.outcome,
            state.phase,
            outcome.net_bb
        );
        Ok(outcome)
    }

    fn play<R: Rng>(&self, state: &mut HandState<'a>, rng: &mut R) -> EngineResult<HandOutcome> {
        for street in [Street::Flop, Street::Turn] {
            if let Some(done) = self.play_street(street, state, rng)? {
                return Ok(done);
            }
        }
        self.play_river(state, rng)
    }

    fn select_opponents<R: Rng>(
        &self,
        rng: &mut R,
        cache: &mut ComboCache,
        tracker: &mut ParticipationTracker,
    ) -> EngineResult<HandState<'a>> {
        assert_unique_cards(&[&self.hero[..], self.board])?;

        let mut deck = Deck::new(&[]);
        let mut dead: HashSet<Card> = HashSet::new();
        for &card in self.hero.iter().chain(self.board) {
            deck.remove(card);
            dead.insert(card);
        }

        let mut active = Vec::new();
        for seat in self.seats {
            let profile = seat.profile();
            tracker.seats += 1;
            if !profile.participates(rng) {
                continue;
            }

            let range = build_weighted_range(profile, seat.position, rng)?;
            let Some((c1, c2)) = sample_combo(&range, &dead, cache, rng) else {
                log::warn!("{} has no live combinations, skipped", seat.player.name);
                continue;
            };
            tracker.entered += 1;
            if !deck.remove(c1) || !deck.remove(c2) {
                return Err(EngineError::DuplicateCards(format!("{} {}", c1, c2)));
            }
            dead.insert(c1);
            dead.insert(c2);
            active.push(ActiveOpponent {
                hand: [c1, c2],
                profile,
                committed: false,
            });
        }

        Ok(HandState {
            phase: Phase::PreflopSelect,
            deck,
            board: self.board.to_vec(),
            active,
            pot: SMALL_BLIND + BIG_BLIND,
            hero_invested: BIG_BLIND,
            hero_stack: STARTING_STACK - BIG_BLIND,
            pressure: 0,
        })
    }

    fn strength_of(&self, hand: &[Card], board: &[Card]) -> EngineResult<HandStrength> {
        hand_strength(self.evaluator, hand, board)
    }

    /// Flop or turn: hero may give up with air, otherwise bets and each opponent calls or folds.
    fn play_street<R: Rng>(
        &self,
        street: Street,
        state: &mut HandState<'a>,
        rng: &mut R,
    ) -> EngineResult<Option<HandOutcome>> {
        state.enter(street.into());
        state.deal_to(street)?;
        state.pressure += 1;

        let texture = classify_texture(&state.board);
        let bet = street_bet_size(
            street,
            state.pot,
            texture,
            self.strategy.aggression,
            state.hero_stack,
        )?;
        let heads_up = state.active.len() == 1;

        if self.strength_of(&self.hero, &state.board)? == HandStrength::Air {
            let fold_rate = state.table_fold_rate(street);
            let continues = rng.gen::<f64>() < air_continue_rate(street, heads_up)
                || hero_should_continue(street, state.pressure, fold_rate, texture)?;
            if !continues {
                return Ok(Some(state.early_loss(street)));
            }
        }

        state.hero_puts_in(bet);

        let mut callers = Vec::with_capacity(state.active.len());
        for opponent in std::mem::take(&mut state.active) {
            let spot = CallSpot {
                street,
                pot: state.pot,
                bet,
                texture,
                pressure: state.pressure,
                aggression: opponent.profile.aggression_factor(),
            };
            if opponent_calls(self.evaluator, &opponent.hand, &state.board, &spot, rng)? {
                state.pot += bet;
                callers.push(ActiveOpponent {
                    committed: opponent.committed || street >= Street::Turn,
                    ..opponent
                });
            }
        }
        state.active = callers;

        if state.active.is_empty() {
            return Ok(Some(state.early_win(street)));
        }
        Ok(None)
    }

    fn play_river<R: Rng>(
        &self,
        state: &mut HandState<'a>,
        rng: &mut R,
    ) -> EngineResult<HandOutcome> {
        state.enter(Phase::River);
        state.deal_to(Street::River)?;

        let hero_strength = self.strength_of(&self.hero, &state.board)?;
        let heads_up = state.active.len() == 1;
        let forced_showdown = heads_up
            && rng.gen::<f64>() < forced_showdown_prob(hero_strength, state.pot, state.hero_stack);
        let river = if heads_up { HEADS_UP_RIVER } else { MULTIWAY_RIVER };

        let texture = classify_texture(&state.board);
        let bet = street_bet_size(
            Street::River,
            state.pot,
            texture,
            self.strategy.aggression,
            state.hero_stack,
        )?;

        let mut bettors = Vec::new();
        for opponent in &state.active {
            let strength = self.strength_of(&opponent.hand, &state.board)?;
            let bet_prob = opponent_river_bet_prob(strength, opponent.profile, heads_up, &river);
            if rng.gen::<f64>() < bet_prob {
                bettors.push(opponent.clone());
            }
        }

        if let Some(first) = bettors.first() {
            let hero_calls = if heads_up {
                let bluff_pressure = (river.bluff_freq * (0.5 + first.profile.aggression_factor())).min(0.25);
                let equity = (heads_up_equity_estimate(hero_strength) + bluff_pressure).min(0.95);
                equity >= bet / (state.pot + bet).max(1.0)
            } else {
                match hero_strength {
                    HandStrength::TopPair | HandStrength::TwoPairPlus => true,
                    HandStrength::WeakPair => {
                        rng.gen::<f64>() < river.call_down * self.strategy.call_down
                    }
                    HandStrength::Air => false,
                }
            };

            if !(hero_calls || forced_showdown) {
                return Ok(state.early_loss(Street::River));
            }

            state.hero_puts_in(bet);
            state.pot += bet * bettors.len() as f64;
            state.active = bettors
                .into_iter()
                .map(|o| ActiveOpponent { committed: true, ..o })
                .collect();
            return self.showdown(state);
        }

        let hero_bets = match hero_strength {
            HandStrength::TwoPairPlus => true,
            HandStrength::TopPair => rng.gen::<f64>() < river.value_bet_thin,
            HandStrength::WeakPair => {
                rng.gen::<f64>() < river.bluff_freq * self.strategy.bluff_freq
            }
            HandStrength::Air => false,
        };

        if hero_bets {
            state.hero_puts_in(bet);
            let call_prob = hero_river_call_prob(hero_strength);

            let mut callers = Vec::new();
            for opponent in std::mem::take(&mut state.active) {
                let strength = self.strength_of(&opponent.hand, &state.board)?;
                if strength >= hero_strength && rng.gen::<f64>() < call_prob {
                    state.pot += bet;
                    callers.push(ActiveOpponent {
                        committed: true,
                        ..opponent
                    });
                }
            }

            if callers.is_empty() {
                return Ok(state.early_win(Street::River));
            }
            state.active = callers;
            return self.showdown(state);
        }

        // Check-through: heads-up goes to showdown, multi-way is conceded to hero.
        if heads_up {
            self.showdown(state)
        } else {
            Ok(state.early_win(Street::River))
        }
    }

    fn showdown(&self, state: &mut HandState<'a>) -> EngineResult<HandOutcome> {
        state.enter(Phase::Showdown);

        let mut groups: Vec<&[Card]> = vec![&self.hero[..], &state.board[..]];
        groups.extend(state.active.iter().map(|o| &o.hand[..]));
        assert_unique_cards(&groups)?;

        let hero_rank = self.evaluator.evaluate(&state.board, &self.hero)?;
        let opponent_ranks = state
            .active
            .iter()
            .map(|o| self.evaluator.evaluate(&state.board, &o.hand))
            .collect::<EngineResult<Vec<u16>>>()?;

        Ok(resolve_showdown(
            hero_rank,
            &opponent_ranks,
            state.pot,
            state.hero_invested,
        ))
    }
}


use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::betting::Street;
use crate::cards::{assert_unique_cards, Card};
use crate::engine::{HandOutcome, HandSimulator, ParticipationTracker, Seat, SimulationMode, TrialOutcome};
use crate::error::{EngineError, EngineResult};
use crate::hand_evaluator::{Evaluator, RankEvaluator};
use crate::profile::{HeroStrategy, PositionalPlayer};
use crate::ranges::{ComboCache, Position};

pub const MAX_OPPONENTS: usize = 6;
pub const DEFAULT_ITERATIONS: usize = 5000;

/// Trials per rayon task in the parallel controller.
pub const PARALLEL_CHUNK: usize = 500;

fn default_iterations() -> usize {
    DEFAULT_ITERATIONS
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub hero_hand: [Card; 2],
    pub position: Position,
    /// Zero, three or four known community cards.
    #[serde(default)]
    pub board: Vec<Card>,
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub opponents: Vec<PositionalPlayer>,
    #[serde(default)]
    pub max_opponents: Option<usize>,
    #[serde(default)]
    pub mode: SimulationMode,
    #[serde(default)]
    pub hero_strategy: HeroStrategy,
}

impl SimulationConfig {
    pub fn new(hero_hand: [Card; 2], position: Position, opponents: Vec<PositionalPlayer>) -> Self {
        SimulationConfig {
            hero_hand,
            position,
            board: Vec::new(),
            iterations: DEFAULT_ITERATIONS,
            seed: None,
            opponents,
            max_opponents: None,
            mode: SimulationMode::Play,
            hero_strategy: HeroStrategy::default(),
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !matches!(self.board.len(), 0 | 3 | 4) {
            return Err(EngineError::InvalidBoardSize(self.board.len()));
        }
        assert_unique_cards(&[&self.hero_hand[..], &self.board[..]])?;
        if self.iterations == 0 {
            return Err(EngineError::InvalidValue(
                "iterations must be at least 1".to_string(),
            ));
        }
        if self.max_opponents == Some(0) {
            return Err(EngineError::InvalidValue(
                "max_opponents must be at least 1".to_string(),
            ));
        }
        self.opponents.iter().try_for_each(PositionalPlayer::validate)
    }

    /// Opponent counts simulated: 1 up to the smallest of six, the roster size and the
    /// requested maximum. Empty for an empty roster.
    pub fn opponent_counts(&self) -> RangeInclusive<usize> {
        let mut max = MAX_OPPONENTS.min(self.opponents.len());
        if let Some(requested) = self.max_opponents {
            max = max.min(requested);
        }
        1..=max
    }

    fn seats(&self, count: usize) -> Vec<Seat<'_>> {
        self.opponents[..count]
            .iter()
            .map(|player| Seat {
                player,
                position: self.position,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Raw counters for one scenario. Partial tallies from parallel chunks are merged in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    pub trials: u64,
    pub showdown_wins: u64,
    pub showdown_losses: u64,
    pub showdown_ties: u64,
    pub non_showdown_wins: u64,
    pub non_showdown_losses: u64,
    pub showdown_net_bb: f64,
    pub non_showdown_net_bb: f64,
    pub early_endings: BTreeMap<Street, u64>,
    pub participation: ParticipationTracker,
}

impl Tally {
    pub fn record(&mut self, hand: &HandOutcome) {
        self.trials += 1;
        match hand.outcome {
            TrialOutcome::Win => self.showdown_wins += 1,
            TrialOutcome::Loss => self.showdown_losses += 1,
            TrialOutcome::Tie => self.showdown_ties += 1,
            TrialOutcome::WinNoShowdown => self.non_showdown_wins += 1,
            TrialOutcome::LossNoShowdown => self.non_showdown_losses += 1,
        }
        if hand.outcome.is_showdown() {
            self.showdown_net_bb += hand.net_bb;
        } else {
            self.non_showdown_net_bb += hand.net_bb;
        }
        if let Some(street) = hand.ended_on {
            *self.early_endings.entry(street).or_insert(0) += 1;
        }
    }

    pub fn merge(mut self, other: Tally) -> Tally {
        self.trials += other.trials;
        self.showdown_wins += other.showdown_wins;
        self.showdown_losses += other.showdown_losses;
        self.showdown_ties += other.showdown_ties;
        self.non_showdown_wins += other.non_showdown_wins;
        self.non_showdown_losses += other.non_showdown_losses;
        self.showdown_net_bb += other.showdown_net_bb;
        self.non_showdown_net_bb += other.non_showdown_net_bb;
        for (street, n) in other.early_endings {
            *self.early_endings.entry(street).or_insert(0) += n;
        }
        self.participation.seats += other.participation.seats;
        self.participation.entered += other.participation.entered;
        self
    }

    pub fn showdown_hands(&self) -> u64 {
        self.showdown_wins + self.showdown_losses + self.showdown_ties
    }

    pub fn finish(&self, opponents: usize) -> SimulationResult {
        let trials = self.trials.max(1) as f64;
        let showdown_hands = self.showdown_hands();

        let equity = if showdown_hands == 0 {
            0.0
        } else {
            (self.showdown_wins as f64 + self.showdown_ties as f64 / 2.0) / showdown_hands as f64
                * 100.0
        };
        let ev_per_hand = (self.showdown_net_bb + self.non_showdown_net_bb) / trials;

        SimulationResult {
            opponents,
            trials: self.trials,
            wins: self.showdown_wins + self.non_showdown_wins,
            losses: self.showdown_losses + self.non_showdown_losses,
            ties: self.showdown_ties,
            showdown_wins: self.showdown_wins,
            showdown_losses: self.showdown_losses,
            showdown_ties: self.showdown_ties,
            showdown_hands,
            non_showdown_wins: self.non_showdown_wins,
            non_showdown_losses: self.non_showdown_losses,
            equity,
            non_showdown_win_pct: self.non_showdown_wins as f64 / trials * 100.0,
            showdown_win_pct: equity,
            showdown_freq_pct: showdown_hands as f64 / trials * 100.0,
            ev_per_hand,
            bb_per_100: ev_per_hand * 100.0,
            showdown_net_bb: self.showdown_net_bb,
            non_showdown_net_bb: self.non_showdown_net_bb,
            participation_pct: self.participation.rate() * 100.0,
            early_endings: self.early_endings.clone(),
        }
    }
}

/// Summary of one opponent-count scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub opponents: usize,
    pub trials: u64,
    pub wins: u64,
    pub losses: u64,
    pub ties: u64,
    pub showdown_wins: u64,
    pub showdown_losses: u64,
    pub showdown_ties: u64,
    pub showdown_hands: u64,
    pub non_showdown_wins: u64,
    pub non_showdown_losses: u64,
    /// Showdown equity in percent, ties counted half.
    pub equity: f64,
    pub non_showdown_win_pct: f64,
    pub showdown_win_pct: f64,
    pub showdown_freq_pct: f64,
    pub ev_per_hand: f64,
    pub bb_per_100: f64,
    pub showdown_net_bb: f64,
    pub non_showdown_net_bb: f64,
    pub participation_pct: f64,
    pub early_endings: BTreeMap<Street, u64>,
}

impl SimulationResult {
    pub fn is_heads_up(&self) -> bool {
        self.opponents == 1
    }
}

impl fmt::Display for SimulationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] Opponents: {} | EV/hand: {:.3} bb | bb/100: {:.2} | SD EQ: {:.2}% | SD freq: {:.2}%",
            if self.is_heads_up() { "HU" } else { "MW" },
            self.opponents,
            self.ev_per_hand,
            self.bb_per_100,
            self.equity,
            self.showdown_freq_pct,
        )
    }
}

// ---------------------------------------------------------------------------
// Run controller
// ---------------------------------------------------------------------------

fn run_trials<E: Evaluator, R: rand::Rng>(
    simulator: &HandSimulator<'_, E>,
    trials: usize,
    rng: &mut R,
) -> EngineResult<Tally> {
    let mut cache = ComboCache::new();
    let mut tally = Tally::default();
    for _ in 0..trials {
        let hand = simulator.simulate(rng, &mut cache, &mut tally.participation)?;
        tally.record(&hand);
    }
    Ok(tally)
}

fn scenario_simulator<'a, E: Evaluator>(
    config: &'a SimulationConfig,
    evaluator: &'a E,
    seats: &'a [Seat<'a>],
) -> HandSimulator<'a, E> {
    HandSimulator::new(evaluator, config.hero_hand, &config.board, seats)
        .with_strategy(config.hero_strategy)
        .with_mode(config.mode)
}

/// Runs every opponent-count scenario on one random stream seeded once per run.
pub fn run_simulation(config: &SimulationConfig) -> EngineResult<Vec<SimulationResult>> {
    run_simulation_with(config, &RankEvaluator)
}

pub fn run_simulation_with<E: Evaluator>(
    config: &SimulationConfig,
    evaluator: &E,
) -> EngineResult<Vec<SimulationResult>> {
    config.validate()?;
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut results = Vec::new();
    for count in config.opponent_counts() {
        let seats = config.seats(count);
        let simulator = scenario_simulator(config, evaluator, &seats);
        let tally = run_trials(&simulator, config.iterations, &mut rng)?;
        let result = tally.finish(count);
        log::info!("{}", result);
        results.push(result);
    }
    Ok(results)
}

fn chunk_seed(base: u64, opponents: usize, chunk: usize) -> u64 {
    base.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(((opponents as u64) << 32) | chunk as u64)
}

/// Parallel variant: trials are split into chunks, each with its own stream derived from
/// the seed, so results are reproducible but differ from [`run_simulation`].
pub fn run_simulation_parallel(config: &SimulationConfig) -> EngineResult<Vec<SimulationResult>> {
    run_simulation_parallel_with(config, &RankEvaluator)
}

pub fn run_simulation_parallel_with<E: Evaluator + Sync>(
    config: &SimulationConfig,
    evaluator: &E,
) -> EngineResult<Vec<SimulationResult>> {
    config.validate()?;
    let base = config.seed.unwrap_or_else(rand::random);

    let mut results = Vec::new();
    for count in config.opponent_counts() {
        let seats = config.seats(count);
        let simulator = scenario_simulator(config, evaluator, &seats);

        let chunks: Vec<(usize, usize)> = (0..config.iterations)
            .step_by(PARALLEL_CHUNK)
            .enumerate()
            .map(|(i, start)| (i, PARALLEL_CHUNK.min(config.iterations - start)))
            .collect();

        let partials: Vec<Tally> = chunks
            .into_par_iter()
            .map(|(chunk, trials)| {
                let mut rng = StdRng::seed_from_u64(chunk_seed(base, count, chunk));
                run_trials(&simulator, trials, &mut rng)
            })
            .collect::<EngineResult<Vec<Tally>>>()?;

        let tally = partials.into_iter().fold(Tally::default(), Tally::merge);
        let result = tally.finish(count);
        log::info!("{}", result);
        results.push(result);
    }
    Ok(results)
}

/// Runs the same configuration once per hero strategy preset.
pub fn compare_strategies(
    config: &SimulationConfig,
    parallel: bool,
) -> EngineResult<Vec<(&'static str, Vec<SimulationResult>)>> {
    HeroStrategy::presets()
        .into_iter()
        .map(|(name, strategy)| {
            log::info!("strategy {}", name);
            let mut variant = config.clone();
            variant.hero_strategy = strategy;
            let results = if parallel {
                run_simulation_parallel(&variant)?
            } else {
                run_simulation(&variant)?
            };
            Ok((name, results))
        })
        .collect()
}

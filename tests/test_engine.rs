use approx::assert_relative_eq;
use equity_sim::betting::{street_bet_size, Street};
use equity_sim::board::BoardTexture;
use equity_sim::cards::*;
use equity_sim::engine::*;
use equity_sim::error::{EngineError, EngineResult};
use equity_sim::hand_evaluator::{Evaluator, RankEvaluator};
use equity_sim::profile::{PlayerProfile, PositionalPlayer};
use equity_sim::ranges::{ComboCache, Position};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn hand(notation: &str) -> [Card; 2] {
    parse_hand(notation).unwrap()
}

fn player(vpip: f64, fold: f64) -> PositionalPlayer {
    PositionalPlayer::uniform(
        format!("vpip-{}", vpip),
        PlayerProfile {
            vpip,
            fold_flop: fold,
            fold_turn: fold,
            fold_river: fold,
            ..PlayerProfile::default()
        },
    )
}

fn seats(players: &[PositionalPlayer], position: Position) -> Vec<Seat<'_>> {
    players.iter().map(|player| Seat { player, position }).collect()
}

fn run<E: Evaluator>(
    simulator: &HandSimulator<'_, E>,
    trials: usize,
    seed: u64,
) -> (Vec<HandOutcome>, ParticipationTracker) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut cache = ComboCache::new();
    let mut tracker = ParticipationTracker::default();
    let outcomes = (0..trials)
        .map(|_| simulator.simulate(&mut rng, &mut cache, &mut tracker).unwrap())
        .collect();
    (outcomes, tracker)
}

// ---------------------------------------------------------------------------
// Showdown resolution
// ---------------------------------------------------------------------------

#[test]
fn test_showdown_win() {
    let outcome = resolve_showdown(100, &[200, 300], 10.0, 3.0);
    assert_eq!(outcome.outcome, TrialOutcome::Win);
    assert_eq!(outcome.ended_on, None);
    assert_relative_eq!(outcome.net_bb, 7.0);
}

#[test]
fn test_showdown_tie_pays_half_pot() {
    let outcome = resolve_showdown(100, &[100, 250], 10.0, 3.0);
    assert_eq!(outcome.outcome, TrialOutcome::Tie);
    assert_relative_eq!(outcome.net_bb, 2.0);
}

#[test]
fn test_showdown_any_better_hand_loses() {
    let outcome = resolve_showdown(100, &[100, 99], 10.0, 3.0);
    assert_eq!(outcome.outcome, TrialOutcome::Loss);
    assert_relative_eq!(outcome.net_bb, -3.0);
}

#[test]
fn test_outcome_kinds() {
    assert!(TrialOutcome::Tie.is_showdown());
    assert!(!TrialOutcome::WinNoShowdown.is_showdown());
    assert_eq!(TrialOutcome::LossNoShowdown.to_string(), "loss_noshowdown");
}

// ---------------------------------------------------------------------------
// Preflop selection
// ---------------------------------------------------------------------------

#[test]
fn test_nobody_enters_hero_takes_blinds() {
    let players = vec![player(0.0, 40.0), player(0.0, 40.0)];
    let seats = seats(&players, Position::Btn);
    let sim = HandSimulator::new(&RankEvaluator, hand("AhAd"), &[], &seats);
    let (outcomes, tracker) = run(&sim, 50, 1);
    for o in outcomes {
        assert_eq!(o.outcome, TrialOutcome::WinNoShowdown);
        assert_eq!(o.ended_on, Some(Street::Preflop));
        assert_relative_eq!(o.net_bb, SMALL_BLIND + BIG_BLIND - BIG_BLIND);
    }
    assert_eq!(tracker.seats, 100);
    assert_eq!(tracker.entered, 0);
}

#[test]
fn test_exhausted_range_skips_opponent() {
    // At UTG a 5% player only holds AA; hero and board leave no aces.
    let players = vec![player(5.0, 40.0)];
    let seats = seats(&players, Position::Utg);
    let board = parse_board("AsKd7c").unwrap();
    let sim = HandSimulator::new(&RankEvaluator, hand("AhAd"), &board, &seats);
    let (outcomes, tracker) = run(&sim, 400, 2);
    assert_eq!(tracker.seats, 400);
    assert_eq!(tracker.entered, 0);
    for o in outcomes {
        assert_eq!(o.outcome, TrialOutcome::WinNoShowdown);
        assert_eq!(o.ended_on, Some(Street::Preflop));
    }
}

#[test]
fn test_duplicate_hero_and_board_fails() {
    let players = vec![player(100.0, 40.0)];
    let seats = seats(&players, Position::Btn);
    let board = parse_board("AhKd7c").unwrap();
    let sim = HandSimulator::new(&RankEvaluator, hand("AhAd"), &board, &seats);
    let mut rng = StdRng::seed_from_u64(3);
    let result = sim.simulate(&mut rng, &mut ComboCache::new(), &mut ParticipationTracker::default());
    assert!(matches!(result, Err(EngineError::DuplicateCards(_))));
}

// ---------------------------------------------------------------------------
// Full hands
// ---------------------------------------------------------------------------

#[test]
fn test_showdown_mode_always_reaches_showdown() {
    let players = vec![player(100.0, 0.0)];
    let seats = seats(&players, Position::Btn);
    let sim = HandSimulator::new(&RankEvaluator, hand("AhAd"), &[], &seats)
        .with_mode(SimulationMode::Showdown);
    let (outcomes, _) = run(&sim, 300, 4);
    let pot = SMALL_BLIND + BIG_BLIND + BIG_BLIND;
    for o in outcomes {
        assert!(o.outcome.is_showdown());
        assert_eq!(o.ended_on, None);
        let expected = match o.outcome {
            TrialOutcome::Win => pot - BIG_BLIND,
            TrialOutcome::Tie => pot / 2.0 - BIG_BLIND,
            _ => -BIG_BLIND,
        };
        assert_relative_eq!(o.net_bb, expected, epsilon = 1e-9);
    }
}

#[test]
fn test_play_mode_outcomes_are_consistent() {
    let players = vec![player(60.0, 30.0), player(45.0, 20.0), player(100.0, 50.0)];
    let seats = seats(&players, Position::Co);
    for hero in ["AhAd", "7d2c", "KsQs", "9h8h"] {
        let sim = HandSimulator::new(&RankEvaluator, hand(hero), &[], &seats);
        let (outcomes, _) = run(&sim, 600, 5);
        for o in outcomes {
            assert_eq!(o.outcome.is_showdown(), o.ended_on.is_none());
            match o.outcome {
                TrialOutcome::WinNoShowdown => assert!(o.net_bb >= SMALL_BLIND - 1e-9),
                TrialOutcome::LossNoShowdown | TrialOutcome::Loss => {
                    assert!(o.net_bb <= -BIG_BLIND + 1e-9)
                }
                TrialOutcome::Win => assert!(o.net_bb > 0.0),
                TrialOutcome::Tie => {}
            }
            assert!(o.net_bb >= -STARTING_STACK);
        }
    }
}

#[test]
fn test_fixed_turn_board() {
    let players = vec![player(100.0, 40.0), player(100.0, 40.0)];
    let seats = seats(&players, Position::Bb);
    let board = parse_board("Kc7d2s9c").unwrap();
    let sim = HandSimulator::new(&RankEvaluator, hand("KhKd"), &board, &seats);
    let (outcomes, tracker) = run(&sim, 500, 6);
    assert_eq!(outcomes.len(), 500);
    assert_eq!(tracker.entered, 1000);
}

#[test]
fn test_air_hero_gives_up_against_callers() {
    // Fold rates of zero clamp to 0.25 on the flop, below the 0.50 needed on a wet board,
    // so only the heads-up continuation roll keeps hero in.
    let players = vec![player(100.0, 0.0)];
    let seats = seats(&players, Position::Btn);
    let board = parse_board("KdQc9h").unwrap();
    let sim = HandSimulator::new(&RankEvaluator, hand("7s2h"), &board, &seats);
    let (outcomes, _) = run(&sim, 1000, 7);
    let flop_folds = outcomes
        .iter()
        .filter(|o| o.outcome == TrialOutcome::LossNoShowdown && o.ended_on == Some(Street::Flop))
        .count();
    assert!(flop_folds > 100 && flop_folds < 300, "flop folds {}", flop_folds);
    for o in outcomes.iter().filter(|o| o.ended_on == Some(Street::Flop)) {
        if o.outcome == TrialOutcome::LossNoShowdown {
            assert_relative_eq!(o.net_bb, -BIG_BLIND);
        }
    }
}

#[test]
fn test_same_seed_same_hands() {
    let players = vec![player(50.0, 40.0), player(30.0, 60.0)];
    let seats = seats(&players, Position::Sb);
    let sim = HandSimulator::new(&RankEvaluator, hand("JhTh"), &[], &seats);
    let (a, ta) = run(&sim, 300, 8);
    let (b, tb) = run(&sim, 300, 8);
    assert_eq!(a, b);
    assert_eq!(ta, tb);
}

#[test]
fn test_participation_tracks_vpip() {
    let players = vec![player(30.0, 40.0)];
    let seats = seats(&players, Position::Btn);
    let sim = HandSimulator::new(&RankEvaluator, hand("QcQd"), &[], &seats);
    let (_, tracker) = run(&sim, 3000, 9);
    assert_eq!(tracker.seats, 3000);
    assert!((tracker.rate() - 0.30).abs() < 0.04, "rate {}", tracker.rate());
}

// ---------------------------------------------------------------------------
// River resolution
// ---------------------------------------------------------------------------

/// Fixed ranks: hero always gets `hero_rank`; opponents hold the nuts until the river
/// (so they call every flop and turn bet) and `opponent_river_rank` on it.
struct ScriptedEvaluator {
    hero: [Card; 2],
    hero_rank: u16,
    opponent_river_rank: u16,
}

impl Evaluator for ScriptedEvaluator {
    fn evaluate(&self, board: &[Card], hand: &[Card]) -> EngineResult<u16> {
        if hand == &self.hero[..] {
            Ok(self.hero_rank)
        } else if board.len() < 5 {
            Ok(1)
        } else {
            Ok(self.opponent_river_rank)
        }
    }
}

// Three hearts keep every street wet, so every bet size is known in advance.
const WET_TURN: &str = "Kh9h4h2c";
const AIR: u16 = 7000;
const WORSE_AIR: u16 = 7400;
const NUTS: u16 = 1;
const WORSE_TWO_PAIR: u16 = 1500;

/// Opponents who always enter with zero aggression. Their fold rates are maxed out,
/// which only feeds hero's continuation check, so hero's air always reaches the river.
fn river_players(count: usize) -> Vec<PositionalPlayer> {
    (0..count)
        .map(|i| {
            PositionalPlayer::uniform(
                format!("Caller{}", i),
                PlayerProfile {
                    vpip: 100.0,
                    aggression: 0.0,
                    fold_flop: 100.0,
                    fold_turn: 100.0,
                    fold_river: 100.0,
                    ..PlayerProfile::default()
                },
            )
        })
        .collect()
}

struct RiverSpot {
    /// Hero's net if the hand ends on the river without any river money going in.
    checked: f64,
    invested: f64,
    bet: f64,
}

fn river_spot(opponents: usize) -> RiverSpot {
    let mut pot = SMALL_BLIND + BIG_BLIND;
    let mut invested = BIG_BLIND;
    for street in [Street::Flop, Street::Turn] {
        let bet = street_bet_size(street, pot, BoardTexture::Wet, 1.0, STARTING_STACK - invested)
            .unwrap();
        pot += bet * (opponents + 1) as f64;
        invested += bet;
    }
    let bet = street_bet_size(
        Street::River,
        pot,
        BoardTexture::Wet,
        1.0,
        STARTING_STACK - invested,
    )
    .unwrap();
    RiverSpot {
        checked: pot - invested,
        invested,
        bet,
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn river_outcomes(
    hero_rank: u16,
    opponent_river_rank: u16,
    opponents: usize,
    seed: u64,
) -> Vec<HandOutcome> {
    let hero = hand("AsQd");
    let board = parse_board(WET_TURN).unwrap();
    let players = river_players(opponents);
    let seats = seats(&players, Position::Btn);
    let evaluator = ScriptedEvaluator {
        hero,
        hero_rank,
        opponent_river_rank,
    };
    let sim = HandSimulator::new(&evaluator, hero, &board, &seats);
    run(&sim, 2000, seed).0
}

#[test]
fn test_heads_up_check_through_reaches_showdown() {
    // Neither side holds anything: the opponent bluffs 37.5% of the time, hero never bets air.
    let spot = river_spot(1);
    let outcomes = river_outcomes(AIR, WORSE_AIR, 1, 10);

    let mut checked_down = 0;
    for o in &outcomes {
        match o.outcome {
            TrialOutcome::Win => {
                assert_eq!(o.ended_on, None);
                if close(o.net_bb, spot.checked) {
                    checked_down += 1;
                } else {
                    // Forced to showdown after calling the bluff.
                    assert_relative_eq!(o.net_bb, spot.checked + spot.bet, epsilon = 1e-9);
                }
            }
            TrialOutcome::LossNoShowdown => {
                assert_eq!(o.ended_on, Some(Street::River));
                assert_relative_eq!(o.net_bb, -spot.invested, epsilon = 1e-9);
            }
            other => panic!("unexpected {} heads-up", other),
        }
    }
    assert!(
        checked_down > 1100 && checked_down < 1400,
        "checked down {}",
        checked_down
    );
}

#[test]
fn test_multiway_check_through_is_early_win() {
    let spot = river_spot(2);
    let outcomes = river_outcomes(AIR, WORSE_AIR, 2, 11);

    let mut conceded = 0;
    for o in &outcomes {
        assert!(!o.outcome.is_showdown(), "multi-way air reached showdown");
        assert_eq!(o.ended_on, Some(Street::River));
        match o.outcome {
            TrialOutcome::WinNoShowdown => {
                assert_relative_eq!(o.net_bb, spot.checked, epsilon = 1e-9);
                conceded += 1;
            }
            // Hero folds air to a multi-way bet; only the flop and turn money is lost.
            TrialOutcome::LossNoShowdown => {
                assert_relative_eq!(o.net_bb, -spot.invested, epsilon = 1e-9)
            }
            _ => unreachable!(),
        }
    }
    assert!(conceded > 1700, "conceded {}", conceded);
}

#[test]
fn test_uncalled_river_bet_wins_without_showdown() {
    let spot = river_spot(1);
    let outcomes = river_outcomes(NUTS, WORSE_AIR, 1, 12);

    let mut uncalled = 0;
    for o in &outcomes {
        match o.outcome {
            TrialOutcome::WinNoShowdown => {
                assert_eq!(o.ended_on, Some(Street::River));
                assert_relative_eq!(o.net_bb, spot.checked, epsilon = 1e-9);
                uncalled += 1;
            }
            // The opponent bluffed and hero called.
            TrialOutcome::Win => {
                assert_eq!(o.ended_on, None);
                assert_relative_eq!(o.net_bb, spot.checked + spot.bet, epsilon = 1e-9);
            }
            other => panic!("unexpected {} with the nuts", other),
        }
    }
    assert!(uncalled > 1100 && uncalled < 1400, "uncalled {}", uncalled);
}

#[test]
fn test_called_river_collects_every_bet() {
    // Both opponents hold two pair and bet 74% of the time each; hero has them beat and
    // calls. Every showdown win nets one river bet per opponent who put one in.
    let spot = river_spot(2);
    let outcomes = river_outcomes(NUTS, WORSE_TWO_PAIR, 2, 13);

    let mut double = 0;
    for o in &outcomes {
        match o.outcome {
            TrialOutcome::Win => {
                assert_eq!(o.ended_on, None);
                let extra = o.net_bb - spot.checked;
                if close(extra, 2.0 * spot.bet) {
                    double += 1;
                } else {
                    assert_relative_eq!(extra, spot.bet, epsilon = 1e-9);
                }
            }
            TrialOutcome::WinNoShowdown => {
                assert_eq!(o.ended_on, Some(Street::River));
                assert_relative_eq!(o.net_bb, spot.checked, epsilon = 1e-9);
            }
            other => panic!("unexpected {} with the nuts", other),
        }
    }
    assert!(double > 1000, "both bets collected {} times", double);
}

use approx::assert_relative_eq;
use equity_sim::betting::Street;
use equity_sim::cards::*;
use equity_sim::engine::{HandOutcome, SimulationMode, TrialOutcome};
use equity_sim::error::EngineError;
use equity_sim::profile::{default_roster, HeroStrategy, PlayerProfile, PositionalPlayer};
use equity_sim::ranges::Position;
use equity_sim::simulator::*;

fn hand(notation: &str) -> [Card; 2] {
    parse_hand(notation).unwrap()
}

fn calling_station() -> PositionalPlayer {
    PositionalPlayer::uniform(
        "Always-In",
        PlayerProfile {
            vpip: 100.0,
            fold_flop: 0.0,
            fold_turn: 0.0,
            fold_river: 0.0,
            ..PlayerProfile::default()
        },
    )
}

fn config(hero: &str, opponents: Vec<PositionalPlayer>, iterations: usize) -> SimulationConfig {
    let mut config = SimulationConfig::new(hand(hero), Position::Btn, opponents);
    config.iterations = iterations;
    config.seed = Some(42);
    config
}

// ---------------------------------------------------------------------------
// Equity sanity
// ---------------------------------------------------------------------------

// The equity bounds below hold when every hand is run out. In play mode only the
// opponents who survive the betting reach showdown, which drags hero's showdown equity
// down; play mode is compared on bb/100 instead.

#[test]
fn test_aces_dominate_when_every_hand_reaches_showdown() {
    let mut cfg = config("AhAd", vec![calling_station()], 3000);
    cfg.mode = SimulationMode::Showdown;
    let results = run_simulation(&cfg).unwrap();
    assert_eq!(results.len(), 1);
    let r = &results[0];
    assert_eq!(r.showdown_hands, 3000);
    assert!(r.equity > 70.0, "AA equity {}", r.equity);
    assert_relative_eq!(r.equity, r.showdown_win_pct);
}

#[test]
fn test_seven_deuce_is_an_underdog_when_every_hand_reaches_showdown() {
    let mut cfg = config("2c7d", vec![calling_station()], 3000);
    cfg.mode = SimulationMode::Showdown;
    let results = run_simulation(&cfg).unwrap();
    assert!(results[0].equity < 45.0, "72o equity {}", results[0].equity);
}

#[test]
fn test_aces_outearn_seven_deuce_in_play() {
    let mut aces = config("AhAd", default_roster(), 2000);
    aces.max_opponents = Some(2);
    let mut trash = config("2c7d", default_roster(), 2000);
    trash.max_opponents = Some(2);

    let aces = run_simulation(&aces).unwrap();
    let trash = run_simulation(&trash).unwrap();
    for (a, t) in aces.iter().zip(&trash) {
        assert!(a.bb_per_100 > t.bb_per_100, "{} vs {}", a, t);
    }
}

// ---------------------------------------------------------------------------
// Run controller
// ---------------------------------------------------------------------------

#[test]
fn test_seeded_runs_are_identical() {
    let cfg = config("KsQs", default_roster(), 400);
    let first = run_simulation(&cfg).unwrap();
    let second = run_simulation(&cfg).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_parallel_runs_are_identical() {
    let cfg = config("9h9c", default_roster(), 1234);
    let first = run_simulation_parallel(&cfg).unwrap();
    let second = run_simulation_parallel(&cfg).unwrap();
    assert_eq!(first, second);
    for r in &first {
        assert_eq!(r.trials, 1234);
    }
}

#[test]
fn test_parallel_matches_sequential_statistically() {
    let mut cfg = config("AhKh", vec![calling_station()], 4000);
    cfg.mode = SimulationMode::Showdown;
    let seq = run_simulation(&cfg).unwrap();
    let par = run_simulation_parallel(&cfg).unwrap();
    assert!((seq[0].equity - par[0].equity).abs() < 5.0);
}

#[test]
fn test_opponent_count_clamped_to_six() {
    let roster: Vec<PositionalPlayer> = (0..8)
        .map(|i| PositionalPlayer::uniform(format!("P{}", i), PlayerProfile::default()))
        .collect();
    let results = run_simulation(&config("AhKd", roster, 50)).unwrap();
    let counts: Vec<usize> = results.iter().map(|r| r.opponents).collect();
    assert_eq!(counts, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_opponent_count_clamped_to_roster() {
    let roster = default_roster()[..3].to_vec();
    let mut cfg = config("AhKd", roster, 50);
    cfg.max_opponents = Some(10);
    assert_eq!(run_simulation(&cfg).unwrap().len(), 3);

    cfg.max_opponents = Some(2);
    assert_eq!(cfg.opponent_counts(), 1..=2);
    assert_eq!(run_simulation(&cfg).unwrap().len(), 2);
}

#[test]
fn test_empty_roster_yields_nothing() {
    let cfg = config("AhKd", Vec::new(), 50);
    assert!(cfg.opponent_counts().is_empty());
    assert!(run_simulation(&cfg).unwrap().is_empty());
    assert!(run_simulation_parallel(&cfg).unwrap().is_empty());
}

#[test]
fn test_invalid_board_size() {
    let mut cfg = config("AhKd", default_roster(), 50);
    cfg.board = parse_board("2c3c").unwrap();
    assert!(matches!(run_simulation(&cfg), Err(EngineError::InvalidBoardSize(2))));
    cfg.board = parse_board("2c3c4c5c6c").unwrap();
    assert!(matches!(cfg.validate(), Err(EngineError::InvalidBoardSize(5))));
}

#[test]
fn test_duplicate_cards_rejected() {
    let mut cfg = config("AhKd", default_roster(), 50);
    cfg.board = parse_board("Ah7c2d").unwrap();
    assert!(matches!(run_simulation(&cfg), Err(EngineError::DuplicateCards(_))));
}

#[test]
fn test_zero_iterations_rejected() {
    let cfg = config("AhKd", default_roster(), 0);
    assert!(matches!(cfg.validate(), Err(EngineError::InvalidValue(_))));
}

#[test]
fn test_result_accounting() {
    let mut cfg = config("JsJc", default_roster(), 800);
    cfg.board = parse_board("Jd8c3h").unwrap();
    for r in run_simulation(&cfg).unwrap() {
        assert_eq!(r.trials, 800);
        assert_eq!(r.wins + r.losses + r.ties, r.trials);
        assert_eq!(r.showdown_hands, r.showdown_wins + r.showdown_losses + r.showdown_ties);
        assert_eq!(r.wins, r.showdown_wins + r.non_showdown_wins);
        assert_eq!(r.losses, r.showdown_losses + r.non_showdown_losses);

        let early: u64 = r.early_endings.values().sum();
        assert_eq!(early, r.non_showdown_wins + r.non_showdown_losses);

        assert_relative_eq!(
            r.ev_per_hand * r.trials as f64,
            r.showdown_net_bb + r.non_showdown_net_bb,
            epsilon = 1e-6
        );
        assert_relative_eq!(r.bb_per_100, r.ev_per_hand * 100.0, epsilon = 1e-9);
        assert_relative_eq!(
            r.showdown_freq_pct,
            r.showdown_hands as f64 / 800.0 * 100.0,
            epsilon = 1e-9
        );
        assert!(r.participation_pct > 0.0 && r.participation_pct <= 100.0);
    }
}

#[test]
fn test_tally_counts_ties_at_half() {
    let mut tally = Tally::default();
    let outcome = |outcome, ended_on, net_bb| HandOutcome {
        outcome,
        ended_on,
        net_bb,
    };
    tally.record(&outcome(TrialOutcome::Win, None, 4.0));
    tally.record(&outcome(TrialOutcome::Tie, None, 0.5));
    tally.record(&outcome(TrialOutcome::Loss, None, -3.0));
    tally.record(&outcome(TrialOutcome::WinNoShowdown, Some(Street::Flop), 1.0));

    let mut other = Tally::default();
    other.record(&outcome(TrialOutcome::LossNoShowdown, Some(Street::Turn), -2.0));
    let r = tally.merge(other).finish(2);

    assert_eq!(r.trials, 5);
    assert_eq!((r.wins, r.losses, r.ties), (2, 2, 1));
    assert_eq!(r.showdown_hands, 3);
    assert_relative_eq!(r.equity, 50.0);
    assert_relative_eq!(r.non_showdown_win_pct, 20.0);
    assert_relative_eq!(r.showdown_freq_pct, 60.0);
    assert_relative_eq!(r.ev_per_hand, 0.1, epsilon = 1e-12);
    assert_relative_eq!(r.showdown_net_bb, 1.5);
    assert_relative_eq!(r.non_showdown_net_bb, -1.0);
    assert_eq!(r.early_endings.get(&Street::Flop), Some(&1));
    assert_eq!(r.early_endings.get(&Street::Turn), Some(&1));
    assert!(!r.is_heads_up());
}

#[test]
fn test_no_showdowns_means_zero_equity() {
    let r = Tally::default().finish(1);
    assert_eq!(r.equity, 0.0);
    assert_eq!(r.trials, 0);
}

#[test]
fn test_compare_strategies() {
    let mut cfg = config("AsQs", default_roster(), 200);
    cfg.max_opponents = Some(1);
    let runs = compare_strategies(&cfg, false).unwrap();
    let names: Vec<&str> = runs.iter().map(|(name, _)| *name).collect();
    assert_eq!(names, vec!["PASSIVE", "BASELINE", "AGGRESSIVE"]);
    for (_, results) in &runs {
        assert_eq!(results.len(), 1);
    }

    let mut baseline = cfg.clone();
    baseline.hero_strategy = HeroStrategy::BASELINE;
    assert_eq!(runs[1].1, run_simulation(&baseline).unwrap());
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "hero_hand": ["Ah", "Kh"],
        "position": "CO",
        "board": ["Qh", "Jh", "2c"],
        "seed": 7,
        "opponents": [
            { "name": "Reg", "profiles": { "CO": { "vpip": 22 } } }
        ]
    }"#;
    let cfg: SimulationConfig = serde_json::from_str(json).unwrap();
    assert_eq!(cfg.hero_hand, hand("AhKh"));
    assert_eq!(cfg.position, Position::Co);
    assert_eq!(cfg.board.len(), 3);
    assert_eq!(cfg.iterations, DEFAULT_ITERATIONS);
    assert_eq!(cfg.mode, SimulationMode::Play);
    assert_eq!(cfg.hero_strategy, HeroStrategy::BASELINE);
    assert_eq!(cfg.opponents[0].profile_for(Position::Co).vpip, 22.0);
    assert_eq!(cfg.opponents[0].profile_for(Position::Co).fold_flop, 40.0);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_result_serialises() {
    let cfg = config("AhKd", default_roster()[..1].to_vec(), 100);
    let results = run_simulation(&cfg).unwrap();
    let value = serde_json::to_value(&results).unwrap();
    assert_eq!(value[0]["opponents"], 1);
    assert_eq!(value[0]["trials"], 100);
    assert!(value[0]["equity"].is_number());
    assert!(value[0]["early_endings"].is_object());
}

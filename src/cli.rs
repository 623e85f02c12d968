use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use log::LevelFilter;
use rand::rngs::StdRng;
use rand::SeedableRng;

use equity_sim::board::describe_board;
use equity_sim::cards::{parse_board, parse_hand, simplify_hand};
use equity_sim::display::{board_display, print_error, print_section, range_grid, results_table, strategy_table};
use equity_sim::engine::SimulationMode;
use equity_sim::error::EngineResult;
use equity_sim::profile::{default_roster, load_roster, HeroStrategy, PlayerProfile, PositionalPlayer};
use equity_sim::ranges::{build_weighted_range, range_pct, Position};
use equity_sim::simulator::{
    compare_strategies, run_simulation, run_simulation_parallel, SimulationConfig, SimulationResult,
    DEFAULT_ITERATIONS,
};

#[derive(Parser)]
#[command(name = "eqsim", version, about = "Monte-Carlo poker equity and EV against profiled opponents.")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Play,
    Showdown,
}

impl From<Mode> for SimulationMode {
    fn from(mode: Mode) -> SimulationMode {
        match mode {
            Mode::Play => SimulationMode::Play,
            Mode::Showdown => SimulationMode::Showdown,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    Passive,
    Baseline,
    Aggressive,
}

impl From<Strategy> for HeroStrategy {
    fn from(strategy: Strategy) -> HeroStrategy {
        match strategy {
            Strategy::Passive => HeroStrategy::PASSIVE,
            Strategy::Baseline => HeroStrategy::BASELINE,
            Strategy::Aggressive => HeroStrategy::AGGRESSIVE,
        }
    }
}

#[derive(Args)]
struct ScenarioArgs {
    /// Hero hole cards (e.g., AhAd or "Ah Ad")
    #[arg(long)]
    hand: String,
    /// Hero position (UTG, MP, CO, BTN, SB, BB)
    #[arg(short, long, default_value = "BTN")]
    position: String,
    /// Known board: flop or flop+turn (e.g., Kh7d2c)
    #[arg(short, long)]
    board: Option<String>,
    /// Trials per opponent count
    #[arg(short = 'n', long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,
    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,
    /// Opponent roster JSON file (built-in roster when omitted)
    #[arg(short, long)]
    roster: Option<PathBuf>,
    /// Highest opponent count to simulate
    #[arg(long)]
    max_opponents: Option<usize>,
    /// Play the betting model or run everyone to showdown
    #[arg(short, long, default_value = "play")]
    mode: Mode,
    /// Split trials across threads
    #[arg(long)]
    parallel: bool,
    /// Print JSON instead of tables
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a hand against 1..6 opponents
    Simulate {
        #[command(flatten)]
        scenario: ScenarioArgs,
        /// Hero strategy preset
        #[arg(short, long, default_value = "baseline")]
        strategy: Strategy,
    },
    /// Run the same scenario with every hero strategy preset
    Compare {
        #[command(flatten)]
        scenario: ScenarioArgs,
    },
    /// Show the weighted range a profile plays from a position
    Range {
        /// Position (UTG, MP, CO, BTN, SB, BB)
        position: String,
        /// Participation rate (VPIP, 0-100)
        #[arg(long, default_value_t = 25.0)]
        vpip: f64,
        /// Use a named player from the roster instead of --vpip
        #[arg(long)]
        player: Option<String>,
        /// Opponent roster JSON file
        #[arg(short, long)]
        roster: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
    },
}

pub fn run() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Err(e) = dispatch(cli.command) {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn dispatch(command: Commands) -> EngineResult<()> {
    match command {
        Commands::Simulate { scenario, strategy } => cmd_simulate(scenario, strategy.into()),
        Commands::Compare { scenario } => cmd_compare(scenario),
        Commands::Range {
            position,
            vpip,
            player,
            roster,
            seed,
        } => cmd_range(&position, vpip, player, roster, seed),
    }
}

fn load_opponents(roster: Option<&PathBuf>) -> EngineResult<Vec<PositionalPlayer>> {
    match roster {
        Some(path) => load_roster(path),
        None => Ok(default_roster()),
    }
}

fn build_config(args: &ScenarioArgs, strategy: HeroStrategy) -> EngineResult<SimulationConfig> {
    let hero = parse_hand(&args.hand)?;
    let position: Position = args.position.parse()?;
    let opponents = load_opponents(args.roster.as_ref())?;

    let mut config = SimulationConfig::new(hero, position, opponents);
    if let Some(board) = &args.board {
        config.board = parse_board(board)?;
    }
    config.iterations = args.iterations;
    config.seed = args.seed;
    config.max_opponents = args.max_opponents;
    config.mode = args.mode.into();
    config.hero_strategy = strategy;
    config.validate()?;
    Ok(config)
}

fn print_header(config: &SimulationConfig) -> EngineResult<()> {
    println!();
    println!(
        "  {} {} from {}  |  board {}  |  {} trials",
        simplify_hand(&config.hero_hand)?.bold(),
        board_display(&config.hero_hand),
        config.position.to_string().cyan(),
        board_display(&config.board),
        config.iterations,
    );
    if !config.board.is_empty() {
        println!("  {}", describe_board(&config.board).dimmed());
    }
    Ok(())
}

fn cmd_simulate(args: ScenarioArgs, strategy: HeroStrategy) -> EngineResult<()> {
    let config = build_config(&args, strategy)?;
    let results: Vec<SimulationResult> = if args.parallel {
        run_simulation_parallel(&config)?
    } else {
        run_simulation(&config)?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    print_header(&config)?;
    if results.is_empty() {
        print_section("Results", "no opponents in roster");
        return Ok(());
    }
    println!("{}", results_table(&results));
    Ok(())
}

fn cmd_compare(args: ScenarioArgs) -> EngineResult<()> {
    let config = build_config(&args, HeroStrategy::default())?;
    let runs = compare_strategies(&config, args.parallel)?;

    if args.json {
        let named: Vec<serde_json::Value> = runs
            .iter()
            .map(|(name, results)| serde_json::json!({ "strategy": name, "results": results }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&named)?);
        return Ok(());
    }

    print_header(&config)?;
    println!("{}", strategy_table(&runs));
    Ok(())
}

fn cmd_range(
    position: &str,
    vpip: f64,
    player: Option<String>,
    roster: Option<PathBuf>,
    seed: Option<u64>,
) -> EngineResult<()> {
    let position: Position = position.parse()?;

    let (name, profile) = match player {
        Some(name) => {
            let opponents = load_opponents(roster.as_ref())?;
            let found = opponents.into_iter().find(|p| p.name.eq_ignore_ascii_case(&name));
            match found {
                Some(p) => (p.name.clone(), p.profile_for(position).clone()),
                None => {
                    print_error(&format!("No player named {}", name));
                    return Ok(());
                }
            }
        }
        None => (
            format!("VPIP {:.0}", vpip),
            PlayerProfile {
                vpip,
                ..PlayerProfile::default()
            },
        ),
    };
    profile.validate()?;

    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let range = build_weighted_range(&profile, position, &mut rng)?;
    let labels = range.labels();

    println!();
    println!(
        "{}",
        range_grid(&range, &format!("{} at {}", name, position))
    );
    print_section(
        "Range",
        &format!(
            "{} labels, {:.1}% of hands  |  {}",
            labels.len(),
            range_pct(&labels),
            profile
        ),
    );
    Ok(())
}

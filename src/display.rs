use colored::Colorize;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

use crate::betting::{Street, POSTFLOP_STREETS};
use crate::cards::{Card, Suit};
use crate::ranges::{StartingHandLabel, WeightedRange};
use crate::simulator::SimulationResult;

const RANGE_GRID_RANKS: [char; 13] = ['A', 'K', 'Q', 'J', 'T', '9', '8', '7', '6', '5', '4', '3', '2'];

/// 13x13 grid of a weighted range; included labels show their weight.
pub fn range_grid(range: &WeightedRange, title: &str) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![Cell::new("")];
    for &r in &RANGE_GRID_RANKS {
        header.push(Cell::new(r).set_alignment(CellAlignment::Center));
    }
    table.set_header(header);

    for (i, &r1) in RANGE_GRID_RANKS.iter().enumerate() {
        let mut row = vec![Cell::new(format!("{}", r1).bold().to_string())];
        for (j, &r2) in RANGE_GRID_RANKS.iter().enumerate() {
            let hand = if i == j {
                format!("{}{}", r1, r2)
            } else if i < j {
                format!("{}{}s", r1, r2)
            } else {
                format!("{}{}o", r2, r1)
            };

            let weight = hand.parse::<StartingHandLabel>().ok().and_then(|label| range.weight(&label));
            let cell = match weight {
                Some(w) if w >= 0.75 => Cell::new(format!("{} {:.2}", hand, w).green().bold().to_string()),
                Some(w) => Cell::new(format!("{} {:.2}", hand, w).yellow().to_string()),
                None => Cell::new(hand.dimmed().to_string()),
            };
            row.push(cell.set_alignment(CellAlignment::Center));
        }
        table.add_row(row);
    }

    format!("  {}\n{}", title.bold(), table)
}

/// `equity` is a fraction in [0, 1].
pub fn equity_bar(equity: f64, width: usize) -> String {
    let filled = ((equity.clamp(0.0, 1.0)) * width as f64) as usize;
    let bar: String = "\u{2588}".repeat(filled) + &"\u{2591}".repeat(width - filled);
    let pct = format!("{:.1}%", equity * 100.0);

    if equity >= 0.6 {
        format!("{} {}", bar.green(), pct)
    } else if equity >= 0.4 {
        format!("{} {}", bar.yellow(), pct)
    } else {
        format!("{} {}", bar.red(), pct)
    }
}

pub fn board_display(cards: &[Card]) -> String {
    if cards.is_empty() {
        return "-".dimmed().to_string();
    }
    cards
        .iter()
        .map(|card| {
            let text = card.pretty();
            match card.suit {
                Suit::Spades => text.white().to_string(),
                Suit::Hearts => text.red().to_string(),
                Suit::Diamonds => text.blue().to_string(),
                Suit::Clubs => text.green().to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn signed_bb(value: f64, precision: usize) -> String {
    let text = format!("{:+.*}", precision, value);
    if value >= 0.0 {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}

fn early_endings_cell(result: &SimulationResult) -> String {
    let mut parts = Vec::new();
    if let Some(n) = result.early_endings.get(&Street::Preflop) {
        parts.push(format!("pre {}", n));
    }
    for street in POSTFLOP_STREETS {
        if let Some(n) = result.early_endings.get(&street) {
            parts.push(format!("{} {}", street, n));
        }
    }
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(", ")
    }
}

pub fn results_table(results: &[SimulationResult]) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Opp"),
        Cell::new("W / L / T").set_alignment(CellAlignment::Right),
        Cell::new("SD Equity"),
        Cell::new("SD Freq").set_alignment(CellAlignment::Right),
        Cell::new("Non-SD Win").set_alignment(CellAlignment::Right),
        Cell::new("EV/hand").set_alignment(CellAlignment::Right),
        Cell::new("bb/100").set_alignment(CellAlignment::Right),
        Cell::new("VPIP seen").set_alignment(CellAlignment::Right),
        Cell::new("Ended early"),
    ]);

    for r in results {
        let mode = if r.is_heads_up() { "HU" } else { "MW" };
        table.add_row(vec![
            Cell::new(format!("{} {}", r.opponents, mode).bold().to_string()),
            Cell::new(format!("{} / {} / {}", r.wins, r.losses, r.ties))
                .set_alignment(CellAlignment::Right),
            Cell::new(equity_bar(r.equity / 100.0, 20)),
            Cell::new(format!("{:.1}%", r.showdown_freq_pct)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}%", r.non_showdown_win_pct))
                .set_alignment(CellAlignment::Right),
            Cell::new(signed_bb(r.ev_per_hand, 3)).set_alignment(CellAlignment::Right),
            Cell::new(signed_bb(r.bb_per_100, 1)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}%", r.participation_pct)).set_alignment(CellAlignment::Right),
            Cell::new(early_endings_cell(r)),
        ]);
    }

    table.to_string()
}

/// One row per strategy preset and opponent count.
pub fn strategy_table(runs: &[(&str, Vec<SimulationResult>)]) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Strategy"),
        Cell::new("Opp"),
        Cell::new("SD Equity").set_alignment(CellAlignment::Right),
        Cell::new("SD Freq").set_alignment(CellAlignment::Right),
        Cell::new("bb/100").set_alignment(CellAlignment::Right),
    ]);

    for (name, results) in runs {
        for r in results {
            table.add_row(vec![
                Cell::new(name.bold().to_string()),
                Cell::new(r.opponents),
                Cell::new(format!("{:.1}%", r.equity)).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.1}%", r.showdown_freq_pct))
                    .set_alignment(CellAlignment::Right),
                Cell::new(signed_bb(r.bb_per_100, 1)).set_alignment(CellAlignment::Right),
            ]);
        }
    }

    table.to_string()
}

pub fn print_section(title: &str, content: &str) {
    println!("\n{}", title.cyan().bold());
    println!("  {}", content);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "Error:".red().bold(), msg);
}

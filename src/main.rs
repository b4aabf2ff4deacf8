//! Optimal 15-Puzzle Solver
//!
//! Solves 4x4 sliding-tile boards in the minimum number of moves using
//! IDA* over walking-distance and pattern-database heuristics. Lookup
//! tables are generated on first use and cached under `database/`.

use std::time::{Duration, Instant};

use clap::{Parser, Subcommand, ValueEnum};

use fifteen::{Board, HeuristicKind, Level, Solver};

/// Solves 15-puzzle boards optimally.
#[derive(Parser)]
#[command(name = "fifteen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Solve a board and print the optimal move sequence.
    Solve {
        /// 16 comma- or space-separated tile values, 0 for the blank.
        #[arg(long)]
        tiles: Option<String>,
        /// Difficulty of the generated board when no tiles are given.
        #[arg(long, value_enum, default_value = "moderate")]
        level: LevelArg,
        #[arg(long, value_enum, default_value = "wdmd")]
        heuristic: KindArg,
        /// Abort the search after this many seconds.
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Print the heuristic estimate of a board without solving it.
    Estimate {
        /// 16 comma- or space-separated tile values, 0 for the blank.
        #[arg(long)]
        tiles: String,
        #[arg(long, value_enum, default_value = "wdmd")]
        heuristic: KindArg,
    },
    /// Generate random boards at a difficulty level.
    Generate {
        #[arg(long, value_enum, default_value = "random")]
        level: LevelArg,
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Generate and save every lookup table the heuristic needs.
    Tables {
        #[arg(long, value_enum, default_value = "pdb663")]
        heuristic: KindArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LevelArg {
    Easy,
    Moderate,
    Hard,
    Random,
}

impl From<LevelArg> for Level {
    fn from(level: LevelArg) -> Level {
        match level {
            LevelArg::Easy => Level::Easy,
            LevelArg::Moderate => Level::Moderate,
            LevelArg::Hard => Level::Hard,
            LevelArg::Random => Level::Random,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Wd,
    Wdmd,
    Pdb555,
    Pdb663,
    Pdb78,
}

impl From<KindArg> for HeuristicKind {
    fn from(kind: KindArg) -> HeuristicKind {
        match kind {
            KindArg::Wd => HeuristicKind::Wd,
            KindArg::Wdmd => HeuristicKind::WdMd,
            KindArg::Pdb555 => HeuristicKind::Pdb555,
            KindArg::Pdb663 => HeuristicKind::Pdb663,
            KindArg::Pdb78 => HeuristicKind::Pdb78,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Solve {
            tiles,
            level,
            heuristic,
            timeout,
        }) => run_solve(tiles, level.into(), heuristic.into(), timeout),
        Some(Command::Estimate { tiles, heuristic }) => run_estimate(&tiles, heuristic.into()),
        Some(Command::Generate { level, count }) => run_generate(level.into(), count),
        Some(Command::Tables { heuristic }) => run_tables(heuristic.into()),
        None => {
            // default: solve a moderate random board
            run_solve(None, Level::Moderate, HeuristicKind::WdMd, None);
        }
    }
}

fn run_solve(tiles: Option<String>, level: Level, kind: HeuristicKind, timeout: Option<u64>) {
    let board = match tiles {
        Some(ref text) => match parse_board(text) {
            Ok(board) => board,
            Err(message) => {
                eprintln!("{}", message);
                return;
            }
        },
        None => Board::generate(level),
    };
    println!("{}", board);

    let mut solver = Solver::new(kind);
    if let Some(seconds) = timeout {
        solver.set_timeout(Duration::from_secs(seconds));
    }

    let started = Instant::now();
    let result = solver.find_optimal_path(&board);
    let elapsed = started.elapsed();

    match result.moves {
        Some(moves) => {
            println!("Optimal solution in {} moves:", moves.len());
            let rendered: Vec<String> = moves.iter().map(ToString::to_string).collect();
            println!("{}", rendered.join(" "));
        }
        None if result.timed_out => println!("Search timed out."),
        None => println!("Board is not solvable."),
    }
    println!(
        "Searched {} nodes in {:.3}s",
        result.nodes_searched,
        elapsed.as_secs_f64()
    );
}

fn run_estimate(text: &str, kind: HeuristicKind) {
    match parse_board(text) {
        Ok(board) => {
            let solver = Solver::new(kind);
            match solver.heuristic(&board) {
                Some(value) => println!("{}", value),
                None => println!("Board is not solvable."),
            }
        }
        Err(message) => eprintln!("{}", message),
    }
}

fn run_generate(level: Level, count: usize) {
    for i in 0..count {
        if i > 0 {
            println!();
        }
        println!("{}", Board::generate(level));
    }
}

fn run_tables(kind: HeuristicKind) {
    // constructing the solver generates and saves anything missing
    let _ = Solver::new(kind);
    println!("Tables ready.");
}

fn parse_board(text: &str) -> Result<Board, String> {
    let values: Result<Vec<u8>, _> = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(str::parse)
        .collect();
    let values = values.map_err(|_| format!("tiles are not numbers: {}", text))?;
    Board::from_tiles(&values).map_err(|err| err.to_string())
}

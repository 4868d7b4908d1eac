use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use formica::solver::stats::render_cp_table;
use formica::{solve, Board, Error, Result, SolveRequest, SolveResult};

/// Sudoku solver driven by ant colony optimization.
#[derive(Debug, Parser)]
#[command(name = "formica", version, about)]
struct Cli {
    /// Puzzle as a flat string ('.' for blanks); length selects the board
    /// size (81, 256, 625, 1296, 2401 or 4096).
    #[arg(long)]
    puzzle: Option<String>,

    /// Read the puzzle from a file (line 1: order, line 2: ignored, then one
    /// value per cell, -1 for blank).
    #[arg(long, conflicts_with = "puzzle")]
    file: Option<PathBuf>,

    /// Solve a blank board of the given --order instead of a puzzle.
    #[arg(long, requires = "order")]
    blank: bool,

    /// Board order for --blank (3 => 9x9, 4 => 16x16, ...).
    #[arg(long)]
    order: Option<usize>,

    /// Algorithm: 0 = single-thread ACS, 2 = parallel ACS.
    #[arg(long, default_value_t = 0)]
    alg: u32,

    /// Wall-clock budget in seconds; non-positive picks a default by size.
    #[arg(long, default_value_t = -1.0, allow_negative_numbers = true)]
    timeout: f32,

    /// Ants per colony.
    #[arg(long, default_value_t = 10)]
    ants: usize,

    /// Sub-colonies for the parallel algorithm.
    #[arg(long, default_value_t = 4)]
    subcolonies: usize,

    /// Exploitation probability of the pseudo-random proportional rule.
    #[arg(long, default_value_t = 0.9)]
    q0: f32,

    /// Pheromone evaporation rate.
    #[arg(long, default_value_t = 0.9)]
    rho: f32,

    /// Decay of the best-solution deposit between iterations.
    #[arg(long, default_value_t = 0.005)]
    evap: f32,

    /// Chatty output: solution grid, iteration counts, timing table.
    #[arg(long)]
    verbose: bool,

    /// Print the board after initial constraint propagation.
    #[arg(long)]
    show_initial: bool,

    /// Emit a single-line JSON report instead of text.
    #[arg(long)]
    json: bool,
}

/// The JSON report is the solve result plus the algorithm that produced it.
#[derive(Serialize)]
struct JsonReport<'a> {
    algorithm: u32,
    #[serde(flatten)]
    result: &'a SolveResult,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let puzzle = resolve_puzzle(cli)?;

    if cli.show_initial {
        // Parse once just for display; the solve call reparses and resets
        // the propagation counters.
        let board: Board = puzzle.parse()?;
        println!("Initial constrained grid");
        println!("{}", board.render(true));
    }

    let request = SolveRequest {
        puzzle,
        algorithm: cli.alg,
        subcolonies: cli.subcolonies,
        ants: cli.ants,
        timeout_seconds: cli.timeout,
        q0: cli.q0,
        rho: cli.rho,
        best_evap: cli.evap,
    };
    let result = solve(&request)?;

    if cli.json {
        let report = JsonReport {
            algorithm: cli.alg,
            result: &result,
        };
        println!(
            "{}",
            serde_json::to_string(&report).expect("report serializes")
        );
        return Ok(());
    }

    report_text(cli, &result);
    Ok(())
}

fn report_text(cli: &Cli, result: &SolveResult) {
    if !cli.verbose {
        // Compact form for batch runs: failure flag, then solve time.
        println!("{}", u8::from(!result.success));
        println!("{}", result.time_seconds);
    }

    println!("cp_initial: {:.6}", result.cp_initial);
    println!("cp_ant: {:.6}", result.cp_ant_total);
    println!("cp_calls: {}", result.cp_calls);

    if cli.verbose {
        if result.success {
            let board: Board = result.solution.parse().expect("solver output parses");
            println!("Solution:");
            println!("{board}");
            println!("solved in {:.3} s", result.time_seconds);
        } else {
            println!("failed in time {:.3} s", result.time_seconds);
            if !result.error.is_empty() {
                println!("error: {}", result.error);
            }
        }
        println!("iterations: {}", result.iterations);
        if cli.alg == formica::ALG_PARALLEL_ACS {
            println!(
                "communication: {}",
                if result.communication { "yes" } else { "no" }
            );
        }
        println!();
        println!("{}", render_cp_table(result));
    }
}

/// Puzzle string from --blank/--puzzle/--file, in that precedence.
fn resolve_puzzle(cli: &Cli) -> Result<String> {
    if cli.blank {
        let order = cli.order.expect("clap enforces --order with --blank");
        return Ok(".".repeat(order * order * order * order));
    }
    if let Some(puzzle) = &cli.puzzle {
        return Ok(puzzle.clone());
    }
    if let Some(path) = &cli.file {
        return read_puzzle_file(path);
    }
    Err(Error::MissingPuzzle)
}

/// Reads the numeric puzzle file format: order, an ignored value, then one
/// value per cell (-1 for blank, otherwise 1-based).
fn read_puzzle_file(path: &PathBuf) -> Result<String> {
    let contents = fs::read_to_string(path)?;
    let mut numbers = contents.split_whitespace().map(str::parse::<i64>);

    let mut next = |what: &str| -> Result<i64> {
        numbers
            .next()
            .transpose()
            .ok()
            .flatten()
            .ok_or_else(|| invalid_file(what))
    };

    let order = next("order")?;
    if !(3..=8).contains(&order) {
        return Err(invalid_file("order"));
    }
    let _ignored = next("header")?;

    let order = order as usize;
    let num_units = order * order;
    let num_cells = num_units * num_units;

    let mut puzzle = String::with_capacity(num_cells);
    for _ in 0..num_cells {
        let value = next("cell value")?;
        let c = match value {
            -1 => '.',
            v if v >= 1 && v as usize <= num_units => encode_value(v as usize, order),
            _ => return Err(invalid_file("cell value")),
        };
        puzzle.push(c);
    }
    Ok(puzzle)
}

/// Character for a 1-based value in the flat encoding of the given order.
fn encode_value(value: usize, order: usize) -> char {
    match order {
        3 => (b'0' + value as u8) as char,
        4 => {
            if value <= 10 {
                (b'0' + value as u8 - 1) as char
            } else {
                (b'a' + value as u8 - 11) as char
            }
        }
        _ => (b'a' + value as u8 - 1) as char,
    }
}

fn invalid_file(what: &str) -> Error {
    Error::PuzzleFile(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("malformed puzzle file ({what})"),
    ))
}

//! End-to-end scenarios for the public solve API.

use std::time::Instant;

use pretty_assertions::assert_eq;

use formica::{solve, Board, SolveRequest, ALG_ACS, ALG_PARALLEL_ACS};

const EASY: &str = "53..7....6..195....98....6.8...6...34..8.3..17...2...6.6....28....419..5....8..79";
const EASY_SOLUTION: &str =
    "534678912672195348198342567859761423426853791713924856961537284287419635345286179";
const HARD: &str = "1....7.9..3..2...8..96..5....53..9...1..8...26....4...3......1..4......7..7...3..";

fn request(puzzle: impl Into<String>, algorithm: u32) -> SolveRequest {
    let mut request = SolveRequest::new(puzzle);
    request.algorithm = algorithm;
    request
}

#[test]
fn easy_9x9_solves_exactly() {
    let mut req = request(EASY, ALG_ACS);
    req.timeout_seconds = 5.0;
    let result = solve(&req).unwrap();
    assert!(result.success, "easy puzzle must solve: {}", result.error);
    assert_eq!(result.solution, EASY_SOLUTION);
    assert!(result.iterations >= 1);
}

#[test]
fn blank_9x9_any_valid_completion() {
    let blank = ".".repeat(81);
    let mut req = request(blank.clone(), ALG_ACS);
    req.timeout_seconds = 10.0;
    let result = solve(&req).unwrap();
    assert!(result.success, "blank board must solve: {}", result.error);

    let blank_board: Board = blank.parse().unwrap();
    let solution: Board = result.solution.parse().unwrap();
    assert!(blank_board.check_solution(&solution));
}

#[test]
fn infeasible_puzzle_is_reported() {
    let mut puzzle = String::from("55");
    puzzle.push_str(&".".repeat(79));
    let result = solve(&request(puzzle, ALG_ACS)).unwrap();
    assert!(!result.success);
    assert_eq!(result.error, "infeasible after propagation");
}

#[test]
fn parallel_solves_and_communicates() {
    let mut req = request(".".repeat(81), ALG_PARALLEL_ACS);
    req.subcolonies = 4;
    req.ants = 10;
    req.timeout_seconds = 10.0;
    let result = solve(&req).unwrap();
    assert!(result.success, "parallel solve failed: {}", result.error);
    if result.iterations >= 100 {
        assert!(result.communication);
    }
}

#[test]
fn order_4_puzzle_detected_and_solved() {
    let full = valid_16x16_grid();
    let mut puzzle: Vec<char> = full.chars().collect();
    for i in (0..puzzle.len()).step_by(7) {
        puzzle[i] = '.';
    }
    let puzzle: String = puzzle.into_iter().collect();
    assert_eq!(puzzle.len(), 256);

    let mut req = request(puzzle, ALG_ACS);
    req.timeout_seconds = 20.0;
    let result = solve(&req).unwrap();
    assert!(result.success, "16x16 puzzle failed: {}", result.error);
    assert_eq!(result.solution, full);
}

#[test]
fn timeout_returns_promptly_with_best_partial() {
    let mut req = request(HARD, ALG_PARALLEL_ACS);
    req.subcolonies = 2;
    req.timeout_seconds = 1.0;

    let timer = Instant::now();
    let result = solve(&req).unwrap();
    let elapsed = timer.elapsed().as_secs_f32();

    assert!(elapsed < 1.5, "took {elapsed} s against a 1 s budget");
    assert!(result.iterations > 0);
    assert_eq!(result.solution.len(), 81);
    if !result.success {
        // Best partial keeps at least the givens and deductions.
        let hard_board: Board = HARD.parse().unwrap();
        let partial: Board = result.solution.parse().unwrap();
        assert!(partial.fixed_cell_count() >= hard_board.fixed_cell_count());
    }
}

/// A complete valid 16x16 grid from the standard shift construction:
/// cell(r, c) = (r·4 + r/4 + c) mod 16, rendered in the order-4 alphabet.
fn valid_16x16_grid() -> String {
    let alphabet: Vec<char> = "0123456789abcdef".chars().collect();
    let mut out = String::with_capacity(256);
    for r in 0..16 {
        for c in 0..16 {
            let value = (r * 4 + r / 4 + c) % 16;
            out.push(alphabet[value]);
        }
    }
    out
}

use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::board::Board;
use crate::error::{Error, Result};
use crate::propagation;
use crate::solver::acs::AntSystem;
use crate::solver::colony::AcsConfig;
use crate::solver::parallel::ParallelAntSystem;

/// Single-threaded Ant Colony System.
pub const ALG_ACS: u32 = 0;
/// Parallel multi-colony Ant Colony System.
pub const ALG_PARALLEL_ACS: u32 = 2;

/// One solve request: the puzzle plus algorithm selection and tuning.
#[derive(Debug, Clone)]
pub struct SolveRequest {
    /// Flat puzzle string; length picks the board order (81, 256, 625,
    /// 1296, 2401 or 4096).
    pub puzzle: String,
    /// [`ALG_ACS`] or [`ALG_PARALLEL_ACS`].
    pub algorithm: u32,
    /// Number of sub-colonies; only meaningful for the parallel algorithm,
    /// clamped to at least one.
    pub subcolonies: usize,
    /// Ants per colony, clamped to at least one.
    pub ants: usize,
    /// Wall-clock budget in seconds. Non-positive selects a default by
    /// board size: 5 s for 9x9, 20 s for 16x16, 120 s beyond.
    pub timeout_seconds: f32,
    pub q0: f32,
    pub rho: f32,
    pub best_evap: f32,
}

impl SolveRequest {
    pub fn new(puzzle: impl Into<String>) -> Self {
        Self {
            puzzle: puzzle.into(),
            algorithm: ALG_ACS,
            subcolonies: 4,
            ants: 10,
            timeout_seconds: -1.0,
            q0: 0.9,
            rho: 0.9,
            best_evap: 0.005,
        }
    }
}

/// Outcome of one solve request.
///
/// `success == false` covers both timeout (best partial in `solution`) and
/// an infeasible puzzle (`error` says so); structural problems with the
/// request never produce a `SolveResult` at all.
#[derive(Debug, Clone, Serialize)]
pub struct SolveResult {
    pub success: bool,
    /// Flat board encoding, `'.'` for cells left open.
    pub solution: String,
    #[serde(rename = "time")]
    pub time_seconds: f64,
    pub iterations: usize,
    pub communication: bool,
    pub error: String,
    /// Seconds of constraint propagation during board construction.
    pub cp_initial: f64,
    /// Seconds of constraint propagation during ant construction, summed
    /// over all colony threads.
    pub cp_ant_total: f64,
    /// Propagating assignments outside the initial phase.
    pub cp_calls: usize,
}

/// Default wall-clock budget for a board of `cell_count` cells.
pub fn default_timeout(cell_count: usize) -> f32 {
    match cell_count {
        81 => 5.0,
        256 => 20.0,
        _ => 120.0,
    }
}

/// Parses and propagates the puzzle, runs the requested algorithm and
/// reports the outcome.
///
/// Structural errors ([`Error::InvalidPuzzleSize`], [`Error::InvalidClue`],
/// [`Error::InvalidAlgorithm`]) are returned before any solver starts. An
/// initial propagation that empties a cell short-circuits with
/// `success == false`; the solver is never launched on an infeasible board.
pub fn solve(request: &SolveRequest) -> Result<SolveResult> {
    if request.algorithm != ALG_ACS && request.algorithm != ALG_PARALLEL_ACS {
        return Err(Error::InvalidAlgorithm(request.algorithm));
    }

    propagation::reset_cp_timing();
    let board: Board = request.puzzle.parse()?;

    let timeout = if request.timeout_seconds > 0.0 {
        request.timeout_seconds
    } else {
        default_timeout(board.cell_count())
    };

    if board.infeasible_count() > 0 {
        return Ok(SolveResult {
            success: false,
            solution: board.line_string(),
            time_seconds: 0.0,
            iterations: 0,
            communication: false,
            error: "infeasible after propagation".to_string(),
            cp_initial: propagation::initial_cp_seconds(),
            cp_ant_total: propagation::ant_cp_seconds(),
            cp_calls: propagation::cp_call_count(),
        });
    }

    debug!(
        algorithm = request.algorithm,
        cells = board.cell_count(),
        fixed = board.fixed_cell_count(),
        timeout,
        "starting solver"
    );

    let cfg = AcsConfig {
        ants: request.ants.max(1),
        q0: request.q0,
        rho: request.rho,
        best_evap: request.best_evap,
    };

    let timer = Instant::now();
    let (mut success, solution, iterations, communication) =
        if request.algorithm == ALG_ACS {
            let mut system = AntSystem::new(cfg);
            let success = system.solve(&board, timeout);
            (
                success,
                system.solution().clone(),
                system.iterations_completed(),
                false,
            )
        } else {
            let mut system = ParallelAntSystem::new(request.subcolonies, cfg);
            let success = system.solve(&board, timeout);
            (
                success,
                system.solution().clone(),
                system.iterations_completed(),
                system.communication_occurred(),
            )
        };
    let time_seconds = timer.elapsed().as_secs_f64();

    let mut error = String::new();
    if success && !board.check_solution(&solution) {
        success = false;
        error = "solution not valid".to_string();
    }

    Ok(SolveResult {
        success,
        solution: solution.line_string(),
        time_seconds,
        iterations,
        communication,
        error,
        cp_initial: propagation::initial_cp_seconds(),
        cp_ant_total: propagation::ant_cp_seconds(),
        cp_calls: propagation::cp_call_count(),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn rejects_unknown_algorithm() {
        let mut request = SolveRequest::new(".".repeat(81));
        request.algorithm = 1;
        assert!(matches!(
            solve(&request),
            Err(Error::InvalidAlgorithm(1))
        ));
    }

    #[test]
    fn rejects_bad_puzzle_before_solving() {
        let request = SolveRequest::new("not a puzzle");
        assert!(matches!(
            solve(&request),
            Err(Error::InvalidPuzzleSize(12))
        ));
    }

    #[test]
    fn infeasible_puzzle_reported_without_solving() {
        let mut puzzle = String::from("55");
        puzzle.push_str(&".".repeat(79));
        let result = solve(&SolveRequest::new(puzzle)).unwrap();
        assert!(!result.success);
        assert_eq!(result.error, "infeasible after propagation");
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn default_timeouts_by_size() {
        assert_eq!(default_timeout(81), 5.0);
        assert_eq!(default_timeout(256), 20.0);
        assert_eq!(default_timeout(625), 120.0);
        assert_eq!(default_timeout(4096), 120.0);
    }

    #[test]
    fn result_serializes_to_flat_json() {
        let result = SolveResult {
            success: true,
            solution: "123".to_string(),
            time_seconds: 0.5,
            iterations: 7,
            communication: false,
            error: String::new(),
            cp_initial: 0.001,
            cp_ant_total: 0.0,
            cp_calls: 0,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["time"], 0.5);
        assert_eq!(json["iterations"], 7);
    }
}

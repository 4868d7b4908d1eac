pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors surfaced by the solver core.
///
/// Structural problems with the input (`InvalidPuzzleSize`, `InvalidClue`,
/// `InvalidAlgorithm`, `MissingPuzzle`) are reported before any solver
/// starts. Running out of time or hitting an infeasible puzzle is *not* an
/// error: both are reported through [`SolveResult`](crate::SolveResult) with
/// `success == false`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("wrong number of cells for a sudoku board: {0}")]
    InvalidPuzzleSize(usize),

    #[error("invalid clue {clue:?} at cell {cell} for a {units}x{units} board")]
    InvalidClue { clue: char, cell: usize, units: usize },

    #[error("invalid algorithm: {0}; use 0 (single-thread ACS) or 2 (parallel ACS)")]
    InvalidAlgorithm(u32),

    #[error("value {value} outside universe 1..={universe}")]
    InvalidUniverse { value: usize, universe: usize },

    #[error("no puzzle specified")]
    MissingPuzzle,

    #[error("could not read puzzle file: {0}")]
    PuzzleFile(#[from] std::io::Error),
}

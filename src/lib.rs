//! Formica is a Sudoku solver built around a cooperating multi-colony Ant
//! Colony System, with a constraint-propagation preprocessor that shrinks
//! the search space before any ant moves.
//!
//! The architecture has two layers: a deductive frontend and a stochastic
//! backend.
//!
//! - **Board and propagation**: a [`Board`] stores one candidate bitset
//!   ([`ValueSet`]) per cell. Parsing a puzzle installs every clue through
//!   the propagator, which applies elimination and hidden-single rules that
//!   cascade recursively through rows, columns and boxes.
//! - **Ant colony search**: what propagation cannot deduce is searched by
//!   pheromone-guided ants. Algorithm 0 ([`solver::acs::AntSystem`]) runs a
//!   single colony; algorithm 2 ([`solver::parallel::ParallelAntSystem`])
//!   runs several colonies on parallel threads that periodically exchange
//!   solutions over ring and random topologies, then fold three solution
//!   sources into their pheromone matrices.
//!
//! The search is a heuristic: it is bounded by a wall-clock deadline and
//! reports the best partial filling when no complete solution appears in
//! time.
//!
//! # Example
//!
//! ```
//! use formica::{solve, SolveRequest};
//!
//! let easy =
//!     "53..7....6..195....98....6.8...6...34..8.3..17...2...6.6....28....419..5....8..79";
//! let result = solve(&SolveRequest::new(easy)).unwrap();
//! assert!(result.success);
//! assert_eq!(result.solution.len(), 81);
//! ```

pub mod board;
pub mod error;
pub mod propagation;
pub mod solver;
pub mod value_set;

pub use board::Board;
pub use error::{Error, Result};
pub use solver::api::{solve, SolveRequest, SolveResult, ALG_ACS, ALG_PARALLEL_ACS};
pub use value_set::ValueSet;

use std::time::Instant;

use rand::RngCore;
use tracing::debug;

use crate::board::Board;
use crate::solver::ant::Ant;
use crate::solver::colony::{AcsConfig, ColonyCore};

/// Single-threaded Ant Colony System (algorithm 0).
///
/// Owns one pheromone matrix and one ant population. Each iteration every
/// ant rebuilds a candidate solution from the propagated puzzle; the best
/// construction so far is reinforced through the standard ACS global update
/// while the local update (applied during construction) keeps pushing
/// explored entries back toward `τ₀`.
///
/// Reference: Dorigo & Gambardella (1997), Ant Colony System.
pub struct AntSystem {
    core: ColonyCore,
    ants: Vec<Ant>,
    cfg: AcsConfig,
    best_sol: Option<Board>,
    best_pher: f32,
    iterations: usize,
    sol_time: f64,
}

impl AntSystem {
    /// A system seeded from OS entropy.
    pub fn new(cfg: AcsConfig) -> Self {
        Self::with_seed(cfg, rand::thread_rng().next_u64())
    }

    /// A deterministically seeded system. With a fixed seed the sequence of
    /// iteration-best solutions is reproducible.
    pub fn with_seed(cfg: AcsConfig, seed: u64) -> Self {
        Self {
            core: ColonyCore::new(&cfg, seed),
            ants: Vec::new(),
            cfg,
            best_sol: None,
            best_pher: 0.0,
            iterations: 0,
            sol_time: 0.0,
        }
    }

    /// Runs the colony against `puzzle` until a complete solution appears or
    /// `max_time` seconds of wall clock elapse. Returns true when solved.
    ///
    /// The deadline is only checked every 100 iterations; termination is
    /// "before starting a new iteration past the deadline", not exact.
    pub fn solve(&mut self, puzzle: &Board, max_time: f32) -> bool {
        let timer = Instant::now();
        let num_cells = puzzle.cell_count();

        self.core.init_for(puzzle);
        self.ants = (0..self.cfg.ants).map(|_| Ant::new(puzzle)).collect();
        self.best_sol = Some(puzzle.clone());
        self.best_pher = 0.0;
        self.sol_time = 0.0;

        let mut iter = 0;
        let mut solved = false;

        while !solved {
            for ant in &mut self.ants {
                let start = self.core.random_start();
                ant.init_solution(puzzle, start);
            }
            // Round-robin stepping: all ants fill their k-th cell before any
            // fills its (k+1)-th.
            for _ in 0..num_cells {
                for ant in &mut self.ants {
                    ant.step(&mut self.core);
                }
            }

            let (i_best, best_val) = self.iteration_best();

            if best_val == num_cells {
                // Complete; handled before the deposit to avoid dividing by
                // zero in the quality score.
                let best = self.best_sol.as_mut().expect("initialized above");
                best.clone_from(self.ants[i_best].solution());
                self.sol_time = timer.elapsed().as_secs_f64();
                solved = true;
            } else {
                let deposit = self.core.deposit_for(best_val);
                if deposit > self.best_pher {
                    let best = self.best_sol.as_mut().expect("initialized above");
                    best.clone_from(self.ants[i_best].solution());
                    self.best_pher = deposit;
                }
                let best = self.best_sol.as_ref().expect("initialized above");
                self.core.reinforce(best, self.best_pher);
                self.best_pher *= 1.0 - self.cfg.best_evap;
            }

            iter += 1;

            if !solved && iter % 100 == 0 && timer.elapsed().as_secs_f32() > max_time {
                break;
            }
        }

        self.iterations = iter;
        debug!(iterations = iter, solved, "ant system finished");
        solved
    }

    /// Index and fill count of the best ant this iteration; earlier ants win
    /// ties.
    fn iteration_best(&self) -> (usize, usize) {
        let mut i_best = 0;
        let mut best_val = 0;
        for (i, ant) in self.ants.iter().enumerate() {
            if ant.num_cells_filled() > best_val {
                best_val = ant.num_cells_filled();
                i_best = i;
            }
        }
        (i_best, best_val)
    }

    /// Best board found, which is the untouched puzzle before the first
    /// iteration completes.
    pub fn solution(&self) -> &Board {
        self.best_sol.as_ref().expect("solve() ran")
    }

    pub fn iterations_completed(&self) -> usize {
        self.iterations
    }

    /// Seconds from solve start to the completing iteration; 0 when the
    /// puzzle was not solved.
    pub fn solution_time(&self) -> f64 {
        self.sol_time
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const EASY: &str = "53..7....6..195....98....6.8...6...34..8.3..17...2...6.6....28....419..5....8..79";
    const EASY_SOLUTION: &str =
        "534678912672195348198342567859761423426853791713924856961537284287419635345286179";

    #[test]
    fn solves_fully_propagated_puzzle_immediately() {
        let puzzle: Board = EASY.parse().unwrap();
        let mut system = AntSystem::with_seed(AcsConfig::default(), 11);
        assert!(system.solve(&puzzle, 5.0));
        assert_eq!(system.iterations_completed(), 1);
        assert_eq!(system.solution().line_string(), EASY_SOLUTION);
        assert!(puzzle.check_solution(system.solution()));
    }

    #[test]
    fn deterministic_under_fixed_seed() {
        let blank: Board = ".".repeat(81).parse().unwrap();

        let run = |seed| {
            let mut system = AntSystem::with_seed(AcsConfig::default(), seed);
            system.solve(&blank, 10.0);
            (
                system.iterations_completed(),
                system.solution().line_string(),
            )
        };

        assert_eq!(run(99), run(99));
    }

    #[test]
    fn solves_blank_board() {
        let blank: Board = ".".repeat(81).parse().unwrap();
        let mut system = AntSystem::with_seed(AcsConfig::default(), 5);
        assert!(system.solve(&blank, 10.0));
        assert!(blank.check_solution(system.solution()));
    }

    #[test]
    fn timeout_returns_best_partial() {
        let hard: Board =
            "1....7.9..3..2...8..96..5....53..9...1..8...26....4...3......1..4......7..7...3.."
                .parse()
                .unwrap();
        let mut system = AntSystem::with_seed(AcsConfig::default(), 2);
        let timer = std::time::Instant::now();
        let solved = system.solve(&hard, 0.3);
        // Either solved within budget or stopped at a 100-iteration check.
        if !solved {
            assert!(timer.elapsed().as_secs_f32() < 2.0);
            assert!(system.solution().fixed_cell_count() >= hard.fixed_cell_count());
        }
        assert!(system.iterations_completed() > 0);
    }
}

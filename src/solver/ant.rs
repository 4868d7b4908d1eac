use crate::board::Board;
use crate::solver::colony::Colony;
use crate::value_set::ValueSet;

/// One ant: a working board built up cell by cell under the parent colony's
/// pheromone policy.
///
/// The cursor walks the board in linear order starting from a randomized
/// cell and wrapping modulo the cell count, so one pass of
/// [`Ant::step`] per cell visits every cell exactly once. Cells the ant
/// cannot fill consistently are skipped and counted in `fail_cells`.
pub struct Ant {
    sol: Board,
    i_cell: usize,
    fail_cells: usize,
    // Roulette scratch, reused across steps: cumulative weights and the
    // candidate value at each slot.
    roulette: Vec<f32>,
    roulette_vals: Vec<usize>,
}

impl Ant {
    pub fn new(puzzle: &Board) -> Self {
        Self {
            sol: puzzle.clone(),
            i_cell: 0,
            fail_cells: 0,
            roulette: Vec::with_capacity(puzzle.num_units()),
            roulette_vals: Vec::with_capacity(puzzle.num_units()),
        }
    }

    /// Restarts the ant on a fresh copy of `puzzle` with its cursor at
    /// `start_cell`.
    pub fn init_solution(&mut self, puzzle: &Board, start_cell: usize) {
        self.sol.clone_from(puzzle);
        self.i_cell = start_cell;
        self.fail_cells = 0;
    }

    /// Fills (or fails) the cell under the cursor, then advances.
    ///
    /// A candidate value is consistent when no already-fixed peer in the
    /// working board holds it; unfixed peers do not constrain the choice.
    /// Among consistent candidates the ant exploits the highest-pheromone
    /// value with probability `q0`, otherwise it spins a roulette wheel
    /// weighted by pheromone. Assignments do not propagate.
    pub fn step<C: Colony>(&mut self, colony: &mut C) {
        let i = self.i_cell;
        let cell = self.sol.cell(i);

        if !cell.is_fixed() {
            let consistent = cell - self.fixed_peer_values(i);
            if consistent.is_empty() {
                self.fail_cells += 1;
            } else {
                let value = if colony.sample() < colony.q0() {
                    self.greedy_choice(i, consistent, colony)
                } else {
                    self.roulette_choice(i, consistent, colony)
                };
                self.sol
                    .set_cell_direct(i, ValueSet::singleton_in(self.sol.num_units(), value));
                self.sol.increment_fixed_cells();
                colony.local_pheromone_update(i, value - 1);
            }
        }

        self.i_cell = (self.i_cell + 1) % self.sol.cell_count();
    }

    /// Union of the values held by fixed peers of cell `i`.
    fn fixed_peer_values(&self, i: usize) -> ValueSet {
        let units = self.sol.num_units();
        let row = self.sol.row_for_cell(i);
        let col = self.sol.col_for_cell(i);
        let boxi = self.sol.box_for_cell(i);

        let mut fixed = ValueSet::empty(units);
        for j in 0..units {
            for k in [
                self.sol.box_cell(boxi, j),
                self.sol.col_cell(col, j),
                self.sol.row_cell(row, j),
            ] {
                if k != i && self.sol.cell(k).is_fixed() {
                    fixed = fixed | self.sol.cell(k);
                }
            }
        }
        fixed
    }

    /// Highest-pheromone candidate; the first encountered wins ties.
    fn greedy_choice<C: Colony>(&self, i: usize, candidates: ValueSet, colony: &C) -> usize {
        let mut best_value = 0;
        let mut best_tau = f32::NEG_INFINITY;
        for v in candidates.iter() {
            let tau = colony.pheromone(i, v - 1);
            if tau > best_tau {
                best_tau = tau;
                best_value = v;
            }
        }
        best_value
    }

    /// Roulette-wheel selection proportional to pheromone.
    fn roulette_choice<C: Colony>(&mut self, i: usize, candidates: ValueSet, colony: &mut C) -> usize {
        self.roulette.clear();
        self.roulette_vals.clear();
        let mut total = 0.0;
        for v in candidates.iter() {
            total += colony.pheromone(i, v - 1);
            self.roulette.push(total);
            self.roulette_vals.push(v);
        }

        let x = colony.sample() * total;
        for (slot, &cumulative) in self.roulette.iter().enumerate() {
            if x < cumulative {
                return self.roulette_vals[slot];
            }
        }
        // Rounding pushed x past the last slot.
        *self.roulette_vals.last().expect("candidates are nonempty")
    }

    /// The ant's working board.
    pub fn solution(&self) -> &Board {
        &self.sol
    }

    /// Cells successfully filled this pass: all cells minus the failures.
    pub fn num_cells_filled(&self) -> usize {
        self.sol.cell_count() - self.fail_cells
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::solver::colony::{AcsConfig, ColonyCore};

    const EASY: &str = "53..7....6..195....98....6.8...6...34..8.3..17...2...6.6....28....419..5....8..79";

    fn run_one_pass(puzzle: &Board, seed: u64) -> Ant {
        let mut core = ColonyCore::new(&AcsConfig::default(), seed);
        core.init_for(puzzle);
        let mut ant = Ant::new(puzzle);
        let start = core.random_start();
        ant.init_solution(puzzle, start);
        for _ in 0..puzzle.cell_count() {
            ant.step(&mut core);
        }
        ant
    }

    #[test]
    fn complete_fill_is_a_valid_solution() {
        let puzzle: Board = EASY.parse().unwrap();
        // The easy puzzle is fully deduced by propagation, so every pass
        // fills all cells trivially and the result must verify.
        let ant = run_one_pass(&puzzle, 1);
        assert_eq!(ant.num_cells_filled(), puzzle.cell_count());
        assert!(puzzle.check_solution(ant.solution()));
    }

    #[test]
    fn fills_are_always_consistent() {
        let blank: Board = ".".repeat(81).parse().unwrap();
        let ant = run_one_pass(&blank, 42);

        // However many cells were filled, no unit may contain a duplicate.
        let unit_fns: [fn(&Board, usize, usize) -> usize; 3] =
            [Board::row_cell, Board::col_cell, Board::box_cell];
        for unit_cell in unit_fns {
            for u in 0..blank.num_units() {
                let mut seen = ValueSet::empty(blank.num_units());
                for k in 0..blank.num_units() {
                    let cell = ant.solution().cell(unit_cell(&blank, u, k));
                    if let Some(v) = cell.index() {
                        assert!(!seen.contains(v + 1), "duplicate value in a unit");
                        seen = seen | cell;
                    }
                }
            }
        }
    }

    #[test]
    fn failed_cells_are_counted_not_filled() {
        let blank: Board = ".".repeat(81).parse().unwrap();
        let ant = run_one_pass(&blank, 7);
        let unfixed = (0..81)
            .filter(|&i| !ant.solution().cell(i).is_fixed())
            .count();
        assert_eq!(ant.num_cells_filled(), 81 - unfixed);
    }

    #[test]
    fn restart_resets_state() {
        let blank: Board = ".".repeat(81).parse().unwrap();
        let mut core = ColonyCore::new(&AcsConfig::default(), 3);
        core.init_for(&blank);
        let mut ant = Ant::new(&blank);

        ant.init_solution(&blank, 5);
        for _ in 0..blank.cell_count() {
            ant.step(&mut core);
        }
        ant.init_solution(&blank, 5);
        assert_eq!(ant.num_cells_filled(), blank.cell_count());
        assert_eq!(ant.solution().fixed_cell_count(), 0);
    }
}

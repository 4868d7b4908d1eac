use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::board::Board;

/// Tunables shared by both ACS variants.
///
/// `pher0` is not here because it depends on the puzzle: it is fixed at
/// `1 / numCells` when a colony is initialized for a board.
#[derive(Debug, Clone, Copy)]
pub struct AcsConfig {
    /// Ants per colony.
    pub ants: usize,
    /// Exploitation probability: with probability `q0` an ant greedily takes
    /// the highest-pheromone value, otherwise it samples proportionally.
    pub q0: f32,
    /// Evaporation rate for the global and three-source pheromone updates.
    pub rho: f32,
    /// Decay applied to the scalar best-deposit between iterations.
    pub best_evap: f32,
}

impl Default for AcsConfig {
    fn default() -> Self {
        Self {
            ants: 10,
            q0: 0.9,
            rho: 0.9,
            best_evap: 0.005,
        }
    }
}

/// The capability set an ant needs from the colony it belongs to.
///
/// Both the single-colony system and the parallel sub-colony implement this,
/// so [`Ant`](crate::solver::ant::Ant) stays agnostic about which one is
/// stepping it.
pub trait Colony {
    /// Exploitation probability for the pseudo-random proportional rule.
    fn q0(&self) -> f32;

    /// One sample from U[0,1).
    fn sample(&mut self) -> f32;

    /// Pheromone for assigning value index `value` (0-based) to `cell`.
    fn pheromone(&self, cell: usize, value: usize) -> f32;

    /// ACS local update: nudge the chosen entry back toward `pher0` so the
    /// next ant is less likely to repeat the exact same construction.
    fn local_pheromone_update(&mut self, cell: usize, value: usize);
}

/// Pheromone matrix, RNG and parameters of one colony.
///
/// Exclusively owned by its colony; ants reach it through [`Colony`] with a
/// mutable borrow taken per step, never across threads.
pub(crate) struct ColonyCore {
    /// `num_cells x num_units` desirability matrix, row-major.
    pher: Vec<f32>,
    num_cells: usize,
    num_units: usize,
    q0: f32,
    rho: f32,
    pher0: f32,
    rng: SmallRng,
}

impl ColonyCore {
    pub fn new(cfg: &AcsConfig, seed: u64) -> Self {
        Self {
            pher: Vec::new(),
            num_cells: 0,
            num_units: 0,
            q0: cfg.q0,
            rho: cfg.rho,
            pher0: 0.0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Sizes the pheromone matrix for `puzzle` and resets every entry to
    /// `τ₀ = 1 / numCells`.
    pub fn init_for(&mut self, puzzle: &Board) {
        self.num_cells = puzzle.cell_count();
        self.num_units = puzzle.num_units();
        self.pher0 = 1.0 / self.num_cells as f32;
        self.pher.clear();
        self.pher.resize(self.num_cells * self.num_units, self.pher0);
    }

    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    /// Uniform starting cell for an ant.
    pub fn random_start(&mut self) -> usize {
        self.rng.gen_range(0..self.num_cells)
    }

    /// Deposit for a solution that filled `cells_filled` cells. Callers must
    /// handle the complete-solution case first; a full board would divide by
    /// zero here.
    pub fn deposit_for(&self, cells_filled: usize) -> f32 {
        self.num_cells as f32 / (self.num_cells - cells_filled) as f32
    }

    /// ACS global update: evaporate-and-reinforce every entry on the best
    /// solution's path.
    ///
    /// `τ[i][v] ← (1−ρ)·τ[i][v] + ρ·deposit` for each fixed cell `i` holding
    /// value `v`.
    pub fn reinforce(&mut self, best: &Board, deposit: f32) {
        for i in 0..self.num_cells {
            if let Some(v) = best.cell(i).index() {
                let tau = &mut self.pher[i * self.num_units + v];
                *tau = *tau * (1.0 - self.rho) + self.rho * deposit;
            }
        }
    }

    /// Evaporate-and-reinforce a single entry with an explicit contribution,
    /// used by the three-source communication update.
    pub fn reinforce_entry(&mut self, cell: usize, value: usize, contribution: f32) {
        let tau = &mut self.pher[cell * self.num_units + value];
        *tau = *tau * (1.0 - self.rho) + self.rho * contribution;
    }
}

impl Colony for ColonyCore {
    fn q0(&self) -> f32 {
        self.q0
    }

    fn sample(&mut self) -> f32 {
        self.rng.gen()
    }

    fn pheromone(&self, cell: usize, value: usize) -> f32 {
        self.pher[cell * self.num_units + value]
    }

    fn local_pheromone_update(&mut self, cell: usize, value: usize) {
        let tau = &mut self.pher[cell * self.num_units + value];
        *tau = *tau * 0.9 + self.pher0 * 0.1;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn core_for(puzzle: &Board) -> ColonyCore {
        let mut core = ColonyCore::new(&AcsConfig::default(), 7);
        core.init_for(puzzle);
        core
    }

    #[test]
    fn pheromone_initialized_uniformly() {
        let puzzle: Board = ".".repeat(81).parse().unwrap();
        let core = core_for(&puzzle);
        let tau0 = 1.0 / 81.0;
        for i in 0..81 {
            for v in 0..9 {
                assert_eq!(core.pheromone(i, v), tau0);
            }
        }
    }

    #[test]
    fn local_update_stays_between_old_and_tau0() {
        let puzzle: Board = ".".repeat(81).parse().unwrap();
        let mut core = core_for(&puzzle);
        let tau0 = 1.0 / 81.0;

        core.reinforce_entry(3, 4, 5.0); // push the entry well above tau0
        let high = core.pheromone(3, 4);
        core.local_pheromone_update(3, 4);
        let after = core.pheromone(3, 4);
        assert!(after < high && after > tau0);

        for _ in 0..8 {
            core.reinforce_entry(3, 4, 0.0); // and pull the entry far below
        }
        let low = core.pheromone(3, 4);
        core.local_pheromone_update(3, 4);
        let after = core.pheromone(3, 4);
        assert!(after > low && after < tau0);
        assert!(after >= 0.0);
    }

    #[test]
    fn deposit_grows_with_quality() {
        let puzzle: Board = ".".repeat(81).parse().unwrap();
        let core = core_for(&puzzle);
        assert!(core.deposit_for(80) > core.deposit_for(60));
        assert_eq!(core.deposit_for(0), 1.0);
    }

    #[test]
    fn samples_are_unit_interval() {
        let puzzle: Board = ".".repeat(81).parse().unwrap();
        let mut core = core_for(&puzzle);
        for _ in 0..1000 {
            let x = core.sample();
            assert!((0.0..1.0).contains(&x));
        }
    }
}

use crate::board::Board;
use crate::solver::ant::Ant;
use crate::solver::colony::{AcsConfig, ColonyCore};

/// One colony of the parallel system: the single-colony machinery plus
/// slots for solutions received from peers during communication rounds.
///
/// Every field is exclusively owned by the colony's worker thread; the
/// coordinator writes the `received_*` slots only inside the barrier
/// critical section while the owner is parked.
pub struct SubColony {
    core: ColonyCore,
    ants: Vec<Ant>,
    cfg: AcsConfig,

    iteration_best: Option<Board>,
    iteration_best_score: usize,
    best_sol: Option<Board>,
    best_sol_score: usize,
    /// Peer's iteration-best, delivered over the ring topology.
    received_iteration_best: Option<Board>,
    received_iteration_best_score: usize,
    /// Peer's best-so-far, delivered over the random topology.
    received_best_sol: Option<Board>,
    received_best_sol_score: usize,

    /// Scalar deposit tracking the best-so-far, for the standard update.
    best_pher: f32,
    /// Iterations this colony has run; read by the coordinator after join.
    current_iteration: usize,

    // Per-cell scratch for the three-source update.
    contributions: Vec<f32>,
    touched: Vec<bool>,
}

impl SubColony {
    pub fn new(cfg: AcsConfig, seed: u64) -> Self {
        Self {
            core: ColonyCore::new(&cfg, seed),
            ants: Vec::new(),
            cfg,
            iteration_best: None,
            iteration_best_score: 0,
            best_sol: None,
            best_sol_score: 0,
            received_iteration_best: None,
            received_iteration_best_score: 0,
            received_best_sol: None,
            received_best_sol_score: 0,
            best_pher: 0.0,
            current_iteration: 0,
            contributions: Vec::new(),
            touched: Vec::new(),
        }
    }

    /// Prepares the colony for a new puzzle: fresh ants, uniform pheromone,
    /// all solution slots reset to the propagated puzzle.
    pub fn initialize(&mut self, puzzle: &Board) {
        self.core.init_for(puzzle);
        self.ants = (0..self.cfg.ants).map(|_| Ant::new(puzzle)).collect();

        self.iteration_best = Some(puzzle.clone());
        self.best_sol = Some(puzzle.clone());
        self.received_iteration_best = Some(puzzle.clone());
        self.received_best_sol = Some(puzzle.clone());

        self.iteration_best_score = puzzle.fixed_cell_count();
        self.best_sol_score = puzzle.fixed_cell_count();
        self.received_iteration_best_score = 0;
        self.received_best_sol_score = 0;
        self.best_pher = 0.0;
        self.current_iteration = 0;

        self.contributions = vec![0.0; puzzle.num_units()];
        self.touched = vec![false; puzzle.num_units()];
    }

    /// One construction-and-evaluation pass: every ant rebuilds a solution,
    /// the iteration-best is recorded, and the best-so-far is updated when
    /// beaten.
    pub fn run_iteration(&mut self, puzzle: &Board) {
        for ant in &mut self.ants {
            let start = self.core.random_start();
            ant.init_solution(puzzle, start);
        }
        for _ in 0..puzzle.cell_count() {
            for ant in &mut self.ants {
                ant.step(&mut self.core);
            }
        }

        let mut i_best = 0;
        let mut best_val = 0;
        for (i, ant) in self.ants.iter().enumerate() {
            if ant.num_cells_filled() > best_val {
                best_val = ant.num_cells_filled();
                i_best = i;
            }
        }

        let iteration_best = self.iteration_best.as_mut().expect("initialized");
        iteration_best.clone_from(self.ants[i_best].solution());
        self.iteration_best_score = best_val;

        if best_val == puzzle.cell_count() {
            // Complete solutions always displace the best; computing the
            // deposit here would divide by zero.
            let best = self.best_sol.as_mut().expect("initialized");
            best.clone_from(self.ants[i_best].solution());
            self.best_sol_score = best_val;
        } else {
            let deposit = self.core.deposit_for(best_val);
            if deposit > self.best_pher {
                let best = self.best_sol.as_mut().expect("initialized");
                best.clone_from(self.ants[i_best].solution());
                self.best_sol_score = best_val;
                self.best_pher = deposit;
            }
        }
    }

    /// Standard ACS global update from the colony's own best-so-far.
    pub fn update_pheromone(&mut self) {
        let best = self.best_sol.as_ref().expect("initialized");
        self.core.reinforce(best, self.best_pher);
    }

    /// Decay of the scalar best deposit, applied on non-communication
    /// iterations only.
    pub fn decay_best_pher(&mut self) {
        self.best_pher *= 1.0 - self.cfg.best_evap;
    }

    /// Three-source pheromone update, run after a communication round.
    ///
    /// Deposits from the local iteration-best, the ring neighbour's
    /// iteration-best and the random partner's best-so-far are summed per
    /// `(cell, value)` entry; only touched entries evaporate (selective
    /// evaporation), everything else is left alone.
    pub fn update_pheromone_with_communication(&mut self) {
        let num_cells = self.core.num_cells();
        let sources = [
            (&self.iteration_best, self.iteration_best_score),
            (
                &self.received_iteration_best,
                self.received_iteration_best_score,
            ),
            (&self.received_best_sol, self.received_best_sol_score),
        ];

        let deposits: Vec<f32> = sources
            .iter()
            .map(|&(_, score)| {
                if score > 0 && score < num_cells {
                    self.core.deposit_for(score)
                } else if score == num_cells {
                    // A finished board cannot be scored by the usual formula;
                    // weight it like a near-complete one.
                    self.core.deposit_for(score - 1)
                } else {
                    0.0
                }
            })
            .collect();

        for i in 0..num_cells {
            self.contributions.fill(0.0);
            self.touched.fill(false);

            for ((board, score), &deposit) in sources.iter().zip(&deposits) {
                if *score == 0 {
                    continue;
                }
                let board = board.as_ref().expect("initialized");
                if let Some(v) = board.cell(i).index() {
                    self.contributions[v] += deposit;
                    self.touched[v] = true;
                }
            }

            for v in 0..self.touched.len() {
                if self.touched[v] {
                    self.core.reinforce_entry(i, v, self.contributions[v]);
                }
            }
        }
    }

    /// Stores a peer's iteration-best from the ring exchange. Used only by
    /// the three-source update; the colony's own best-so-far is untouched.
    pub fn receive_iteration_best(&mut self, solution: &Board) {
        let slot = self.received_iteration_best.as_mut().expect("initialized");
        slot.clone_from(solution);
        self.received_iteration_best_score = solution.fixed_cell_count();
    }

    /// Stores a peer's best-so-far from the random exchange.
    pub fn receive_best_sol(&mut self, solution: &Board) {
        let slot = self.received_best_sol.as_mut().expect("initialized");
        slot.clone_from(solution);
        self.received_best_sol_score = solution.fixed_cell_count();
    }

    pub fn iteration_best(&self) -> &Board {
        self.iteration_best.as_ref().expect("initialized")
    }

    pub fn best_sol(&self) -> &Board {
        self.best_sol.as_ref().expect("initialized")
    }

    pub fn best_sol_score(&self) -> usize {
        self.best_sol_score
    }

    pub fn current_iteration(&self) -> usize {
        self.current_iteration
    }

    pub fn set_current_iteration(&mut self, iter: usize) {
        self.current_iteration = iter;
    }

    pub fn cell_count(&self) -> usize {
        self.core.num_cells()
    }
}

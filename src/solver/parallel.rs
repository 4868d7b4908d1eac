use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info};

use crate::board::Board;
use crate::solver::colony::AcsConfig;
use crate::solver::subcolony::SubColony;

/// How long a parked worker waits on the barrier condition before rechecking
/// the deadline. A safety net against a lost wakeup during shutdown; in the
/// normal path the master's notify releases workers immediately.
const BARRIER_POLL: Duration = Duration::from_millis(100);

/// Parallel Ant Colony System (algorithm 2): N sub-colonies on N OS threads,
/// periodically exchanging solutions at a barrier.
///
/// Two overlaid topologies run in the same communication round: a ring
/// carrying each colony's iteration-best to its successor, and a random
/// cyclic pairing carrying best-so-far solutions. After the exchange every
/// colony folds the three sources (its own iteration-best plus the two
/// received boards) into its pheromone matrix.
///
/// With one sub-colony there is no communication and no barrier; the worker
/// keeps its stop decision in a local, behaving like the single-colony
/// system.
pub struct ParallelAntSystem {
    colonies: Vec<Mutex<SubColony>>,
    seed: u64,

    global_best: Option<Board>,
    global_best_score: usize,
    iterations_completed: usize,
    communication_occurred: bool,
    sol_time: f64,
}

/// Coordinator state shared by the worker threads for one solve call.
struct Shared<'a> {
    colonies: &'a [Mutex<SubColony>],
    stop: AtomicBool,
    barrier: AtomicUsize,
    /// Guards the barrier critical section; the master performs both
    /// exchanges while holding it, so snapshots are self-consistent.
    comm: Mutex<CommState>,
    comm_cv: Condvar,
    /// Best-so-far score published by each worker after every iteration, so
    /// the progress line can read peers without touching their state.
    best_scores: Vec<AtomicUsize>,
    timer: Instant,
    max_time: f32,
    num_cells: usize,
}

struct CommState {
    /// RNG for the random-topology permutation; only the barrier master
    /// draws from it.
    master_rng: SmallRng,
    communication_occurred: bool,
}

impl<'a> Shared<'a> {
    fn timed_out(&self) -> bool {
        self.timer.elapsed().as_secs_f32() >= self.max_time
    }

    fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.comm_cv.notify_all();
    }
}

/// Locks a mutex, recovering the data if a panicking worker poisoned it;
/// a failed worker must not take its siblings' results down with it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ParallelAntSystem {
    /// A system of `num_colonies` sub-colonies (clamped to at least one),
    /// seeded from OS entropy.
    pub fn new(num_colonies: usize, cfg: AcsConfig) -> Self {
        Self::with_seed(num_colonies, cfg, rand::thread_rng().next_u64())
    }

    /// A deterministically seeded system; colony `i` derives its RNG from
    /// `base_seed + i` so the colonies still diverge from each other.
    pub fn with_seed(num_colonies: usize, cfg: AcsConfig, base_seed: u64) -> Self {
        let num_colonies = num_colonies.max(1);
        let colonies = (0..num_colonies)
            .map(|i| Mutex::new(SubColony::new(cfg, base_seed.wrapping_add(i as u64))))
            .collect();
        Self {
            colonies,
            seed: base_seed,
            global_best: None,
            global_best_score: 0,
            iterations_completed: 0,
            communication_occurred: false,
            sol_time: 0.0,
        }
    }

    /// Runs all colonies against `puzzle` until one finds a complete
    /// solution or `max_time` seconds elapse (non-positive selects the
    /// 120 s default). Returns true when solved; the best partial is kept
    /// either way.
    pub fn solve(&mut self, puzzle: &Board, max_time: f32) -> bool {
        let max_time = if max_time > 0.0 { max_time } else { 120.0 };

        let shared = Shared {
            colonies: &self.colonies,
            stop: AtomicBool::new(false),
            barrier: AtomicUsize::new(0),
            comm: Mutex::new(CommState {
                master_rng: SmallRng::seed_from_u64(self.seed.wrapping_mul(0x9e37_79b9).wrapping_add(1)),
                communication_occurred: false,
            }),
            comm_cv: Condvar::new(),
            best_scores: (0..self.colonies.len()).map(|_| AtomicUsize::new(0)).collect(),
            timer: Instant::now(),
            max_time,
            num_cells: puzzle.cell_count(),
        };

        thread::scope(|scope| {
            for id in 0..self.colonies.len() {
                let shared = &shared;
                scope.spawn(move || {
                    // A failing worker terminates itself and signals the
                    // rest; the coordinator still reports what was found.
                    let outcome =
                        catch_unwind(AssertUnwindSafe(|| worker(shared, id, puzzle)));
                    if outcome.is_err() {
                        shared.request_stop();
                    }
                });
            }
        });

        self.global_best = Some(puzzle.clone());
        self.global_best_score = puzzle.fixed_cell_count();
        self.iterations_completed = 0;
        for colony in &self.colonies {
            let colony = lock(colony);
            if colony.best_sol_score() > self.global_best_score {
                let best = self.global_best.as_mut().expect("set above");
                best.clone_from(colony.best_sol());
                self.global_best_score = colony.best_sol_score();
            }
            self.iterations_completed = self.iterations_completed.max(colony.current_iteration());
        }
        self.communication_occurred = lock(&shared.comm).communication_occurred;
        self.sol_time = shared.timer.elapsed().as_secs_f64();

        debug!(
            iterations = self.iterations_completed,
            best = self.global_best_score,
            communication = self.communication_occurred,
            "parallel ant system finished"
        );
        self.global_best_score == puzzle.cell_count()
    }

    pub fn solution(&self) -> &Board {
        self.global_best.as_ref().expect("solve() ran")
    }

    pub fn iterations_completed(&self) -> usize {
        self.iterations_completed
    }

    /// True when at least one barrier exchange happened during the solve.
    pub fn communication_occurred(&self) -> bool {
        self.communication_occurred
    }

    pub fn solution_time(&self) -> f64 {
        self.sol_time
    }
}

/// Per-thread loop: iterate the colony, update pheromone (with or without
/// communication), publish the score, stop on completion, deadline or the
/// shared flag.
fn worker(shared: &Shared<'_>, id: usize, puzzle: &Board) {
    let num_colonies = shared.colonies.len();
    // With a single colony the hot path skips the shared flag.
    let single = num_colonies == 1;

    {
        let mut colony = lock(&shared.colonies[id]);
        colony.initialize(puzzle);
        shared.best_scores[id].store(colony.best_sol_score(), Ordering::Relaxed);
    }

    let mut iter = 0usize;
    loop {
        if !single && shared.stop.load(Ordering::SeqCst) {
            break;
        }
        if shared.timed_out() {
            shared.request_stop();
            break;
        }

        iter += 1;

        let should_communicate = if single {
            false
        } else if iter < 200 {
            iter % 100 == 0
        } else {
            iter % 10 == 0
        };

        {
            let mut colony = lock(&shared.colonies[id]);
            colony.set_current_iteration(iter);
            colony.run_iteration(puzzle);
        }

        if should_communicate {
            barrier_sync(shared);
            let mut colony = lock(&shared.colonies[id]);
            colony.update_pheromone_with_communication();
            shared.best_scores[id].store(colony.best_sol_score(), Ordering::Relaxed);
            if shared.stop.load(Ordering::SeqCst) {
                break;
            }
        } else {
            let mut colony = lock(&shared.colonies[id]);
            colony.update_pheromone();
            colony.decay_best_pher();
            shared.best_scores[id].store(colony.best_sol_score(), Ordering::Relaxed);
        }

        if id == 0 && iter % 50 == 0 {
            let global_best = shared
                .best_scores
                .iter()
                .map(|s| s.load(Ordering::Relaxed))
                .max()
                .unwrap_or(0);
            info!(
                iteration = iter,
                best = global_best,
                total = shared.num_cells,
                "progress"
            );
        }

        let solved = shared.best_scores[id].load(Ordering::Relaxed) == shared.num_cells;
        if solved {
            shared.request_stop();
            break;
        }
    }
}

/// Classic N-way barrier: the last thread to arrive becomes the master,
/// performs both exchanges under the communication mutex and releases
/// everyone; the rest wait on the condition with a timed poll so a shutdown
/// can never strand them.
fn barrier_sync(shared: &Shared<'_>) {
    if shared.stop.load(Ordering::SeqCst) {
        return;
    }

    let mut comm = lock(&shared.comm);
    if shared.stop.load(Ordering::SeqCst) {
        shared.barrier.store(0, Ordering::SeqCst);
        shared.comm_cv.notify_all();
        return;
    }

    let arrived = shared.barrier.fetch_add(1, Ordering::SeqCst) + 1;
    if arrived == shared.colonies.len() {
        run_master_exchange(shared, &mut comm);
        shared.barrier.store(0, Ordering::SeqCst);
        shared.comm_cv.notify_all();
    } else {
        wait_for_master(shared, comm);
    }
}

/// Master role: snapshot and redistribute solutions over both topologies.
/// All peers are parked in [`wait_for_master`], so their colony locks are
/// free and the snapshots are taken from quiescent state.
fn run_master_exchange(shared: &Shared<'_>, comm: &mut MutexGuard<'_, CommState>) {
    comm.communication_occurred = true;
    let n = shared.colonies.len();

    // Ring: colony i's iteration-best goes to colony (i+1) mod n.
    let snapshots: Vec<Board> = shared
        .colonies
        .iter()
        .map(|c| lock(c).iteration_best().clone())
        .collect();
    for (i, snapshot) in snapshots.iter().enumerate() {
        lock(&shared.colonies[(i + 1) % n]).receive_iteration_best(snapshot);
    }

    // Random cyclic pairing: each position of a shuffled colony order
    // receives the best-so-far of its predecessor in that order.
    let mut matching: Vec<usize> = (0..n).collect();
    matching.shuffle(&mut comm.master_rng);
    let bests: Vec<Board> = shared
        .colonies
        .iter()
        .map(|c| lock(c).best_sol().clone())
        .collect();
    for i in 0..n {
        let to = matching[i];
        let from = matching[(i + n - 1) % n];
        lock(&shared.colonies[to]).receive_best_sol(&bests[from]);
    }

    let any_complete = shared.colonies.iter().any(|c| {
        let c = lock(c);
        c.best_sol_score() == c.cell_count()
    });
    if any_complete {
        shared.stop.store(true, Ordering::SeqCst);
    }
}

/// Worker role at the barrier: parked until the master resets the counter,
/// with a deadline check on every poll.
fn wait_for_master<'m>(shared: &Shared<'_>, mut comm: MutexGuard<'m, CommState>) {
    loop {
        if shared.barrier.load(Ordering::SeqCst) == 0 || shared.stop.load(Ordering::SeqCst) {
            return;
        }
        let (guard, _timeout) = shared
            .comm_cv
            .wait_timeout(comm, BARRIER_POLL)
            .unwrap_or_else(PoisonError::into_inner);
        comm = guard;

        if shared.timed_out() && !shared.stop.load(Ordering::SeqCst) {
            shared.stop.store(true, Ordering::SeqCst);
            shared.barrier.store(0, Ordering::SeqCst);
            shared.comm_cv.notify_all();
        }
    }
}

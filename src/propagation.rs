//! Logical deduction rules that shrink the search space before and during
//! the ant colony search.
//!
//! Two classic rules are applied per cell:
//!
//! - **Elimination**: remove every value already fixed in the cell's row,
//!   column or box; a cell narrowed to one value becomes fixed.
//! - **Hidden single**: a value that cannot appear in any peer of one of the
//!   cell's units must go in this cell.
//!
//! Fixing a cell cascades through [`set_cell_and_propagate`], which re-runs
//! both rules on every peer. The recursion terminates because each recursive
//! fix strictly increases the board's fixed-cell count, which is bounded by
//! the cell count.
//!
//! The module keeps process-wide counters for cost-benefit analysis of the
//! propagation work: wall-clock time spent inside the rules during initial
//! board construction, time spent during ant construction, and the number of
//! propagating cell assignments outside the initial phase. The counters are
//! atomics because colony workers may run propagation concurrently.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use crate::board::Board;
use crate::value_set::ValueSet;

// Rule bodies routinely run in well under a microsecond, so the counters
// accumulate nanoseconds.
static INITIAL_CP_NANOS: AtomicU64 = AtomicU64::new(0);
static ANT_CP_NANOS: AtomicU64 = AtomicU64::new(0);
static CP_CALLS: AtomicUsize = AtomicUsize::new(0);
static IN_INITIAL_CP: AtomicBool = AtomicBool::new(false);

/// Clears all propagation counters. Called once per solve request.
pub fn reset_cp_timing() {
    INITIAL_CP_NANOS.store(0, Ordering::Relaxed);
    ANT_CP_NANOS.store(0, Ordering::Relaxed);
    CP_CALLS.store(0, Ordering::Relaxed);
    IN_INITIAL_CP.store(false, Ordering::Relaxed);
}

/// Seconds spent in the rules during initial board construction.
pub fn initial_cp_seconds() -> f64 {
    INITIAL_CP_NANOS.load(Ordering::Relaxed) as f64 / 1e9
}

/// Seconds spent in the rules outside the initial phase, summed over all
/// colony threads.
pub fn ant_cp_seconds() -> f64 {
    ANT_CP_NANOS.load(Ordering::Relaxed) as f64 / 1e9
}

/// Number of propagating cell assignments outside the initial phase.
pub fn cp_call_count() -> usize {
    CP_CALLS.load(Ordering::Relaxed)
}

pub(crate) fn begin_initial_cp() {
    IN_INITIAL_CP.store(true, Ordering::Relaxed);
}

pub(crate) fn end_initial_cp() {
    IN_INITIAL_CP.store(false, Ordering::Relaxed);
}

/// Adds the elapsed rule time to the counter for the current phase. Each
/// rule records its own body once, before any recursive fix it triggers, so
/// nested calls never double-count.
fn record_rule_time(start: Instant) {
    let nanos = start.elapsed().as_nanos() as u64;
    if IN_INITIAL_CP.load(Ordering::Relaxed) {
        INITIAL_CP_NANOS.fetch_add(nanos, Ordering::Relaxed);
    } else {
        ANT_CP_NANOS.fetch_add(nanos, Ordering::Relaxed);
    }
}

/// Elimination rule. Removes every value fixed elsewhere in the cell's row,
/// column or box; if exactly one candidate survives, fixes the cell and
/// cascades. Returns true if the cell was fixed.
pub fn eliminate(board: &mut Board, cell_index: usize) -> bool {
    let start = Instant::now();

    let cell = board.cell(cell_index);
    if cell.is_empty() || cell.is_fixed() {
        record_rule_time(start);
        return false;
    }

    let units = board.num_units();
    let row = board.row_for_cell(cell_index);
    let col = board.col_for_cell(cell_index);
    let boxi = board.box_for_cell(cell_index);

    let mut fixed_peers = ValueSet::empty(units);
    for j in 0..units {
        for k in [
            board.box_cell(boxi, j),
            board.col_cell(col, j),
            board.row_cell(row, j),
        ] {
            if k != cell_index && board.cell(k).is_fixed() {
                fixed_peers = fixed_peers | board.cell(k);
            }
        }
    }

    let remaining = cell & !fixed_peers;
    record_rule_time(start);

    if remaining.is_fixed() {
        set_cell_and_propagate(board, cell_index, remaining);
        true
    } else {
        board.set_cell_direct(cell_index, remaining);
        false
    }
}

/// Hidden-single rule. If one of the cell's candidates appears in no peer
/// of its row, column or box, the cell must hold it; fixes and cascades.
/// Units are tried in row, column, box order. Returns true if the cell was
/// fixed.
pub fn hidden_single(board: &mut Board, cell_index: usize) -> bool {
    let start = Instant::now();

    let cell = board.cell(cell_index);
    if cell.is_empty() || cell.is_fixed() {
        record_rule_time(start);
        return false;
    }

    let units = board.num_units();
    let row = board.row_for_cell(cell_index);
    let col = board.col_for_cell(cell_index);
    let boxi = board.box_for_cell(cell_index);

    let mut row_all = ValueSet::empty(units);
    let mut col_all = ValueSet::empty(units);
    let mut box_all = ValueSet::empty(units);
    for j in 0..units {
        let k = board.box_cell(boxi, j);
        if k != cell_index {
            box_all = box_all | board.cell(k);
        }
        let k = board.col_cell(col, j);
        if k != cell_index {
            col_all = col_all | board.cell(k);
        }
        let k = board.row_cell(row, j);
        if k != cell_index {
            row_all = row_all | board.cell(k);
        }
    }

    record_rule_time(start);

    for unit_all in [row_all, col_all, box_all] {
        let only_here = cell - unit_all;
        if only_here.is_fixed() {
            set_cell_and_propagate(board, cell_index, only_here);
            return true;
        }
    }
    false
}

/// Runs both rules on one cell, then accounts for a cell that the rules
/// emptied out.
pub fn propagate_constraints(board: &mut Board, cell_index: usize) {
    let cell = board.cell(cell_index);
    if cell.is_empty() || cell.is_fixed() {
        return;
    }

    if eliminate(board, cell_index) {
        return;
    }
    hidden_single(board, cell_index);

    if board.cell(cell_index).is_empty() {
        board.increment_infeasible();
    }
}

/// Fixes cell `cell_index` to `value` (a singleton set) and propagates both
/// rules to every peer in its row, column and box. A no-op when the cell is
/// already fixed, which also makes repeated assignment idempotent.
pub fn set_cell_and_propagate(board: &mut Board, cell_index: usize, value: ValueSet) {
    if board.cell(cell_index).is_fixed() {
        return;
    }

    board.set_cell_direct(cell_index, value);
    board.increment_fixed_cells();

    if !IN_INITIAL_CP.load(Ordering::Relaxed) {
        CP_CALLS.fetch_add(1, Ordering::Relaxed);
    }

    let units = board.num_units();
    let row = board.row_for_cell(cell_index);
    let col = board.col_for_cell(cell_index);
    let boxi = board.box_for_cell(cell_index);

    for j in 0..units {
        let k = board.box_cell(boxi, j);
        if k != cell_index {
            propagate_constraints(board, k);
        }
        let k = board.col_cell(col, j);
        if k != cell_index {
            propagate_constraints(board, k);
        }
        let k = board.row_cell(row, j);
        if k != cell_index {
            propagate_constraints(board, k);
        }
    }
}

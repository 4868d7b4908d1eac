use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::propagation;
use crate::value_set::ValueSet;

/// A Sudoku board: one [`ValueSet`] of remaining candidates per cell, plus
/// the counters maintained by the constraint propagator.
///
/// A board of order `k` has `k²` units (rows, columns, boxes) and `k⁴`
/// cells. Orders 3 through 8 are supported, which the puzzle-string length
/// selects (81, 256, 625, 1296, 2401 or 4096 characters).
///
/// Construction parses the puzzle string and installs every clue through
/// [`propagation::set_cell_and_propagate`], so a freshly parsed board has
/// already had all cascading deductions applied. After that the board is
/// read-only to solvers, which work on deep copies.
pub struct Board {
    cells: Vec<ValueSet>,
    order: usize,
    num_units: usize,
    num_cells: usize,
    num_fixed: usize,
    num_infeasible: usize,
}

impl FromStr for Board {
    type Err = Error;

    fn from_str(puzzle: &str) -> Result<Self> {
        let order = match puzzle.len() {
            81 => 3,
            256 => 4,
            625 => 5,
            1296 => 6,
            2401 => 7,
            4096 => 8,
            n => return Err(Error::InvalidPuzzleSize(n)),
        };
        let num_units = order * order;
        let num_cells = num_units * num_units;

        let mut board = Board {
            cells: vec![ValueSet::full(num_units); num_cells],
            order,
            num_units,
            num_cells,
            num_fixed: 0,
            num_infeasible: 0,
        };

        propagation::begin_initial_cp();
        for (i, c) in puzzle.chars().enumerate() {
            if c == '.' {
                continue;
            }
            let value = decode_clue(c, order).ok_or(Error::InvalidClue {
                clue: c,
                cell: i,
                units: num_units,
            })?;
            propagation::set_cell_and_propagate(
                &mut board,
                i,
                ValueSet::singleton_in(num_units, value),
            );
        }
        propagation::end_initial_cp();

        Ok(board)
    }
}

/// 1-based value for a clue character, or `None` if the character is outside
/// the alphabet for this order.
fn decode_clue(c: char, order: usize) -> Option<usize> {
    match order {
        3 => match c {
            '1'..='9' => Some(c as usize - '0' as usize),
            _ => None,
        },
        4 => match c {
            '0'..='9' => Some(1 + c as usize - '0' as usize),
            'a'..='f' => Some(11 + c as usize - 'a' as usize),
            _ => None,
        },
        _ => {
            let units = order * order;
            let v = (c as usize).wrapping_sub('a' as usize);
            (v < units).then_some(v + 1)
        }
    }
}

impl Board {
    /// Candidate set of cell `i`.
    pub fn cell(&self, i: usize) -> ValueSet {
        self.cells[i]
    }

    /// Number of cells whose value is uniquely determined.
    pub fn fixed_cell_count(&self) -> usize {
        self.num_fixed
    }

    /// Number of cells with no remaining candidates.
    pub fn infeasible_count(&self) -> usize {
        self.num_infeasible
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.num_cells
    }

    /// Number of rows (equivalently columns or boxes).
    pub fn num_units(&self) -> usize {
        self.num_units
    }

    /// Puzzle order (3 for a standard 9x9 board).
    pub fn order(&self) -> usize {
        self.order
    }

    // Geometry. Cells are stored row-major; boxes tile the grid with `order`
    // box-columns per box-row.

    /// Linear index of the `k`-th cell of row `r`.
    pub fn row_cell(&self, r: usize, k: usize) -> usize {
        r * self.num_units + k
    }

    /// Linear index of the `k`-th cell of column `c`.
    pub fn col_cell(&self, c: usize, k: usize) -> usize {
        k * self.num_units + c
    }

    /// Linear index of the `k`-th cell of box `b`.
    pub fn box_cell(&self, b: usize, k: usize) -> usize {
        let order = self.order;
        let top_corner = (b % order) * order + (b / order) * order * order * order;
        top_corner + k % order + (k / order) * order * order
    }

    /// Row containing cell `i`.
    pub fn row_for_cell(&self, i: usize) -> usize {
        i / self.num_units
    }

    /// Column containing cell `i`.
    pub fn col_for_cell(&self, i: usize) -> usize {
        i % self.num_units
    }

    /// Box containing cell `i`.
    pub fn box_for_cell(&self, i: usize) -> usize {
        let order = self.order;
        order * (i / (order * order * order)) + (i % (order * order)) / order
    }

    /// True iff `other` is a complete, unit-valid filling that agrees with
    /// every fixed cell of `self`.
    pub fn check_solution(&self, other: &Board) -> bool {
        if other.cell_count() != self.cell_count() {
            return false;
        }

        let complete = (0..other.num_cells).all(|i| other.cell(i).is_fixed());

        let units_covered = (0..self.num_units).all(|u| {
            let mut row = ValueSet::empty(self.num_units);
            let mut col = ValueSet::empty(self.num_units);
            let mut boxs = ValueSet::empty(self.num_units);
            for k in 0..self.num_units {
                row = row | other.cell(self.row_cell(u, k));
                col = col | other.cell(self.col_cell(u, k));
                boxs = boxs | other.cell(self.box_cell(u, k));
            }
            row.count() == self.num_units
                && col.count() == self.num_units
                && boxs.count() == self.num_units
        });

        let consistent = (0..self.num_cells).all(|i| {
            !self.cell(i).is_fixed() || self.cell(i).index() == other.cell(i).index()
        });

        complete && units_covered && consistent
    }

    /// The character alphabet used to encode this board's values, matching
    /// the puzzle-string encoding accepted by [`Board::from_str`].
    pub fn alphabet(&self) -> String {
        match self.order {
            3 => "123456789".to_string(),
            4 => "0123456789abcdef".to_string(),
            _ => (0..self.num_units)
                .map(|i| (b'a' + i as u8) as char)
                .collect(),
        }
    }

    /// Flat single-line encoding of the board: one alphabet character per
    /// fixed cell, `'.'` for every unfixed cell.
    pub fn line_string(&self) -> String {
        let alphabet = self.alphabet();
        self.cells
            .iter()
            .map(|cell| match cell.index() {
                Some(i) => alphabet.chars().nth(i).unwrap_or('?'),
                None => '.',
            })
            .collect()
    }

    /// Human-readable grid with box separators.
    ///
    /// With `show_unfixed`, unfixed cells render their full candidate set
    /// instead of `'.'`; the column pitch widens to fit the widest cell.
    pub fn render(&self, show_unfixed: bool) -> String {
        let alphabet = self.alphabet();
        let texts: Vec<String> = self
            .cells
            .iter()
            .map(|cell| {
                if cell.is_fixed() || show_unfixed {
                    cell.to_text(&alphabet)
                } else {
                    ".".to_string()
                }
            })
            .collect();
        let pitch = texts.iter().map(String::len).max().unwrap_or(1) + 1;

        let mut out = String::new();
        for (i, text) in texts.iter().enumerate() {
            out.push_str(&format!("{text:>pitch$} "));
            if i % self.num_units == self.num_units - 1 {
                if i != self.num_cells - 1 {
                    out.push('\n');
                }
            } else if i % self.order == self.order - 1 {
                out.push('|');
            }
            if i % (self.num_units * self.order) == self.num_units * self.order - 1
                && i != self.num_cells - 1
            {
                for j in 0..self.order {
                    for _ in 0..self.order * (pitch + 1) {
                        out.push('-');
                    }
                    if j != self.order - 1 {
                        out.push('+');
                    }
                }
                out.push('\n');
            }
        }
        out
    }

    // Mutation API, used only by the constraint propagator and by ants
    // filling their working copies.

    pub(crate) fn set_cell_direct(&mut self, i: usize, c: ValueSet) {
        self.cells[i] = c;
    }

    pub(crate) fn increment_fixed_cells(&mut self) {
        self.num_fixed += 1;
    }

    pub(crate) fn increment_infeasible(&mut self) {
        self.num_infeasible += 1;
    }
}

impl Clone for Board {
    fn clone(&self) -> Self {
        Board {
            cells: self.cells.clone(),
            order: self.order,
            num_units: self.num_units,
            num_cells: self.num_cells,
            num_fixed: self.num_fixed,
            num_infeasible: self.num_infeasible,
        }
    }

    // Ants re-seed their working board every iteration; reusing the cell
    // buffer avoids an allocation per ant per iteration.
    fn clone_from(&mut self, source: &Self) {
        self.cells.clone_from(&source.cells);
        self.order = source.order;
        self.num_units = source.num_units;
        self.num_cells = source.num_cells;
        self.num_fixed = source.num_fixed;
        self.num_infeasible = source.num_infeasible;
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("order", &self.order)
            .field("fixed", &self.num_fixed)
            .field("infeasible", &self.num_infeasible)
            .field("cells", &self.line_string())
            .finish()
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
    fn rejects_bad_length() {
        assert!(matches!(
            "123".parse::<Board>(),
            Err(Error::InvalidPuzzleSize(3))
        ));
    }

    #[test]
    fn rejects_bad_clue() {
        let mut puzzle = String::from(EASY);
        puzzle.replace_range(0..1, "x");
        assert!(matches!(
            puzzle.parse::<Board>(),
            Err(Error::InvalidClue { clue: 'x', .. })
        ));
        let zeros = "0".repeat(81);
        assert!(matches!(
            zeros.parse::<Board>(),
            Err(Error::InvalidClue { clue: '0', .. })
        ));
    }

    #[test]
    fn geometry_round_trips() {
        let board: Board = ".".repeat(81).parse().unwrap();
        let units = board.num_units();
        for b in 0..units {
            for k in 0..units {
                assert_eq!(board.box_for_cell(board.box_cell(b, k)), b);
                assert_eq!(board.row_for_cell(board.row_cell(b, k)), b);
                assert_eq!(board.col_for_cell(board.col_cell(b, k)), b);
            }
        }
        // Every cell belongs to exactly one row, column and box of size U.
        let mut seen = vec![0usize; board.cell_count()];
        for b in 0..units {
            for k in 0..units {
                seen[board.box_cell(b, k)] += 1;
            }
        }
        assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn geometry_round_trips_order_4() {
        let board: Board = ".".repeat(256).parse().unwrap();
        for b in 0..board.num_units() {
            for k in 0..board.num_units() {
                assert_eq!(board.box_for_cell(board.box_cell(b, k)), b);
            }
        }
    }

    #[test]
    fn fixed_count_matches_cells() {
        let board: Board = EASY.parse().unwrap();
        let fixed = (0..board.cell_count())
            .filter(|&i| board.cell(i).is_fixed())
            .count();
        assert_eq!(board.fixed_cell_count(), fixed);
        assert!(board.fixed_cell_count() >= 30); // at least the clues
        assert_eq!(board.infeasible_count(), 0);
    }

    #[test]
    fn check_solution_accepts_known_solution() {
        let puzzle: Board = EASY.parse().unwrap();
        let solution: Board = EASY_SOLUTION.parse().unwrap();
        assert!(puzzle.check_solution(&solution));
    }

    #[test]
    fn check_solution_rejects_partial_and_mismatched() {
        let puzzle: Board = EASY.parse().unwrap();
        let blank: Board = ".".repeat(81).parse().unwrap();
        assert!(!puzzle.check_solution(&blank));

        // A complete, valid grid that contradicts the puzzle's clues.
        let mut other = String::from(EASY_SOLUTION);
        other.replace_range(0..2, "35");
        let other: Board = other.parse().unwrap();
        assert!(!blank.check_solution(&other)); // row has two 3s or 5s
    }

    #[test]
    fn line_string_round_trips() {
        let solution: Board = EASY_SOLUTION.parse().unwrap();
        assert_eq!(solution.line_string(), EASY_SOLUTION);
    }

    #[test]
    fn order_4_alphabet() {
        let mut puzzle = ".".repeat(256);
        puzzle.replace_range(0..1, "0");
        puzzle.replace_range(1..2, "f");
        let board: Board = puzzle.parse().unwrap();
        assert_eq!(board.cell(0).index(), Some(0));
        assert_eq!(board.cell(1).index(), Some(15));
        assert!(board.line_string().starts_with("0f"));
    }
}

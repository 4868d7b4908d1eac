use prettytable::{Cell, Row, Table};

use crate::solver::api::SolveResult;

/// Renders the constraint-propagation cost-benefit table shown in verbose
/// mode: how much of the solve went into logical deduction versus the ant
/// search itself.
pub fn render_cp_table(result: &SolveResult) -> String {
    let total_cp = result.cp_initial + result.cp_ant_total;
    let cp_share = if result.time_seconds > 0.0 {
        100.0 * total_cp / result.time_seconds
    } else {
        0.0
    };

    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Phase"),
        Cell::new("Time (s)"),
    ]));
    table.add_row(Row::new(vec![
        Cell::new("Initial propagation"),
        Cell::new(&format!("{:.6}", result.cp_initial)),
    ]));
    table.add_row(Row::new(vec![
        Cell::new("Ant-phase propagation"),
        Cell::new(&format!("{:.6}", result.cp_ant_total)),
    ]));
    table.add_row(Row::new(vec![
        Cell::new("Propagating assignments"),
        Cell::new(&result.cp_calls.to_string()),
    ]));
    table.add_row(Row::new(vec![
        Cell::new("Total propagation"),
        Cell::new(&format!("{total_cp:.6}")),
    ]));
    table.add_row(Row::new(vec![
        Cell::new("Total solve"),
        Cell::new(&format!("{:.6}", result.time_seconds)),
    ]));
    table.add_row(Row::new(vec![
        Cell::new("Propagation share"),
        Cell::new(&format!("{cp_share:.2}%")),
    ]));
    table.to_string()
}

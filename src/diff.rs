use std::ops::ControlFlow;

use crate::expect::Expected;
use crate::table::Cell;
use crate::table::Table;

/// First divergence between an expectation and what the program printed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diff {
    Status { expected: bool, found: bool },
    Existence { expected: bool, found: bool },
    Header { expected: Vec<String>, found: Vec<String> },
    RowCount { expected: usize, found: usize },
    /// `row` is the zero-based position, the ids are the printed row numbers.
    RowId { row: usize, expected: u32, found: u32 },
    /// `None` on one side means that row ended before `column`.
    Cell {
        row: usize,
        column: usize,
        expected: Option<Cell>,
        found: Option<Cell>,
    },
    /// The prompt did not come back within `allowed` seconds.
    Time { command: String, allowed: u64 },
}

impl Diff {
    pub fn time(command: &str, allowed: u64) -> Self {
        Diff::Time {
            command: command.trim().to_string(),
            allowed,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Diff::Time { .. } => "Time limit exceeded",
            _ => "Output Incorrect",
        }
    }
}

struct Pair<'a> {
    expected_ok: bool,
    found_ok: bool,
    expected: Option<&'a Table>,
    found: Option<&'a Table>,
}

/// `Continue` defers to the next rule, `Break(None)` is a pass.
type Rule = fn(&Pair) -> ControlFlow<Option<Diff>>;

const RULES: [Rule; 5] = [status, existence, header, row_count, rows];

/// Compares one step. Returns `None` when the observation matches.
pub fn compare(expected: &Expected, found: Option<&Table>, found_ok: bool) -> Option<Diff> {
    evaluate(&Pair {
        expected_ok: expected.ok,
        found_ok,
        expected: expected.table.as_ref(),
        found,
    })
}

/// Compares two snapshots, ignoring status.
pub fn diff_tables(expected: Option<&Table>, found: Option<&Table>) -> Option<Diff> {
    evaluate(&Pair {
        expected_ok: true,
        found_ok: true,
        expected,
        found,
    })
}

impl Table {
    pub fn diff(&self, other: &Table) -> Option<Diff> {
        diff_tables(Some(self), Some(other))
    }
}

fn evaluate(pair: &Pair) -> Option<Diff> {
    RULES
        .iter()
        .find_map(|rule| match rule(pair) {
            ControlFlow::Break(diff) => Some(diff),
            ControlFlow::Continue(()) => None,
        })
        .flatten()
}

fn status(pair: &Pair) -> ControlFlow<Option<Diff>> {
    match pair.expected_ok == pair.found_ok {
        true => ControlFlow::Continue(()),
        false => ControlFlow::Break(Some(Diff::Status {
            expected: pair.expected_ok,
            found: pair.found_ok,
        })),
    }
}

fn existence(pair: &Pair) -> ControlFlow<Option<Diff>> {
    match (pair.expected, pair.found) {
        (None, None) => ControlFlow::Break(None),
        (Some(_), Some(_)) => ControlFlow::Continue(()),
        (expected, found) => ControlFlow::Break(Some(Diff::Existence {
            expected: expected.is_some(),
            found: found.is_some(),
        })),
    }
}

fn header(pair: &Pair) -> ControlFlow<Option<Diff>> {
    let (Some(expected), Some(found)) = (pair.expected, pair.found) else {
        return ControlFlow::Continue(());
    };

    match expected.col_names == found.col_names {
        true => ControlFlow::Continue(()),
        false => ControlFlow::Break(Some(Diff::Header {
            expected: expected.col_names.clone(),
            found: found.col_names.clone(),
        })),
    }
}

fn row_count(pair: &Pair) -> ControlFlow<Option<Diff>> {
    let (Some(expected), Some(found)) = (pair.expected, pair.found) else {
        return ControlFlow::Continue(());
    };

    match expected.num_rows() == found.num_rows() {
        true => ControlFlow::Continue(()),
        false => ControlFlow::Break(Some(Diff::RowCount {
            expected: expected.num_rows(),
            found: found.num_rows(),
        })),
    }
}

fn rows(pair: &Pair) -> ControlFlow<Option<Diff>> {
    let (Some(expected), Some(found)) = (pair.expected, pair.found) else {
        return ControlFlow::Continue(());
    };

    for (row, (expected, found)) in expected.rows.iter().zip(&found.rows).enumerate() {
        if expected.id != found.id {
            return ControlFlow::Break(Some(Diff::RowId {
                row,
                expected: expected.id,
                found: found.id,
            }));
        }

        let width = expected.cells.len().max(found.cells.len());
        let mismatch = (0..width)
            .map(|column| {
                let expected = expected.cells.get(column).copied();
                let found = found.cells.get(column).copied();
                (column, expected, found)
            })
            .find(|(_, expected, found)| expected != found);

        if let Some((column, expected, found)) = mismatch {
            return ControlFlow::Break(Some(Diff::Cell {
                row,
                column,
                expected,
                found,
            }));
        }
    }

    ControlFlow::Continue(())
}

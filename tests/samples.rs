// Replays the built-in samples through the whole pipeline with synthesized
// session logs.

use spreadsheet_autograder::diff::Diff;
use spreadsheet_autograder::expect;
use spreadsheet_autograder::grade::grade_session;
use spreadsheet_autograder::grade::Options;
use spreadsheet_autograder::suite;
use spreadsheet_autograder::table::Cell;

/// Builds the stdout a correct program would print for `expecteds`.
fn transcript(expecteds: &[expect::Expected]) -> String {
    let mut log = String::from("      A       B\n1       0       0\n[0.00] (ok) > ");
    for expected in expecteds {
        if let Some(table) = &expected.table {
            log.push_str(&table.to_string());
        }
        let status = if expected.ok { "ok" } else { "unrecognized cmd" };
        log.push_str(&format!("[0.00] ({}) > ", status));
    }
    log
}

#[test]
fn correct_sessions_pass_every_sample() {
    for case in suite::samples() {
        let expecteds = expect::parse(&case.expected).expect("sample parses");
        let log = transcript(&expecteds);

        let failure = grade_session(&case.commands(), &expecteds, &log, &Options::default())
            .expect("sample grades");

        assert_eq!(failure, None, "{}", case.name());
    }
}

#[test]
fn wrong_cell_is_reported_at_its_position() {
    let case = suite::samples()
        .into_iter()
        .find(|case| case.name() == "basic.cmds")
        .expect("basic sample exists");

    let expecteds = expect::parse(&case.expected).unwrap();
    let mut observed = expecteds.clone();

    // Fourth command, D2 = B1*C1.
    let table = observed[3].table.as_mut().unwrap();
    table.rows[1].cells[3] = Cell::Integer(24);

    let log = transcript(&observed);
    let failure = grade_session(&case.commands(), &expecteds, &log, &Options::default())
        .unwrap()
        .unwrap();

    assert_eq!(failure.step, Some(3));
    assert_eq!(failure.command, "D2=B1*C1");
    assert_eq!(
        failure.diff,
        Some(Diff::Cell {
            row: 1,
            column: 3,
            expected: Some(Cell::Integer(25)),
            found: Some(Cell::Integer(24)),
        })
    );
}

#[test]
fn printing_while_output_is_disabled_is_an_existence_diff() {
    let case = suite::samples()
        .into_iter()
        .find(|case| case.name() == "basic.cmds")
        .unwrap();

    let expecteds = expect::parse(&case.expected).unwrap();
    let mut observed = expecteds.clone();
    observed[6].table = observed[4].table.clone();

    let log = transcript(&observed);
    let failure = grade_session(&case.commands(), &expecteds, &log, &Options::default())
        .unwrap()
        .unwrap();

    assert_eq!(failure.step, Some(6));
    assert_eq!(
        failure.diff,
        Some(Diff::Existence {
            expected: false,
            found: true
        })
    );
}

#[test]
fn truncated_row_is_reported() {
    let case = suite::samples()
        .into_iter()
        .find(|case| case.name() == "errors.cmds")
        .unwrap();

    let expecteds = expect::parse(&case.expected).unwrap();
    let mut observed = expecteds.clone();

    let table = observed[0].table.as_mut().unwrap();
    table.rows[0].cells.truncate(9);

    let log = transcript(&observed);
    let failure = grade_session(&case.commands(), &expecteds, &log, &Options::default())
        .unwrap()
        .unwrap();

    assert_eq!(failure.step, Some(0));
    assert_eq!(
        failure.diff,
        Some(Diff::Cell {
            row: 0,
            column: 9,
            expected: Some(Cell::Integer(0)),
            found: None,
        })
    );
}

#[test]
fn scrolled_viewport_checks_row_ids() {
    let case = suite::samples()
        .into_iter()
        .find(|case| case.name() == "scroll.cmds")
        .unwrap();

    let expecteds = expect::parse(&case.expected).unwrap();
    let mut observed = expecteds.clone();

    // Pretend `s` did not scroll.
    observed[2].table = observed[1].table.clone();

    let log = transcript(&observed);
    let failure = grade_session(&case.commands(), &expecteds, &log, &Options::default())
        .unwrap()
        .unwrap();

    assert_eq!(
        failure.diff,
        Some(Diff::RowId {
            row: 0,
            expected: 11,
            found: 1
        })
    );
}

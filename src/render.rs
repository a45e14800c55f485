use std::io::Write;
use std::iter;

use ansi_term::Color;
use ansi_term::Style;
use difference::Changeset;
use difference::Difference;

use crate::diff::Diff;
use crate::table::Cell;
use crate::table::Table;

const GAP: usize = 3;
const PADDING: usize = 2;

/// Writes human-readable reports of a [`Diff`].
///
/// Output is purely diagnostic: pass/fail is decided by `diff::compare`.
#[derive(Copy, Clone, Debug)]
pub struct Renderer {
    color: bool,
}

struct Text {
    text: String,
    style: Style,
}

impl Text {
    fn plain<S: Into<String>>(text: S) -> Self {
        Text {
            text: text.into(),
            style: Style::new(),
        }
    }

    fn styled<S: Into<String>>(text: S, style: Style) -> Self {
        Text {
            text: text.into(),
            style,
        }
    }

    fn width(&self) -> usize {
        self.text.chars().count()
    }
}

/// Rendered lines that all share the same visible `width`.
struct Grid {
    lines: Vec<String>,
    width: usize,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Renderer { color }
    }

    pub fn render<W: Write>(
        &self,
        out: &mut W,
        diff: &Diff,
        command: &str,
        expected: Option<&Table>,
        found: Option<&Table>,
    ) -> anyhow::Result<()> {
        writeln!(
            out,
            "{}",
            self.paint(Color::Red.normal(), &format!("For command {}:-", command.trim()))
        )?;

        match diff {
            Diff::Status { expected, found } => writeln!(
                out,
                "Expected status '{}' found '{}'",
                status(*expected),
                status(*found)
            )?,
            Diff::Existence {
                expected: true,
                found: false,
            } => {
                writeln!(out, "Expected following table found None:-")?;
                if let Some(table) = expected {
                    self.write_lines(out, &self.sheet(table, None).lines)?;
                }
            }
            Diff::Existence { .. } => {
                writeln!(out, "Expected None found the following table:-")?;
                if let Some(table) = found {
                    self.write_lines(out, &self.sheet(table, None).lines)?;
                }
            }
            Diff::Header { expected, found } => {
                writeln!(out, "Expected header != given header")?;
                self.write_lines(out, &self.headers(expected, found).lines)?;
                writeln!(out, "{}", self.changes(expected, found))?;
            }
            Diff::RowCount { expected, found } => writeln!(
                out,
                "Number of {} rows {}, {} num rows {}",
                self.paint(Color::Green.normal(), "expected"),
                expected,
                self.paint(Color::Red.normal(), "found"),
                found
            )?,
            Diff::RowId {
                row,
                expected,
                found,
            } => writeln!(
                out,
                "Id of {} is supposed to be {}, {}",
                self.paint(Color::Cyan.normal(), &format!("row at position {}", row)),
                self.paint(Color::Green.normal(), &expected.to_string()),
                self.paint(Color::Red.normal(), &format!("found {}", found)),
            )?,
            Diff::Cell {
                row,
                column,
                expected: expected_cell,
                found: found_cell,
            } => {
                let name = expected
                    .and_then(|table| Some((table.col_names.get(*column)?, table.rows.get(*row)?)))
                    .map(|(name, row)| format!("{}{}", name, row.id))
                    .unwrap_or_else(|| format!("({}, {})", row, column));

                writeln!(
                    out,
                    "Cell {} is supposed to be {}, found {}",
                    self.paint(Color::Cyan.normal(), &name),
                    self.paint(Color::Green.normal(), &describe(expected_cell.as_ref())),
                    self.paint(Color::Red.normal(), &describe(found_cell.as_ref())),
                )?;

                if let (Some(expected), Some(found)) = (expected, found) {
                    let left = self.sheet(expected, Some(((*row, *column), Color::Green)));
                    let right = self.sheet(found, Some(((*row, *column), Color::Red)));
                    self.write_lines(out, &self.panel("Table diff", &left, &right))?;
                }
            }
            Diff::Time { command, allowed } => writeln!(
                out,
                "Command {}, expected to run in {}secs.",
                self.paint(Color::Yellow.normal(), command),
                self.paint(Color::Green.normal(), &allowed.to_string()),
            )?,
        }

        Ok(())
    }

    pub(crate) fn paint(&self, style: Style, text: &str) -> String {
        match self.color {
            true => style.paint(text).to_string(),
            false => text.to_string(),
        }
    }

    fn write_lines<W: Write>(&self, out: &mut W, lines: &[String]) -> anyhow::Result<()> {
        for line in lines {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }

    fn sheet(&self, table: &Table, highlight: Option<((usize, usize), Color)>) -> Grid {
        let header = iter::once(Text::styled("row_id", Color::Cyan.bold()))
            .chain(
                table
                    .col_names
                    .iter()
                    .map(|name| Text::styled(name.as_str(), Style::new().bold())),
            )
            .collect::<Vec<_>>();

        let rows = table
            .rows
            .iter()
            .enumerate()
            .map(|(row, entry)| {
                let cells = entry.cells.iter().enumerate().map(|(column, cell)| {
                    match highlight {
                        Some((position, color)) if position == (row, column) => match self.color {
                            true => Text::styled(cell.to_string(), Style::new().on(color)),
                            false => Text::plain(format!("[{}]", cell)),
                        },
                        _ => Text::plain(cell.to_string()),
                    }
                });

                iter::once(Text::styled(entry.id.to_string(), Color::Cyan.normal()))
                    .chain(cells)
                    .collect()
            })
            .collect::<Vec<_>>();

        self.grid(Some(header), rows)
    }

    fn headers(&self, expected: &[String], found: &[String]) -> Grid {
        let row = |label: &str, color: Color, names: &[String]| {
            iter::once(Text::styled(label, color.normal()))
                .chain(names.iter().map(|name| Text::plain(name.as_str())))
                .collect::<Vec<_>>()
        };

        self.grid(
            None,
            vec![
                row("Expected", Color::Green, expected),
                row("Found", Color::Red, found),
            ],
        )
    }

    fn changes(&self, expected: &[String], found: &[String]) -> String {
        Changeset::new(&expected.join(" "), &found.join(" "), " ")
            .diffs
            .iter()
            .map(|difference| match difference {
                Difference::Same(same) => same.clone(),
                Difference::Add(added) => {
                    self.paint(Color::Green.normal(), &format!("+{}", added))
                }
                Difference::Rem(removed) => {
                    self.paint(Color::Red.normal(), &format!("-{}", removed))
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Box-drawn grid. Rows shorter than the widest row are padded with
    /// empty cells; every column is right-justified.
    fn grid(&self, mut header: Option<Vec<Text>>, mut rows: Vec<Vec<Text>>) -> Grid {
        let columns = header
            .iter()
            .chain(&rows)
            .map(Vec::len)
            .max()
            .unwrap_or(0);

        for row in header.iter_mut().chain(rows.iter_mut()) {
            row.resize_with(columns, || Text::plain(""));
        }

        let mut widths = vec![0; columns];
        for row in header.iter().chain(&rows) {
            for (width, text) in widths.iter_mut().zip(row) {
                *width = (*width).max(text.width());
            }
        }

        let rule = |left: &str, middle: &str, right: &str| {
            let segments = widths
                .iter()
                .map(|width| "─".repeat(width + 2))
                .collect::<Vec<_>>();
            format!("{}{}{}", left, segments.join(middle), right)
        };

        let line = |row: &[Text]| {
            let cells = row
                .iter()
                .zip(&widths)
                .map(|(text, width)| {
                    let padding = " ".repeat(width - text.width());
                    format!(" {}{} ", padding, self.paint(text.style, &text.text))
                })
                .collect::<Vec<_>>();
            format!("│{}│", cells.join("│"))
        };

        let mut lines = vec![rule("┌", "┬", "┐")];
        if let Some(header) = &header {
            lines.push(line(header));
            lines.push(rule("├", "┼", "┤"));
        }
        lines.extend(rows.iter().map(|row| line(row)));
        lines.push(rule("└", "┴", "┘"));

        let width = widths.iter().map(|width| width + 3).sum::<usize>() + 1;
        Grid { lines, width }
    }

    /// Places two grids side by side inside a titled border.
    fn panel(&self, title: &str, left: &Grid, right: &Grid) -> Vec<String> {
        let border = Color::Red.normal();
        let inner = left.width + GAP + right.width + 2 * PADDING;
        let height = left.lines.len().max(right.lines.len());

        let pad = |text: &str, width: usize, visible: usize| {
            format!("{}{}", text, " ".repeat(width.saturating_sub(visible)))
        };
        let framed = |content: String, visible: usize| {
            format!(
                "{}{}{}{}{}",
                self.paint(border, "│"),
                " ".repeat(PADDING),
                pad(&content, inner - 2 * PADDING, visible),
                " ".repeat(PADDING),
                self.paint(border, "│"),
            )
        };

        let heading = format!("─ {} ", title);
        let mut lines = vec![self.paint(
            border,
            &format!(
                "╭{}{}╮",
                heading,
                "─".repeat(inner.saturating_sub(heading.chars().count()))
            ),
        )];
        lines.push(framed(String::new(), 0));

        let labels = format!(
            "{}{}",
            pad(
                &self.paint(Color::Green.bold(), "Expected"),
                left.width + GAP,
                "Expected".len()
            ),
            self.paint(Color::Red.bold(), "Found"),
        );
        lines.push(framed(labels, left.width + GAP + "Found".len()));

        for index in 0..height {
            let content = format!(
                "{}{}",
                pad(
                    left.lines.get(index).map(String::as_str).unwrap_or(""),
                    left.width + GAP,
                    left.lines.get(index).map_or(0, |_| left.width),
                ),
                right.lines.get(index).map(String::as_str).unwrap_or(""),
            );
            let visible = left.width + GAP + right.lines.get(index).map_or(0, |_| right.width);
            lines.push(framed(content, visible));
        }

        lines.push(framed(String::new(), 0));
        lines.push(self.paint(border, &format!("╰{}╯", "─".repeat(inner))));
        lines
    }
}

fn status(ok: bool) -> &'static str {
    match ok {
        true => "ok",
        false => "err",
    }
}

fn describe(cell: Option<&Cell>) -> String {
    match cell {
        Some(cell) => cell.to_string(),
        None => String::from("None"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(text: &str) -> Table {
        Table::parse(text.lines()).unwrap().unwrap()
    }

    fn render(diff: &Diff, expected: Option<&Table>, found: Option<&Table>) -> String {
        let mut out = Vec::new();
        Renderer::new(false)
            .render(&mut out, diff, "A1=2\n", expected, found)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn status_report() {
        let report = render(
            &Diff::Status {
                expected: true,
                found: false,
            },
            None,
            None,
        );
        assert_eq!(report, "For command A1=2:-\nExpected status 'ok' found 'err'\n");
    }

    #[test]
    fn existence_report_prints_present_table() {
        let found = table("A B\n1 10 7");
        let report = render(
            &Diff::Existence {
                expected: false,
                found: true,
            },
            None,
            Some(&found),
        );

        assert!(report.contains("Expected None found the following table:-"));
        assert!(report.contains("│ row_id │  A │ B │"));
        assert!(report.contains("│      1 │ 10 │ 7 │"));
    }

    #[test]
    fn header_report_shows_both_sides() {
        let report = render(
            &Diff::Header {
                expected: vec!["A".to_string(), "B".to_string()],
                found: vec!["A".to_string(), "C".to_string()],
            },
            None,
            None,
        );

        assert!(report.contains("│ Expected │ A │ B │"));
        assert!(report.contains("│    Found │ A │ C │"));
        assert!(report.contains("-B"));
        assert!(report.contains("+C"));
    }

    #[test]
    fn row_reports_name_positions() {
        let report = render(&Diff::RowCount { expected: 3, found: 2 }, None, None);
        assert!(report.contains("Number of expected rows 3, found num rows 2"));

        let report = render(
            &Diff::RowId {
                row: 1,
                expected: 2,
                found: 4,
            },
            None,
            None,
        );
        assert!(report.contains("Id of row at position 1 is supposed to be 2, found 4"));
    }

    #[test]
    fn cell_report_highlights_both_grids() {
        let expected = table("A B\n1 5 ERR");
        let found = table("A B\n1 5 9");
        let report = render(
            &Diff::Cell {
                row: 0,
                column: 1,
                expected: Some(Cell::Error),
                found: Some(Cell::Integer(9)),
            },
            Some(&expected),
            Some(&found),
        );

        assert!(report.contains("Cell B1 is supposed to be ERR, found 9"));
        assert!(report.contains("Table diff"));
        assert!(report.contains("[ERR]"));
        assert!(report.contains("[9]"));

        let widths = report
            .lines()
            .skip(2)
            .map(|line| line.chars().count())
            .collect::<Vec<_>>();
        assert!(widths.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    fn cell_report_names_missing_side() {
        let expected = table("A B\n1 5 7");
        let found = table("A B\n1 5");
        let report = render(
            &Diff::Cell {
                row: 0,
                column: 1,
                expected: Some(Cell::Integer(7)),
                found: None,
            },
            Some(&expected),
            Some(&found),
        );

        assert!(report.contains("Cell B1 is supposed to be 7, found None"));
        assert!(report.contains("[7]"));
    }

    #[test]
    fn time_report() {
        let report = render(&Diff::time("A1=2", 1), None, None);
        assert!(report.contains("Command A1=2, expected to run in 1secs."));
    }
}

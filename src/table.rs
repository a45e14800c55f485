use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use anyhow::anyhow;
use anyhow::Context as _;
use regex::Regex;

pub const MAX_COLUMNS: usize = 10;
pub const MAX_ROWS: usize = 10;
pub const MAX_ROW_INDEX: u32 = 999;

/// Token the student program prints for a cell whose formula failed.
pub const ERROR_TOKEN: &str = "ERR";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Cell {
    Integer(i64),
    Error,
}

impl From<&str> for Cell {
    fn from(token: &str) -> Self {
        match token.parse() {
            Ok(value) => Cell::Integer(value),
            Err(_) => Cell::Error,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cell::Integer(value) => write!(fmt, "{}", value),
            Cell::Error => write!(fmt, "{}", ERROR_TOKEN),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub cells: Vec<Cell>,
}

/// Snapshot of the viewport printed after a single command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    pub col_names: Vec<String>,
    pub rows: Vec<Row>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Invalid {
    #[error("Num columns > {}", MAX_COLUMNS)]
    Columns(usize),
    #[error("Num rows > {}", MAX_ROWS)]
    Rows(usize),
    #[error("Invalid Col name {0}")]
    ColumnName(String),
    #[error("Only {max} rows are allowed found {0}", max = MAX_ROW_INDEX)]
    RowIndex(u32),
    #[error("All rows must have {expected} number of cells found {found}")]
    Width { expected: usize, found: usize },
}

fn column_name() -> &'static Regex {
    static COLUMN_NAME: OnceLock<Regex> = OnceLock::new();
    COLUMN_NAME
        .get_or_init(|| Regex::new("^[A-Z]{1,3}$").expect("[INTERNAL ERROR]: valid regex"))
}

impl Table {
    /// Parses a header line followed by `<row> <cell>...` lines.
    ///
    /// Returns `Ok(None)` when there are no non-blank lines, i.e. nothing was
    /// printed. A row whose first token is not a row index is an error in the
    /// transcript itself, not in the submission.
    pub fn parse<'a, I>(lines: I) -> anyhow::Result<Option<Table>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut lines = lines.into_iter().filter(|line| !line.trim().is_empty());

        let header = match lines.next() {
            Some(header) => header,
            None => return Ok(None),
        };

        let col_names = header.split_whitespace().map(String::from).collect();
        let rows = lines
            .map(|line| {
                line.parse::<Row>()
                    .with_context(|| anyhow!("[INTERNAL ERROR]: failed to parse row: {}", line))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Some(Table { col_names, rows }))
    }

    /// Checks the viewport limits. Advisory only: nothing in the comparison
    /// depends on it.
    pub fn validate(&self) -> Result<(), Invalid> {
        if self.num_cols() > MAX_COLUMNS {
            return Err(Invalid::Columns(self.num_cols()));
        }
        if self.num_rows() > MAX_ROWS {
            return Err(Invalid::Rows(self.num_rows()));
        }

        if let Some(name) = self
            .col_names
            .iter()
            .find(|name| !column_name().is_match(name))
        {
            return Err(Invalid::ColumnName(name.clone()));
        }

        for row in &self.rows {
            if row.id > MAX_ROW_INDEX {
                return Err(Invalid::RowIndex(row.id));
            }
            if row.cells.len() != self.num_cols() {
                return Err(Invalid::Width {
                    expected: self.num_cols(),
                    found: row.cells.len(),
                });
            }
        }

        Ok(())
    }

    pub fn num_cols(&self) -> usize {
        self.col_names.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }
}

impl FromStr for Row {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut tokens = line.split_whitespace();
        let id = tokens
            .next()
            .filter(|token| token.bytes().all(|byte| byte.is_ascii_digit()))
            .ok_or_else(|| anyhow!("Row index must be integer"))?
            .parse()?;

        Ok(Row {
            id,
            cells: tokens.map(Cell::from).collect(),
        })
    }
}

impl fmt::Display for Table {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        writeln!(fmt, "{}", self.col_names.join(" "))?;
        for row in &self.rows {
            write!(fmt, "{}", row.id)?;
            for cell in &row.cells {
                write!(fmt, " {}", cell)?;
            }
            writeln!(fmt)?;
        }
        Ok(())
    }
}

use anyhow::anyhow;
use anyhow::Context as _;

use crate::table::Table;

/// Line terminating every block of a `.exp` transcript.
pub const DELIMITER: &str = "*******************";

/// What a single command is expected to produce.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expected {
    pub ok: bool,
    /// Seconds allowed before the prompt must reappear.
    pub time: u64,
    pub table: Option<Table>,
}

/// Splits a golden transcript into one [`Expected`] per command, in file order.
pub fn parse(content: &str) -> anyhow::Result<Vec<Expected>> {
    let mut expecteds = Vec::new();
    let mut block = Vec::new();

    for line in content.lines() {
        if line.trim_end() == DELIMITER {
            let expected = parse_block(&block)
                .with_context(|| anyhow!("Malformed expectation block {}", expecteds.len() + 1))?;
            expecteds.push(expected);
            block.clear();
        } else if !line.trim().is_empty() {
            block.push(line);
        }
    }

    if !block.is_empty() {
        return Err(anyhow!(
            "Expectation block {} is not terminated by `{}`",
            expecteds.len() + 1,
            DELIMITER
        ));
    }

    Ok(expecteds)
}

fn parse_block(block: &[&str]) -> anyhow::Result<Expected> {
    let (status, lines) = block
        .split_first()
        .ok_or_else(|| anyhow!("Missing `<status> <time>` line"))?;

    let (ok, time) = match status.split_whitespace().collect::<Vec<_>>()[..] {
        [token, time] => (
            token == "ok",
            time.parse::<u64>()
                .with_context(|| anyhow!("Invalid time budget `{}`", time))?,
        ),
        _ => return Err(anyhow!("Expected `<status> <time>`, found `{}`", status)),
    };

    let table = Table::parse(lines.iter().copied())?;

    Ok(Expected { ok, time, table })
}

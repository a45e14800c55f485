//! Splitting a captured session log into per-command responses.
//!
//! The spreadsheet program prints `[<elapsed>] (<status>) > ` after its
//! initial viewport and after every command, so the text between two
//! consecutive prompts is the response to one command, and the status belongs
//! to the prompt that ends it.

use std::sync::OnceLock;

use regex::Regex;

use crate::table::Table;

fn prompt() -> &'static Regex {
    static PROMPT: OnceLock<Regex> = OnceLock::new();
    PROMPT.get_or_init(|| {
        Regex::new(r"\[([^\]\n]*)\] ?\(([^)\n]*)\) ?> ?").expect("[INTERNAL ERROR]: valid regex")
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub ok: bool,
    /// Seconds reported by the prompt, if it printed a number.
    pub elapsed: Option<f64>,
    pub lines: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    /// Viewport printed before the first prompt.
    pub initial: Vec<String>,
    pub responses: Vec<Response>,
}

/// What the program produced for one command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Observed {
    pub ok: bool,
    pub table: Option<Table>,
}

impl Response {
    pub fn observe(&self) -> anyhow::Result<Observed> {
        Ok(Observed {
            ok: self.ok,
            table: Table::parse(self.lines.iter().map(String::as_str))?,
        })
    }
}

/// Returns `None` if the log never reached the first prompt.
///
/// Text after the last prompt is not a response: the program either exited or
/// was still working on the next command.
pub fn split(log: &str) -> Option<Session> {
    let mut prompts = prompt().captures_iter(log);

    let first = prompts.next()?.get_match();
    let initial = lines(&log[..first.start()]);

    let mut start = first.end();
    let mut responses = Vec::new();

    for captures in prompts {
        let whole = captures.get_match();

        responses.push(Response {
            ok: captures[2].to_ascii_lowercase().contains("ok"),
            elapsed: captures[1].trim().parse().ok(),
            lines: lines(&log[start..whole.start()]),
        });

        start = whole.end();
    }

    Some(Session { initial, responses })
}

fn lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(String::from)
        .collect()
}

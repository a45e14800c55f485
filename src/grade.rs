use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use ansi_term::Color;
use anyhow::anyhow;
use anyhow::Context as _;

use crate::diff;
use crate::diff::Diff;
use crate::expect;
use crate::expect::Expected;
use crate::render::Renderer;
use crate::session;
use crate::suite::Marks;
use crate::suite::TestCase;
use crate::table::Table;

#[derive(Copy, Clone, Debug)]
pub struct Options {
    /// Seconds tolerated on top of each command's time budget.
    pub slack: f64,
    /// Reject observed tables outside the viewport limits before diffing.
    pub validate: bool,
    pub verbose: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            slack: 0.2,
            validate: false,
            verbose: false,
        }
    }
}

/// The step a test case stopped at.
#[derive(Clone, Debug, PartialEq)]
pub struct Failure {
    /// `None` when the session never reached the first command.
    pub step: Option<usize>,
    pub command: String,
    pub reason: String,
    pub diff: Option<Diff>,
    pub expected: Option<Table>,
    pub found: Option<Table>,
}

impl Failure {
    fn new(step: usize, command: &str, reason: impl Into<String>) -> Self {
        Failure {
            step: Some(step),
            command: command.trim().to_string(),
            reason: reason.into(),
            diff: None,
            expected: None,
            found: None,
        }
    }

    fn from_diff(
        step: usize,
        command: &str,
        diff: Diff,
        expected: &Expected,
        found: Option<Table>,
    ) -> Self {
        Failure {
            reason: diff.reason().to_string(),
            diff: Some(diff),
            expected: expected.table.clone(),
            found,
            ..Failure::new(step, command, "")
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Verdict {
    pub name: String,
    pub pass: bool,
    pub reason: String,
    pub marks: f64,
    pub step: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub student: String,
    pub verdicts: Vec<Verdict>,
}

impl Summary {
    pub fn passed(&self) -> usize {
        self.verdicts.iter().filter(|verdict| verdict.pass).count()
    }

    pub fn total(&self) -> usize {
        self.verdicts.len()
    }

    pub fn marks(&self) -> f64 {
        self.verdicts.iter().map(|verdict| verdict.marks).sum()
    }
}

/// Replays one captured session against its expectations and stops at the
/// first failing step.
///
/// A command/expectation count mismatch or an unparseable transcript is an
/// error in the test asset and is returned as `Err`.
pub fn grade_session(
    commands: &[&str],
    expecteds: &[Expected],
    log: &str,
    options: &Options,
) -> anyhow::Result<Option<Failure>> {
    if commands.len() != expecteds.len() {
        return Err(anyhow!(
            "Error in test case len(commands)={}, len(expecteds)={}",
            commands.len(),
            expecteds.len()
        ));
    }

    let session = match session::split(log) {
        Some(session) => session,
        None => {
            return Ok(Some(Failure {
                step: None,
                ..Failure::new(0, "", "Couldn't read the initial prompt")
            }))
        }
    };

    for (step, (command, expected)) in commands.iter().zip(expecteds).enumerate() {
        let response = match session.responses.get(step) {
            Some(response) => response,
            None => {
                tracing::debug!("no prompt after step {} ({})", step, command.trim());
                let diff = Diff::time(command, expected.time);
                return Ok(Some(Failure::from_diff(step, command, diff, expected, None)));
            }
        };

        if let Some(elapsed) = response.elapsed {
            if elapsed > expected.time as f64 + options.slack {
                tracing::debug!("step {} took {}s, allowed {}s", step, elapsed, expected.time);
                let diff = Diff::time(command, expected.time);
                return Ok(Some(Failure::from_diff(step, command, diff, expected, None)));
            }
        }

        let observed = response
            .observe()
            .with_context(|| anyhow!("Failed to parse output of command `{}`", command.trim()))?;

        if options.validate {
            if let Some(Err(invalid)) = observed.table.as_ref().map(Table::validate) {
                return Ok(Some(Failure {
                    found: observed.table,
                    expected: expected.table.clone(),
                    ..Failure::new(step, command, format!("Invalid table: {}", invalid))
                }));
            }
        }

        if let Some(diff) = diff::compare(expected, observed.table.as_ref(), observed.ok) {
            return Ok(Some(Failure::from_diff(step, command, diff, expected, observed.table)));
        }
    }

    Ok(None)
}

pub fn grade_case<W: Write>(
    out: &mut W,
    case: &TestCase,
    submission: &Path,
    marks: &Marks,
    renderer: &Renderer,
    options: &Options,
) -> anyhow::Result<Verdict> {
    let name = case.name();
    let log = case.log(submission);

    if !log.is_file() {
        tracing::warn!("missing session log {}", log.display());
        return Ok(Verdict {
            name,
            pass: false,
            reason: String::from("Missing session log"),
            marks: 0.0,
            step: None,
        });
    }

    let stdout = fs::read(&log).with_context(|| anyhow!("Could not read {}", log.display()))?;
    let actual = String::from_utf8_lossy(&stdout);
    let expecteds = expect::parse(&case.expected)
        .with_context(|| anyhow!("Failed to parse expectations of {}", name))?;

    let failure = grade_session(&case.commands(), &expecteds, &actual, options)
        .with_context(|| anyhow!("Failed to grade test {}", name))?;

    match failure {
        None => Ok(Verdict {
            marks: marks.get(case),
            name,
            pass: true,
            reason: String::new(),
            step: None,
        }),
        Some(failure) => {
            if let Some(diff) = &failure.diff {
                renderer.render(
                    out,
                    diff,
                    &failure.command,
                    failure.expected.as_ref(),
                    failure.found.as_ref(),
                )?;
            }

            Ok(Verdict {
                name,
                pass: false,
                reason: failure.reason,
                marks: 0.0,
                step: failure.step,
            })
        }
    }
}

/// Grades every case against the logs of one submission directory.
pub fn grade_submission<W: Write>(
    out: &mut W,
    submission: &Path,
    cases: &[TestCase],
    marks: &Marks,
    renderer: &Renderer,
    options: &Options,
) -> anyhow::Result<Summary> {
    let student = student(submission);

    writeln!(
        out,
        "[{}] grading in workspace {}...",
        student,
        submission.display()
    )?;

    let mut verdicts = Vec::with_capacity(cases.len());

    for case in cases {
        let verdict = grade_case(out, case, submission, marks, renderer, options)?;

        match verdict.pass {
            true if options.verbose => writeln!(out, "- [{}]: pass", verdict.name)?,
            true => (),
            false => writeln!(out, "- [{}]: fail: {}", verdict.name, verdict.reason)?,
        }

        verdicts.push(verdict);
    }

    let summary = Summary { student, verdicts };

    writeln!(
        out,
        "{}",
        renderer.paint(
            Color::Blue.normal(),
            &format!(
                "[{}]: passed {} out of {} ({} marks)",
                summary.student,
                summary.passed(),
                summary.total(),
                summary.marks()
            )
        )
    )?;

    Ok(summary)
}

/// Grades each sub-directory of `workspace` as a separate submission. A
/// submission that cannot be graded is recorded and the batch continues.
pub fn grade_batch<W: Write>(
    out: &mut W,
    workspace: &Path,
    cases: &[TestCase],
    marks: &Marks,
    renderer: &Renderer,
    options: &Options,
) -> anyhow::Result<Vec<(String, anyhow::Result<Summary>)>> {
    let mut submissions = workspace
        .read_dir()
        .with_context(|| anyhow!("Could not read workspace {}", workspace.display()))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect::<Vec<PathBuf>>();

    submissions.sort();

    let mut results = Vec::with_capacity(submissions.len());

    for submission in &submissions {
        let result = grade_submission(out, submission, cases, marks, renderer, options);
        if let Err(error) = &result {
            tracing::error!("failed to grade {}: {:#}", submission.display(), error);
            writeln!(
                out,
                "{}",
                renderer.paint(
                    Color::Red.normal(),
                    &format!("[{}]: error: {:#}", student(submission), error)
                )
            )?;
        }
        results.push((student(submission), result));
    }

    writeln!(out)?;
    for (student, result) in &results {
        match result {
            Ok(summary) => writeln!(
                out,
                "{:<24} {:>3}/{:<3} {:>6}",
                student,
                summary.passed(),
                summary.total(),
                summary.marks()
            )?,
            Err(error) => writeln!(out, "{:<24} error: {}", student, error)?,
        }
    }

    let failed = results.iter().filter(|(_, result)| result.is_err()).count();
    writeln!(
        out,
        "{}",
        renderer.paint(
            Color::Blue.normal(),
            &format!(
                "graded {} submissions, {} could not be graded",
                results.len(),
                failed
            )
        )
    )?;

    Ok(results)
}

fn student(submission: &Path) -> String {
    submission
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| submission.display().to_string())
}

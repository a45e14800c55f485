use std::fs;
use std::io;
use std::io::Write as _;
use std::path::PathBuf;
use std::str::FromStr;

use ansi_term::Color;
use anyhow::anyhow;
use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use spreadsheet_autograder::expect;
use spreadsheet_autograder::grade;
use spreadsheet_autograder::grade::Options;
use spreadsheet_autograder::render::Renderer;
use spreadsheet_autograder::suite;
use spreadsheet_autograder::suite::Marks;

#[derive(Parser)]
#[clap(about)]
enum Command {
    /// Grade captured session logs (or a directory of submissions).
    Grade {
        /// Directory holding one `<case>.out` session log per test case.
        #[clap(short, long)]
        workspace: PathBuf,

        /// Test case directory or single `.cmds` file. Defaults to the built-in samples.
        #[clap(short, long)]
        tests: Option<PathBuf>,

        /// Headerless `name,marks` CSV.
        #[clap(short, long)]
        marks: Option<PathBuf>,

        /// Treat each sub-directory of the workspace as a separate submission.
        #[clap(short, long)]
        batch: bool,

        #[clap(short, long)]
        verbose: bool,

        /// Fail a step whose table is outside the viewport limits before diffing it.
        #[clap(long)]
        validate: bool,

        /// Seconds tolerated on top of each command's time budget.
        #[clap(long, default_value = "0.2")]
        slack: f64,

        /// One of auto, always, never.
        #[clap(long, default_value = "auto")]
        color: ColorChoice,
    },

    /// Parse a `.exp` transcript and report tables outside the viewport limits.
    Check {
        #[clap(short, long)]
        expected: PathBuf,

        /// Verify that the transcript has one block per command.
        #[clap(short, long)]
        commands: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    fn enabled(self) -> bool {
        match self {
            ColorChoice::Auto => atty::is(atty::Stream::Stdout),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        }
    }
}

impl FromStr for ColorChoice {
    type Err = anyhow::Error;
    fn from_str(choice: &str) -> Result<Self, Self::Err> {
        match choice {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(anyhow!("Invalid color choice `{}`", choice)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let command = Command::parse();

    match command {
        Command::Grade {
            workspace,
            tests,
            marks,
            batch,
            verbose,
            validate,
            slack,
            color,
        } => {
            let cases = match &tests {
                Some(tests) => suite::discover(tests)?,
                None => suite::samples(),
            };

            if cases.is_empty() {
                return Err(anyhow!("No test cases found"));
            }

            let marks = match &marks {
                Some(marks) => Marks::load(marks)?,
                None => Marks::default(),
            };

            let renderer = Renderer::new(color.enabled());
            let options = Options {
                slack,
                validate,
                verbose,
            };

            let stdout = io::stdout();
            let mut out = stdout.lock();

            match batch {
                true => {
                    grade::grade_batch(&mut out, &workspace, &cases, &marks, &renderer, &options)?;
                }
                false => {
                    grade::grade_submission(
                        &mut out, &workspace, &cases, &marks, &renderer, &options,
                    )?;
                }
            }
        }

        Command::Check { expected, commands } => {
            let content = fs::read_to_string(&expected)
                .with_context(|| anyhow!("Could not read {}", expected.display()))?;
            let expecteds = expect::parse(&content)
                .with_context(|| anyhow!("Failed to parse {}", expected.display()))?;

            if let Some(commands) = &commands {
                let text = fs::read_to_string(commands)
                    .with_context(|| anyhow!("Could not read {}", commands.display()))?;
                let count = suite::commands(&text).len();

                if count != expecteds.len() {
                    return Err(anyhow!(
                        "Error in test case len(commands)={}, len(expecteds)={}",
                        count,
                        expecteds.len()
                    ));
                }
            }

            let color = atty::is(atty::Stream::Stdout);
            let stdout = io::stdout();
            let mut out = stdout.lock();

            for (index, expected) in expecteds.iter().enumerate() {
                let line = match expected.table.as_ref().map(|table| table.validate()) {
                    None => String::from("no table"),
                    Some(Ok(())) => String::from("ok"),
                    Some(Err(invalid)) if color => {
                        Color::Yellow.paint(invalid.to_string()).to_string()
                    }
                    Some(Err(invalid)) => invalid.to_string(),
                };
                writeln!(out, "- [block {}]: {}", index + 1, line)?;
            }
        }
    }

    Ok(())
}

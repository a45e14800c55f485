use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use anyhow::anyhow;
use anyhow::Context as _;
use include_dir::include_dir;
use include_dir::Dir;
use walkdir::WalkDir;

static SAMPLES: Dir = include_dir!("$CARGO_MANIFEST_DIR/suite");

/// A `.cmds` script and its golden `.exp` transcript.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCase {
    /// Path of the `.cmds` file, relative to the suite root.
    pub path: PathBuf,
    pub commands: String,
    pub expected: String,
}

impl TestCase {
    pub fn name(&self) -> String {
        self.path.to_string_lossy().replace('\\', "/")
    }

    /// Where the captured stdout of this case lives inside a submission.
    pub fn log(&self, submission: &Path) -> PathBuf {
        submission.join(self.path.with_extension("out"))
    }

    pub fn commands(&self) -> Vec<&str> {
        commands(&self.commands)
    }
}

/// One command per line; trailing blank lines are not commands.
pub fn commands(text: &str) -> Vec<&str> {
    let mut commands = text.lines().collect::<Vec<_>>();

    while commands.last().map_or(false, |command| command.trim().is_empty()) {
        commands.pop();
    }

    commands
}

/// Test cases shipped with the binary.
pub fn samples() -> Vec<TestCase> {
    let mut cases = Vec::new();
    collect_samples(&SAMPLES, &mut cases);
    cases.sort_by(|a, b| a.path.cmp(&b.path));
    cases
}

fn collect_samples(dir: &Dir, cases: &mut Vec<TestCase>) {
    for file in dir.files() {
        if file.path().extension().map_or(true, |extension| extension != "cmds") {
            continue;
        }

        let expected = match dir.get_file(file.path().with_extension("exp")) {
            Some(expected) => expected,
            None => {
                tracing::warn!("sample {} has no .exp file", file.path().display());
                continue;
            }
        };

        cases.push(TestCase {
            path: file.path().to_path_buf(),
            commands: file.contents_utf8().unwrap_or_default().to_string(),
            expected: expected.contents_utf8().unwrap_or_default().to_string(),
        });
    }

    for dir in dir.dirs() {
        collect_samples(dir, cases);
    }
}

/// Finds every `<name>.cmds` with a sibling `<name>.exp` under `root`, or the
/// single case `root` if it is a `.cmds` file.
pub fn discover(root: &Path) -> anyhow::Result<Vec<TestCase>> {
    if root.is_file() {
        let name = root
            .file_name()
            .ok_or_else(|| anyhow!("Invalid test path {}", root.display()))?;
        return Ok(vec![read(root, Path::new(name))?]);
    }

    let mut cases = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| anyhow!("Could not walk {}", root.display()))?;
        let path = entry.path();

        if !entry.file_type().is_file()
            || path.extension().map_or(true, |extension| extension != "cmds")
        {
            continue;
        }

        if !path.with_extension("exp").is_file() {
            tracing::warn!("skipping {}: no matching .exp file", path.display());
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        cases.push(read(path, relative)?);
    }

    cases.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::debug!("discovered {} test cases under {}", cases.len(), root.display());
    Ok(cases)
}

fn read(path: &Path, relative: &Path) -> anyhow::Result<TestCase> {
    let expected = path.with_extension("exp");
    Ok(TestCase {
        path: relative.to_path_buf(),
        commands: fs::read_to_string(path)
            .with_context(|| anyhow!("Could not read {}", path.display()))?,
        expected: fs::read_to_string(&expected)
            .with_context(|| anyhow!("Could not read {}", expected.display()))?,
    })
}

/// Marks awarded per passing test case; unlisted cases are worth one mark.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Marks(HashMap<String, f64>);

impl Marks {
    pub const DEFAULT: f64 = 1.0;

    /// Reads a headerless `name,marks[,...]` CSV. Extra columns are ignored.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| anyhow!("Could not open marks mapping {}", path.display()))?;

        Self::from_reader(reader)
    }

    fn from_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> anyhow::Result<Self> {
        let mut marks = HashMap::new();

        for (index, record) in reader.records().enumerate() {
            let record = record.with_context(|| anyhow!("Invalid marks record {}", index + 1))?;
            let (name, value) = match (record.get(0), record.get(1)) {
                (Some(name), Some(value)) => (name, value),
                _ => return Err(anyhow!("Marks record {} needs a name and marks", index + 1)),
            };
            let value = value
                .parse::<f64>()
                .with_context(|| anyhow!("Invalid marks `{}` for {}", value, name))?;
            marks.insert(name.to_string(), value);
        }

        Ok(Marks(marks))
    }

    /// Looks a case up by relative path first, then by file name.
    pub fn get(&self, case: &TestCase) -> f64 {
        let file_name = case
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        self.0
            .get(&case.name())
            .or_else(|| file_name.and_then(|name| self.0.get(&name)))
            .copied()
            .unwrap_or(Self::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempdir::TempDir;

    use super::*;
    use crate::expect;

    fn case(path: &str, commands: &str) -> TestCase {
        TestCase {
            path: PathBuf::from(path),
            commands: commands.to_string(),
            expected: String::new(),
        }
    }

    #[test]
    fn samples_are_well_formed() {
        let samples = samples();
        assert!(!samples.is_empty());

        for sample in &samples {
            let expecteds = expect::parse(&sample.expected).unwrap();
            assert_eq!(expecteds.len(), sample.commands().len(), "{}", sample.name());
            for table in expecteds.iter().filter_map(|expected| expected.table.as_ref()) {
                assert_eq!(table.validate(), Ok(()), "{}", sample.name());
            }
        }
    }

    #[test]
    fn commands_ignore_trailing_blank_lines() {
        let case = case("a.cmds", "A1=1\n\nB1=2\n\n\n");
        assert_eq!(case.commands(), vec!["A1=1", "", "B1=2"]);
    }

    #[test]
    fn log_mirrors_case_path() {
        let case = case("range/max.cmds", "");
        assert_eq!(
            case.log(Path::new("/work/2023CS10001")),
            PathBuf::from("/work/2023CS10001/range/max.out")
        );
    }

    #[test]
    fn discovers_pairs_recursively() {
        let root = TempDir::new("suite").unwrap();
        fs::create_dir(root.path().join("nested")).unwrap();
        fs::write(root.path().join("b.cmds"), "A1=1\n").unwrap();
        fs::write(root.path().join("b.exp"), "ok 1\n*******************\n").unwrap();
        fs::write(root.path().join("nested/a.cmds"), "A1=2\n").unwrap();
        fs::write(root.path().join("nested/a.exp"), "ok 1\n*******************\n").unwrap();
        fs::write(root.path().join("orphan.cmds"), "A1=3\n").unwrap();

        let cases = discover(root.path()).unwrap();
        let names = cases.iter().map(TestCase::name).collect::<Vec<_>>();
        assert_eq!(names, vec!["b.cmds", "nested/a.cmds"]);
        assert_eq!(cases[1].commands, "A1=2\n");
    }

    #[test]
    fn discovers_single_file() {
        let root = TempDir::new("suite").unwrap();
        let path = root.path().join("only.cmds");
        fs::write(&path, "A1=1\n").unwrap();
        fs::write(root.path().join("only.exp"), "ok 1\n*******************\n").unwrap();

        let cases = discover(&path).unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].path, PathBuf::from("only.cmds"));
    }

    #[test]
    fn single_file_without_expectation_is_an_error() {
        let root = TempDir::new("suite").unwrap();
        let path = root.path().join("only.cmds");
        fs::write(&path, "A1=1\n").unwrap();
        assert!(discover(&path).is_err());
    }

    #[test]
    fn marks_lookup() {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader("basic.cmds, 2.5, 1, 512\nrange/max.cmds,4\n".as_bytes());
        let marks = Marks::from_reader(reader).unwrap();

        assert_eq!(marks.get(&case("basic.cmds", "")), 2.5);
        assert_eq!(marks.get(&case("range/max.cmds", "")), 4.0);
        assert_eq!(marks.get(&case("other/basic.cmds", "")), 2.5);
        assert_eq!(marks.get(&case("missing.cmds", "")), Marks::DEFAULT);
    }

    #[test]
    fn invalid_marks_are_rejected() {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader("basic.cmds,lots\n".as_bytes());
        assert!(Marks::from_reader(reader).is_err());
    }
}

//! Test-runner generation.
//!
//! For each test source this emits a companion runner under a sibling
//! `runner/` directory, and once every file has been scanned, a single
//! aggregate dispatcher that invokes each discovered group. Files are
//! written only on content change, so regenerating with identical inputs
//! never perturbs build-tree mtimes.

mod gen;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use gen::runner_source;

use crate::util::fs::{read_entire_file, write_entire_file_if_changed, DEFAULT_FILE_LIMIT};

/// First line of every generated file.
pub const GENERATED_BANNER: &str = "/* AUTOGENERATED FILE. DO NOT EDIT. */\n";

/// Insertion-ordered set of test group names accumulated across files.
///
/// Insertion order defines the aggregate runner's dispatch order;
/// re-declaring a group is idempotent.
#[derive(Debug, Default)]
pub struct TestGroupSet {
    names: Vec<String>,
}

impl TestGroupSet {
    pub fn new() -> TestGroupSet {
        TestGroupSet { names: Vec::new() }
    }

    /// Insert a group. Returns whether it was newly added.
    pub fn insert(&mut self, name: &str) -> bool {
        if self.names.iter().any(|n| n == name) {
            return false;
        }
        self.names.push(name.to_string());
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Where the runner for a test source lives: a sibling `runner/` directory,
/// filename `<stem>_runner<ext>`.
pub fn runner_path(test_file: &Path) -> PathBuf {
    let dir = test_file.parent().unwrap_or_else(|| Path::new(""));
    let stem = test_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut name = format!("{}_runner", stem);
    if let Some(ext) = test_file.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    dir.join("runner").join(name)
}

/// What a generation pass produced.
#[derive(Debug)]
pub struct RunnerOutput {
    /// Per-file runner paths, in input order.
    pub runners: Vec<PathBuf>,
    /// Path of the aggregate dispatcher.
    pub aggregate: PathBuf,
    /// Number of distinct groups discovered.
    pub groups: usize,
    /// How many files were actually (re)written.
    pub written: usize,
}

/// Generate a runner next to every test file plus the aggregate dispatcher.
pub fn generate_runner_files(test_files: &[PathBuf], aggregate: &Path) -> Result<RunnerOutput> {
    let mut groups = TestGroupSet::new();
    let mut runners = Vec::with_capacity(test_files.len());
    let mut written = 0;

    for file in test_files {
        let input = read_entire_file(file, DEFAULT_FILE_LIMIT)
            .with_context(|| format!("while scanning test file {}", file.display()))?;
        let source = runner_source(&input, &mut groups);

        let path = runner_path(file);
        if write_entire_file_if_changed(&path, source.as_bytes(), DEFAULT_FILE_LIMIT)? {
            tracing::info!("Generated {}", path.display());
            written += 1;
        }
        runners.push(path);
    }

    let aggregate_source = aggregate_runner_source(&groups);
    if write_entire_file_if_changed(aggregate, aggregate_source.as_bytes(), DEFAULT_FILE_LIMIT)? {
        tracing::info!("Generated {}", aggregate.display());
        written += 1;
    }

    Ok(RunnerOutput {
        runners,
        aggregate: aggregate.to_path_buf(),
        groups: groups.len(),
        written,
    })
}

/// The aggregate dispatcher: one `RUN_TEST_GROUP` call per group, in
/// accumulation order.
pub fn aggregate_runner_source(groups: &TestGroupSet) -> String {
    let mut out = String::from(GENERATED_BANNER);
    out.push_str("#include \"unity_fixture.h\"\n");
    out.push_str("\nvoid run_all_tests(void) {\n");
    for group in groups.iter() {
        out.push_str(&format!("    RUN_TEST_GROUP({});\n", group));
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_group_set_preserves_insertion_order() {
        let mut groups = TestGroupSet::new();
        assert!(groups.insert("timer"));
        assert!(groups.insert("adc"));
        assert!(!groups.insert("timer"));

        assert_eq!(groups.iter().collect::<Vec<_>>(), ["timer", "adc"]);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_runner_path_is_a_sibling() {
        assert_eq!(
            runner_path(Path::new("test/test_add.c")),
            PathBuf::from("test/runner/test_add_runner.c")
        );
    }

    #[test]
    fn test_aggregate_source_format() {
        let mut groups = TestGroupSet::new();
        groups.insert("add");
        groups.insert("timer");

        assert_eq!(
            aggregate_runner_source(&groups),
            "/* AUTOGENERATED FILE. DO NOT EDIT. */\n\
             #include \"unity_fixture.h\"\n\
             \n\
             void run_all_tests(void) {\n\
             \x20   RUN_TEST_GROUP(add);\n\
             \x20   RUN_TEST_GROUP(timer);\n\
             }\n"
        );
    }

    #[test]
    fn test_generation_covers_all_files_and_aggregates_in_order() {
        let tmp = TempDir::new().unwrap();
        let test_dir = tmp.path().join("test");
        fs::create_dir_all(&test_dir).unwrap();

        let first = test_dir.join("test_add.c");
        let second = test_dir.join("test_sub.c");
        fs::write(&first, "TEST_GROUP(add);\nTEST(add, zero) {}\n").unwrap();
        fs::write(&second, "TEST_GROUP(sub);\nTEST(sub, zero) {}\n").unwrap();

        let aggregate = test_dir.join("runner").join("all_tests.c");
        let output =
            generate_runner_files(&[first.clone(), second.clone()], &aggregate).unwrap();

        assert_eq!(output.groups, 2);
        assert_eq!(output.written, 3);
        assert_eq!(
            output.runners,
            vec![
                test_dir.join("runner").join("test_add_runner.c"),
                test_dir.join("runner").join("test_sub_runner.c"),
            ]
        );

        let aggregate_text = fs::read_to_string(&aggregate).unwrap();
        let add_at = aggregate_text.find("RUN_TEST_GROUP(add);").unwrap();
        let sub_at = aggregate_text.find("RUN_TEST_GROUP(sub);").unwrap();
        assert!(add_at < sub_at);
    }

    #[test]
    fn test_regeneration_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let test_dir = tmp.path().join("test");
        fs::create_dir_all(&test_dir).unwrap();
        let file = test_dir.join("test_add.c");
        fs::write(&file, "TEST_GROUP(add);\nTEST(add, zero) {}\n").unwrap();

        let aggregate = test_dir.join("runner").join("all_tests.c");
        let first = generate_runner_files(&[file.clone()], &aggregate).unwrap();
        assert_eq!(first.written, 2);

        let second = generate_runner_files(&[file], &aggregate).unwrap();
        assert_eq!(second.written, 0);
    }
}

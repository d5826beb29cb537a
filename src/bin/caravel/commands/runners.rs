//! `caravel runners` command

use std::path::Path;

use anyhow::{bail, Result};

use caravel::core::manifest::{Manifest, TestsSection};
use caravel::runner::generate_runner_files;
use caravel::util::fs::glob_files;

use crate::cli::RunnersArgs;

pub fn execute(_args: RunnersArgs) -> Result<()> {
    let manifest = Manifest::load_or_default(Path::new("."))?;
    let tests: TestsSection = manifest.tests.unwrap_or_default();

    let test_files = glob_files(Path::new("."), &tests.sources)?;
    if test_files.is_empty() {
        bail!("no test sources matched the patterns {:?}", tests.sources);
    }

    let output = generate_runner_files(&test_files, &tests.aggregate_runner)?;
    tracing::info!(
        "Generated {} runners covering {} groups ({} files written)",
        output.runners.len(),
        output.groups,
        output.written
    );
    Ok(())
}

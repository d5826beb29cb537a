//! Project manifest (`Caravel.toml`) loading.
//!
//! The manifest names the artifacts to build and where their sources live,
//! and optionally overlays per-target toolchain settings on top of the
//! built-in host and AVR defaults. Every table is optional; a missing
//! manifest behaves like an empty one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Manifest filename looked up in the project root.
pub const MANIFEST_FILE: &str = "Caravel.toml";

/// Top-level manifest structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub package: PackageSection,
    pub lib: Option<LibSection>,
    pub bin: Option<BinSection>,
    pub tests: Option<TestsSection>,
    /// Per-target toolchain overlays, keyed by architecture tag.
    #[serde(rename = "target")]
    pub targets: BTreeMap<String, TargetSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PackageSection {
    pub name: String,
}

impl Default for PackageSection {
    fn default() -> Self {
        PackageSection {
            name: "app".to_string(),
        }
    }
}

/// Static library built from `sources` and linked into the binary and the
/// test executable.
#[derive(Debug, Clone, Deserialize)]
pub struct LibSection {
    pub name: String,
    pub sources: Vec<String>,
}

/// Product executable.
#[derive(Debug, Clone, Deserialize)]
pub struct BinSection {
    pub name: String,
    pub sources: Vec<String>,
}

/// Test executable: `sources` are scanned for test macros and get generated
/// runners; `harness` sources (the main function and any framework code) are
/// compiled in as-is.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TestsSection {
    pub name: String,
    pub sources: Vec<String>,
    pub harness: Vec<String>,
    pub aggregate_runner: PathBuf,
}

impl Default for TestsSection {
    fn default() -> Self {
        TestsSection {
            name: "tests".to_string(),
            sources: vec!["test/test_*.c".to_string()],
            harness: vec!["test/testmain.c".to_string()],
            aggregate_runner: PathBuf::from("test/runner/all_tests.c"),
        }
    }
}

/// Toolchain overlay for one target. Every field is optional; unset fields
/// keep the built-in default for the architecture.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TargetSpec {
    pub cc: Option<Vec<String>>,
    pub ld: Option<Vec<String>>,
    pub ar: Option<Vec<String>>,
    pub objcopy: Option<Vec<String>>,
    pub size: Option<Vec<String>>,
    pub cflags: Option<Vec<String>>,
    pub ldflags: Option<Vec<String>>,
    /// Include directories, with or without the `-I` prefix.
    pub include_dirs: Option<Vec<String>>,
    pub obj_extension: Option<String>,
    pub lib_extension: Option<String>,
    pub exec_extension: Option<String>,
    pub build_dir: Option<PathBuf>,
}

impl Manifest {
    /// Parse a manifest from TOML text.
    pub fn parse(text: &str) -> Result<Manifest> {
        toml::from_str(text).context("failed to parse manifest")
    }

    /// Load the manifest from a file.
    pub fn load(path: &Path) -> Result<Manifest> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;
        Manifest::parse(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Load `Caravel.toml` from `dir` if present, otherwise the defaults.
    pub fn load_or_default(dir: &Path) -> Result<Manifest> {
        let path = dir.join(MANIFEST_FILE);
        if path.exists() {
            Manifest::load(&path)
        } else {
            tracing::debug!("no {} found, using defaults", MANIFEST_FILE);
            Ok(Manifest::default())
        }
    }
}

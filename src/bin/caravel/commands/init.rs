//! `caravel init` command
//!
//! Scaffolds a project in the current directory: a manifest, a library
//! with a header, a product main, and a test skeleton wired to the
//! fixture framework.

use std::path::Path;

use anyhow::{bail, Result};

use caravel::core::manifest::MANIFEST_FILE;
use caravel::util::fs::write_entire_file;

use crate::cli::InitArgs;

const MANIFEST_TEMPLATE: &str = r#"[package]
name = "{name}"

[lib]
name = "{name}"
sources = ["lib/*.c"]

[bin]
name = "{name}"
sources = ["src/*.c"]

[tests]
sources = ["test/test_*.c"]
harness = ["test/testmain.c"]
aggregate_runner = "test/runner/all_tests.c"

[target.host]
include_dirs = ["include"]

[target.avr]
include_dirs = ["include"]
"#;

const LIB_HEADER_TEMPLATE: &str = r#"#ifndef {GUARD}_H
#define {GUARD}_H

int {name}_run(void);

#endif /* {GUARD}_H */
"#;

const LIB_SOURCE_TEMPLATE: &str = r#"#include "{name}.h"

int {name}_run(void) {
    return 0;
}
"#;

const MAIN_TEMPLATE: &str = r#"#include <stdio.h>

#include "{name}.h"

int main(void) {
    printf("%d\n", {name}_run());
    return 0;
}
"#;

const TEST_TEMPLATE: &str = r#"#include "unity_fixture.h"

#include "{name}.h"

TEST_GROUP({name});

TEST_SETUP({name}) {
}

TEST_TEAR_DOWN({name}) {
}

TEST({name}, run_returns_zero) {
    TEST_ASSERT_EQUAL(0, {name}_run());
}
"#;

const TESTMAIN_TEMPLATE: &str = r#"#include "unity_fixture.h"

void run_all_tests(void);

int main(int argc, const char **argv) {
    return UnityMain(argc, argv, run_all_tests);
}
"#;

fn fill(template: &str, name: &str) -> String {
    template
        .replace("{GUARD}", &name.to_uppercase())
        .replace("{name}", name)
}

pub fn execute(args: InitArgs) -> Result<()> {
    let root = Path::new(".");
    let manifest_path = root.join(MANIFEST_FILE);
    if manifest_path.exists() {
        bail!("{} already exists", manifest_path.display());
    }

    let name = match args.name {
        Some(name) => name,
        None => std::env::current_dir()?
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "app".to_string()),
    };
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
        || !name.starts_with(|c: char| c.is_ascii_alphabetic())
    {
        bail!("`{}` is not a valid project name (want a C identifier)", name);
    }

    write_entire_file(&manifest_path, fill(MANIFEST_TEMPLATE, &name).as_bytes())?;
    write_entire_file(
        &root.join("include").join(format!("{}.h", name)),
        fill(LIB_HEADER_TEMPLATE, &name).as_bytes(),
    )?;
    write_entire_file(
        &root.join("lib").join(format!("{}.c", name)),
        fill(LIB_SOURCE_TEMPLATE, &name).as_bytes(),
    )?;
    write_entire_file(
        &root.join("src").join("main.c"),
        fill(MAIN_TEMPLATE, &name).as_bytes(),
    )?;
    write_entire_file(
        &root.join("test").join(format!("test_{}.c", name)),
        fill(TEST_TEMPLATE, &name).as_bytes(),
    )?;
    write_entire_file(
        &root.join("test").join("testmain.c"),
        TESTMAIN_TEMPLATE.as_bytes(),
    )?;

    eprintln!("     Created `{}` project", name);
    Ok(())
}

//! Compile, archive, and link driver.
//!
//! Three operations, each returning the path of what it produced inside the
//! build tree: source→object, objects→static library, objects→executable.
//! Every step consults the rebuild decider first, creates its output
//! directory on demand, and dispatches the configured toolchain as a
//! synchronous child process.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::builder::context::BuildCtx;
use crate::builder::rebuild::{needs_rebuild, DepTree};
use crate::builder::scan::included_dependencies;
use crate::core::config::BuildConfig;
use crate::util::fs::{ensure_parent_dir, shorten_path, write_entire_file_if_changed, DEFAULT_FILE_LIMIT};
use crate::util::process::ProcessBuilder;

/// One entry of a `compile_commands.json` compilation database.
#[derive(Debug, Clone, Serialize)]
pub struct CompileCommand {
    pub directory: String,
    pub command: String,
    pub file: String,
}

/// Map a source path into the build tree:
/// `<build_dir>/<kind>/<shortened path><extension>`.
///
/// Root and parent components are dropped so an absolute or `../` source
/// path still lands inside the build directory.
fn output_path(config: &BuildConfig, kind: &str, path: &Path, extension: &str) -> PathBuf {
    let short = shorten_path(path);
    let rel: PathBuf = short
        .components()
        .filter(|c| matches!(c, std::path::Component::Normal(_)))
        .collect();

    let mut name = config.build_dir.join(kind).join(rel).into_os_string();
    name.push(extension);
    PathBuf::from(name)
}

/// Compile one C source into an object file, if needed.
///
/// The rebuild check covers the source itself, the caller's extra
/// dependencies, and every header the source transitively includes.
pub fn build_source(
    ctx: &mut BuildCtx,
    config: &BuildConfig,
    src: &Path,
    extra_deps: &DepTree,
) -> Result<PathBuf> {
    if src.extension().and_then(|e| e.to_str()) != Some("c") {
        bail!(
            "not implemented: cannot compile {} (only .c sources are supported)",
            src.display()
        );
    }

    let obj = output_path(config, "obj", src, &config.obj_extension);

    let cmd = ProcessBuilder::from_argv(&config.cc)?
        .arg("-c")
        .arg("-o")
        .arg(&obj)
        .arg(src)
        .args(&config.cflags)
        .args(&config.include_dirs);
    ctx.compile_db.push(CompileCommand {
        directory: std::env::current_dir()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|_| ".".to_string()),
        command: cmd.display_command(),
        file: src.display().to_string(),
    });

    let headers = included_dependencies(ctx, config, src, &src.to_string_lossy())?;
    let deps = DepTree::List(vec![
        DepTree::leaf(src),
        extra_deps.clone(),
        DepTree::paths(headers),
    ]);

    if needs_rebuild(ctx, &obj, &deps)? {
        tracing::info!("Compiling {}", src.display());
        ensure_parent_dir(&mut ctx.dir_exists, &obj)?;
        cmd.exec_and_check()?;
    } else {
        tracing::debug!("{} is up to date", obj.display());
    }
    Ok(obj)
}

/// Archive the objects compiled from `srcs` into a static library, if
/// needed.
///
/// The decision runs in two phases before any object is produced: first
/// the archive against the sources and extra dependencies, then the
/// archive against each source's scanned headers. Compiling first would
/// push fresh object mtimes into the cache and mask header-driven
/// staleness of the archive itself.
pub fn build_library(
    ctx: &mut BuildCtx,
    config: &BuildConfig,
    lib_name: &str,
    srcs: &[PathBuf],
    extra_deps: &DepTree,
) -> Result<PathBuf> {
    let archive = output_path(config, "lib", Path::new(lib_name), &config.lib_extension);

    let mut rebuild = needs_rebuild(
        ctx,
        &archive,
        &DepTree::List(vec![DepTree::paths(srcs.to_vec()), extra_deps.clone()]),
    )?;

    if !rebuild {
        for src in srcs {
            let headers = included_dependencies(ctx, config, src, &src.to_string_lossy())?;
            if needs_rebuild(ctx, &archive, &DepTree::paths(headers))? {
                rebuild = true;
                break;
            }
        }
    }

    if rebuild {
        let mut objs = Vec::with_capacity(srcs.len());
        for src in srcs {
            objs.push(build_source(ctx, config, src, extra_deps)?);
        }

        tracing::info!("Archiving {}", archive.display());
        ensure_parent_dir(&mut ctx.dir_exists, &archive)?;
        ProcessBuilder::from_argv(&config.ar)?
            .arg("-rcs")
            .arg(&archive)
            .args(&objs)
            .exec_and_check()?;
    } else {
        tracing::debug!("{} is up to date", archive.display());
    }
    Ok(archive)
}

/// Link objects (and archives) into an executable, if needed.
pub fn build_executable(
    ctx: &mut BuildCtx,
    config: &BuildConfig,
    exe_name: &str,
    objs: &[PathBuf],
    extra_deps: &DepTree,
) -> Result<PathBuf> {
    let exe = output_path(config, "bin", Path::new(exe_name), &config.exec_extension);

    let deps = DepTree::List(vec![DepTree::paths(objs.to_vec()), extra_deps.clone()]);
    if needs_rebuild(ctx, &exe, &deps)? {
        tracing::info!("Linking {}", exe.display());
        ensure_parent_dir(&mut ctx.dir_exists, &exe)?;
        ProcessBuilder::from_argv(&config.ld)?
            .arg("-o")
            .arg(&exe)
            .args(&config.ldflags)
            .args(objs)
            .exec_and_check()?;
    } else {
        tracing::debug!("{} is up to date", exe.display());
    }
    Ok(exe)
}

/// Write the accumulated compilation database into the build tree.
///
/// Change-only, so IDE tooling watching the file is not poked on every
/// invocation.
pub fn write_compile_db(ctx: &mut BuildCtx, config: &BuildConfig) -> Result<PathBuf> {
    let path = config.build_dir.join("compile_commands.json");
    let entries = std::mem::take(&mut ctx.compile_db);
    let json = serde_json::to_vec_pretty(&entries).context("failed to encode compile database")?;
    write_entire_file_if_changed(&path, &json, DEFAULT_FILE_LIMIT)?;
    Ok(path)
}

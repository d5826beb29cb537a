//! `caravel build` command

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use caravel::builder::{
    build_executable, build_library, build_source, needs_rebuild, write_compile_db, BuildCtx,
    DepTree,
};
use caravel::core::config::BuildConfig;
use caravel::core::manifest::Manifest;
use caravel::util::fs::glob_files;
use caravel::util::process::ProcessBuilder;

use crate::cli::BuildArgs;

pub fn execute(args: BuildArgs) -> Result<()> {
    let manifest = Manifest::load_or_default(Path::new("."))?;
    let config = resolve_config(&args.target, &manifest, &args.overrides)?;
    let mut ctx = BuildCtx::new();

    if manifest.lib.is_none() && manifest.bin.is_none() {
        bail!("nothing to build: the manifest declares neither [lib] nor [bin]");
    }

    build_all(&mut ctx, &config, &manifest)?;
    write_compile_db(&mut ctx, &config)?;
    ctx.log_stats();
    Ok(())
}

/// Resolve the target configuration and apply `KEY=VALUE` overrides in
/// order.
pub fn resolve_config(
    target: &str,
    manifest: &Manifest,
    overrides: &[String],
) -> Result<BuildConfig> {
    let mut config = BuildConfig::for_target(target, manifest)?;
    for spec in overrides {
        config.apply_override(spec)?;
    }
    Ok(config)
}

/// Build the `[lib]` archive and the `[bin]` executable, whichever the
/// manifest declares. Returns the archive path for callers that link
/// against it.
pub fn build_all(
    ctx: &mut BuildCtx,
    config: &BuildConfig,
    manifest: &Manifest,
) -> Result<Option<PathBuf>> {
    let mut archive = None;

    if let Some(lib) = &manifest.lib {
        let srcs = glob_files(Path::new("."), &lib.sources)?;
        if srcs.is_empty() {
            bail!("no sources matched the [lib] patterns {:?}", lib.sources);
        }
        archive = Some(build_library(ctx, config, &lib.name, &srcs, &DepTree::empty())?);
    }

    if let Some(bin) = &manifest.bin {
        let srcs = glob_files(Path::new("."), &bin.sources)?;
        if srcs.is_empty() {
            bail!("no sources matched the [bin] patterns {:?}", bin.sources);
        }

        let mut objs = Vec::with_capacity(srcs.len() + 1);
        for src in &srcs {
            objs.push(build_source(ctx, config, src, &DepTree::empty())?);
        }
        objs.extend(archive.clone());

        let exe = build_executable(ctx, config, &bin.name, &objs, &DepTree::empty())?;
        finish_image(ctx, config, &exe)?;
        tracing::info!("Finished {}", exe.display());
    }

    Ok(archive)
}

/// Post-link steps for targets that configure them: an ihex companion for
/// flashing tools, and the size tool's report.
fn finish_image(ctx: &mut BuildCtx, config: &BuildConfig, exe: &Path) -> Result<()> {
    if let Some(objcopy) = &config.objcopy {
        let hex = exe.with_extension("hex");
        if needs_rebuild(ctx, &hex, &DepTree::leaf(exe))? {
            tracing::info!("Writing {}", hex.display());
            ProcessBuilder::from_argv(objcopy)?
                .arg("-O")
                .arg("ihex")
                .arg(exe)
                .arg(&hex)
                .exec_and_check()?;
        }
    }

    if let Some(size) = &config.size {
        let out = ProcessBuilder::from_argv(size)?.arg(exe).exec_capture()?;
        print!("{}", String::from_utf8_lossy(&out.stdout));
    }
    Ok(())
}

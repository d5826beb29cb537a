//! `caravel flags` command

use std::path::Path;

use anyhow::Result;

use caravel::core::config::BuildConfig;
use caravel::core::manifest::Manifest;

use crate::cli::FlagsArgs;

pub fn execute(args: FlagsArgs) -> Result<()> {
    let manifest = Manifest::load_or_default(Path::new("."))?;
    let config = BuildConfig::for_target(&args.target, &manifest)?;

    println!("target: {}", config.arch);
    println!("build_dir: {}", config.build_dir.display());
    println!("cc: {}", config.cc.join(" "));
    println!("ld: {}", config.ld.join(" "));
    println!("ar: {}", config.ar.join(" "));
    if let Some(objcopy) = &config.objcopy {
        println!("objcopy: {}", objcopy.join(" "));
    }
    if let Some(size) = &config.size {
        println!("size: {}", size.join(" "));
    }
    println!("cflags: {}", config.cflags.join(" "));
    println!("ldflags: {}", config.ldflags.join(" "));
    println!("include_dirs: {}", config.include_dirs.join(" "));
    println!(
        "extensions: obj={} lib={} exec={}",
        config.obj_extension, config.lib_extension, config.exec_extension
    );
    Ok(())
}

//! `caravel clean` command
//!
//! Removes build trees without resolving the full toolchain configuration,
//! so cleaning works on machines with no compiler installed. The build
//! directory for a target comes straight from the manifest overlay (or the
//! `build/<arch>` default).

use std::path::{Path, PathBuf};

use anyhow::Result;

use caravel::core::config::{ARCH_AVR, ARCH_HOST};
use caravel::core::manifest::Manifest;
use caravel::util::fs::remove_dir_all_if_exists;

use crate::cli::CleanArgs;

/// The build tree location for one target architecture.
fn build_dir_for(arch: &str, manifest: &Manifest) -> PathBuf {
    manifest
        .targets
        .get(arch)
        .and_then(|spec| spec.build_dir.clone())
        .unwrap_or_else(|| Path::new("build").join(arch))
}

pub fn execute(args: CleanArgs) -> Result<()> {
    let manifest = Manifest::load_or_default(Path::new("."))?;

    let archs: Vec<String> = match args.target {
        Some(target) => vec![target],
        None => {
            let mut archs = vec![ARCH_HOST.to_string(), ARCH_AVR.to_string()];
            for arch in manifest.targets.keys() {
                if !archs.contains(arch) {
                    archs.push(arch.clone());
                }
            }
            archs
        }
    };

    // Each command runs with a fresh build context, so removing the trees
    // is the whole job: the caches that described them die with it.
    for arch in &archs {
        let dir = build_dir_for(arch, &manifest);
        if dir.exists() {
            remove_dir_all_if_exists(&dir)?;
            eprintln!("     Removed {}", dir.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_dir_defaults_per_arch() {
        let manifest = Manifest::default();
        assert_eq!(build_dir_for("host", &manifest), Path::new("build").join("host"));
        assert_eq!(build_dir_for("avr", &manifest), Path::new("build").join("avr"));
    }

    #[test]
    fn test_build_dir_honors_manifest_overlay() {
        let manifest = Manifest::parse("[target.avr]\nbuild_dir = \"out/avr\"\n").unwrap();
        assert_eq!(build_dir_for("avr", &manifest), PathBuf::from("out/avr"));
    }
}

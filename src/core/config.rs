//! Resolved build configuration for one target architecture.
//!
//! A [`BuildConfig`] is immutable once the build starts: built-in defaults
//! for the architecture, overlaid with the manifest's `[target.<arch>]`
//! table, then with any `KEY=VALUE` command-line overrides.

use std::path::PathBuf;

use anyhow::{bail, Result};
use thiserror::Error;

use crate::core::manifest::{Manifest, TargetSpec};
use crate::util::process::{find_ar, find_c_compiler};

/// Architecture tag for the machine running the build.
pub const ARCH_HOST: &str = "host";
/// Architecture tag for the AVR ATmega2560 cross target.
pub const ARCH_AVR: &str = "avr";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed override `{spec}` (expected KEY=VALUE)")]
    MalformedOverride { spec: String },
    #[error(
        "unknown configuration key `{key}` (expected one of CC, LD, AR, OBJCOPY, SIZE, \
         CFLAGS, LDFLAGS, INCLUDE_DIRS, BUILD_DIR, OBJ_EXTENSION, LIB_EXTENSION, EXEC_EXTENSION)"
    )]
    UnknownKey { key: String },
}

/// Toolchain and layout settings for one target.
///
/// The `cc`/`ld`/`ar` fields are argv prefixes: the program plus any
/// always-on flags (`["avr-gcc", "-mmcu=atmega2560"]`). Include directories
/// are stored in flag form (`-Iinclude`); [`include_search_dirs`]
/// (Self::include_search_dirs) yields the bare paths for include resolution.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub arch: String,
    pub build_dir: PathBuf,
    pub cc: Vec<String>,
    pub ld: Vec<String>,
    pub ar: Vec<String>,
    pub objcopy: Option<Vec<String>>,
    pub size: Option<Vec<String>>,
    pub cflags: Vec<String>,
    pub ldflags: Vec<String>,
    pub include_dirs: Vec<String>,
    pub obj_extension: String,
    pub lib_extension: String,
    pub exec_extension: String,
}

impl BuildConfig {
    /// Defaults for the host architecture. The compiler and archiver are
    /// discovered from `$CC`/`$AR` or PATH.
    pub fn host_default() -> Result<BuildConfig> {
        let cc = find_c_compiler().ok_or_else(|| {
            anyhow::anyhow!(
                "no C compiler found\n\
                 \n\
                 caravel requires a C compiler (gcc, clang, or cc).\n\
                 Set the CC environment variable or install a compiler."
            )
        })?;
        let ar = find_ar().ok_or_else(|| {
            anyhow::anyhow!(
                "no archiver found\n\
                 \n\
                 caravel requires an archiver (ar).\n\
                 Set the AR environment variable or install binutils."
            )
        })?;

        let cc = vec![cc.to_string_lossy().into_owned()];
        Ok(BuildConfig {
            arch: ARCH_HOST.to_string(),
            build_dir: PathBuf::from("build").join(ARCH_HOST),
            ld: cc.clone(),
            cc,
            ar: vec![ar.to_string_lossy().into_owned()],
            objcopy: None,
            size: None,
            cflags: vec!["-Wall".to_string(), "-g".to_string()],
            ldflags: Vec::new(),
            include_dirs: vec!["-Iinclude".to_string()],
            obj_extension: ".o".to_string(),
            lib_extension: ".a".to_string(),
            exec_extension: if cfg!(windows) { ".exe" } else { "" }.to_string(),
        })
    }

    /// Defaults for the AVR ATmega2560 cross target.
    pub fn avr_default() -> BuildConfig {
        let cc = vec!["avr-gcc".to_string(), "-mmcu=atmega2560".to_string()];
        BuildConfig {
            arch: ARCH_AVR.to_string(),
            build_dir: PathBuf::from("build").join(ARCH_AVR),
            ld: cc.clone(),
            cc,
            ar: vec!["avr-ar".to_string()],
            objcopy: Some(vec!["avr-objcopy".to_string()]),
            size: Some(vec!["avr-size".to_string()]),
            cflags: vec!["-Os".to_string(), "-DF_CPU=16000000UL".to_string()],
            ldflags: Vec::new(),
            include_dirs: vec!["-Iinclude".to_string()],
            obj_extension: ".o".to_string(),
            lib_extension: ".a".to_string(),
            exec_extension: ".elf".to_string(),
        }
    }

    /// Resolve the configuration for `arch`: built-in defaults overlaid
    /// with the manifest's `[target.<arch>]` table, if any.
    pub fn for_target(arch: &str, manifest: &Manifest) -> Result<BuildConfig> {
        let mut config = match arch {
            ARCH_HOST => BuildConfig::host_default()?,
            ARCH_AVR => BuildConfig::avr_default(),
            other => {
                if !manifest.targets.contains_key(other) {
                    bail!("unknown target `{}` (no [target.{}] in the manifest)", other, other);
                }
                let mut base = BuildConfig::host_default()?;
                base.arch = other.to_string();
                base.build_dir = PathBuf::from("build").join(other);
                base
            }
        };
        if let Some(spec) = manifest.targets.get(arch) {
            config.overlay(spec);
        }
        Ok(config)
    }

    fn overlay(&mut self, spec: &TargetSpec) {
        if let Some(cc) = &spec.cc {
            self.cc = cc.clone();
        }
        if let Some(ld) = &spec.ld {
            self.ld = ld.clone();
        } else if let Some(cc) = &spec.cc {
            // The compiler doubles as the link driver unless set explicitly.
            self.ld = cc.clone();
        }
        if let Some(ar) = &spec.ar {
            self.ar = ar.clone();
        }
        if let Some(objcopy) = &spec.objcopy {
            self.objcopy = Some(objcopy.clone());
        }
        if let Some(size) = &spec.size {
            self.size = Some(size.clone());
        }
        if let Some(cflags) = &spec.cflags {
            self.cflags = cflags.clone();
        }
        if let Some(ldflags) = &spec.ldflags {
            self.ldflags = ldflags.clone();
        }
        if let Some(dirs) = &spec.include_dirs {
            self.include_dirs = dirs.iter().map(|d| to_include_flag(d)).collect();
        }
        if let Some(ext) = &spec.obj_extension {
            self.obj_extension = ext.clone();
        }
        if let Some(ext) = &spec.lib_extension {
            self.lib_extension = ext.clone();
        }
        if let Some(ext) = &spec.exec_extension {
            self.exec_extension = ext.clone();
        }
        if let Some(dir) = &spec.build_dir {
            self.build_dir = dir.clone();
        }
    }

    /// Apply one make-style `KEY=VALUE` override. Each key writes its own
    /// field; list-valued keys split on whitespace.
    pub fn apply_override(&mut self, spec: &str) -> Result<()> {
        let (key, value) = spec.split_once('=').ok_or_else(|| ConfigError::MalformedOverride {
            spec: spec.to_string(),
        })?;

        let words = || value.split_whitespace().map(str::to_string).collect::<Vec<_>>();
        match key {
            "CC" => self.cc = words(),
            "LD" => self.ld = words(),
            "AR" => self.ar = words(),
            "OBJCOPY" => self.objcopy = Some(words()),
            "SIZE" => self.size = Some(words()),
            "CFLAGS" => self.cflags = words(),
            "LDFLAGS" => self.ldflags = words(),
            "INCLUDE_DIRS" => {
                self.include_dirs = value.split_whitespace().map(to_include_flag).collect();
            }
            "BUILD_DIR" => self.build_dir = PathBuf::from(value),
            "OBJ_EXTENSION" => self.obj_extension = value.to_string(),
            "LIB_EXTENSION" => self.lib_extension = value.to_string(),
            "EXEC_EXTENSION" => self.exec_extension = value.to_string(),
            _ => {
                return Err(ConfigError::UnknownKey {
                    key: key.to_string(),
                }
                .into())
            }
        }
        Ok(())
    }

    /// The include search path: `include_dirs` with the `-I` flag prefix
    /// stripped.
    pub fn include_search_dirs(&self) -> impl Iterator<Item = &str> {
        self.include_dirs
            .iter()
            .map(|d| d.strip_prefix("-I").unwrap_or(d))
    }
}

fn to_include_flag(dir: &str) -> String {
    if dir.starts_with("-I") {
        dir.to_string()
    } else {
        format!("-I{}", dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> BuildConfig {
        BuildConfig {
            arch: ARCH_HOST.to_string(),
            build_dir: PathBuf::from("build/host"),
            cc: vec!["cc".to_string()],
            ld: vec!["cc".to_string()],
            ar: vec!["ar".to_string()],
            objcopy: None,
            size: None,
            cflags: vec!["-Wall".to_string()],
            ldflags: Vec::new(),
            include_dirs: vec!["-Iinclude".to_string()],
            obj_extension: ".o".to_string(),
            lib_extension: ".a".to_string(),
            exec_extension: String::new(),
        }
    }

    #[test]
    fn test_each_override_writes_its_own_field() {
        let mut config = test_config();

        config.apply_override("CC=clang --target=avr").unwrap();
        config.apply_override("LD=avr-ld").unwrap();
        config.apply_override("AR=avr-ar").unwrap();
        config.apply_override("CFLAGS=-Os -flto").unwrap();
        config.apply_override("LDFLAGS=-Wl,--gc-sections").unwrap();
        config.apply_override("INCLUDE_DIRS=include dep/port/avr").unwrap();
        config.apply_override("EXEC_EXTENSION=.elf").unwrap();
        config.apply_override("BUILD_DIR=out").unwrap();

        assert_eq!(config.cc, ["clang", "--target=avr"]);
        assert_eq!(config.ld, ["avr-ld"]);
        assert_eq!(config.ar, ["avr-ar"]);
        assert_eq!(config.cflags, ["-Os", "-flto"]);
        assert_eq!(config.ldflags, ["-Wl,--gc-sections"]);
        assert_eq!(config.include_dirs, ["-Iinclude", "-Idep/port/avr"]);
        assert_eq!(config.exec_extension, ".elf");
        assert_eq!(config.build_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_override_rejects_unknown_key() {
        let mut config = test_config();
        let err = config.apply_override("CXXFLAGS=-O2").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::UnknownKey { .. })
        ));
    }

    #[test]
    fn test_override_rejects_missing_equals() {
        let mut config = test_config();
        let err = config.apply_override("CFLAGS").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::MalformedOverride { .. })
        ));
    }

    #[test]
    fn test_include_search_dirs_strip_flag_prefix() {
        let mut config = test_config();
        config.include_dirs = vec!["-Iinclude".to_string(), "-Idep/port/avr".to_string()];
        let dirs: Vec<&str> = config.include_search_dirs().collect();
        assert_eq!(dirs, ["include", "dep/port/avr"]);
    }

    #[test]
    fn test_avr_defaults() {
        let config = BuildConfig::avr_default();
        assert_eq!(config.arch, "avr");
        assert_eq!(config.cc[0], "avr-gcc");
        assert!(config.cc.iter().any(|f| f == "-mmcu=atmega2560"));
        assert_eq!(config.exec_extension, ".elf");
        assert_eq!(config.build_dir, PathBuf::from("build").join("avr"));
    }

    #[test]
    fn test_manifest_overlay_replaces_set_fields_only() {
        let manifest = Manifest::parse(
            r#"
            [target.avr]
            cflags = ["-Os"]
            include_dirs = ["dep/port/avr"]
            "#,
        )
        .unwrap();

        let mut config = BuildConfig::avr_default();
        config.overlay(&manifest.targets["avr"]);

        assert_eq!(config.cflags, ["-Os"]);
        assert_eq!(config.include_dirs, ["-Idep/port/avr"]);
        // Unset fields keep their defaults.
        assert_eq!(config.cc[0], "avr-gcc");
        assert_eq!(config.exec_extension, ".elf");
    }
}

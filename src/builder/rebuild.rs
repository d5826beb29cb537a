//! Rebuild decisions.
//!
//! A target is rebuilt when it is missing or strictly older than any of its
//! dependencies. Equal mtimes count as up to date, so a build immediately
//! followed by another invocation stays quiet.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{bail, Context, Result};

use crate::builder::context::BuildCtx;

/// A dependency bundle: one path, or an arbitrarily nested list of bundles.
///
/// Build steps collect dependencies from several places (the source, extra
/// deps handed in by the caller, the scanned headers); the nesting lets them
/// pass those along without flattening first.
#[derive(Debug, Clone)]
pub enum DepTree {
    Leaf(PathBuf),
    List(Vec<DepTree>),
}

impl DepTree {
    /// An empty bundle.
    pub fn empty() -> DepTree {
        DepTree::List(Vec::new())
    }

    pub fn leaf(path: impl Into<PathBuf>) -> DepTree {
        DepTree::Leaf(path.into())
    }

    /// Bundle a list of paths.
    pub fn paths<I, P>(paths: I) -> DepTree
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        DepTree::List(paths.into_iter().map(DepTree::leaf).collect())
    }

    /// True when any leaf's mtime is strictly newer than `reference`.
    /// Short-circuits on the first positive answer.
    fn any_newer_than(&self, ctx: &mut BuildCtx, reference: SystemTime) -> Result<bool> {
        match self {
            DepTree::Leaf(path) => match cached_mtime(ctx, path)? {
                Some(mtime) => Ok(mtime > reference),
                None => bail!("missing dependency: {}", path.display()),
            },
            DepTree::List(items) => {
                for item in items {
                    if item.any_newer_than(ctx, reference)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

impl From<PathBuf> for DepTree {
    fn from(path: PathBuf) -> DepTree {
        DepTree::Leaf(path)
    }
}

impl From<&Path> for DepTree {
    fn from(path: &Path) -> DepTree {
        DepTree::Leaf(path.to_path_buf())
    }
}

impl From<Vec<DepTree>> for DepTree {
    fn from(items: Vec<DepTree>) -> DepTree {
        DepTree::List(items)
    }
}

/// Stat a path through the mtime cache. `Ok(None)` means the path does not
/// exist; only existing paths enter the cache.
pub fn cached_mtime(ctx: &mut BuildCtx, path: &Path) -> Result<Option<SystemTime>> {
    if let Some(mtime) = ctx.mtimes.get(path) {
        return Ok(Some(*mtime));
    }
    match std::fs::metadata(path) {
        Ok(meta) => {
            let mtime = meta
                .modified()
                .with_context(|| format!("failed to read mtime of {}", path.display()))?;
            ctx.mtimes.put(path.to_path_buf(), mtime);
            Ok(Some(mtime))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to stat {}", path.display())),
    }
}

/// Decide whether `target` must be rebuilt: true when it is missing or any
/// dependency is strictly newer.
///
/// A positive decision drops the target's mtime cache entry, so the build
/// step about to overwrite it stats the fresh file afterwards instead of
/// reusing a stale timestamp.
pub fn needs_rebuild(ctx: &mut BuildCtx, target: &Path, deps: &DepTree) -> Result<bool> {
    let target_mtime = match cached_mtime(ctx, target)? {
        Some(mtime) => mtime,
        None => {
            ctx.mtimes.clear_entry(target);
            tracing::debug!("{} is missing, rebuilding", target.display());
            return Ok(true);
        }
    };

    let rebuild = deps.any_newer_than(ctx, target_mtime)?;
    if rebuild {
        ctx.mtimes.clear_entry(target);
        tracing::debug!("{} is out of date, rebuilding", target.display());
    }
    Ok(rebuild)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::time::Duration;
    use tempfile::TempDir;

    fn set_mtime(path: &Path, mtime: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
    }

    #[test]
    fn test_missing_target_always_rebuilds() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = BuildCtx::new();
        let target = tmp.path().join("out.o");

        assert!(needs_rebuild(&mut ctx, &target, &DepTree::empty()).unwrap());
    }

    #[test]
    fn test_existing_target_with_no_deps_is_up_to_date() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = BuildCtx::new();
        let target = tmp.path().join("out.o");
        fs::write(&target, "obj").unwrap();

        assert!(!needs_rebuild(&mut ctx, &target, &DepTree::empty()).unwrap());
    }

    #[test]
    fn test_equal_mtimes_are_up_to_date() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = BuildCtx::new();
        let target = tmp.path().join("out.o");
        let dep = tmp.path().join("in.c");
        fs::write(&target, "obj").unwrap();
        fs::write(&dep, "src").unwrap();

        let now = SystemTime::now();
        set_mtime(&target, now);
        set_mtime(&dep, now);

        assert!(!needs_rebuild(&mut ctx, &target, &DepTree::leaf(&dep)).unwrap());
    }

    #[test]
    fn test_newer_dep_forces_rebuild_and_invalidates_target_mtime() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = BuildCtx::new();
        let target = tmp.path().join("out.o");
        let dep = tmp.path().join("in.c");
        fs::write(&target, "obj").unwrap();
        fs::write(&dep, "src").unwrap();

        let now = SystemTime::now();
        set_mtime(&target, now);
        set_mtime(&dep, now - Duration::from_secs(60));

        assert!(!needs_rebuild(&mut ctx, &target, &DepTree::leaf(&dep)).unwrap());
        assert!(ctx.mtimes.contains(target.as_path()));

        // Touch the dependency forward; the cached target entry must be
        // dropped by the positive decision.
        set_mtime(&dep, now + Duration::from_secs(60));
        ctx.mtimes.clear_entry(dep.as_path());

        assert!(needs_rebuild(&mut ctx, &target, &DepTree::leaf(&dep)).unwrap());
        assert!(!ctx.mtimes.contains(target.as_path()));
    }

    #[test]
    fn test_nested_bundles_flatten_and_short_circuit() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = BuildCtx::new();
        let target = tmp.path().join("lib.a");
        let old = tmp.path().join("old.c");
        let fresh = tmp.path().join("fresh.h");
        fs::write(&target, "ar").unwrap();
        fs::write(&old, "src").unwrap();
        fs::write(&fresh, "hdr").unwrap();

        let now = SystemTime::now();
        set_mtime(&target, now);
        set_mtime(&old, now - Duration::from_secs(60));
        set_mtime(&fresh, now + Duration::from_secs(60));

        let deps = DepTree::List(vec![
            DepTree::paths([old.clone()]),
            DepTree::List(vec![DepTree::paths([fresh.clone()])]),
        ]);
        assert!(needs_rebuild(&mut ctx, &target, &deps).unwrap());
    }

    #[test]
    fn test_missing_dependency_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = BuildCtx::new();
        let target = tmp.path().join("out.o");
        fs::write(&target, "obj").unwrap();

        let ghost = tmp.path().join("ghost.c");
        let err = needs_rebuild(&mut ctx, &target, &DepTree::leaf(&ghost)).unwrap_err();
        assert!(err.to_string().contains("missing dependency"));
    }

    #[test]
    fn test_mtime_cache_answers_repeat_queries() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = BuildCtx::new();
        let dep = tmp.path().join("in.c");
        fs::write(&dep, "src").unwrap();

        cached_mtime(&mut ctx, &dep).unwrap();
        let hits = ctx.mtimes.stats().hits;
        cached_mtime(&mut ctx, &dep).unwrap();
        assert_eq!(ctx.mtimes.stats().hits, hits + 1);
    }
}

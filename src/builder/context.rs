//! Build context: the mutable state threaded through every build operation.
//!
//! One `BuildCtx` lives for one invocation. Keeping the caches here instead
//! of in process-wide statics means tests get a fresh context for free and
//! `clean` resets state by clearing (or just dropping) the context.

use std::path::PathBuf;
use std::time::SystemTime;

use crate::builder::compile::CompileCommand;
use crate::cache::Cache;

/// Per-invocation build state.
pub struct BuildCtx {
    /// Directories known to exist; an entry implies entries for all its
    /// ancestors. Never evicted except by [`clear_all`](Self::clear_all).
    pub dir_exists: Cache<PathBuf, ()>,
    /// File modification times, present only for paths that existed when
    /// statted. The entry for a rebuild target is invalidated on a positive
    /// rebuild decision so the freshly written file is re-statted.
    pub mtimes: Cache<PathBuf, SystemTime>,
    /// Transitive resolved-header lists, keyed by raw include form or by a
    /// source path used as its own key. Unresolved includes are memoized
    /// with an empty list so repeated scans do not retry them.
    pub included_deps: Cache<String, Vec<PathBuf>>,
    /// Compilation-database entries accumulated by the compile driver.
    pub compile_db: Vec<CompileCommand>,
}

impl BuildCtx {
    pub fn new() -> Self {
        BuildCtx {
            dir_exists: Cache::new(),
            mtimes: Cache::new(),
            included_deps: Cache::new(),
            compile_db: Vec::new(),
        }
    }

    /// Drop every cache entry. `clean` calls this after removing the build
    /// tree, since nothing the caches describe is on disk anymore.
    pub fn clear_all(&mut self) {
        self.dir_exists.clear_all();
        self.mtimes.clear_all();
        self.included_deps.clear_all();
    }

    /// Log per-cache statistics at debug level.
    pub fn log_stats(&self) {
        tracing::debug!("dir cache: {}", self.dir_exists.stats());
        tracing::debug!("mtime cache: {}", self.mtimes.stats());
        tracing::debug!("include cache: {}", self.included_deps.stats());
    }
}

impl Default for BuildCtx {
    fn default() -> Self {
        BuildCtx::new()
    }
}

//! The incremental build engine.
//!
//! [`compile`] drives the toolchain, [`rebuild`] decides what can be
//! skipped, [`scan`] discovers header dependencies, and [`context`] carries
//! the per-invocation caches all of them share.

pub mod compile;
pub mod context;
pub mod rebuild;
pub mod scan;

pub use compile::{build_executable, build_library, build_source, write_compile_db};
pub use context::BuildCtx;
pub use rebuild::{needs_rebuild, DepTree};
pub use scan::included_dependencies;

//! caravel - an incremental build tool and test-runner generator for
//! small C projects.
//!
//! This crate provides the core library: the C tokenizer, the memo caches,
//! the include scanner and rebuild decider, the compile/archive/link
//! driver, and the test-runner generator for fixture-style C test
//! frameworks.

pub mod builder;
pub mod cache;
pub mod core;
pub mod lexer;
pub mod runner;
pub mod util;

pub use crate::builder::{BuildCtx, DepTree};
pub use crate::core::{BuildConfig, Manifest};

//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// caravel - an incremental build tool and test-runner generator for small C projects
#[derive(Parser)]
#[command(name = "caravel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug/info)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scaffold a caravel project in the current directory
    Init(InitArgs),

    /// Build the library and product executable
    Build(BuildArgs),

    /// Generate test runners, build the test executable, and run it
    Test(TestArgs),

    /// Generate test runners only
    Runners(RunnersArgs),

    /// Remove build artifacts
    Clean(CleanArgs),

    /// Show the effective toolchain configuration for a target
    Flags(FlagsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Project name (defaults to the directory name)
    pub name: Option<String>,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Target architecture to build for
    #[arg(long, default_value = "host")]
    pub target: String,

    /// Make-style configuration overrides (e.g. CC=clang CFLAGS="-O2 -g")
    #[arg(value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,
}

#[derive(Args)]
pub struct TestArgs {
    /// Target architecture to build the test image for
    #[arg(long, default_value = "host")]
    pub target: String,

    /// Seconds the test executable may run before the watchdog kills it
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// Make-style configuration overrides (e.g. CC=clang CFLAGS="-O2 -g")
    #[arg(value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,
}

#[derive(Args)]
pub struct RunnersArgs {}

#[derive(Args)]
pub struct CleanArgs {
    /// Clean a single target's build tree instead of all of them
    #[arg(long)]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct FlagsArgs {
    /// Target architecture to show
    #[arg(long, default_value = "host")]
    pub target: String,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

//! caravel CLI - an incremental build tool for small C projects

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("caravel=debug")
    } else if cli.quiet {
        EnvFilter::new("caravel=error")
    } else {
        EnvFilter::new("caravel=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Init(args) => commands::init::execute(args),
        Commands::Build(args) => commands::build::execute(args),
        Commands::Test(args) => commands::test::execute(args),
        Commands::Runners(args) => commands::runners::execute(args),
        Commands::Clean(args) => commands::clean::execute(args),
        Commands::Flags(args) => commands::flags::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

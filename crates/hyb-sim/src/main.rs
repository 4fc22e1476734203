use std::error::Error;

use clap::{Parser, Subcommand};
use hyb_sim::commands::{self, CheckArgs, RunArgs};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "hyb-sim", about = "Segment CT-HYB simulation driver")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate a parameter file.
    Check(CheckArgs),
    /// Run one worker until its completion fraction reaches one.
    Run(RunArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    match cli.command {
        Command::Check(args) => commands::check::run(&args),
        Command::Run(args) => {
            commands::run::run(&args)?;
            Ok(())
        }
    }
}

mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{merge, stream, validate, MergeArgs, StreamArgs, ValidateArgs};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Screenkit CLI - validate, merge and stream screen documents
#[derive(Parser, Debug)]
#[command(name = "screenkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to ./screenkit.config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a screen document; exits 1 when publishing would be blocked
    Validate(ValidateArgs),

    /// Three-way merge of screen documents; exits 1 when both sides changed a field
    Merge(MergeArgs),

    /// Follow a server-sent events stream and print state updates
    Stream(StreamArgs),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "screenkit=debug" } else { "screenkit=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let cwd = std::env::current_dir()?.display().to_string();
    let config = Config::load(&cwd, cli.config.as_deref())?;

    match cli.command {
        Command::Validate(args) => validate(args, &config),
        Command::Merge(args) => merge(args),
        Command::Stream(args) => stream(args, &config).map(|()| true),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!();
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            eprintln!();
            std::process::exit(1);
        }
    }
}

use std::env;
use std::io;
use std::process::ExitCode;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod command;
mod config;
mod error;
mod jobs;
mod process;
mod prompt;
mod session;
mod shell;
mod signal_handler;
mod terminal;
#[cfg(test)]
mod testing;

use config::Config;

fn print_help() {
    println!("mabshell - job control shell");
    println!();
    println!("Usage: mabshell [OPTIONS]");
    println!("  -h, --help          Print this help");
    println!("  -v, --version       Print version");
    println!("      --no-job-control  Keep jobs in the shell's process group");
    println!();
    println!("Environment:");
    println!("  MABSHELL_PROMPT     Use this literal prompt");
    println!("  RUST_LOG            Log filter (logs go to stderr)");
}

fn print_version() {
    println!("mabshell v {}", env!("CARGO_PKG_VERSION"));
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    // respond to common flags before touching signals or the terminal
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_help();
        return ExitCode::SUCCESS;
    }

    if args.iter().any(|a| a == "-v" || a == "--version" || a == "-V") {
        print_version();
        return ExitCode::SUCCESS;
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> anyhow::Result<()> {
    let config = Config::from_env(args);
    tracing::debug!(?config, "starting");

    let mut shell = shell::Shell::new(&config)?;
    shell.run(io::stdin().lock())?;
    Ok(())
}

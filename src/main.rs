//! Idiolink CLI binary.

use std::io::Write;
use std::process;

use anyhow::Context;
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;

use idiolink::cli::args::IdiolinkArgs;
use idiolink::cli::commands::execute_command;

#[tokio::main]
async fn main() {
    let args = IdiolinkArgs::parse();

    let log_level = match args.verbosity() {
        0 => LevelFilter::Error, // Quiet mode
        1 => LevelFilter::Warn,  // Default
        2 => LevelFilter::Info,  // Verbose
        _ => LevelFilter::Debug, // Very verbose (3+)
    };

    Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    if let Err(e) = run(args).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(args: IdiolinkArgs) -> anyhow::Result<()> {
    let command = args.command.name();
    execute_command(args)
        .await
        .with_context(|| format!("{command} failed"))
}

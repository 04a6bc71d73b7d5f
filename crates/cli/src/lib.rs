pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use crate::commands::advise::AdviseArgs;

#[derive(Debug, Parser)]
#[command(
    name = "fieldcast",
    about = "Fieldcast irrigation advisory CLI",
    long_about = "Generate irrigation advisories from field telemetry, inspect configuration, and check readiness.",
    after_help = "Examples:\n  fieldcast advise --input '{\"moisture\":20,\"humidity\":50}'\n  fieldcast advise --from-store --raw\n  fieldcast doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Produce an advisory for one sensor payload (stdin, --input, or the telemetry store)")]
    Advise(AdviseArgs),
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config and check weather, model, document, and telemetry readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Advise(args) => commands::advise::run(&args),
        Command::Config => commands::config::run(),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

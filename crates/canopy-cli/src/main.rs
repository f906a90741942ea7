//! Canopy CLI: the `canopy` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    support::init_tracing();

    match cli.command {
        Commands::Classify { rules, json } => commands::classify::run(rules, json),

        Commands::Validate {
            rules,
            vector,
            upper,
            lower,
            fraction_prefix,
            json,
        } => commands::validate::run(commands::validate::Args {
            rules,
            vector,
            upper,
            lower,
            fraction_prefix,
            json,
        }),

        Commands::Apply { config, json } => commands::apply::run(config, json),

        Commands::CrsCheck { config, json } => commands::crs_check::run(config, json),

        Commands::Consistency { upper, lower, json } => {
            commands::consistency::run(upper, lower, json)
        }
    }
}

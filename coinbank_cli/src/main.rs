//! coinbank: watch a load cell under a coin bank and raise removal alerts.

mod cli;
mod commands;
mod error_fmt;
mod logging;
mod wiring;

use clap::Parser;

use crate::cli::{Cli, Commands, JSON_MODE};

fn main() {
    let _ = color_eyre::install();

    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        let json = JSON_MODE.get().copied().unwrap_or(false);
        if json {
            eprintln!("{}", error_fmt::format_error_json(&e));
        } else {
            eprintln!("{}", error_fmt::humanize(&e));
        }
        std::process::exit(error_fmt::exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = wiring::load_config(cli.config.as_deref())?;
    logging::init(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::debug!(store = ?cfg.store.kind, coin = %cfg.coin.label, "configuration loaded");

    match cli.cmd {
        Commands::Run {
            sim,
            status_every_s,
            duration_s,
        } => commands::run(&cfg, sim, status_every_s, duration_s, cli.json),
        Commands::Breakdown { grams, prize } => {
            commands::breakdown_cmd(&cfg, grams, prize, cli.json)
        }
        Commands::Simulate { weights, deliver } => {
            commands::simulate(&cfg, &weights, deliver, cli.json)
        }
        Commands::SelfCheck { sim } => commands::self_check(&cfg, sim, cli.json),
    }
}

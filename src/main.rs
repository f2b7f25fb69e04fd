//! sysdiagnose - CLI entry point

mod commands;

use anyhow::Result;
use clap::Parser;

use commands::Outcome;
use sysdiagnose::cli::{Cli, Commands, ConfigCommands};
use sysdiagnose::{logging, Config, InterruptFlag, PluginRegistry};

#[cfg(not(tarpaulin_include))]
fn main() {
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            Outcome::Failure.exit_code()
        }
    };
    std::process::exit(code);
}

#[cfg(not(tarpaulin_include))]
fn run(cli: Cli) -> Result<Outcome> {
    let config = Config::load()?;
    logging::init(&config.logging, &config.app_paths().log_file(), cli.verbose)?;

    let plugins = PluginRegistry::builtin();

    match cli.command {
        Commands::Init { archive, force } => commands::init::handle(&config, &archive, force),
        Commands::List { what } => commands::list::handle(&config, &plugins, what),
        Commands::Parse(args) => {
            let interrupt = InterruptFlag::new();
            interrupt.register_signal_handlers();
            commands::parse::handle(&config, &plugins, &interrupt, &args)
        }
        Commands::Analyze(args) => {
            let interrupt = InterruptFlag::new();
            interrupt.register_signal_handlers();
            commands::analyze::handle(&config, &plugins, &interrupt, &args)
        }
        Commands::Status { case_id } => commands::status::handle(&config, &plugins, &case_id),
        Commands::Clear { yes } => commands::clear::handle(&config, yes),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::handle_show(&config),
            ConfigCommands::Init => commands::config::handle_init(),
        },
    }
}

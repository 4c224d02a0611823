mod classifier;
mod cli;
mod error;
mod export;
mod fmt;
mod logging;
mod models;
mod parser;
mod processor;
mod settings;
mod summarizer;

use clap::Parser;

use cli::{Cli, Commands};
use settings::{default_settings_path, load_settings};

fn main() {
    let cli = Cli::parse();

    let settings_path = cli.config.clone().unwrap_or_else(default_settings_path);
    let settings = load_settings(&settings_path);
    logging::init(&settings);

    let result = match cli.command {
        Commands::Validate { files } => cli::validate::run(&settings, &files),
        Commands::Process {
            files,
            expect,
            output_dir,
            no_save,
            preview,
        } => cli::process::run(
            settings,
            &files,
            cli::process::Options {
                expect,
                output_dir,
                no_save,
                preview,
            },
        ),
        Commands::Classify { columns } => cli::classify::run(&columns),
        Commands::Show { summary } => cli::show::run(&summary),
        Commands::Config { init } => cli::config::run(&settings, &settings_path, init),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

//! Voxline CLI - voice-over localization audio toolkit

use clap::Parser;
use env_logger::Env;
use log::info;

use voxline::cli::{commands, Cli, Commands};
use voxline::Result;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    info!("Voxline v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Split { input, output } => commands::split(&input, &output, &cli.config),
        Commands::Process { dir, effects, scale } => {
            commands::process(&dir, &effects, scale, &cli.config)
        }
        Commands::MatchVolume { dir, reference } => {
            commands::match_volume(&dir, &reference, &cli.config)
        }
        Commands::CheckNames { dir, repair, stub } => {
            commands::check_names(&dir, repair, stub, &cli.config)
        }
        Commands::CheckFiles { dir, purge } => commands::check_files(&dir, purge, &cli.config),
        Commands::Compile { dir, output } => commands::compile(&dir, &output, &cli.config),
    }
}

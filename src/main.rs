mod commands;
mod logging;

use std::process;

use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use movie_archiver::{DiskSpace, NotificationController, ShellExecutor, SystemDisk};
use tracing::error;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match movie_archiver::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    match args.command {
        Some(Commands::Run) => {
            let mut controller = NotificationController::new(config);
            let mut executor = ShellExecutor::new();
            controller.start_archiving(&mut executor, true);
        }
        Some(Commands::FreeSpace) => {
            let disk = SystemDisk;
            println!(
                "Source {}: {}",
                config.source_path.display(),
                disk.free_space_label(&config.source_path).green(),
            );
            println!(
                "Target {}: {}",
                config.target_path.display(),
                disk.free_space_label(&config.target_path).green(),
            );
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

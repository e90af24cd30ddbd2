use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "movie-archiver")]
#[command(about = "Archive or back up movies when disk space runs low", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one archiving or backup pass on the configured paths
    Run,
    /// Show free space on the configured source and target volumes
    FreeSpace,
    /// Print configuration values
    PrintConfig,
}

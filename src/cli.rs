use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mediaprobe")]
#[command(author, version, about = "Probe media containers through a runtime-loaded libavformat")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe a media file and display its metadata
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Read the file into memory and probe the buffer
        #[arg(long)]
        buffer: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that libavformat and libavutil load and export every entry point
    CheckLibs,

    /// Print the text libavutil associates with an error code
    DescribeError {
        /// Error code, usually negative
        #[arg(allow_negative_numbers = true)]
        code: i32,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

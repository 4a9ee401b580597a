use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nalscope")]
#[command(author, version, about = "Annotated inspection of HEVC elementary streams")]
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
    /// Scan an Annex-B HEVC stream and report its NAL units
    Scan {
        /// Stream to scan
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Print the annotated syntax tree
        #[arg(long)]
        tree: bool,

        /// Stop after this many NAL units
        #[arg(long)]
        max_units: Option<usize>,
    },

    /// Display file information and the detected stream format
    Info {
        /// File to inspect
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

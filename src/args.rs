//! Command-line argument parsing

use clap::Parser;

/// Command-line arguments for the router binary
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", env = "RWSPLIT_CONFIG")]
    pub config: String,

    /// Validate the configuration and exit
    #[arg(long)]
    pub check: bool,
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "duet",
    about = "One model drafts, another reviews and improves the draft",
    version
)]
pub struct Cli {
    /// TOML config file. Defaults plus environment variables when omitted.
    #[arg(long, short, global = true, env = "DUET_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a single prompt and exit
    Ask {
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        prompt: Vec<String>,
        /// Text file to attach to the prompt
        #[arg(long, short)]
        file: Option<PathBuf>,
    },
    /// Interactive session with conversation memory
    Chat {
        /// Text file to attach to the first message
        #[arg(long, short)]
        file: Option<PathBuf>,
    },
}

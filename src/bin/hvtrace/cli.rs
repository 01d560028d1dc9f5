use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI для hvtrace
#[derive(Parser, Debug)]
#[command(name = "hvtrace", version, about = "hypervisor trace log -> trace.dat converter")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Convert a text trace log into ./trace.dat
    Convert {
        /// Input text log (first line is a header and is skipped)
        #[arg(long, short = 'i')]
        input: PathBuf,
        /// JSON summary output (single object)
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

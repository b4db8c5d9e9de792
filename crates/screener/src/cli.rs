use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Sets the level of tracing.
    ///
    /// Without it, progress bars and a coloured summary are shown instead of logs.
    #[arg(short, long, global = true)]
    pub trace: Option<TraceLevel>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the snapshot store, or add any columns an existing one lacks.
    Init,

    /// Scrape every tracked ticker (or the fallback file's, on a cold start) into the store.
    Scrape {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Stop after this many seconds; the ticker in flight is abandoned.
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },

    /// Load a raw artifact into the store without fetching anything.
    Replay {
        /// Path to a raw artifact written by `scrape`.
        path: PathBuf,
    },
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
#[clap(rename_all = "UPPERCASE")]
pub enum TraceLevel {
    DEBUG,
    ERROR,
    INFO,
    TRACE,
    WARN,
}

use clap::{Parser, Subcommand};

/// CLI arguments parser using `clap`
#[derive(Parser, Debug)]
#[command(name = "winmaint", version, about = "Removes orphaned profile SIDs and disables administrative shares")]
pub struct Cli {
    /// Only log what would change
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Subcommand chosen to execute, the interactive menu when absent
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// Subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Interactively deletes orphaned SIDs and their profile folders
    Sids,
    /// Disables administrative shares and hardens IPC$
    Shares {
        /// Skip confirmation and continue if the registry backup fails
        #[arg(long)]
        force: bool,
    },
    /// Runs SID cleanup, then share cleanup
    All {
        /// Skip confirmation and continue if the registry backup fails
        #[arg(long)]
        force: bool,
    },
}

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// App Blocker
///
/// Password-protected blocking of distracting applications. Declares which
/// packages are blocked, hands the set to the platform enforcement
/// mechanism, and keeps statistics about every block it performs.
#[derive(Parser, Debug)]
#[command(name = "app-blocker")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the data file (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub data_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Set the password (first-time setup or overwrite)
    SetPassword {
        /// Security question to enable password recovery; the answer is
        /// prompted separately
        #[arg(long)]
        question: Option<String>,
    },
    /// Verify the password and show the failed-attempt state
    Verify,
    /// Change the password (requires the current one)
    ChangePassword,
    /// Show the configured security question
    Question,
    /// Recover a forgotten password by answering the security question
    Recover,
    /// Turn block notifications on or off
    Notifications {
        #[arg(value_enum)]
        state: Toggle,
    },
    /// Show credential, blocking and statistics status
    Status,
    /// Manage the blocked application set
    Block {
        #[command(subcommand)]
        command: BlockCommands,
    },
    /// Dashboard statistics
    Stats {
        #[command(subcommand)]
        command: StatsCommands,
    },
    /// Re-push the blocked set and watch for block events until interrupted
    Run,
    /// Delete the password, settings, blocked set and statistics
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum BlockCommands {
    /// List the blocked packages
    List,
    /// Add packages to the blocked set
    Add {
        /// Package identifiers, e.g. com.example.app
        #[arg(required = true)]
        packages: Vec<String>,
    },
    /// Remove packages from the blocked set
    Remove {
        #[arg(required = true)]
        packages: Vec<String>,
    },
    /// Replace the blocked set with exactly these packages
    Set {
        packages: Vec<String>,
    },
    /// Remove every package from the blocked set
    Clear,
    /// Seed the blocked set with the default starter packages
    Defaults,
}

#[derive(Subcommand, Debug)]
pub enum StatsCommands {
    /// Show the accumulated statistics
    Show,
    /// Zero the statistics
    Reset,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Toggle {
    On,
    Off,
}

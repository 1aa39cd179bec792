use std::path::PathBuf;

use clap::{Parser, Subcommand};
use composer_core::Tone;

use super::logging::LogDestination;

/// Composer - AI reply control for webmail compose windows
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// RON configuration file; defaults apply when absent
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Where log output goes
    #[arg(long, value_enum, default_value = "terminal", global = true)]
    pub log: LogDestination,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Host a saved page snapshot and inject the reply control into it
    Run {
        /// HTML snapshot whose body is mounted into the page
        #[arg(long, value_name = "FILE")]
        page: PathBuf,

        /// Click the control once it is injected and print the compose text
        #[arg(long)]
        activate: bool,
    },
    /// Ask the reply service for a reply to the given email text
    Generate {
        /// Email text to reply to
        #[arg(long)]
        content: String,

        /// professional, casual or friendly
        #[arg(long)]
        tone: Option<Tone>,

        /// Also copy the reply to the clipboard
        #[arg(long)]
        copy: bool,
    },
}

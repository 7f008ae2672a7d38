//! CLI module for Svar.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Svar - Grounded Question Answering
///
/// Ask questions about an indexed library of transcribed spoken content,
/// with live web search as fallback and optional spoken answers.
/// The name "Svar" comes from the Norwegian/Scandinavian word for "answer."
#[derive(Parser, Debug)]
#[command(name = "svar")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question and get a grounded answer
    Ask {
        /// The question to ask
        question: String,

        /// Target response language (BCP 47 tag, e.g. "en", "tr")
        #[arg(short, long)]
        language: Option<String>,

        /// Render the answer as speech and write it to this file
        #[arg(short, long, value_name = "FILE")]
        speak: Option<String>,
    },

    /// Start an interactive chat session
    Chat {
        /// Target response language (BCP 47 tag)
        #[arg(short, long)]
        language: Option<String>,

        /// Render each answer as speech into this directory
        #[arg(short, long, value_name = "DIR")]
        speak: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the current configuration to the config file
    Init,
}

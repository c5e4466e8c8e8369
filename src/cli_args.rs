use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::llm::ProviderKind;
use crate::types::Style;

/// CLI options
#[derive(Parser, Debug)]
#[command(
    name = "worklogbot",
    version,
    about = "LLM-assisted work logs, stand-up scripts, commit messages and PR descriptions"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.config/worklogbot.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// LLM backend: gemini, openai or local
    #[arg(long, global = true)]
    pub provider: Option<ProviderKind>,

    /// Model name to use (e.g. gemini-2.0-flash, gpt-4o-mini, llama3.2)
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// API key for the selected hosted provider
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Base URL of the provider (required for the local provider)
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Read the diff from this file instead of stdin
    #[arg(long, global = true)]
    pub diff: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands, e.g. `git diff | worklogbot worklog --style business`
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Summarize the diff as worklog bullets plus a stand-up script
    Worklog {
        /// technical or business
        #[arg(long)]
        style: Option<Style>,
    },

    /// Generate a commit message from the diff
    Commit,

    /// Fill a pull request template from the diff
    Pr {
        /// Template file; a built-in template is used when omitted
        #[arg(long)]
        template: Option<PathBuf>,

        /// Commit message to use as an extra hint for checkboxes (repeatable)
        #[arg(long = "commit")]
        commits: Vec<String>,
    },

    /// Print the prompt that would be sent, without calling any model
    Prompt {
        #[arg(long)]
        style: Option<Style>,
    },

    /// List models offered by the configured provider
    Models,
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "policybot",
    version,
    about = "Answer employee questions from the company policy library, with provenance"
)]
pub struct Cli {
    /// Path to the TOML config (defaults to ./policybot.toml when present).
    #[arg(long, global = true, env = "POLICYBOT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rebuild the index from the policies directory.
    Index {
        /// Override `paths.policies_dir`.
        #[arg(long)]
        policies_dir: Option<PathBuf>,
        /// Override `paths.index_path`.
        #[arg(long)]
        index_path: Option<PathBuf>,
    },
    /// Answer one question and print the reply.
    Ask {
        /// Requester identity used for the intro-banner cooldown.
        #[arg(long, default_value = "cli")]
        user: String,
        question: String,
    },
    /// Serve `POST /ask` over HTTP.
    Serve {
        /// Override `server.bind` (host:port).
        #[arg(long)]
        bind: Option<String>,
    },
}

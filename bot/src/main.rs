use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use policybot_lib::cli::{Cli, Command};
use policybot_lib::config::BotConfig;
use policybot_lib::{indexer, server, service};
use tracing_subscriber::EnvFilter;

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("POLICYBOT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut cfg = BotConfig::load(cli.config.as_deref())?.with_env_overrides(env_var);

    match cli.command {
        Command::Index {
            policies_dir,
            index_path,
        } => {
            if let Some(dir) = policies_dir {
                cfg.paths.policies_dir = dir;
            }
            if let Some(path) = index_path {
                cfg.paths.index_path = path;
            }
            let (embedder, _) = service::provider_pair(service::provider_client(&cfg, env_var)?);
            let index = indexer::run_index(&cfg, embedder.as_ref())?;
            println!(
                "indexed {} policies into {} chunks -> {}",
                index.meta.policies_count,
                index.meta.chunk_count,
                cfg.paths.index_path.display()
            );
        }
        Command::Ask { user, question } => {
            let (embedder, llm) = service::provider_pair(service::provider_client(&cfg, env_var)?);
            let responder = service::build_responder(&cfg, embedder, llm)?;
            println!("{}", responder.respond(&question, &user));
        }
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
            let (embedder, llm) = service::provider_pair(service::provider_client(&cfg, env_var)?);
            let responder = Arc::new(service::build_responder(&cfg, embedder, llm)?);
            tokio::runtime::Runtime::new()
                .context("failed to start async runtime")?
                .block_on(server::serve(responder, &bind))?;
        }
    }
    Ok(())
}

//! tempmem-replay - run a recorded kernel call scenario against one agent
//!
//! Reads a JSON scenario (see [`scenario`]), applies every step to a fresh
//! agent, and prints a JSON report of sweeps, consume points and the final
//! store sizes. Exits non-zero on the first failing step.

mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tempmem_core::{Agent, AgentConfig};
use tracing::{info, Level};

use crate::scenario::{Replayer, Scenario};

#[derive(Parser)]
#[command(name = "tempmem-replay")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Replay a working-memory call scenario", long_about = None)]
struct Cli {
    /// Scenario file (JSON)
    scenario: PathBuf,

    /// Agent configuration file (TOML)
    #[arg(short, long, env = "TEMPMEM_CONFIG")]
    config: Option<PathBuf>,

    /// Override the agent name from the config
    #[arg(long)]
    agent: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tempmem_core::init_tracing(cli.json, level);

    let mut config = match &cli.config {
        Some(path) => AgentConfig::load(path)
            .with_context(|| format!("Failed to load agent config: {:?}", path))?,
        None => AgentConfig::default(),
    };
    if let Some(name) = cli.agent {
        config.name = name;
    }

    let scenario = Scenario::load(&cli.scenario)?;
    info!(steps = scenario.steps.len(), agent = %config.name, "replaying scenario");

    let agent = Agent::new(config).context("Failed to create agent")?;
    let report = Replayer::new(agent).run(&scenario)?;

    let out = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    println!("{}", out);
    Ok(())
}

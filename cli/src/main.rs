// Command-line runner for the rationing engine
//
// Reads a market snapshot (supply and demand node lists) from JSON, rations
// it, and prints the filled collections together with the allocation result.
//
//   market-ration --input demos/market.json --policy priority --bind --pretty

use clap::{Parser, ValueEnum};
use market_rationing_core_rs::{
    AcceptAllBinder, AllocationResult, EngineConfig, NodeCollection, PolicyConfig,
    RationingEngine,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "market-ration")]
#[command(about = "Ration a two-sided compute market snapshot")]
struct Cli {
    /// Market snapshot JSON: {"supply": [...], "demand": [...]}
    #[arg(short, long)]
    input: PathBuf,

    /// Engine config JSON (tolerance, rng_seed, policy)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the config's rationing policy
    #[arg(short, long, value_enum)]
    policy: Option<PolicyArg>,

    /// Override the config's RNG seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Bind every matched pair into a contract
    #[arg(short, long)]
    bind: bool,

    /// Pretty-print the report
    #[arg(long)]
    pretty: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Proportional,
    Priority,
    Lottery,
}

impl From<PolicyArg> for PolicyConfig {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Proportional => PolicyConfig::Proportional,
            PolicyArg::Priority => PolicyConfig::Priority,
            PolicyArg::Lottery => PolicyConfig::Lottery,
        }
    }
}

#[derive(Deserialize)]
struct MarketSnapshot {
    supply: NodeCollection,
    demand: NodeCollection,
}

#[derive(Serialize)]
struct Report {
    config_hash: String,
    policy: &'static str,
    digest: String,
    result: AllocationResult,
    supply: NodeCollection,
    demand: NodeCollection,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_json_str(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    if let Some(policy) = cli.policy {
        config = config.with_policy(policy.into());
    }
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }
    Ok(config)
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(cli)?;
    let config_hash = config.config_hash()?;
    let engine = RationingEngine::new(config)?;

    let snapshot: MarketSnapshot = serde_json::from_str(&fs::read_to_string(&cli.input)?)?;
    let MarketSnapshot {
        mut supply,
        mut demand,
    } = snapshot;

    info!(
        input = %cli.input.display(),
        policy = engine.policy_name(),
        supply_nodes = supply.len(),
        demand_nodes = demand.len(),
        "rationing market snapshot"
    );

    let result = if cli.bind {
        let mut binder = AcceptAllBinder::new();
        let result = engine.ration_and_bind(&mut supply, &mut demand, &mut binder)?;
        info!(
            contracts = binder.bound().len(),
            volume = binder.total_volume(),
            "contracts bound"
        );
        result
    } else {
        engine.ration_nodes(&mut supply, &mut demand)?
    };

    let report = Report {
        config_hash,
        policy: engine.policy_name(),
        digest: result.digest()?,
        result,
        supply,
        demand,
    };

    let json = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", json);
    Ok(())
}

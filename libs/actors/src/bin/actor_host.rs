//! Actor host - wires an actor manager the way an invocation gateway would
//!
//! Usage:
//!   actor-host
//!   actor-host --config config/actors.toml --env dev
//!   actor-host --types counter,tally --classes demo.Counter,demo.Counter

use actor_runtime::{
    Activatable, ActorClassBuilder, ActorConfig, ActorManagement, ActorManager, ClassCatalog,
    Deactivatable,
};
use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "actor-host")]
#[command(about = "Hosts actors and runs a create/invoke/delete round trip")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Environment overlay under config/environments
    #[arg(short, long)]
    env: Option<String>,

    /// Comma-separated actor type names (used without --config)
    #[arg(long, requires = "classes")]
    types: Option<String>,

    /// Comma-separated implementing class names, paired with --types
    #[arg(long, requires = "types")]
    classes: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,
}

#[derive(Debug, Default)]
struct Counter {
    value: i64,
}

impl Activatable for Counter {
    fn activate(&mut self) -> Result<()> {
        info!("Counter activated");
        Ok(())
    }
}

impl Deactivatable for Counter {
    fn deactivate(&mut self) -> Result<()> {
        info!(final_value = self.value, "Counter deactivated");
        Ok(())
    }
}

fn catalog() -> ClassCatalog {
    ClassCatalog::new().with(
        ActorClassBuilder::<Counter>::with_default("demo.Counter")
            .method("increment", |c: &mut Counter, by: Option<i64>| {
                c.value += by.unwrap_or(1);
                Ok(c.value)
            })
            .method("get", |c: &mut Counter, _: ()| Ok(c.value))
            .activatable()
            .deactivatable()
            .build(),
    )
}

fn load_config(args: &Args) -> Result<ActorConfig> {
    if let Some(path) = &args.config {
        return ActorConfig::load(Some(path.as_path()), args.env.as_deref());
    }
    if let (Some(types), Some(classes)) = (&args.types, &args.classes) {
        return ActorConfig::from_delimited(types, classes)
            .context("Invalid --types/--classes lists");
    }
    Ok(ActorConfig::default().with_actor("counter", "demo.Counter"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args)?;
    init_logging(&args, &config);

    let catalog = catalog();
    let manager = ActorManager::new(config, &catalog).map_err(|e| {
        error!(error = %e, category = e.category(), "Refusing to start with invalid actor types");
        e
    })?;

    for actor_type in manager.types().type_names() {
        run_round_trip(&manager, actor_type).await?;
    }

    let report = manager.collect_idle_default();
    for failure in &report.failures {
        warn!(error = %failure, "Idle actor failed to deactivate");
    }
    info!(
        collected = report.collected.len(),
        skipped_busy = report.skipped_busy,
        "Idle sweep complete"
    );

    info!(active = %manager.active_actors_json()?, "Active actors before shutdown");

    let failures = manager.shutdown().await;
    let stats = manager.metrics().snapshot();
    println!("{}", serde_json::to_string_pretty(&stats)?);

    if !failures.is_empty() {
        anyhow::bail!("{} actors failed to deactivate", failures.len());
    }
    Ok(())
}

async fn run_round_trip(manager: &ActorManager, actor_type: &str) -> Result<()> {
    let descriptor = manager.types().get(actor_type)?;
    if descriptor.method("increment").is_err() {
        info!(actor_type, "Type has no 'increment' method, skipping round trip");
        return Ok(());
    }

    manager.create_actor(actor_type, "demo-1").await?;
    for _ in 0..3 {
        manager
            .invoke(actor_type, "demo-1", "increment", Value::Null)
            .await?;
    }
    let value = manager
        .invoke(actor_type, "demo-1", "increment", json!(10))
        .await?;
    info!(actor_type, value = %value, "Round trip complete");

    manager.create_actor(actor_type, "demo-2").await?;
    manager.delete_actor(actor_type, "demo-2").await?;
    Ok(())
}

fn init_logging(args: &Args, config: &ActorConfig) {
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.runtime.log_level.clone());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if args.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
